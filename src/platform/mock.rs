//! Scripted backend for engine tests: notifications are fed by hand and
//! injections are logged instead of reaching the OS.

use super::{InputBackend, InputCallback, RawInput, SubscriptionId};
use crate::error::{Error, Result};
use crate::events::{Action, Button};
use parking_lot::Mutex;

#[derive(Default)]
pub struct MockBackend {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    subscriber: Option<(SubscriptionId, InputCallback)>,
    next_id: u64,
    injected: Vec<RawInput>,
    deny_subscribe: bool,
    fail_injection_at: Option<usize>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend whose `subscribe` is refused, as when the OS denies
    /// input monitoring.
    pub fn denying() -> Self {
        let backend = Self::new();
        backend.inner.lock().deny_subscribe = true;
        backend
    }

    /// Make the nth injection (zero-based) fail.
    pub fn fail_injection_at(&self, index: usize) {
        self.inner.lock().fail_injection_at = Some(index);
    }

    /// Deliver a notification to the current subscriber, if any.
    pub fn emit(&self, raw: RawInput) {
        let mut inner = self.inner.lock();
        if let Some((_, callback)) = inner.subscriber.as_mut() {
            callback(raw);
        }
    }

    pub fn injected(&self) -> Vec<RawInput> {
        self.inner.lock().injected.clone()
    }

    pub fn has_subscriber(&self) -> bool {
        self.inner.lock().subscriber.is_some()
    }

    fn record_injection(&self, raw: RawInput) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.fail_injection_at == Some(inner.injected.len()) {
            return Err(Error::permission_denied("injection refused"));
        }
        inner.injected.push(raw);
        Ok(())
    }
}

impl InputBackend for MockBackend {
    fn subscribe(&self, callback: InputCallback) -> Result<SubscriptionId> {
        let mut inner = self.inner.lock();
        if inner.deny_subscribe {
            return Err(Error::permission_denied("input monitoring refused"));
        }
        if inner.subscriber.is_some() {
            return Err(Error::already_running("a subscription is already active"));
        }
        inner.next_id += 1;
        let id = SubscriptionId(inner.next_id);
        inner.subscriber = Some((id, callback));
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        let mut inner = self.inner.lock();
        if matches!(inner.subscriber, Some((current, _)) if current == id) {
            inner.subscriber = None;
        }
    }

    fn inject_pointer_move(&self, x: i32, y: i32) -> Result<()> {
        self.record_injection(RawInput::PointerMove { x, y })
    }

    fn inject_pointer_button(
        &self,
        button: Button,
        action: Action,
        x: i32,
        y: i32,
    ) -> Result<()> {
        self.record_injection(RawInput::PointerButton {
            button,
            action,
            x,
            y,
        })
    }

    fn inject_key(&self, key: &str, action: Action) -> Result<()> {
        self.record_injection(RawInput::Key {
            key: key.to_string(),
            action,
        })
    }
}
