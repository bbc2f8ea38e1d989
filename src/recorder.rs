//! Capture engine: turns native input notifications into stamped events
//!
//! Notifications are stamped with the elapsed time since recording start at
//! arrival, queued in arrival order on an unbounded channel so bursts are
//! never dropped, and appended to the sequence by a collector thread.

use crate::error::Result;
use crate::events::{Event, Macro};
use crate::platform::{InputBackend, RawInput, SubscriptionId};
use crossbeam_channel::unbounded;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::debug;

/// Capture configuration
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Capture pointer motion in addition to buttons and keys.
    pub record_pointer_moves: bool,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            record_pointer_moves: true,
        }
    }
}

/// The capture engine
pub struct Recorder {
    backend: Arc<dyn InputBackend>,
    config: RecorderConfig,
}

impl Recorder {
    pub fn new(backend: Arc<dyn InputBackend>) -> Self {
        Self::with_config(backend, RecorderConfig::default())
    }

    pub fn with_config(backend: Arc<dyn InputBackend>, config: RecorderConfig) -> Self {
        Self { backend, config }
    }

    /// Subscribe to native input and start collecting stamped events.
    ///
    /// `on_event` fires once per captured event, from the capture context;
    /// keep it short and do not call back into the session from it. Fails
    /// with `PermissionDenied` when the OS refuses input monitoring, in
    /// which case no partial session is left behind.
    pub fn start<F>(&self, mut on_event: F) -> Result<RecordingHandle>
    where
        F: FnMut(&Event) + Send + 'static,
    {
        let (tx, rx) = unbounded::<Event>();
        let start = Instant::now();
        let record_moves = self.config.record_pointer_moves;

        let subscription = self.backend.subscribe(Box::new(move |raw: RawInput| {
            if !record_moves && matches!(raw, RawInput::PointerMove { .. }) {
                return;
            }
            let event = Event {
                offset_ms: start.elapsed().as_millis() as u64,
                kind: raw.into(),
            };
            let _ = tx.send(event);
        }))?;

        // Drains until the backend drops the callback (and with it the
        // sender) on unsubscribe.
        let collector = thread::spawn(move || {
            let mut events = Vec::new();
            for event in rx {
                on_event(&event);
                events.push(event);
            }
            events
        });

        debug!("capture started");
        Ok(RecordingHandle {
            backend: Arc::clone(&self.backend),
            subscription,
            collector: Some(collector),
        })
    }
}

/// Owns an active recording session
pub struct RecordingHandle {
    backend: Arc<dyn InputBackend>,
    subscription: SubscriptionId,
    collector: Option<thread::JoinHandle<Vec<Event>>>,
}

impl RecordingHandle {
    /// Deregister the native listener, drain what already arrived, and
    /// freeze the sequence. Nothing is appended afterward.
    pub fn stop(mut self) -> Macro {
        self.backend.unsubscribe(self.subscription);
        let events = match self.collector.take() {
            Some(collector) => collector.join().unwrap_or_default(),
            None => Vec::new(),
        };
        debug!(events = events.len(), "capture stopped");
        Macro::from_events(events)
    }
}

impl std::fmt::Debug for RecordingHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingHandle")
            .field("subscription", &self.subscription)
            .field("recording", &self.collector.is_some())
            .finish()
    }
}

impl Drop for RecordingHandle {
    fn drop(&mut self) {
        if self.collector.is_some() {
            self.backend.unsubscribe(self.subscription);
        }
    }
}
