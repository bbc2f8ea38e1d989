//! Native input capability boundary
//!
//! The engine consumes exactly five native operations: subscribe to input
//! notifications, unsubscribe, and inject pointer moves, pointer buttons,
//! and key transitions. Any backend satisfying [`InputBackend`] is
//! substitutable; the engine never touches OS hooks directly.

use crate::error::Result;
use crate::events::{Action, Button, EventKind};

#[cfg(test)]
pub mod mock;

#[cfg(feature = "system")]
pub mod system;

/// One unstamped input notification crossing the native boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawInput {
    PointerMove { x: i32, y: i32 },
    PointerButton {
        button: Button,
        action: Action,
        x: i32,
        y: i32,
    },
    Key { key: String, action: Action },
}

impl From<RawInput> for EventKind {
    fn from(raw: RawInput) -> Self {
        match raw {
            RawInput::PointerMove { x, y } => EventKind::Move { x, y },
            RawInput::PointerButton {
                button,
                action,
                x,
                y,
            } => EventKind::Button {
                button,
                action,
                x,
                y,
            },
            RawInput::Key { key, action } => EventKind::Key { key, action },
        }
    }
}

/// Callback invoked for every native notification while subscribed.
pub type InputCallback = Box<dyn FnMut(RawInput) + Send>;

/// Opaque handle returned by [`InputBackend::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

/// Native input monitoring and injection, as consumed by the engine.
///
/// Contract for implementations:
/// - notifications are delivered from a single thread, in arrival order;
/// - `unsubscribe` drops the stored callback, so anything it owns (such as
///   a channel sender) is released promptly;
/// - `subscribe` fails with `PermissionDenied` when the OS refuses input
///   monitoring, leaving no subscription behind.
pub trait InputBackend: Send + Sync {
    fn subscribe(&self, callback: InputCallback) -> Result<SubscriptionId>;

    fn unsubscribe(&self, id: SubscriptionId);

    fn inject_pointer_move(&self, x: i32, y: i32) -> Result<()>;

    fn inject_pointer_button(
        &self,
        button: Button,
        action: Action,
        x: i32,
        y: i32,
    ) -> Result<()>;

    fn inject_key(&self, key: &str, action: Action) -> Result<()>;
}
