//! macro-recorder - capture and replay of mouse/keyboard macros
//!
//! Records user input with millisecond offsets and replays it later with
//! the original inter-event timing. Capture and playback each run on their
//! own background thread; a session controller keeps them mutually
//! exclusive and owns the recorded macro between runs.
//!
//! The engine consumes native input through the [`platform::InputBackend`]
//! capability trait; enable the `system` feature for the `rdev`-backed OS
//! implementation (and the `mrec` binary).
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use macro_recorder::prelude::*;
//!
//! fn demo(backend: Arc<dyn InputBackend>) -> macro_recorder::Result<()> {
//!     let session = Session::new(backend);
//!
//!     session.start_recording(|event| println!("captured {:?}", event))?;
//!     std::thread::sleep(std::time::Duration::from_secs(5));
//!     let recorded = session.stop_recording()?;
//!     println!("{} events", recorded.map(|m| m.len()).unwrap_or(0));
//!
//!     session.start_playing(
//!         |index| println!("played event {index}"),
//!         |outcome| println!("done, completed: {}", outcome.completed),
//!     )?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod events;
pub mod platform;
pub mod recorder;
pub mod replay;
pub mod session;
pub mod storage;

pub use error::{Error, ErrorCode, Result};
pub use events::{Action, Button, Event, EventKind, Macro, FORMAT_VERSION};
pub use platform::{InputBackend, InputCallback, RawInput, SubscriptionId};
pub use recorder::{Recorder, RecorderConfig, RecordingHandle};
pub use replay::{ReplayHandle, ReplayOutcome, Replayer};
pub use session::{Session, SessionState};
pub use storage::MacroStore;

#[cfg(feature = "system")]
pub use platform::system::SystemBackend;

pub mod prelude {
    pub use crate::error::{Error, ErrorCode, Result};
    pub use crate::events::{Action, Button, Event, EventKind, Macro};
    pub use crate::platform::{InputBackend, RawInput, SubscriptionId};
    pub use crate::recorder::{Recorder, RecorderConfig, RecordingHandle};
    pub use crate::replay::{ReplayHandle, ReplayOutcome, Replayer};
    pub use crate::session::{Session, SessionState};
    pub use crate::storage::MacroStore;

    #[cfg(feature = "system")]
    pub use crate::platform::system::SystemBackend;
}
