//! Session controller: owns the macro slot and arbitrates modes
//!
//! An explicit state machine (`Idle`, `Recording`, `Playing`) keeps capture
//! and playback mutually exclusive. Controller calls return quickly; the
//! long-running work lives on the engines' background threads and reports
//! back through callbacks. The controller returns to `Idle` after any
//! failure.

use crate::error::{Error, Result};
use crate::events::{Event, Macro};
use crate::platform::InputBackend;
use crate::recorder::{Recorder, RecorderConfig, RecordingHandle};
use crate::replay::{ReplayHandle, ReplayOutcome, Replayer};
use crate::storage;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Recording,
    Playing,
}

#[derive(Clone)]
pub struct Session {
    backend: Arc<dyn InputBackend>,
    config: RecorderConfig,
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    state: SessionState,
    slot: Option<Macro>,
    recording: Option<RecordingHandle>,
    playback: Option<ReplayHandle>,
    speed: f64,
}

impl Session {
    pub fn new(backend: Arc<dyn InputBackend>) -> Self {
        Self::with_config(backend, RecorderConfig::default())
    }

    pub fn with_config(backend: Arc<dyn InputBackend>, config: RecorderConfig) -> Self {
        Self {
            backend,
            config,
            inner: Arc::new(Mutex::new(Inner {
                state: SessionState::Idle,
                slot: None,
                recording: None,
                playback: None,
                speed: 1.0,
            })),
        }
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    /// Whether a frozen macro is held and playback is possible.
    pub fn macro_loaded(&self) -> bool {
        self.inner.lock().slot.is_some()
    }

    /// Clone of the held macro, if any.
    pub fn current_macro(&self) -> Option<Macro> {
        self.inner.lock().slot.clone()
    }

    /// Playback speed used by subsequent `start_playing` calls.
    pub fn set_speed(&self, speed: f64) {
        if speed > 0.0 {
            self.inner.lock().speed = speed;
        }
    }

    /// Begin capturing into a fresh macro, discarding any held one.
    pub fn start_recording<F>(&self, on_event: F) -> Result<()>
    where
        F: FnMut(&Event) + Send + 'static,
    {
        let mut inner = self.inner.lock();
        match inner.state {
            SessionState::Recording => Err(Error::already_running("recording already active")),
            SessionState::Playing => Err(Error::conflicting_operation(
                "cannot start recording while playing",
            )),
            SessionState::Idle => {
                let recorder = Recorder::with_config(Arc::clone(&self.backend), self.config.clone());
                let handle = recorder.start(on_event)?;
                inner.slot = None;
                inner.recording = Some(handle);
                inner.state = SessionState::Recording;
                debug!("session: idle -> recording");
                Ok(())
            }
        }
    }

    /// Stop capturing and freeze the recorded macro.
    ///
    /// Returns `None` when no recording was active (stop is idempotent).
    pub fn stop_recording(&self) -> Result<Option<Macro>> {
        let mut inner = self.inner.lock();
        match inner.state {
            SessionState::Playing => Err(Error::conflicting_operation(
                "cannot stop recording while playing",
            )),
            SessionState::Idle => Ok(None),
            SessionState::Recording => {
                let handle = inner.recording.take();
                inner.state = SessionState::Idle;
                debug!("session: recording -> idle");
                let recorded = match handle {
                    Some(handle) => handle.stop(),
                    None => Macro::new(),
                };
                inner.slot = Some(recorded.clone());
                Ok(Some(recorded))
            }
        }
    }

    /// Play the held macro on the playback engine's thread.
    ///
    /// `on_progress` fires after each injected event with its index;
    /// `on_done` fires exactly once when playback completes, is cancelled,
    /// or fails, after the session has returned to `Idle`.
    pub fn start_playing<P, D>(&self, on_progress: P, on_done: D) -> Result<()>
    where
        P: FnMut(usize) + Send + 'static,
        D: FnOnce(ReplayOutcome) + Send + 'static,
    {
        let mut inner = self.inner.lock();
        match inner.state {
            SessionState::Recording => Err(Error::conflicting_operation(
                "cannot start playback while recording",
            )),
            SessionState::Playing => Err(Error::already_running("playback already active")),
            SessionState::Idle => {
                let recording = inner
                    .slot
                    .clone()
                    .ok_or_else(|| Error::no_macro_loaded("no macro to play"))?;

                let shared = Arc::clone(&self.inner);
                let done = move |outcome: ReplayOutcome| {
                    {
                        let mut inner = shared.lock();
                        inner.state = SessionState::Idle;
                        inner.playback = None;
                        debug!("session: playing -> idle");
                    }
                    on_done(outcome);
                };

                let handle = Replayer::new(Arc::clone(&self.backend))
                    .speed(inner.speed)
                    .start(recording, on_progress, done);
                inner.playback = Some(handle);
                inner.state = SessionState::Playing;
                debug!("session: idle -> playing");
                Ok(())
            }
        }
    }

    /// Request cancellation of the active playback; a no-op when idle.
    ///
    /// Returns immediately. Playback halts at the next event boundary and
    /// `on_done` reports `completed = false`.
    pub fn stop_playing(&self) -> Result<()> {
        let inner = self.inner.lock();
        match inner.state {
            SessionState::Recording => Err(Error::conflicting_operation(
                "cannot stop playback while recording",
            )),
            SessionState::Idle => Ok(()),
            SessionState::Playing => {
                if let Some(handle) = &inner.playback {
                    handle.stop();
                }
                Ok(())
            }
        }
    }

    /// Serialize the held macro to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let inner = self.inner.lock();
        match &inner.slot {
            Some(recording) => storage::save(recording, path),
            None => Err(Error::no_macro_loaded("no macro to save")),
        }
    }

    /// Deserialize a macro from `path` into the slot, enabling playback.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Macro> {
        let mut inner = self.inner.lock();
        if inner.state != SessionState::Idle {
            return Err(Error::conflicting_operation(
                "cannot load while recording or playing",
            ));
        }
        let loaded = storage::load(path)?;
        inner.slot = Some(loaded.clone());
        Ok(loaded)
    }

    /// Place an already-frozen macro into the slot.
    pub fn set_macro(&self, recording: Macro) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.state != SessionState::Idle {
            return Err(Error::conflicting_operation(
                "cannot replace the macro while recording or playing",
            ));
        }
        inner.slot = Some(recording);
        Ok(())
    }

    /// Drop the held macro.
    pub fn clear(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.state != SessionState::Idle {
            return Err(Error::conflicting_operation(
                "cannot clear while recording or playing",
            ));
        }
        inner.slot = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::events::{Action, EventKind};
    use crate::platform::mock::MockBackend;
    use crate::platform::RawInput;
    use crossbeam_channel::unbounded;
    use std::time::Duration;

    fn key_event(offset_ms: u64, key: &str) -> Event {
        Event {
            offset_ms,
            kind: EventKind::Key {
                key: key.into(),
                action: Action::Press,
            },
        }
    }

    fn long_macro() -> Macro {
        Macro::from_events(vec![key_event(0, "a"), key_event(60_000, "b")])
    }

    #[test]
    fn recording_round_trip() {
        let backend = Arc::new(MockBackend::new());
        let session = Session::new(backend.clone());

        session.start_recording(|_| {}).unwrap();
        assert_eq!(session.state(), SessionState::Recording);

        backend.emit(RawInput::Key {
            key: "a".into(),
            action: Action::Press,
        });
        backend.emit(RawInput::Key {
            key: "a".into(),
            action: Action::Release,
        });

        let recorded = session.stop_recording().unwrap().unwrap();
        assert_eq!(recorded.len(), 2);
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.macro_loaded());
    }

    #[test]
    fn modes_are_mutually_exclusive() {
        let backend = Arc::new(MockBackend::new());
        let session = Session::new(backend.clone());

        session.start_recording(|_| {}).unwrap();
        let err = session.start_playing(|_| {}, |_| {}).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConflictingOperation);
        // The active recording is unaffected.
        assert_eq!(session.state(), SessionState::Recording);
        assert!(backend.has_subscriber());
        session.stop_recording().unwrap();

        session.set_macro(long_macro()).unwrap();
        let (done_tx, done_rx) = unbounded();
        session
            .start_playing(|_| {}, move |outcome| {
                let _ = done_tx.send(outcome);
            })
            .unwrap();
        let err = session.start_recording(|_| {}).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConflictingOperation);
        assert_eq!(session.state(), SessionState::Playing);

        session.stop_playing().unwrap();
        let outcome = done_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(!outcome.completed);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn playback_requires_a_macro() {
        let session = Session::new(Arc::new(MockBackend::new()));
        let err = session.start_playing(|_| {}, |_| {}).unwrap_err();
        assert_eq!(err.code, ErrorCode::NoMacroLoaded);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn reentrant_playback_is_rejected() {
        let session = Session::new(Arc::new(MockBackend::new()));
        session.set_macro(long_macro()).unwrap();

        let (done_tx, done_rx) = unbounded();
        session
            .start_playing(|_| {}, move |outcome| {
                let _ = done_tx.send(outcome);
            })
            .unwrap();
        let err = session.start_playing(|_| {}, |_| {}).unwrap_err();
        assert_eq!(err.code, ErrorCode::AlreadyRunning);

        session.stop_playing().unwrap();
        assert!(!done_rx.recv_timeout(Duration::from_secs(2)).unwrap().completed);
    }

    #[test]
    fn stops_are_idempotent() {
        let session = Session::new(Arc::new(MockBackend::new()));
        assert!(session.stop_recording().unwrap().is_none());
        session.stop_playing().unwrap();
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn save_requires_a_macro() {
        let session = Session::new(Arc::new(MockBackend::new()));
        let dir = tempfile::tempdir().unwrap();
        let err = session.save(dir.path().join("m.json")).unwrap_err();
        assert_eq!(err.code, ErrorCode::NoMacroLoaded);
    }

    #[test]
    fn record_nothing_save_load_play() {
        let backend = Arc::new(MockBackend::new());
        let session = Session::new(backend.clone());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.json");

        session.start_recording(|_| {}).unwrap();
        let recorded = session.stop_recording().unwrap().unwrap();
        assert!(recorded.is_empty());

        session.save(&path).unwrap();
        let loaded = session.load(&path).unwrap();
        assert!(loaded.is_empty());

        let (done_tx, done_rx) = unbounded();
        session
            .start_playing(|_| {}, move |outcome| {
                let _ = done_tx.send(outcome);
            })
            .unwrap();
        let outcome = done_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(outcome.completed);
        assert_eq!(outcome.last_index, None);
        assert!(backend.injected().is_empty());
    }

    #[test]
    fn failed_playback_returns_to_idle() {
        let backend = Arc::new(MockBackend::new());
        backend.fail_injection_at(0);
        let session = Session::new(backend.clone());
        session
            .set_macro(Macro::from_events(vec![key_event(0, "a")]))
            .unwrap();

        let (done_tx, done_rx) = unbounded();
        session
            .start_playing(|_| {}, move |outcome| {
                let _ = done_tx.send(outcome);
            })
            .unwrap();

        let outcome = done_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(!outcome.completed);
        assert!(outcome.error.is_some());
        assert_eq!(outcome.last_index, None);
        // The done callback runs after the transition back to idle.
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn starting_a_recording_discards_the_held_macro() {
        let backend = Arc::new(MockBackend::new());
        let session = Session::new(backend.clone());
        session.set_macro(long_macro()).unwrap();
        assert!(session.macro_loaded());

        session.start_recording(|_| {}).unwrap();
        assert!(!session.macro_loaded());
        let recorded = session.stop_recording().unwrap().unwrap();
        assert!(recorded.is_empty());
    }

    #[test]
    fn clear_drops_the_macro() {
        let session = Session::new(Arc::new(MockBackend::new()));
        session.set_macro(long_macro()).unwrap();
        session.clear().unwrap();
        let err = session.start_playing(|_| {}, |_| {}).unwrap_err();
        assert_eq!(err.code, ErrorCode::NoMacroLoaded);
    }

    #[test]
    fn load_rejects_garbage() {
        let session = Session::new(Arc::new(MockBackend::new()));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "not json at all").unwrap();
        let err = session.load(&path).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFormat);
        assert!(!session.macro_loaded());
        assert_eq!(session.state(), SessionState::Idle);
    }
}
