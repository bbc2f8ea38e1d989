//! Playback engine: re-injects a frozen macro with its original timing
//!
//! Each event is scheduled at its absolute offset from playback start, so
//! scheduling slack never accumulates across events. The inter-event sleep
//! doubles as the cancellation point: a cancel signal interrupts it and
//! playback halts at the next event boundary.

use crate::error::{Error, Result};
use crate::events::{Event, EventKind, Macro};
use crate::platform::InputBackend;
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How a playback run ended.
#[derive(Debug, Clone)]
pub struct ReplayOutcome {
    /// True when every event was injected; false on cancellation or a
    /// mid-playback injection failure.
    pub completed: bool,
    /// Index of the last successfully injected event, if any.
    pub last_index: Option<usize>,
    /// The failure that stopped playback, when one occurred.
    pub error: Option<Error>,
}

/// The playback engine
pub struct Replayer {
    backend: Arc<dyn InputBackend>,
    speed: f64,
}

impl Replayer {
    pub fn new(backend: Arc<dyn InputBackend>) -> Self {
        Self {
            backend,
            speed: 1.0,
        }
    }

    /// Playback speed (1.0 = real-time, 2.0 = 2x speed)
    pub fn speed(mut self, speed: f64) -> Self {
        if speed > 0.0 {
            self.speed = speed;
        }
        self
    }

    /// Start playback on a dedicated thread.
    ///
    /// `on_progress` fires with the event index after each injection;
    /// `on_done` fires exactly once, after completion, cancellation, or a
    /// mid-playback failure. Dropping the returned handle cancels playback.
    pub fn start<P, D>(&self, recording: Macro, mut on_progress: P, on_done: D) -> ReplayHandle
    where
        P: FnMut(usize) + Send + 'static,
        D: FnOnce(ReplayOutcome) + Send + 'static,
    {
        let (cancel_tx, cancel_rx) = bounded::<()>(1);
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();
        let backend = Arc::clone(&self.backend);
        let speed = self.speed;

        let thread = thread::spawn(move || {
            debug!(events = recording.len(), speed, "playback started");
            let start = Instant::now();
            let mut cancelled = false;
            let mut error: Option<Error> = None;
            let mut last_index: Option<usize> = None;

            'events: for (index, event) in recording.events.iter().enumerate() {
                let target = Duration::from_millis(event.offset_ms).div_f64(speed);
                loop {
                    let elapsed = start.elapsed();
                    if elapsed >= target {
                        break;
                    }
                    match cancel_rx.recv_timeout(target - elapsed) {
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                            cancelled = true;
                            break 'events;
                        }
                        Err(RecvTimeoutError::Timeout) => {}
                    }
                }
                if cancel_rx.try_recv().is_ok() {
                    cancelled = true;
                    break;
                }

                if let Err(e) = inject(backend.as_ref(), event) {
                    warn!(index, "injection failed: {e}");
                    error = Some(e);
                    break;
                }
                last_index = Some(index);
                on_progress(index);
            }

            let outcome = ReplayOutcome {
                completed: !cancelled && error.is_none(),
                last_index,
                error,
            };
            debug!(
                completed = outcome.completed,
                last_index = ?outcome.last_index,
                "playback finished"
            );
            flag.store(false, Ordering::SeqCst);
            on_done(outcome);
        });

        ReplayHandle {
            cancel_tx,
            running,
            thread: Some(thread),
        }
    }
}

fn inject(backend: &dyn InputBackend, event: &Event) -> Result<()> {
    match &event.kind {
        EventKind::Move { x, y } => backend.inject_pointer_move(*x, *y),
        EventKind::Button {
            button,
            action,
            x,
            y,
        } => backend.inject_pointer_button(*button, *action, *x, *y),
        EventKind::Key { key, action } => backend.inject_key(key, *action),
    }
}

/// Owns an active playback run
pub struct ReplayHandle {
    cancel_tx: Sender<()>,
    running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl ReplayHandle {
    /// Request cooperative cancellation: playback halts at the next event
    /// boundary. Safe to call more than once.
    pub fn stop(&self) {
        let _ = self.cancel_tx.try_send(());
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Block until the playback thread ends, without cancelling it.
    pub fn wait(mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
