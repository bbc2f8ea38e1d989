//! System backend backed by the `rdev` global hook
//!
//! `rdev` cannot tear its hook down once installed, so the listener thread
//! is started once per process and stays up; subscriptions are gated by the
//! callback slot instead. Button notifications carry the last observed
//! pointer position, since the native hook reports buttons without
//! coordinates.

use super::{InputBackend, InputCallback, RawInput, SubscriptionId};
use crate::error::{Error, Result};
use crate::events::{Action, Button};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rdev::{simulate, Button as RdevButton, EventType, Key as RdevKey};

pub struct SystemBackend {
    inner: Arc<SystemInner>,
}

struct SystemInner {
    subscriber: Mutex<Option<(SubscriptionId, InputCallback)>>,
    last_pos: Mutex<(i32, i32)>,
    listener_started: AtomicBool,
    listener_failed: Mutex<Option<String>>,
    next_id: AtomicU64,
}

impl SystemBackend {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SystemInner {
                subscriber: Mutex::new(None),
                last_pos: Mutex::new((0, 0)),
                listener_started: AtomicBool::new(false),
                listener_failed: Mutex::new(None),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    fn ensure_listener(&self) -> Result<()> {
        if !self.inner.listener_started.swap(true, Ordering::SeqCst) {
            let inner = Arc::clone(&self.inner);
            let dispatch_inner = Arc::clone(&self.inner);
            thread::spawn(move || {
                if let Err(e) = rdev::listen(move |event| dispatch_inner.dispatch(event)) {
                    tracing::warn!("input hook failed: {e:?}");
                    *inner.listener_failed.lock() = Some(format!("{e:?}"));
                }
            });
            // The hook fails fast when the OS refuses it; give it a moment
            // to report before the first subscription proceeds.
            for _ in 0..10 {
                thread::sleep(Duration::from_millis(20));
                if self.inner.listener_failed.lock().is_some() {
                    break;
                }
            }
        }
        if let Some(reason) = self.inner.listener_failed.lock().clone() {
            return Err(Error::permission_denied(format!(
                "input hook unavailable: {reason}"
            )));
        }
        Ok(())
    }
}

impl Default for SystemBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemInner {
    fn dispatch(&self, event: rdev::Event) {
        let raw = match event.event_type {
            EventType::MouseMove { x, y } => {
                let pos = (x as i32, y as i32);
                *self.last_pos.lock() = pos;
                RawInput::PointerMove { x: pos.0, y: pos.1 }
            }
            EventType::ButtonPress(button) => {
                let Some(button) = button_from_rdev(button) else {
                    return;
                };
                let (x, y) = *self.last_pos.lock();
                RawInput::PointerButton {
                    button,
                    action: Action::Press,
                    x,
                    y,
                }
            }
            EventType::ButtonRelease(button) => {
                let Some(button) = button_from_rdev(button) else {
                    return;
                };
                let (x, y) = *self.last_pos.lock();
                RawInput::PointerButton {
                    button,
                    action: Action::Release,
                    x,
                    y,
                }
            }
            EventType::KeyPress(key) => RawInput::Key {
                key: key_name(key),
                action: Action::Press,
            },
            EventType::KeyRelease(key) => RawInput::Key {
                key: key_name(key),
                action: Action::Release,
            },
            // Wheel motion is outside the event model.
            EventType::Wheel { .. } => return,
        };

        if let Some((_, callback)) = self.subscriber.lock().as_mut() {
            callback(raw);
        }
    }
}

impl InputBackend for SystemBackend {
    fn subscribe(&self, callback: InputCallback) -> Result<SubscriptionId> {
        self.ensure_listener()?;
        let mut subscriber = self.inner.subscriber.lock();
        if subscriber.is_some() {
            return Err(Error::already_running(
                "an input subscription is already active",
            ));
        }
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        *subscriber = Some((id, callback));
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        let mut subscriber = self.inner.subscriber.lock();
        if matches!(*subscriber, Some((current, _)) if current == id) {
            *subscriber = None;
        }
    }

    fn inject_pointer_move(&self, x: i32, y: i32) -> Result<()> {
        send(&EventType::MouseMove {
            x: x as f64,
            y: y as f64,
        })
    }

    fn inject_pointer_button(
        &self,
        button: Button,
        action: Action,
        x: i32,
        y: i32,
    ) -> Result<()> {
        // Position the pointer before the button transition, like the hook
        // observed it.
        self.inject_pointer_move(x, y)?;
        let button = button_to_rdev(button);
        match action {
            Action::Press => send(&EventType::ButtonPress(button)),
            Action::Release => send(&EventType::ButtonRelease(button)),
        }
    }

    fn inject_key(&self, key: &str, action: Action) -> Result<()> {
        let key = key_from_name(key)
            .ok_or_else(|| Error::invalid_format(format!("unrecognized key identifier: {key}")))?;
        match action {
            Action::Press => send(&EventType::KeyPress(key)),
            Action::Release => send(&EventType::KeyRelease(key)),
        }
    }
}

fn send(event_type: &EventType) -> Result<()> {
    simulate(event_type)
        .map_err(|e| Error::permission_denied(format!("input injection refused: {e:?}")))
}

fn button_from_rdev(button: RdevButton) -> Option<Button> {
    match button {
        RdevButton::Left => Some(Button::Left),
        RdevButton::Right => Some(Button::Right),
        RdevButton::Middle => Some(Button::Middle),
        RdevButton::Unknown(_) => None,
    }
}

fn button_to_rdev(button: Button) -> RdevButton {
    match button {
        Button::Left => RdevButton::Left,
        Button::Right => RdevButton::Right,
        Button::Middle => RdevButton::Middle,
    }
}

/// Stable key names used in recorded macros, one table for both directions.
const KEY_NAMES: &[(&str, RdevKey)] = &[
    ("a", RdevKey::KeyA),
    ("b", RdevKey::KeyB),
    ("c", RdevKey::KeyC),
    ("d", RdevKey::KeyD),
    ("e", RdevKey::KeyE),
    ("f", RdevKey::KeyF),
    ("g", RdevKey::KeyG),
    ("h", RdevKey::KeyH),
    ("i", RdevKey::KeyI),
    ("j", RdevKey::KeyJ),
    ("k", RdevKey::KeyK),
    ("l", RdevKey::KeyL),
    ("m", RdevKey::KeyM),
    ("n", RdevKey::KeyN),
    ("o", RdevKey::KeyO),
    ("p", RdevKey::KeyP),
    ("q", RdevKey::KeyQ),
    ("r", RdevKey::KeyR),
    ("s", RdevKey::KeyS),
    ("t", RdevKey::KeyT),
    ("u", RdevKey::KeyU),
    ("v", RdevKey::KeyV),
    ("w", RdevKey::KeyW),
    ("x", RdevKey::KeyX),
    ("y", RdevKey::KeyY),
    ("z", RdevKey::KeyZ),
    ("0", RdevKey::Num0),
    ("1", RdevKey::Num1),
    ("2", RdevKey::Num2),
    ("3", RdevKey::Num3),
    ("4", RdevKey::Num4),
    ("5", RdevKey::Num5),
    ("6", RdevKey::Num6),
    ("7", RdevKey::Num7),
    ("8", RdevKey::Num8),
    ("9", RdevKey::Num9),
    ("f1", RdevKey::F1),
    ("f2", RdevKey::F2),
    ("f3", RdevKey::F3),
    ("f4", RdevKey::F4),
    ("f5", RdevKey::F5),
    ("f6", RdevKey::F6),
    ("f7", RdevKey::F7),
    ("f8", RdevKey::F8),
    ("f9", RdevKey::F9),
    ("f10", RdevKey::F10),
    ("f11", RdevKey::F11),
    ("f12", RdevKey::F12),
    ("space", RdevKey::Space),
    ("enter", RdevKey::Return),
    ("tab", RdevKey::Tab),
    ("backspace", RdevKey::Backspace),
    ("escape", RdevKey::Escape),
    ("caps_lock", RdevKey::CapsLock),
    ("shift", RdevKey::ShiftLeft),
    ("shift_right", RdevKey::ShiftRight),
    ("ctrl", RdevKey::ControlLeft),
    ("ctrl_right", RdevKey::ControlRight),
    ("alt", RdevKey::Alt),
    ("alt_gr", RdevKey::AltGr),
    ("meta", RdevKey::MetaLeft),
    ("meta_right", RdevKey::MetaRight),
    ("up", RdevKey::UpArrow),
    ("down", RdevKey::DownArrow),
    ("left", RdevKey::LeftArrow),
    ("right", RdevKey::RightArrow),
    ("home", RdevKey::Home),
    ("end", RdevKey::End),
    ("page_up", RdevKey::PageUp),
    ("page_down", RdevKey::PageDown),
    ("insert", RdevKey::Insert),
    ("delete", RdevKey::Delete),
    ("print_screen", RdevKey::PrintScreen),
    ("scroll_lock", RdevKey::ScrollLock),
    ("pause", RdevKey::Pause),
    ("num_lock", RdevKey::NumLock),
    ("minus", RdevKey::Minus),
    ("equal", RdevKey::Equal),
    ("left_bracket", RdevKey::LeftBracket),
    ("right_bracket", RdevKey::RightBracket),
    ("semicolon", RdevKey::SemiColon),
    ("quote", RdevKey::Quote),
    ("backslash", RdevKey::BackSlash),
    ("intl_backslash", RdevKey::IntlBackslash),
    ("comma", RdevKey::Comma),
    ("dot", RdevKey::Dot),
    ("slash", RdevKey::Slash),
    ("backquote", RdevKey::BackQuote),
    ("kp_0", RdevKey::Kp0),
    ("kp_1", RdevKey::Kp1),
    ("kp_2", RdevKey::Kp2),
    ("kp_3", RdevKey::Kp3),
    ("kp_4", RdevKey::Kp4),
    ("kp_5", RdevKey::Kp5),
    ("kp_6", RdevKey::Kp6),
    ("kp_7", RdevKey::Kp7),
    ("kp_8", RdevKey::Kp8),
    ("kp_9", RdevKey::Kp9),
    ("kp_minus", RdevKey::KpMinus),
    ("kp_plus", RdevKey::KpPlus),
    ("kp_multiply", RdevKey::KpMultiply),
    ("kp_divide", RdevKey::KpDivide),
    ("kp_enter", RdevKey::KpReturn),
    ("kp_delete", RdevKey::KpDelete),
    ("fn", RdevKey::Function),
];

fn key_name(key: RdevKey) -> String {
    if let RdevKey::Unknown(code) = key {
        return format!("raw:{code}");
    }
    KEY_NAMES
        .iter()
        .find(|(_, k)| *k == key)
        .map(|(name, _)| (*name).to_string())
        .unwrap_or_else(|| format!("{key:?}").to_lowercase())
}

fn key_from_name(name: &str) -> Option<RdevKey> {
    if let Some(code) = name.strip_prefix("raw:") {
        return code.parse().ok().map(RdevKey::Unknown);
    }
    KEY_NAMES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, key)| *key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_names_round_trip() {
        for (name, key) in KEY_NAMES {
            assert_eq!(key_name(*key), *name);
            assert_eq!(key_from_name(name), Some(*key));
        }
    }

    #[test]
    fn unknown_keys_round_trip() {
        let name = key_name(RdevKey::Unknown(187));
        assert_eq!(name, "raw:187");
        assert_eq!(key_from_name(&name), Some(RdevKey::Unknown(187)));
    }
}
