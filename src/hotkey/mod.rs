//! Global hotkeys for pausing and finishing a session, backed by `rdev`.
//!
//! # Design
//!
//! `rdev::listen()` is a blocking OS-level call that never returns while the
//! process is alive, so it runs on a dedicated OS thread and forwards events
//! over a `tokio::sync::mpsc` channel.  The egui update loop drains that
//! channel with `try_recv` every frame.
//!
//! # Usage
//!
//! ```no_run
//! use tokio::sync::mpsc;
//! use pose_coach::config::HotkeyConfig;
//! use pose_coach::hotkey::{HotkeyBindings, HotkeyListener};
//!
//! let (tx, mut rx) = mpsc::channel(16);
//! let bindings = HotkeyBindings::from_config(&HotkeyConfig::default()).unwrap();
//! let _listener = HotkeyListener::start(bindings, tx).unwrap();
//!
//! // Each frame:
//! // while let Ok(ev) = rx.try_recv() { ... }
//! ```

pub mod listener;

pub use listener::HotkeyListener;

use crate::config::HotkeyConfig;

// ---------------------------------------------------------------------------
// HotkeyEvent
// ---------------------------------------------------------------------------

/// Events emitted by the hotkey listener thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyEvent {
    /// Flip between paused and live.
    TogglePause,
    /// Open the end-of-session dialog.
    FinishSession,
}

// ---------------------------------------------------------------------------
// HotkeyBindings
// ---------------------------------------------------------------------------

/// Keys the listener reacts to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HotkeyBindings {
    pub pause: rdev::Key,
    pub finish: rdev::Key,
}

impl HotkeyBindings {
    /// Resolve the configured key names.  `None` if either is unknown or
    /// both name the same key.
    pub fn from_config(config: &HotkeyConfig) -> Option<Self> {
        let pause = parse_key(&config.pause_key)?;
        let finish = parse_key(&config.finish_key)?;
        (pause != finish).then_some(Self { pause, finish })
    }

    /// Event bound to `key`, if any.
    pub fn event_for(&self, key: rdev::Key) -> Option<HotkeyEvent> {
        if key == self.pause {
            Some(HotkeyEvent::TogglePause)
        } else if key == self.finish {
            Some(HotkeyEvent::FinishSession)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// parse_key
// ---------------------------------------------------------------------------

/// Parse a hotkey name from a config string into an [`rdev::Key`].
///
/// Accepts F1–F12, a handful of named keys and single ASCII letters, all
/// case-insensitively.  Returns `None` for anything else.
///
/// # Examples
///
/// ```
/// use pose_coach::hotkey::parse_key;
///
/// assert_eq!(parse_key("F8"),    Some(rdev::Key::F8));
/// assert_eq!(parse_key("space"), Some(rdev::Key::Space));
/// assert_eq!(parse_key("p"),     Some(rdev::Key::KeyP));
/// assert_eq!(parse_key("F13"),   None);
/// ```
pub fn parse_key(name: &str) -> Option<rdev::Key> {
    use rdev::Key;

    let name = name.trim().to_ascii_lowercase();

    if let Some(n) = name.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
        const FUNCTION_KEYS: [Key; 12] = [
            Key::F1, Key::F2, Key::F3, Key::F4, Key::F5, Key::F6,
            Key::F7, Key::F8, Key::F9, Key::F10, Key::F11, Key::F12,
        ];
        return FUNCTION_KEYS.get(usize::from(n).checked_sub(1)?).copied();
    }

    let named = match name.as_str() {
        "escape" | "esc" => Some(Key::Escape),
        "space" => Some(Key::Space),
        "return" | "enter" => Some(Key::Return),
        "tab" => Some(Key::Tab),
        "home" => Some(Key::Home),
        "end" => Some(Key::End),
        "pageup" => Some(Key::PageUp),
        "pagedown" => Some(Key::PageDown),
        "pause" => Some(Key::Pause),
        "scrolllock" => Some(Key::ScrollLock),
        _ => None,
    };
    if named.is_some() {
        return named;
    }

    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_lowercase() => letter_key(c),
        _ => None,
    }
}

fn letter_key(c: char) -> Option<rdev::Key> {
    use rdev::Key::*;
    const LETTERS: [rdev::Key; 26] = [
        KeyA, KeyB, KeyC, KeyD, KeyE, KeyF, KeyG, KeyH, KeyI, KeyJ, KeyK, KeyL, KeyM,
        KeyN, KeyO, KeyP, KeyQ, KeyR, KeyS, KeyT, KeyU, KeyV, KeyW, KeyX, KeyY, KeyZ,
    ];
    LETTERS.get((c as u8).checked_sub(b'a')? as usize).copied()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
