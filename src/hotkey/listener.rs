//! Dedicated OS-thread hotkey listener using `rdev::listen`.
//!
//! # Shutdown caveat
//!
//! `rdev::listen` has **no graceful shutdown API**.  Dropping the
//! [`HotkeyListener`] sets a stop flag so nothing more is forwarded, but the
//! thread stays blocked in the rdev event loop until the process exits.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::sync::mpsc;

use super::{HotkeyBindings, HotkeyEvent};

// ---------------------------------------------------------------------------
// KeyDebounce
// ---------------------------------------------------------------------------

/// Turns raw press/release events into one event per physical press; OS
/// auto-repeat sends many presses while a key is held.
#[derive(Debug, Default)]
struct KeyDebounce {
    held: Vec<rdev::Key>,
}

impl KeyDebounce {
    fn on_event(&mut self, bindings: &HotkeyBindings, event: &rdev::EventType) -> Option<HotkeyEvent> {
        match *event {
            rdev::EventType::KeyPress(key) => {
                let action = bindings.event_for(key)?;
                if self.held.contains(&key) {
                    return None;
                }
                self.held.push(key);
                Some(action)
            }
            rdev::EventType::KeyRelease(key) => {
                self.held.retain(|k| *k != key);
                None
            }
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// HotkeyListener
// ---------------------------------------------------------------------------

/// Handle to a running hotkey listener thread.  Drop it to stop forwarding
/// events.
pub struct HotkeyListener {
    stop: Arc<AtomicBool>,
    /// Never joined: `rdev::listen` does not return.
    _thread: std::thread::JoinHandle<()>,
}

impl HotkeyListener {
    /// Spawn the listener thread.  Events are sent with `try_send`; if the UI
    /// falls behind by a full channel, extra presses are dropped.
    ///
    /// # Errors
    ///
    /// Fails only if the OS refuses to create the thread.
    pub fn start(bindings: HotkeyBindings, tx: mpsc::Sender<HotkeyEvent>) -> std::io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = Arc::clone(&stop);

        let thread = std::thread::Builder::new()
            .name("hotkey-listener".into())
            .spawn(move || {
                let mut debounce = KeyDebounce::default();
                let result = rdev::listen(move |event| {
                    if stop_clone.load(Ordering::Relaxed) {
                        return;
                    }
                    if let Some(action) = debounce.on_event(&bindings, &event.event_type) {
                        log::debug!("hotkey: {action:?}");
                        let _ = tx.try_send(action);
                    }
                });

                if let Err(e) = result {
                    log::error!("hotkey-listener: rdev::listen exited with error: {:?}", e);
                }
            })?;

        log::info!(
            "hotkey: pause on {:?}, finish on {:?}",
            bindings.pause,
            bindings.finish
        );
        Ok(Self {
            stop,
            _thread: thread,
        })
    }
}

impl Drop for HotkeyListener {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdev::{EventType, Key};

    fn bindings() -> HotkeyBindings {
        HotkeyBindings {
            pause: Key::F8,
            finish: Key::F10,
        }
    }

    #[test]
    fn auto_repeat_yields_one_event() {
        let mut debounce = KeyDebounce::default();
        let b = bindings();

        assert_eq!(
            debounce.on_event(&b, &EventType::KeyPress(Key::F8)),
            Some(HotkeyEvent::TogglePause)
        );
        assert_eq!(debounce.on_event(&b, &EventType::KeyPress(Key::F8)), None);
        assert_eq!(debounce.on_event(&b, &EventType::KeyRelease(Key::F8)), None);
        assert_eq!(
            debounce.on_event(&b, &EventType::KeyPress(Key::F8)),
            Some(HotkeyEvent::TogglePause)
        );
    }

    #[test]
    fn unbound_keys_are_ignored() {
        let mut debounce = KeyDebounce::default();
        assert_eq!(debounce.on_event(&bindings(), &EventType::KeyPress(Key::KeyQ)), None);
        assert_eq!(
            debounce.on_event(&bindings(), &EventType::KeyPress(Key::F10)),
            Some(HotkeyEvent::FinishSession)
        );
    }
}
