//! Global key listener using macOS CGEventTap
//!
//! Runs on a dedicated thread with its own CFRunLoop. Key down/up events
//! and modifier flag changes are translated to [`KeyEvent`]s and delivered
//! to the sink on that thread.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use core_foundation::runloop::{kCFRunLoopCommonModes, kCFRunLoopDefaultMode, CFRunLoop};
use core_graphics::event::{
    CGEvent, CGEventFlags, CGEventTap, CGEventTapLocation, CGEventTapOptions,
    CGEventTapPlacement, CGEventTapProxy, CGEventType, EventField,
};
use tracing::{debug, error, info, trace, warn};

use super::keys::{ModifierKey, NamedKey, RawKey};
use super::listener::{EventSink, KeyEvent, KeyListener, ListenerError};

/// How long the run loop blocks before re-checking the running flag
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Raw tap callback output, handed from the tap to the loop body
#[derive(Debug, Clone, Copy)]
enum TapMessage {
    Down(u16),
    Up(u16),
    Flags(u16, CGEventFlags),
    Disabled,
}

/// CGEventTap-backed listener
pub struct EventTapListener {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl EventTapListener {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }
}

impl Default for EventTapListener {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyListener for EventTapListener {
    /// Spawns the tap thread and waits until the tap is installed, so a
    /// missing Accessibility permission surfaces as an error here.
    fn start(&mut self, sink: EventSink) -> Result<(), ListenerError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ListenerError::AlreadyRunning);
        }

        let running = Arc::clone(&self.running);
        let (ready_tx, ready_rx) = mpsc::channel();

        let spawned = thread::Builder::new()
            .name("hotkey-listener".to_string())
            .spawn(move || {
                info!("hotkey listener thread started");
                if let Err(e) = run_event_loop(sink, Arc::clone(&running), ready_tx) {
                    error!(?e, "hotkey listener error");
                }
                running.store(false, Ordering::SeqCst);
                info!("hotkey listener thread stopped");
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(ListenerError::ThreadSpawn(e.to_string()));
            }
        };

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.thread = Some(handle);
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(ListenerError::EventTapCreation)
            }
        }
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        let Some(handle) = self.thread.take() else {
            return;
        };
        // Stopping from a callback: the loop exits once the callback returns
        if handle.thread().id() == thread::current().id() {
            debug!("hotkey listener stopped from its own thread");
            return;
        }
        if handle.join().is_err() {
            warn!("hotkey listener thread panicked");
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for EventTapListener {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Run the CFRunLoop with the event tap until `running` is cleared
fn run_event_loop(
    sink: EventSink,
    running: Arc<AtomicBool>,
    ready: mpsc::Sender<Result<(), ListenerError>>,
) -> Result<(), ListenerError> {
    let (callback_tx, callback_rx) = mpsc::channel::<TapMessage>();

    // CGEventTap callback - must be fast and non-blocking
    let callback = move |_proxy: CGEventTapProxy,
                         event_type: CGEventType,
                         event: &CGEvent|
          -> Option<CGEvent> {
        let keycode = event.get_integer_value_field(EventField::KEYBOARD_EVENT_KEYCODE) as u16;
        let message = match event_type {
            CGEventType::KeyDown => Some(TapMessage::Down(keycode)),
            CGEventType::KeyUp => Some(TapMessage::Up(keycode)),
            CGEventType::FlagsChanged => Some(TapMessage::Flags(keycode, event.get_flags())),
            CGEventType::TapDisabledByTimeout | CGEventType::TapDisabledByUserInput => {
                Some(TapMessage::Disabled)
            }
            _ => None,
        };
        if let Some(message) = message {
            let _ = callback_tx.send(message);
        }
        Some(event.clone())
    };

    let tap = match CGEventTap::new(
        CGEventTapLocation::Session,
        CGEventTapPlacement::HeadInsertEventTap,
        CGEventTapOptions::ListenOnly,
        vec![
            CGEventType::KeyDown,
            CGEventType::KeyUp,
            CGEventType::FlagsChanged,
        ],
        callback,
    ) {
        Ok(tap) => tap,
        Err(()) => {
            error!("failed to create event tap - is Accessibility permission granted?");
            let _ = ready.send(Err(ListenerError::EventTapCreation));
            return Err(ListenerError::EventTapCreation);
        }
    };

    let Ok(run_loop_source) = tap.mach_port.create_runloop_source(0) else {
        let _ = ready.send(Err(ListenerError::EventTapCreation));
        return Err(ListenerError::EventTapCreation);
    };
    let run_loop = CFRunLoop::get_current();
    unsafe {
        run_loop.add_source(&run_loop_source, kCFRunLoopCommonModes);
    }
    tap.enable();

    info!("event tap created and enabled");
    let _ = ready.send(Ok(()));

    let mut held = HashSet::new();
    while running.load(Ordering::SeqCst) {
        CFRunLoop::run_in_mode(unsafe { kCFRunLoopDefaultMode }, POLL_INTERVAL, true);

        while let Ok(message) = callback_rx.try_recv() {
            if !running.load(Ordering::SeqCst) {
                break;
            }
            match message {
                TapMessage::Down(code) => sink.send(KeyEvent::press(raw_key(code))),
                TapMessage::Up(code) => sink.send(KeyEvent::release(raw_key(code))),
                TapMessage::Flags(code, flags) => {
                    if let Some(event) = modifier_event(code, flags, &mut held) {
                        sink.send(event);
                    }
                }
                TapMessage::Disabled => {
                    warn!("event tap disabled by the system, re-enabling");
                    tap.enable();
                }
            }
        }
    }

    // Tap is removed when it goes out of scope
    Ok(())
}

/// Translate a FlagsChanged event into a press or release of one sided
/// modifier key. The event fires once per change of that key, so a held
/// key toggles to released; both sides share one class flag, so the flag
/// alone cannot tell a release apart while the sibling is down.
fn modifier_event(
    code: u16,
    flags: CGEventFlags,
    held: &mut HashSet<ModifierKey>,
) -> Option<KeyEvent> {
    let Some(key) = modifier_key(code) else {
        trace!(code, "unmapped flags change");
        return None;
    };
    if held.remove(&key) {
        Some(KeyEvent::release(RawKey::Modifier(key)))
    } else if flags.contains(class_flag(key)) {
        held.insert(key);
        Some(KeyEvent::press(RawKey::Modifier(key)))
    } else {
        None
    }
}

fn class_flag(key: ModifierKey) -> CGEventFlags {
    match key {
        ModifierKey::ControlLeft | ModifierKey::ControlRight => CGEventFlags::CGEventFlagControl,
        ModifierKey::AltLeft | ModifierKey::AltRight => CGEventFlags::CGEventFlagAlternate,
        ModifierKey::ShiftLeft | ModifierKey::ShiftRight => CGEventFlags::CGEventFlagShift,
        ModifierKey::MetaLeft
        | ModifierKey::MetaRight
        | ModifierKey::SuperLeft
        | ModifierKey::SuperRight => CGEventFlags::CGEventFlagCommand,
    }
}

fn modifier_key(code: u16) -> Option<ModifierKey> {
    let key = match code {
        0x3B => ModifierKey::ControlLeft,
        0x3E => ModifierKey::ControlRight,
        0x3A => ModifierKey::AltLeft,
        0x3D => ModifierKey::AltRight,
        0x38 => ModifierKey::ShiftLeft,
        0x3C => ModifierKey::ShiftRight,
        0x37 => ModifierKey::MetaLeft,
        0x36 => ModifierKey::MetaRight,
        _ => return None,
    };
    Some(key)
}

/// Map an ANSI virtual keycode to a raw key
fn raw_key(code: u16) -> RawKey {
    let c = match code {
        0x00 => 'a',
        0x01 => 's',
        0x02 => 'd',
        0x03 => 'f',
        0x04 => 'h',
        0x05 => 'g',
        0x06 => 'z',
        0x07 => 'x',
        0x08 => 'c',
        0x09 => 'v',
        0x0B => 'b',
        0x0C => 'q',
        0x0D => 'w',
        0x0E => 'e',
        0x0F => 'r',
        0x10 => 'y',
        0x11 => 't',
        0x12 => '1',
        0x13 => '2',
        0x14 => '3',
        0x15 => '4',
        0x16 => '6',
        0x17 => '5',
        0x18 => '=',
        0x19 => '9',
        0x1A => '7',
        0x1B => '-',
        0x1C => '8',
        0x1D => '0',
        0x1E => ']',
        0x1F => 'o',
        0x20 => 'u',
        0x21 => '[',
        0x22 => 'i',
        0x23 => 'p',
        0x25 => 'l',
        0x26 => 'j',
        0x27 => '\'',
        0x28 => 'k',
        0x29 => ';',
        0x2A => '\\',
        0x2B => ',',
        0x2C => '/',
        0x2D => 'n',
        0x2E => 'm',
        0x2F => '.',
        0x32 => '`',
        _ => return named_key(code).map_or(RawKey::Code(code as u32), RawKey::Named),
    };
    RawKey::Char(c)
}

fn named_key(code: u16) -> Option<NamedKey> {
    let key = match code {
        0x24 => NamedKey::Enter,
        0x30 => NamedKey::Tab,
        0x31 => NamedKey::Space,
        0x33 => NamedKey::Backspace,
        0x35 => NamedKey::Esc,
        0x73 => NamedKey::Home,
        0x74 => NamedKey::PageUp,
        0x75 => NamedKey::Delete,
        0x77 => NamedKey::End,
        0x79 => NamedKey::PageDown,
        0x7B => NamedKey::Left,
        0x7C => NamedKey::Right,
        0x7D => NamedKey::Down,
        0x7E => NamedKey::Up,
        0x7A => NamedKey::F(1),
        0x78 => NamedKey::F(2),
        0x63 => NamedKey::F(3),
        0x76 => NamedKey::F(4),
        0x60 => NamedKey::F(5),
        0x61 => NamedKey::F(6),
        0x62 => NamedKey::F(7),
        0x64 => NamedKey::F(8),
        0x65 => NamedKey::F(9),
        0x6D => NamedKey::F(10),
        0x67 => NamedKey::F(11),
        0x6F => NamedKey::F(12),
        _ => return None,
    };
    Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::keys::{normalize, KeyToken};

    #[test]
    fn test_listener_creation() {
        let listener = EventTapListener::new();
        assert!(!listener.is_running());
    }

    #[test]
    fn test_keycode_mapping() {
        assert_eq!(raw_key(0x05), RawKey::Char('g'));
        assert_eq!(raw_key(0x35), RawKey::Named(NamedKey::Esc));
        assert_eq!(raw_key(0x60), RawKey::Named(NamedKey::F(5)));
        assert_eq!(raw_key(0xFF), RawKey::Code(0xFF));
        assert_eq!(normalize(&raw_key(0x2A)), Some(KeyToken::Char('\\')));
    }

    #[test]
    fn test_flags_changed_press_and_release() {
        let mut held = HashSet::new();
        let press = modifier_event(0x3B, CGEventFlags::CGEventFlagControl, &mut held);
        assert_eq!(
            press,
            Some(KeyEvent::press(RawKey::Modifier(ModifierKey::ControlLeft)))
        );
        let release = modifier_event(0x3B, CGEventFlags::CGEventFlagNull, &mut held);
        assert_eq!(
            release,
            Some(KeyEvent::release(RawKey::Modifier(ModifierKey::ControlLeft)))
        );
        assert!(held.is_empty());

        // release of a key pressed before the tap existed
        assert_eq!(modifier_event(0x3A, CGEventFlags::CGEventFlagNull, &mut held), None);
    }

    #[test]
    fn test_sibling_modifier_keeps_flag_set() {
        let mut held = HashSet::new();
        let shift = CGEventFlags::CGEventFlagShift;
        modifier_event(0x38, shift, &mut held);
        modifier_event(0x3C, shift, &mut held);
        // left released while right still holds the class flag
        assert_eq!(
            modifier_event(0x38, shift, &mut held),
            Some(KeyEvent::release(RawKey::Modifier(ModifierKey::ShiftLeft)))
        );
        assert_eq!(held.len(), 1);
    }
}
