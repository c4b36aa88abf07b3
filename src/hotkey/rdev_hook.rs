//! Global key listener backed by `rdev`
//!
//! `rdev::listen` blocks its thread forever and offers no way to remove
//! the hook, so the hook thread is spawned once per process and forwards
//! events to whichever sink is currently installed. Stopping a listener
//! clears the sink; the hook itself stays alive but idle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::thread;

use rdev::{listen, Event, EventType, Key as RdevKey};
use tracing::{error, info, trace};

use super::keys::{ModifierKey, NamedKey, RawKey};
use super::listener::{EventSink, KeyEvent, KeyListener, ListenerError};

static HOOK_SPAWNED: AtomicBool = AtomicBool::new(false);

static SINK: Mutex<Option<EventSink>> = Mutex::new(None);

fn sink_slot() -> MutexGuard<'static, Option<EventSink>> {
    SINK.lock().unwrap_or_else(|p| p.into_inner())
}

/// Listener sharing the process-wide rdev hook. Only one can be running
/// at a time; starting another replaces the active sink.
#[derive(Debug, Default)]
pub struct RdevListener {
    running: bool,
}

impl RdevListener {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyListener for RdevListener {
    fn start(&mut self, sink: EventSink) -> Result<(), ListenerError> {
        if self.running {
            return Err(ListenerError::AlreadyRunning);
        }
        *sink_slot() = Some(sink);

        // Only spawn the hook thread once
        if HOOK_SPAWNED
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let spawned = thread::Builder::new()
                .name("hotkey-listener".to_string())
                .spawn(|| {
                    info!("rdev hook thread started");
                    if let Err(e) = listen(forward) {
                        error!(?e, "rdev listen error");
                    }
                    // listen only returns on failure; allow a later retry
                    HOOK_SPAWNED.store(false, Ordering::SeqCst);
                });
            if let Err(e) = spawned {
                HOOK_SPAWNED.store(false, Ordering::SeqCst);
                sink_slot().take();
                return Err(ListenerError::ThreadSpawn(e.to_string()));
            }
        }

        self.running = true;
        Ok(())
    }

    fn stop(&mut self) {
        if self.running {
            sink_slot().take();
            self.running = false;
        }
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

impl Drop for RdevListener {
    fn drop(&mut self) {
        self.stop();
    }
}

fn forward(event: Event) {
    let key_event = match event.event_type {
        EventType::KeyPress(key) => KeyEvent::press(raw_key(key)),
        EventType::KeyRelease(key) => KeyEvent::release(raw_key(key)),
        _ => return,
    };
    // Clone out so the slot is not held while callbacks run
    let sink = sink_slot().clone();
    match sink {
        Some(sink) => sink.send(key_event),
        None => trace!("no active listener; key event dropped"),
    }
}

fn raw_key(key: RdevKey) -> RawKey {
    let c = match key {
        RdevKey::KeyA => 'a',
        RdevKey::KeyB => 'b',
        RdevKey::KeyC => 'c',
        RdevKey::KeyD => 'd',
        RdevKey::KeyE => 'e',
        RdevKey::KeyF => 'f',
        RdevKey::KeyG => 'g',
        RdevKey::KeyH => 'h',
        RdevKey::KeyI => 'i',
        RdevKey::KeyJ => 'j',
        RdevKey::KeyK => 'k',
        RdevKey::KeyL => 'l',
        RdevKey::KeyM => 'm',
        RdevKey::KeyN => 'n',
        RdevKey::KeyO => 'o',
        RdevKey::KeyP => 'p',
        RdevKey::KeyQ => 'q',
        RdevKey::KeyR => 'r',
        RdevKey::KeyS => 's',
        RdevKey::KeyT => 't',
        RdevKey::KeyU => 'u',
        RdevKey::KeyV => 'v',
        RdevKey::KeyW => 'w',
        RdevKey::KeyX => 'x',
        RdevKey::KeyY => 'y',
        RdevKey::KeyZ => 'z',
        RdevKey::Num0 => '0',
        RdevKey::Num1 => '1',
        RdevKey::Num2 => '2',
        RdevKey::Num3 => '3',
        RdevKey::Num4 => '4',
        RdevKey::Num5 => '5',
        RdevKey::Num6 => '6',
        RdevKey::Num7 => '7',
        RdevKey::Num8 => '8',
        RdevKey::Num9 => '9',
        RdevKey::Minus => '-',
        RdevKey::Equal => '=',
        RdevKey::BackQuote => '`',
        RdevKey::LeftBracket => '[',
        RdevKey::RightBracket => ']',
        RdevKey::SemiColon => ';',
        RdevKey::Quote => '\'',
        RdevKey::BackSlash | RdevKey::IntlBackslash => '\\',
        RdevKey::Comma => ',',
        RdevKey::Dot => '.',
        RdevKey::Slash => '/',
        other => return non_char_key(other),
    };
    RawKey::Char(c)
}

fn non_char_key(key: RdevKey) -> RawKey {
    let named = match key {
        RdevKey::Escape => NamedKey::Esc,
        RdevKey::Space => NamedKey::Space,
        RdevKey::Return | RdevKey::KpReturn => NamedKey::Enter,
        RdevKey::Tab => NamedKey::Tab,
        RdevKey::Backspace => NamedKey::Backspace,
        RdevKey::Delete => NamedKey::Delete,
        RdevKey::UpArrow => NamedKey::Up,
        RdevKey::DownArrow => NamedKey::Down,
        RdevKey::LeftArrow => NamedKey::Left,
        RdevKey::RightArrow => NamedKey::Right,
        RdevKey::Home => NamedKey::Home,
        RdevKey::End => NamedKey::End,
        RdevKey::PageUp => NamedKey::PageUp,
        RdevKey::PageDown => NamedKey::PageDown,
        RdevKey::F1 => NamedKey::F(1),
        RdevKey::F2 => NamedKey::F(2),
        RdevKey::F3 => NamedKey::F(3),
        RdevKey::F4 => NamedKey::F(4),
        RdevKey::F5 => NamedKey::F(5),
        RdevKey::F6 => NamedKey::F(6),
        RdevKey::F7 => NamedKey::F(7),
        RdevKey::F8 => NamedKey::F(8),
        RdevKey::F9 => NamedKey::F(9),
        RdevKey::F10 => NamedKey::F(10),
        RdevKey::F11 => NamedKey::F(11),
        RdevKey::F12 => NamedKey::F(12),
        other => return modifier_key(other),
    };
    RawKey::Named(named)
}

fn modifier_key(key: RdevKey) -> RawKey {
    let modifier = match key {
        RdevKey::ControlLeft => ModifierKey::ControlLeft,
        RdevKey::ControlRight => ModifierKey::ControlRight,
        RdevKey::Alt => ModifierKey::AltLeft,
        RdevKey::AltGr => ModifierKey::AltRight,
        RdevKey::ShiftLeft => ModifierKey::ShiftLeft,
        RdevKey::ShiftRight => ModifierKey::ShiftRight,
        RdevKey::MetaLeft => ModifierKey::MetaLeft,
        RdevKey::MetaRight => ModifierKey::MetaRight,
        RdevKey::Unknown(code) => return RawKey::Code(code),
        other => {
            trace!(?other, "unmapped rdev key");
            return RawKey::Code(0);
        }
    };
    RawKey::Modifier(modifier)
}
