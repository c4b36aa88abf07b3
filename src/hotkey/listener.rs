//! Keyboard listener interface
//!
//! A listener delivers raw key press/release events from an OS-wide hook
//! on its own thread. The manager hands it an [`EventSink`] on start and
//! builds a fresh listener through a [`ListenerFactory`] each time.

use std::fmt;
use std::sync::Arc;

use super::keys::RawKey;

/// Press or release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Press,
    Release,
}

/// A raw event from the keyboard hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub action: KeyAction,
    pub key: RawKey,
}

impl KeyEvent {
    pub fn press(key: RawKey) -> Self {
        Self {
            action: KeyAction::Press,
            key,
        }
    }

    pub fn release(key: RawKey) -> Self {
        Self {
            action: KeyAction::Release,
            key,
        }
    }
}

/// Where a listener delivers its events
#[derive(Clone)]
pub struct EventSink(Arc<dyn Fn(KeyEvent) + Send + Sync>);

impl EventSink {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(KeyEvent) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Deliver one event; runs dispatch synchronously on the caller's thread
    pub fn send(&self, event: KeyEvent) {
        (self.0)(event)
    }
}

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EventSink(..)")
    }
}

/// An OS-level keyboard hook
pub trait KeyListener: Send {
    /// Begin delivering events to `sink`
    fn start(&mut self, sink: EventSink) -> Result<(), ListenerError>;

    /// Stop delivering events and release the hook. Once this returns no
    /// further events reach the sink, unless it is called from the
    /// listener's own thread.
    fn stop(&mut self);

    fn is_running(&self) -> bool;
}

/// Builds a new listener for each `start()`
pub type ListenerFactory = Box<dyn FnMut() -> Box<dyn KeyListener> + Send>;

/// Errors that can occur while starting a listener
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("key listener is already running")]
    AlreadyRunning,

    #[error("failed to create event tap - check Accessibility permissions")]
    EventTapCreation,

    #[error("failed to spawn listener thread: {0}")]
    ThreadSpawn(String),

    #[error("no global key listener available: {0}")]
    Unavailable(String),
}

/// Listener used when the platform has no hook backend
///
/// Starting it always fails, so the manager reports `start() == false`
/// while `trigger` keeps working.
#[derive(Debug, Default)]
pub struct UnavailableListener {
    reason: String,
}

impl UnavailableListener {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl KeyListener for UnavailableListener {
    fn start(&mut self, _sink: EventSink) -> Result<(), ListenerError> {
        Err(ListenerError::Unavailable(self.reason.clone()))
    }

    fn stop(&mut self) {}

    fn is_running(&self) -> bool {
        false
    }
}

/// Factory for the best listener this build supports
pub fn platform_listener_factory() -> ListenerFactory {
    #[cfg(target_os = "macos")]
    {
        Box::new(|| Box::new(super::macos::EventTapListener::new()) as Box<dyn KeyListener>)
    }

    #[cfg(all(not(target_os = "macos"), feature = "rdev"))]
    {
        Box::new(|| Box::new(super::rdev_hook::RdevListener::new()) as Box<dyn KeyListener>)
    }

    #[cfg(all(not(target_os = "macos"), not(feature = "rdev")))]
    {
        Box::new(|| {
            Box::new(UnavailableListener::new(
                "built without a keyboard hook backend (enable the `rdev` feature)",
            )) as Box<dyn KeyListener>
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_sink_delivers() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let out = Arc::clone(&seen);
        let sink = EventSink::new(move |e| out.lock().unwrap().push(e));

        sink.send(KeyEvent::press(RawKey::Char('g')));
        sink.clone().send(KeyEvent::release(RawKey::Char('g')));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].action, KeyAction::Press);
        assert_eq!(seen[1].action, KeyAction::Release);
    }

    #[test]
    fn test_unavailable_listener() {
        let mut listener = UnavailableListener::new("headless");
        let err = listener.start(EventSink::new(|_| {})).unwrap_err();
        assert!(err.to_string().contains("headless"));
        assert!(!listener.is_running());
    }
}
