//! Global hotkeys: combination parsing, the binding table and the
//! manager that drives them from an OS key listener.
//!
//! The listener backend is CGEventTap on macOS and `rdev` elsewhere when
//! the `rdev` feature is enabled.

mod bindings;
mod callback;
mod combination;
mod error;
mod keys;
mod listener;
mod manager;

#[cfg(target_os = "macos")]
mod macos;
#[cfg(all(not(target_os = "macos"), feature = "rdev"))]
mod rdev_hook;

pub use bindings::{Binding, BindingAction, BindingTable};
pub use callback::{Callback, Trigger};
pub use combination::{Combination, CombinationMatcher};
pub use error::{CallbackFailure, HotkeyError};
pub use keys::{normalize, Key, KeyToken, Modifier, ModifierKey, NamedKey, RawKey};
pub use listener::{
    platform_listener_factory, EventSink, KeyAction, KeyEvent, KeyListener, ListenerError,
    ListenerFactory, UnavailableListener,
};
pub use manager::HotkeyManager;
