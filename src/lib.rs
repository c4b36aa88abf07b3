//! stream-companion: global hotkeys and leader-key chords
//!
//! A [`hotkey::HotkeyManager`] owns a table of direct key combinations and
//! an optional chord activator. Pressing the activator opens a short window
//! in which a typed [`chord::ChordSequence`] fires its callback.

pub mod app;
pub mod chord;
pub mod config;
pub mod events;
pub mod hotkey;
pub mod lifecycle;
