//! Leader-key chord support
//!
//! An activator combination arms the [`ChordEngine`] for a short window in
//! which keys typed one at a time are matched against registered
//! [`ChordSequence`]s.

mod activator;
mod engine;
mod sequence;
mod timer;

pub use activator::{ActivatorMode, ActivatorSpec, DEFAULT_TIMEOUT_MS, MIN_TIMEOUT_MS};
pub use engine::{ChordEngine, ChordStep, DisarmReason};
pub use sequence::ChordSequence;
pub use timer::ArmTimer;
