//! Events emitted by the hotkey manager
//!
//! Every state transition worth logging is also broadcast as a
//! [`ManagerEvent`] so the daemon (or an embedding app) can observe it.

use serde::{Deserialize, Serialize};

use crate::chord::DisarmReason;

/// Transitions and outcomes reported by the hotkey manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ManagerEvent {
    /// Listener started
    ListenerStarted {
        /// Number of bindings at start
        bindings: usize,
    },

    /// Listener stopped
    ListenerStopped,

    /// A direct hotkey or activator was added to the binding table
    HotkeyRegistered { combination: String },

    /// A binding was removed
    HotkeyUnregistered { combination: String },

    /// Registration refused (duplicate or invalid)
    RegistrationRejected { combination: String, reason: String },

    /// A direct hotkey fired
    HotkeyTriggered { combination: String },

    /// Activator pressed, chord window open
    ChordArmed {
        /// Window length in milliseconds
        timeout_ms: u64,
    },

    /// Chord window closed
    ChordDisarmed { reason: DisarmReason },

    /// A chord sequence matched
    SequenceMatched { sequence: String },

    /// A callback returned an error or panicked
    CallbackFailed { trigger: String, message: String },
}

impl std::fmt::Display for ManagerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ManagerEvent::ListenerStarted { bindings } => {
                write!(f, "LISTENER_STARTED ({} bindings)", bindings)
            }
            ManagerEvent::ListenerStopped => write!(f, "LISTENER_STOPPED"),
            ManagerEvent::HotkeyRegistered { combination } => {
                write!(f, "HOTKEY_REGISTERED {}", combination)
            }
            ManagerEvent::HotkeyUnregistered { combination } => {
                write!(f, "HOTKEY_UNREGISTERED {}", combination)
            }
            ManagerEvent::RegistrationRejected {
                combination,
                reason,
            } => write!(f, "REGISTRATION_REJECTED {} ({})", combination, reason),
            ManagerEvent::HotkeyTriggered { combination } => {
                write!(f, "HOTKEY_TRIGGERED {}", combination)
            }
            ManagerEvent::ChordArmed { timeout_ms } => write!(f, "CHORD_ARMED ({}ms)", timeout_ms),
            ManagerEvent::ChordDisarmed { reason } => write!(f, "CHORD_DISARMED ({})", reason),
            ManagerEvent::SequenceMatched { sequence } => {
                write!(f, "SEQUENCE_MATCHED {}", sequence)
            }
            ManagerEvent::CallbackFailed { trigger, message } => {
                write!(f, "CALLBACK_FAILED {}: {}", trigger, message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = ManagerEvent::ChordDisarmed {
            reason: DisarmReason::NoMatch,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("chord_disarmed"));
        assert!(json.contains("no_match"));
    }

    #[test]
    fn test_event_deserialization() {
        let json = r#"{"type":"chord_armed","timeout_ms":1500}"#;
        let event: ManagerEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event, ManagerEvent::ChordArmed { timeout_ms: 1500 });
    }

    #[test]
    fn test_event_display() {
        let event = ManagerEvent::SequenceMatched {
            sequence: "g+h".to_string(),
        };
        assert_eq!(event.to_string(), "SEQUENCE_MATCHED g+h");
    }
}
