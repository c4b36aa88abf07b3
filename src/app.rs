//! Shortcut list wiring: turns configured shortcuts into manager bindings

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::chord::{ActivatorSpec, ChordSequence};
use crate::hotkey::{Callback, HotkeyManager};

/// A triggerable shortcut, bound either directly or as a chord suffix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortcut {
    pub label: String,

    /// Direct combination, e.g. `<ctrl>+<alt>+1`. Wins over `suffix`.
    #[serde(default)]
    pub hotkey: Option<String>,

    /// Keys typed after the activator
    #[serde(default)]
    pub suffix: Option<Vec<String>>,
}

impl Shortcut {
    pub fn direct(label: impl Into<String>, hotkey: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            hotkey: Some(hotkey.into()),
            suffix: None,
        }
    }

    pub fn chord<S: AsRef<str>>(label: impl Into<String>, suffix: &[S]) -> Self {
        Self {
            label: label.into(),
            hotkey: None,
            suffix: Some(suffix.iter().map(|s| s.as_ref().to_string()).collect()),
        }
    }
}

/// Outcome of [`register_shortcuts`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistrationSummary {
    /// Direct hotkeys registered
    pub direct: usize,
    /// Chord sequences installed
    pub sequences: usize,
    /// Shortcuts dropped as invalid, duplicate or empty
    pub skipped: usize,
    pub chords_enabled: bool,
}

/// Built-in shortcut list
pub fn default_shortcuts() -> Vec<Shortcut> {
    vec![
        Shortcut::direct("sample overlay", "<ctrl>+<alt>+1"),
        Shortcut::chord("sample chord", &["g", "h"]),
    ]
}

/// Register every shortcut with `manager`, routing triggers to `handler`.
///
/// Registration problems are logged and counted, never fatal. When two
/// shortcuts share a suffix the later one wins.
pub fn register_shortcuts<H>(
    manager: &HotkeyManager,
    shortcuts: &[Shortcut],
    activator: Option<&ActivatorSpec>,
    handler: H,
) -> RegistrationSummary
where
    H: Fn(&Shortcut) -> anyhow::Result<()> + Send + Sync + 'static,
{
    let handler = Arc::new(handler);
    let mut summary = RegistrationSummary::default();
    let mut sequences = HashMap::new();

    for shortcut in shortcuts {
        let callback = {
            let handler = Arc::clone(&handler);
            let shortcut = shortcut.clone();
            Callback::new(move || handler(&shortcut))
        };

        if let Some(hotkey) = &shortcut.hotkey {
            match manager.register_hotkey(hotkey, callback) {
                Ok(()) => summary.direct += 1,
                Err(e) => {
                    warn!(label = %shortcut.label, hotkey = %hotkey, error = %e, "skipping duplicate or invalid hotkey");
                    summary.skipped += 1;
                }
            }
        } else if let Some(suffix) = &shortcut.suffix {
            match ChordSequence::parse(suffix) {
                Ok(sequence) => {
                    if sequences.contains_key(&sequence) {
                        warn!(%sequence, label = %shortcut.label, "duplicate chord suffix; later entry overrides");
                        summary.skipped += 1;
                    }
                    sequences.insert(sequence, callback);
                }
                Err(e) => {
                    warn!(label = %shortcut.label, error = %e, "skipping invalid chord suffix");
                    summary.skipped += 1;
                }
            }
        } else {
            warn!(label = %shortcut.label, "shortcut has neither hotkey nor suffix");
            summary.skipped += 1;
        }
    }

    match activator {
        Some(activator) if !sequences.is_empty() => {
            let count = sequences.len();
            match manager.configure_chord_sequences(activator, sequences) {
                Ok(()) => {
                    summary.sequences = count;
                    summary.chords_enabled = true;
                }
                Err(e) => warn!(activator = %activator.hotkey, error = %e, "failed to configure activator"),
            }
        }
        None if !sequences.is_empty() => {
            warn!(count = sequences.len(), "chord suffixes configured but no activator set");
        }
        _ => {}
    }

    info!(
        direct = summary.direct,
        sequences = summary.sequences,
        skipped = summary.skipped,
        chords = summary.chords_enabled,
        "shortcuts registered"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::{KeyListener, UnavailableListener};
    use std::sync::Mutex;

    fn manager() -> HotkeyManager {
        HotkeyManager::new(Box::new(|| {
            Box::new(UnavailableListener::new("test")) as Box<dyn KeyListener>
        }))
    }

    fn recorder() -> (
        Arc<Mutex<Vec<String>>>,
        impl Fn(&Shortcut) -> anyhow::Result<()> + Send + Sync + 'static,
    ) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let out = Arc::clone(&seen);
        let handler = move |s: &Shortcut| {
            out.lock().unwrap().push(s.label.clone());
            Ok::<(), anyhow::Error>(())
        };
        (seen, handler)
    }

    #[test]
    fn test_default_shortcuts_register() {
        let manager = manager();
        let (seen, handler) = recorder();
        let activator = ActivatorSpec::new("<ctrl>+<alt>+a");

        let summary = register_shortcuts(&manager, &default_shortcuts(), Some(&activator), handler);
        assert_eq!(
            summary,
            RegistrationSummary {
                direct: 1,
                sequences: 1,
                skipped: 0,
                chords_enabled: true,
            }
        );

        assert!(manager.trigger("<ctrl>+<alt>+1"));
        assert_eq!(*seen.lock().unwrap(), vec!["sample overlay".to_string()]);
    }

    #[test]
    fn test_duplicates_and_invalid_skipped() {
        let manager = manager();
        let (_, handler) = recorder();
        let shortcuts = vec![
            Shortcut::direct("one", "ctrl+1"),
            Shortcut::direct("again", "<CTRL>+1"),
            Shortcut::direct("broken", "ctrl+"),
            Shortcut::chord("empty", &[] as &[&str]),
            Shortcut {
                label: "nothing".to_string(),
                hotkey: None,
                suffix: None,
            },
        ];

        let summary = register_shortcuts(&manager, &shortcuts, None, handler);
        assert_eq!(summary.direct, 1);
        assert_eq!(summary.skipped, 4);
        assert!(!summary.chords_enabled);
    }

    #[test]
    fn test_duplicate_suffix_later_wins() {
        let manager = manager();
        let (seen, handler) = recorder();
        let shortcuts = vec![
            Shortcut::chord("first", &["G", "h"]),
            Shortcut::chord("second", &[" g ", "H"]),
        ];

        let summary = register_shortcuts(
            &manager,
            &shortcuts,
            Some(&ActivatorSpec::new("ctrl+alt+a")),
            handler,
        );
        assert_eq!(summary.sequences, 1);
        assert_eq!(summary.skipped, 1);
        assert!(summary.chords_enabled);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_chords_need_activator() {
        let manager = manager();
        let (_, handler) = recorder();
        let summary = register_shortcuts(&manager, &[Shortcut::chord("c", &["x"])], None, handler);
        assert!(!summary.chords_enabled);
        assert_eq!(summary.sequences, 0);
        assert!(manager.registered_combinations().is_empty());
    }

    #[test]
    fn test_activator_collision_not_fatal() {
        let manager = manager();
        let (_, handler) = recorder();
        let shortcuts = vec![
            Shortcut::direct("direct", "ctrl+alt+a"),
            Shortcut::chord("chord", &["x"]),
        ];
        let summary = register_shortcuts(
            &manager,
            &shortcuts,
            Some(&ActivatorSpec::new("<ctrl>+<alt>+a")),
            handler,
        );
        assert_eq!(summary.direct, 1);
        assert!(!summary.chords_enabled);
    }

    #[test]
    fn test_shortcut_deserialize() {
        let json = r#"[{"label":"clap","hotkey":"<ctrl>+<alt>+2"},{"label":"wave","suffix":["w"]}]"#;
        let shortcuts: Vec<Shortcut> = serde_json::from_str(json).unwrap();
        assert_eq!(shortcuts[0], Shortcut::direct("clap", "<ctrl>+<alt>+2"));
        assert_eq!(shortcuts[1], Shortcut::chord("wave", &["w"]));
    }
}
