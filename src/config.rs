//! Configuration loading from the environment

use anyhow::{Context, Result};

use crate::chord::{ActivatorMode, ActivatorSpec, DEFAULT_TIMEOUT_MS};

pub const ACTIVATOR_VAR: &str = "STREAM_COMPANION_ACTIVATOR";
pub const TIMEOUT_VAR: &str = "STREAM_COMPANION_CHORD_TIMEOUT_MS";
pub const MODE_VAR: &str = "STREAM_COMPANION_CHORD_MODE";

/// Daemon configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Chord activator combination; `None` disables chords
    pub activator: Option<String>,

    /// Arming window in milliseconds (clamped when applied)
    pub chord_timeout_ms: u64,

    pub chord_mode: ActivatorMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            activator: None,
            chord_timeout_ms: DEFAULT_TIMEOUT_MS,
            chord_mode: ActivatorMode::Press,
        }
    }
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        Self::from_vars(std::env::vars())
    }

    /// Build configuration from an explicit set of variables
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();

        for (key, value) in vars {
            let value = value.as_ref().trim();
            match key.as_ref() {
                ACTIVATOR_VAR => {
                    config.activator = (!value.is_empty()).then(|| value.to_string());
                }
                TIMEOUT_VAR => {
                    config.chord_timeout_ms = value
                        .parse()
                        .with_context(|| format!("{TIMEOUT_VAR} must be milliseconds, got {value:?}"))?;
                }
                MODE_VAR => {
                    config.chord_mode = value
                        .parse()
                        .map_err(anyhow::Error::msg)
                        .with_context(|| format!("invalid {MODE_VAR}"))?;
                }
                _ => {}
            }
        }

        Ok(config)
    }

    /// Activator settings, if chords are enabled
    pub fn activator_spec(&self) -> Option<ActivatorSpec> {
        self.activator.as_ref().map(|hotkey| {
            ActivatorSpec::new(hotkey.clone())
                .with_timeout_ms(self.chord_timeout_ms)
                .with_mode(self.chord_mode)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_test::assert_err;

    #[test]
    fn test_config_defaults() {
        let config = Config::from_vars(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.activator_spec().is_none());
    }

    #[test]
    fn test_config_from_vars() {
        let config = Config::from_vars([
            (ACTIVATOR_VAR, " <ctrl>+<alt>+a "),
            (TIMEOUT_VAR, "40"),
            (MODE_VAR, "hold"),
            ("HOME", "/tmp"),
        ])
        .unwrap();

        let spec = config.activator_spec().unwrap();
        assert_eq!(spec.hotkey, "<ctrl>+<alt>+a");
        assert_eq!(spec.mode, ActivatorMode::Hold);
        // below the floor
        assert_eq!(spec.timeout(), Duration::from_millis(100));
    }

    #[test]
    fn test_empty_activator_disables_chords() {
        let config = Config::from_vars([(ACTIVATOR_VAR, "  ")]).unwrap();
        assert!(config.activator.is_none());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert_err!(Config::from_vars([(TIMEOUT_VAR, "soon")]));
        assert_err!(Config::from_vars([(TIMEOUT_VAR, "-5")]));

        let err = Config::from_vars([(MODE_VAR, "toggle")]).unwrap_err();
        assert!(format!("{err:#}").contains(MODE_VAR));
    }
}
