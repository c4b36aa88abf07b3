//! Leader-key activator settings

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default arming window
pub const DEFAULT_TIMEOUT_MS: u64 = 1500;
/// Shortest arming window accepted; shorter values are clamped up
pub const MIN_TIMEOUT_MS: u64 = 100;

/// How the activator arms the chord engine
///
/// `Hold` is accepted for configuration compatibility but currently arms
/// exactly like `Press`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivatorMode {
    #[default]
    Press,
    Hold,
}

impl fmt::Display for ActivatorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivatorMode::Press => f.write_str("press"),
            ActivatorMode::Hold => f.write_str("hold"),
        }
    }
}

impl FromStr for ActivatorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "press" => Ok(ActivatorMode::Press),
            "hold" => Ok(ActivatorMode::Hold),
            other => Err(format!("unknown activator mode '{}' (expected press or hold)", other)),
        }
    }
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// The global leader combination plus its arming window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivatorSpec {
    /// Combination string, e.g. `<ctrl>+<alt>+a`
    pub hotkey: String,
    #[serde(default)]
    pub mode: ActivatorMode,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl ActivatorSpec {
    pub fn new(hotkey: impl Into<String>) -> Self {
        Self {
            hotkey: hotkey.into(),
            mode: ActivatorMode::default(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_mode(mut self, mode: ActivatorMode) -> Self {
        self.mode = mode;
        self
    }

    /// Arming window, clamped to [`MIN_TIMEOUT_MS`]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.max(MIN_TIMEOUT_MS))
    }
}
