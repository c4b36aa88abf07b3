//! Direct key combinations and their press/release matcher

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::error::HotkeyError;
use super::keys::{Key, KeyToken, Modifier};

/// A set of modifiers plus exactly one non-modifier key
///
/// Equality and ordering follow the parsed key set, so `"alt+ctrl+k"` and
/// `"<CTRL> + <ALT> + K"` are the same combination.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Combination {
    modifiers: BTreeSet<Modifier>,
    key: KeyToken,
}

impl Combination {
    pub fn new(modifiers: impl IntoIterator<Item = Modifier>, key: KeyToken) -> Self {
        Self {
            modifiers: modifiers.into_iter().collect(),
            key,
        }
    }

    /// Parse a `+`-separated combination. Segments are trimmed and
    /// lower-cased and may be wrapped in angle brackets (`<ctrl>+<alt>+k`).
    pub fn parse(input: &str) -> Result<Self, HotkeyError> {
        if input.trim().is_empty() {
            return Err(HotkeyError::invalid("hotkey combination must be a non-empty string"));
        }

        let mut modifiers = BTreeSet::new();
        let mut key = None;

        for segment in input.split('+') {
            let segment = segment.trim().to_lowercase();
            let name = segment
                .strip_prefix('<')
                .and_then(|s| s.strip_suffix('>'))
                .unwrap_or(segment.as_str())
                .trim();

            if name.is_empty() {
                return Err(HotkeyError::invalid(format!(
                    "empty key segment in combination '{}'",
                    input
                )));
            }

            if let Some(modifier) = Modifier::parse(name) {
                modifiers.insert(modifier);
                continue;
            }

            let token = KeyToken::parse(name).ok_or_else(|| {
                HotkeyError::invalid(format!("unknown key '{}' in combination '{}'", name, input))
            })?;
            if key.replace(token).is_some() {
                return Err(HotkeyError::invalid(format!(
                    "combination '{}' names more than one non-modifier key",
                    input
                )));
            }
        }

        let key = key.ok_or_else(|| {
            HotkeyError::invalid(format!("combination '{}' has no non-modifier key", input))
        })?;

        Ok(Self { modifiers, key })
    }

    pub fn modifiers(&self) -> impl Iterator<Item = Modifier> + '_ {
        self.modifiers.iter().copied()
    }

    pub fn key(&self) -> KeyToken {
        self.key
    }

    /// Every key that must be held for the combination to be satisfied
    pub fn keys(&self) -> BTreeSet<Key> {
        self.modifiers
            .iter()
            .map(|m| Key::Modifier(*m))
            .chain(std::iter::once(Key::Token(self.key)))
            .collect()
    }
}

impl FromStr for Combination {
    type Err = HotkeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Canonical form: `<ctrl>+<alt>+<shift>+<cmd>+key`
impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in &self.modifiers {
            write!(f, "<{}>+", modifier.name())?;
        }
        match self.key {
            KeyToken::Char(c) => write!(f, "{}", c),
            KeyToken::Named(named) => write!(f, "<{}>", named),
        }
    }
}

/// Tracks which keys of one combination are currently held
#[derive(Debug, Clone)]
pub struct CombinationMatcher {
    keys: BTreeSet<Key>,
    held: BTreeSet<Key>,
}

impl CombinationMatcher {
    pub fn new(combination: &Combination) -> Self {
        Self {
            keys: combination.keys(),
            held: BTreeSet::new(),
        }
    }

    /// Feed a key press. Returns true when this press completes the
    /// combination; auto-repeat of an already held key does not refire.
    pub fn press(&mut self, key: Key) -> bool {
        self.keys.contains(&key) && self.held.insert(key) && self.held == self.keys
    }

    /// Feed a key release
    pub fn release(&mut self, key: Key) {
        self.held.remove(&key);
    }

    /// Forget all held keys
    pub fn reset(&mut self) {
        self.held.clear();
    }
}
