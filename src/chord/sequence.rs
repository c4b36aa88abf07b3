//! Ordered key-token sequences typed after the activator

use std::fmt;

use crate::hotkey::{HotkeyError, KeyToken, Modifier};

/// Non-empty ordered tuple of key tokens, e.g. `g` then `h`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChordSequence(Vec<KeyToken>);

impl ChordSequence {
    pub fn new(tokens: Vec<KeyToken>) -> Result<Self, HotkeyError> {
        if tokens.is_empty() {
            return Err(HotkeyError::invalid("chord sequence must not be empty"));
        }
        Ok(Self(tokens))
    }

    /// Parse token names; each is trimmed and lower-cased. Modifiers are
    /// rejected since suffixes are typed one key at a time.
    pub fn parse<I, S>(names: I) -> Result<Self, HotkeyError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tokens = names
            .into_iter()
            .map(|name| {
                let name = name.as_ref().trim().to_lowercase();
                KeyToken::parse(&name).ok_or_else(|| {
                    if Modifier::parse(&name).is_some() {
                        HotkeyError::invalid(format!(
                            "modifier '{}' is not allowed in a chord sequence",
                            name
                        ))
                    } else {
                        HotkeyError::invalid(format!("unknown key '{}' in chord sequence", name))
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(tokens)
    }

    pub fn tokens(&self) -> &[KeyToken] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when `buffer` is a strict prefix of this sequence
    pub fn extends(&self, buffer: &[KeyToken]) -> bool {
        self.0.len() > buffer.len() && self.0.starts_with(buffer)
    }
}

impl From<KeyToken> for ChordSequence {
    fn from(token: KeyToken) -> Self {
        Self(vec![token])
    }
}

impl fmt::Display for ChordSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("+")?;
            }
            write!(f, "{}", token)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_err;

    #[test]
    fn test_parse_normalizes() {
        let seq = ChordSequence::parse([" G", "h "]).unwrap();
        assert_eq!(seq.tokens(), &[KeyToken::Char('g'), KeyToken::Char('h')]);
        assert_eq!(seq.to_string(), "g+h");
    }

    #[test]
    fn test_parse_rejects() {
        assert_err!(ChordSequence::parse(Vec::<String>::new()));
        assert_err!(ChordSequence::parse(["g", "ctrl"]));
        assert_err!(ChordSequence::parse(["g", "hyper"]));
    }

    #[test]
    fn test_extends() {
        let seq = ChordSequence::parse(["g", "h"]).unwrap();
        assert!(seq.extends(&[]));
        assert!(seq.extends(&[KeyToken::Char('g')]));
        assert!(!seq.extends(&[KeyToken::Char('g'), KeyToken::Char('h')]));
        assert!(!seq.extends(&[KeyToken::Char('h')]));
    }
}
