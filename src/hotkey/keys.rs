//! Key definitions and normalization
//!
//! Listeners report keys as [`RawKey`], a platform-neutral view of what the
//! OS delivered. [`Key::from_raw`] collapses that into a canonical [`Key`]
//! (sided modifiers merge, characters are lower-cased) and [`Key::token`]
//! yields the [`KeyToken`] used by chord sequences.

use std::fmt;

/// Punctuation accepted as a printable key token besides ASCII alphanumerics
const PUNCTUATION: &str = "-=`[];,'./\\";

/// Modifier classes used in combinations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Modifier {
    Ctrl,
    Alt,
    Shift,
    /// Command / Meta / Super
    Cmd,
}

impl Modifier {
    /// Canonical lowercase name
    pub fn name(self) -> &'static str {
        match self {
            Modifier::Ctrl => "ctrl",
            Modifier::Alt => "alt",
            Modifier::Shift => "shift",
            Modifier::Cmd => "cmd",
        }
    }

    /// Parse a modifier name, including the sided spellings used by
    /// keyboard hooks (`ctrl_l`, `alt_gr`, `super`, ...)
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "ctrl" | "control" | "ctrl_l" | "ctrl_r" => Some(Modifier::Ctrl),
            "alt" | "option" | "alt_l" | "alt_r" | "alt_gr" => Some(Modifier::Alt),
            "shift" | "shift_l" | "shift_r" => Some(Modifier::Shift),
            "cmd" | "cmd_l" | "cmd_r" | "command" | "meta" | "super" | "win" => {
                Some(Modifier::Cmd)
            }
            _ => None,
        }
    }
}

/// Named non-printable keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NamedKey {
    Esc,
    Space,
    Enter,
    Tab,
    Backspace,
    Delete,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    /// Function key F1..=F12
    F(u8),
}

impl NamedKey {
    /// Parse a named key, accepting a few common aliases
    pub fn parse(name: &str) -> Option<Self> {
        let key = match name {
            "esc" | "escape" => NamedKey::Esc,
            "space" => NamedKey::Space,
            "enter" | "return" => NamedKey::Enter,
            "tab" => NamedKey::Tab,
            "backspace" => NamedKey::Backspace,
            "delete" | "del" => NamedKey::Delete,
            "up" => NamedKey::Up,
            "down" => NamedKey::Down,
            "left" => NamedKey::Left,
            "right" => NamedKey::Right,
            "home" => NamedKey::Home,
            "end" => NamedKey::End,
            "pageup" | "page_up" => NamedKey::PageUp,
            "pagedown" | "page_down" => NamedKey::PageDown,
            other => {
                let n: u8 = other.strip_prefix('f')?.parse().ok()?;
                return NamedKey::function(n);
            }
        };
        Some(key)
    }

    /// Function key `F<n>`, if `n` is within F1..=F12
    pub fn function(n: u8) -> Option<Self> {
        (1..=12).contains(&n).then_some(NamedKey::F(n))
    }
}

impl fmt::Display for NamedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NamedKey::Esc => "esc",
            NamedKey::Space => "space",
            NamedKey::Enter => "enter",
            NamedKey::Tab => "tab",
            NamedKey::Backspace => "backspace",
            NamedKey::Delete => "delete",
            NamedKey::Up => "up",
            NamedKey::Down => "down",
            NamedKey::Left => "left",
            NamedKey::Right => "right",
            NamedKey::Home => "home",
            NamedKey::End => "end",
            NamedKey::PageUp => "pageup",
            NamedKey::PageDown => "pagedown",
            NamedKey::F(n) => return write!(f, "f{}", n),
        };
        f.write_str(name)
    }
}

/// Physical modifier keys as reported by a keyboard hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModifierKey {
    ControlLeft,
    ControlRight,
    AltLeft,
    AltRight,
    ShiftLeft,
    ShiftRight,
    MetaLeft,
    MetaRight,
    SuperLeft,
    SuperRight,
}

impl ModifierKey {
    /// The modifier class this physical key belongs to
    pub fn modifier(self) -> Modifier {
        match self {
            ModifierKey::ControlLeft | ModifierKey::ControlRight => Modifier::Ctrl,
            ModifierKey::AltLeft | ModifierKey::AltRight => Modifier::Alt,
            ModifierKey::ShiftLeft | ModifierKey::ShiftRight => Modifier::Shift,
            ModifierKey::MetaLeft
            | ModifierKey::MetaRight
            | ModifierKey::SuperLeft
            | ModifierKey::SuperRight => Modifier::Cmd,
        }
    }
}

/// A key exactly as a listener backend delivered it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawKey {
    /// Character produced by the key (any case)
    Char(char),
    /// Non-printable key the backend recognized
    Named(NamedKey),
    /// Sided modifier key
    Modifier(ModifierKey),
    /// Backend-specific code with no mapping
    Code(u32),
}

/// Canonical key: a modifier class or a chord token
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    Modifier(Modifier),
    Token(KeyToken),
}

impl Key {
    /// Normalize a raw key; `None` means the key is not mappable and is
    /// consumed silently.
    pub fn from_raw(raw: &RawKey) -> Option<Self> {
        match *raw {
            RawKey::Char(c) => KeyToken::from_char(c).map(Key::Token),
            RawKey::Named(named) => Some(Key::Token(KeyToken::Named(named))),
            RawKey::Modifier(m) => Some(Key::Modifier(m.modifier())),
            RawKey::Code(_) => None,
        }
    }

    /// Chord token for this key; modifiers never produce one
    pub fn token(self) -> Option<KeyToken> {
        match self {
            Key::Modifier(_) => None,
            Key::Token(token) => Some(token),
        }
    }

    pub fn is_modifier(self) -> bool {
        matches!(self, Key::Modifier(_))
    }
}

/// Normalized identifier for one non-modifier key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyToken {
    /// Lowercase ASCII alphanumeric or accepted punctuation
    Char(char),
    Named(NamedKey),
}

impl KeyToken {
    /// Parse a token name such as `"a"`, `"Esc"` or `"f5"`
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        let mut chars = name.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return KeyToken::from_char(c);
        }
        NamedKey::parse(&name).map(KeyToken::Named)
    }

    /// Map a delivered character; control characters map to their named keys
    pub fn from_char(c: char) -> Option<Self> {
        let named = match c {
            ' ' => Some(NamedKey::Space),
            '\t' => Some(NamedKey::Tab),
            '\r' | '\n' => Some(NamedKey::Enter),
            '\u{1b}' => Some(NamedKey::Esc),
            '\u{8}' => Some(NamedKey::Backspace),
            '\u{7f}' => Some(NamedKey::Delete),
            _ => None,
        };
        if let Some(named) = named {
            return Some(KeyToken::Named(named));
        }

        let c = c.to_ascii_lowercase();
        (c.is_ascii_alphanumeric() || PUNCTUATION.contains(c)).then_some(KeyToken::Char(c))
    }

    pub fn is_esc(self) -> bool {
        self == KeyToken::Named(NamedKey::Esc)
    }
}

impl fmt::Display for KeyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyToken::Char(c) => write!(f, "{}", c),
            KeyToken::Named(named) => write!(f, "{}", named),
        }
    }
}

/// Normalize a raw key straight to a chord token
pub fn normalize(raw: &RawKey) -> Option<KeyToken> {
    Key::from_raw(raw).and_then(Key::token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_case_insensitive() {
        assert_eq!(normalize(&RawKey::Char('A')), normalize(&RawKey::Char('a')));
        assert_eq!(normalize(&RawKey::Char('a')), Some(KeyToken::Char('a')));
    }

    #[test]
    fn test_punctuation_accepted() {
        for c in "-=`[];,'./\\".chars() {
            assert_eq!(normalize(&RawKey::Char(c)), Some(KeyToken::Char(c)), "{c}");
        }
        assert_eq!(normalize(&RawKey::Char('!')), None);
        assert_eq!(normalize(&RawKey::Char('é')), None);
    }

    #[test]
    fn test_control_chars_map_to_named() {
        assert_eq!(
            normalize(&RawKey::Char('\u{1b}')),
            Some(KeyToken::Named(NamedKey::Esc))
        );
        assert_eq!(
            normalize(&RawKey::Char(' ')),
            normalize(&RawKey::Named(NamedKey::Space))
        );
    }

    #[test]
    fn test_modifiers_have_no_token() {
        let key = Key::from_raw(&RawKey::Modifier(ModifierKey::SuperLeft)).unwrap();
        assert_eq!(key, Key::Modifier(Modifier::Cmd));
        assert!(key.token().is_none());
        assert_eq!(
            Key::from_raw(&RawKey::Modifier(ModifierKey::MetaRight)),
            Some(Key::Modifier(Modifier::Cmd))
        );
        assert_eq!(
            Key::from_raw(&RawKey::Modifier(ModifierKey::ControlRight)),
            Some(Key::Modifier(Modifier::Ctrl))
        );
    }

    #[test]
    fn test_unmapped_code() {
        assert_eq!(Key::from_raw(&RawKey::Code(0xdead)), None);
    }

    #[test]
    fn test_parse_named_tokens() {
        assert_eq!(KeyToken::parse("Esc"), Some(KeyToken::Named(NamedKey::Esc)));
        assert_eq!(KeyToken::parse("escape"), Some(KeyToken::Named(NamedKey::Esc)));
        assert_eq!(KeyToken::parse("F12"), Some(KeyToken::Named(NamedKey::F(12))));
        assert_eq!(KeyToken::parse("f13"), None);
        assert_eq!(KeyToken::parse("page_down"), Some(KeyToken::Named(NamedKey::PageDown)));
        assert_eq!(KeyToken::parse(" G "), Some(KeyToken::Char('g')));
        assert_eq!(KeyToken::parse("ctrl"), None);
        assert_eq!(KeyToken::parse(""), None);
    }

    #[test]
    fn test_token_display() {
        assert_eq!(KeyToken::Named(NamedKey::F(3)).to_string(), "f3");
        assert_eq!(KeyToken::Named(NamedKey::PageUp).to_string(), "pageup");
        assert_eq!(KeyToken::Char('/').to_string(), "/");
    }
}
