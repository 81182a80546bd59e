// Macrokb Key Identifier
// Symbolic key names as reported by the kernel input layer

use std::fmt;
use std::str::FromStr;

/// Represents a single key identifier.
///
/// Identifiers are the symbolic names from Linux input-event-codes.h
/// (`KEY_GRAVE`, `KEY_TAB`, `BTN_LEFT`, ...). Bind tables are written in
/// terms of these names, so the core never deals with raw numeric codes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyId(String);

/// Why a key name was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyParseError {
    #[error("Empty key name")]
    Empty,

    #[error("Unknown key: {0}")]
    Unknown(String),
}

impl KeyId {
    /// Resolve a raw `EV_KEY` code to its symbolic name.
    ///
    /// Codes the kernel table does not name become `KEY_<code>`.
    pub fn from_code(code: u16) -> Self {
        let name = format!("{:?}", evdev::Key::new(code));
        if name.starts_with("KEY_") || name.starts_with("BTN_") {
            Self(name)
        } else {
            Self(format!("KEY_{}", code))
        }
    }

    /// Get the name of this key
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parse a key name from the kernel table, case-insensitively.
///
/// Aliases sharing a code resolve to the name events are reported with, so
/// `KEY_ROTATE_DISPLAY` becomes `KEY_DIRECTION`.
impl FromStr for KeyId {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(KeyParseError::Empty);
        }
        let key = evdev::Key::from_str(&trimmed.to_uppercase())
            .map_err(|_| KeyParseError::Unknown(trimmed.to_string()))?;
        Ok(Self::from_code(key.code()))
    }
}

impl From<&str> for KeyId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for KeyId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl AsRef<str> for KeyId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code_known_key() {
        assert_eq!(KeyId::from_code(41).name(), "KEY_GRAVE");
        assert_eq!(KeyId::from_code(15).name(), "KEY_TAB");
        assert_eq!(KeyId::from_code(70).name(), "KEY_SCROLLLOCK");
    }

    #[test]
    fn test_from_str_normalizes_case() {
        let key: KeyId = " key_grave ".parse().unwrap();
        assert_eq!(key, KeyId::from("KEY_GRAVE"));
    }

    #[test]
    fn test_from_str_rejects_empty() {
        assert_eq!("".parse::<KeyId>(), Err(KeyParseError::Empty));
        assert_eq!("   ".parse::<KeyId>(), Err(KeyParseError::Empty));
        assert!("KEY A".parse::<KeyId>().is_err());
    }

    #[test]
    fn test_from_str_rejects_unknown_names() {
        assert_eq!(
            "KEY_GRAEV".parse::<KeyId>(),
            Err(KeyParseError::Unknown("KEY_GRAEV".to_string()))
        );
        assert!("KEY_MIN_INTERESTING".parse::<KeyId>().is_err());
        assert!("GRAVE".parse::<KeyId>().is_err());
    }

    #[test]
    fn test_from_str_resolves_aliases() {
        let alias: KeyId = "KEY_ROTATE_DISPLAY".parse().unwrap();
        assert_eq!(alias, KeyId::from_code(153));
        assert_eq!(alias.name(), "KEY_DIRECTION");

        let button: KeyId = "btn_left".parse().unwrap();
        assert_eq!(button.name(), "BTN_LEFT");
    }

    #[test]
    fn test_display() {
        assert_eq!(KeyId::from("KEY_SYSRQ").to_string(), "KEY_SYSRQ");
    }
}
