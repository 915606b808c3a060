//! Validated names for reusable components

use crate::error::{InvalidComponentKey, KeyDecodingError};
use crate::ordered_map::{KeyStrategy, MapKey};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Human-readable form of the component key character rule
pub const KEY_RULE: &str =
    "component keys may only contain letters, digits, '-', '_' and '.', and must not be empty";

static KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L}\p{N}._-]+$").expect("component key pattern compiles"));

/// Name of a reusable component in the components object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ComponentKey(String);

impl ComponentKey {
    /// Create a key, rejecting strings outside the allowed character set
    pub fn new(raw: impl Into<String>) -> Result<Self, InvalidComponentKey> {
        let raw = raw.into();
        if Self::is_valid(&raw) {
            Ok(Self(raw))
        } else {
            Err(InvalidComponentKey { key: raw })
        }
    }

    /// Build a valid key from arbitrary text by replacing disallowed characters with `_`
    pub fn sanitized(raw: &str) -> Self {
        let cleaned: String = raw
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        if cleaned.is_empty() {
            Self("_".to_string())
        } else {
            Self(cleaned)
        }
    }

    pub fn is_valid(raw: &str) -> bool {
        KEY_PATTERN.is_match(raw)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ComponentKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ComponentKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl FromStr for ComponentKey {
    type Err = InvalidComponentKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ComponentKey {
    type Error = InvalidComponentKey;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for ComponentKey {
    type Error = InvalidComponentKey;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ComponentKey> for String {
    fn from(key: ComponentKey) -> Self {
        key.0
    }
}

impl MapKey for ComponentKey {
    const STRATEGY: KeyStrategy = KeyStrategy::RawValue;

    fn encode_key(&self) -> Option<String> {
        Some(self.0.clone())
    }

    fn decode_key(raw: &str) -> Result<Self, KeyDecodingError> {
        Self::new(raw).map_err(|_| KeyDecodingError::with_hint(raw, KEY_RULE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_key() {
        let key = ComponentKey::new("valid-key_1.2").unwrap();
        assert_eq!(key.as_str(), "valid-key_1.2");
        assert!(ComponentKey::new("Ünïcödé9").is_ok());
    }

    #[test]
    fn test_invalid_key_fails_construction() {
        let err = ComponentKey::new("bad key!").unwrap_err();
        assert_eq!(err.key, "bad key!");
        assert!(ComponentKey::new("").is_err());
        assert!(ComponentKey::new("a/b").is_err());
    }

    #[test]
    fn test_invalid_key_fails_decode() {
        let err = serde_json::from_str::<ComponentKey>(r#""bad key!""#).unwrap_err();
        assert!(err.to_string().contains("Invalid component key 'bad key!'"));

        let key: ComponentKey = serde_json::from_str(r#""Pet.v2""#).unwrap();
        assert_eq!(key.as_str(), "Pet.v2");
    }

    #[test]
    fn test_map_key_decode_carries_hint() {
        let err = ComponentKey::decode_key("bad key!").unwrap_err();
        assert_eq!(err.raw, "bad key!");
        assert_eq!(err.hint.as_deref(), Some(KEY_RULE));
    }

    #[test]
    fn test_sanitized() {
        assert_eq!(ComponentKey::sanitized("pets.yaml#/Pet").as_str(), "pets.yaml__Pet");
        assert_eq!(ComponentKey::sanitized("").as_str(), "_");
        assert!(ComponentKey::is_valid(ComponentKey::sanitized("a b/c?d").as_str()));
    }
}
