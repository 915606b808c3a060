//! Error types for the document model

use crate::component_key::ComponentKey;
use crate::reference::ComponentKind;
use thiserror::Error;

/// Result type alias for reference and component operations
pub type ReferenceResult<T> = std::result::Result<T, ReferenceError>;

/// Result type alias for document parsing
pub type ParseResult<T> = std::result::Result<T, ParseError>;

/// Errors raised while looking up or dereferencing components
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("Remote references cannot be resolved against local components: {0}")]
    RemoteReference(String),

    #[error("Component '{name}' is missing from {kind}")]
    MissingComponent { name: String, kind: ComponentKind },

    #[error("Cannot create a reference to '{name}': no such component in {kind}")]
    MissingComponentOnCreation { name: String, kind: ComponentKind },

    #[error("Reference cycle detected: {}", .path.join(" -> "))]
    ReferenceCycle { path: Vec<String> },

    #[error("Component '{name}' is already defined in {kind}")]
    ComponentConflict { name: ComponentKey, kind: ComponentKind },
}

/// A string did not satisfy the component key character rules
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid component key '{key}': {}", crate::component_key::KEY_RULE)]
pub struct InvalidComponentKey {
    pub key: String,
}

/// An ordered map key could not be rebuilt from its decoded string form
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to decode map key '{raw}'{}", .hint.as_ref().map(|h| format!(": {}", h)).unwrap_or_default())]
pub struct KeyDecodingError {
    /// The raw string that failed to convert
    pub raw: String,
    /// Type-specific description of the expected shape
    pub hint: Option<String>,
}

impl KeyDecodingError {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            hint: None,
        }
    }

    pub fn with_hint(raw: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            hint: Some(hint.into()),
        }
    }
}

/// Document parsing error types
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("YAML parse error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Unsupported OpenAPI version: {0}")]
    UnsupportedVersion(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_decoding_error_message_includes_hint() {
        let err = KeyDecodingError::with_hint("bad key!", "expected letters and digits");
        assert_eq!(
            err.to_string(),
            "Failed to decode map key 'bad key!': expected letters and digits"
        );

        let bare = KeyDecodingError::new("x");
        assert_eq!(bare.to_string(), "Failed to decode map key 'x'");
    }

    #[test]
    fn test_cycle_message_lists_path() {
        let err = ReferenceError::ReferenceCycle {
            path: vec![
                "#/components/schemas/A".to_string(),
                "#/components/schemas/A".to_string(),
            ],
        };
        assert_eq!(
            err.to_string(),
            "Reference cycle detected: #/components/schemas/A -> #/components/schemas/A"
        );
    }
}
