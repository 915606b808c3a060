//! The pluggable strategy for fetching and naming external nodes

use crate::error::{LoadError, LoadResult};
use async_trait::async_trait;
use openapi_model::{ComponentKey, ComponentKind};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;
use url::Url;

/// A non-fatal diagnostic produced while loading
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoaderMessage {
    pub locator: String,
    pub message: String,
}

impl LoaderMessage {
    pub fn new(locator: &Url, message: impl Into<String>) -> Self {
        Self {
            locator: locator.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for LoaderMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.locator, self.message)
    }
}

/// Fetches external nodes and decides the component names they are stored under
#[async_trait]
pub trait ExternalLoader: Send + Sync {
    /// Fetch the node at `locator`, following its fragment if there is one
    async fn load(&self, locator: &Url) -> LoadResult<(Value, Vec<LoaderMessage>)>;

    /// Stable component name for the node at `locator`
    ///
    /// Equal locators must map to equal keys so that repeated loads of one
    /// node collapse into a single component.
    fn component_key(&self, kind: ComponentKind, locator: &Url) -> LoadResult<ComponentKey>;
}

/// `<file stem>_<last fragment segment>`, with disallowed characters replaced
///
/// `file:///specs/pets.yaml#/components/schemas/Pet` becomes `pets_Pet`.
pub fn default_component_key(locator: &Url) -> ComponentKey {
    let file = locator
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .or_else(|| locator.host_str())
        .unwrap_or("external");
    let stem = file.split_once('.').map_or(file, |(stem, _)| stem);

    let tail = locator
        .fragment()
        .and_then(|fragment| fragment.rsplit('/').find(|segment| !segment.is_empty()));

    match tail {
        Some(tail) => ComponentKey::sanitized(&format!("{}_{}", stem, decode_token(tail))),
        None => ComponentKey::sanitized(stem),
    }
}

/// The locator with its fragment removed, identifying the whole document
pub fn document_locator(locator: &Url) -> Url {
    let mut document = locator.clone();
    document.set_fragment(None);
    document
}

/// Select the node named by the locator's fragment
pub fn select_fragment(document: &Value, locator: &Url) -> LoadResult<Value> {
    let pointer = match locator.fragment() {
        None | Some("") => return Ok(document.clone()),
        Some(fragment) => fragment,
    };

    document
        .pointer(pointer)
        .cloned()
        .ok_or_else(|| LoadError::PointerNotFound {
            locator: document_locator(locator).to_string(),
            pointer: pointer.to_string(),
        })
}

fn decode_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

/// Loader over documents held in memory, keyed by document locator
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    documents: HashMap<Url, Value>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, locator: Url, document: Value) {
        self.documents.insert(document_locator(&locator), document);
    }

    pub fn with_document(mut self, locator: Url, document: Value) -> Self {
        self.insert(locator, document);
        self
    }
}

#[async_trait]
impl ExternalLoader for MemoryLoader {
    async fn load(&self, locator: &Url) -> LoadResult<(Value, Vec<LoaderMessage>)> {
        let document = self
            .documents
            .get(&document_locator(locator))
            .ok_or_else(|| LoadError::Fetch {
                locator: locator.to_string(),
                message: "no such document".to_string(),
            })?;
        debug!("Loading {} from memory", locator);
        Ok((select_fragment(document, locator)?, Vec::new()))
    }

    fn component_key(&self, _kind: ComponentKind, locator: &Url) -> LoadResult<ComponentKey> {
        Ok(default_component_key(locator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn url(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    #[test]
    fn test_default_component_key() {
        let key = default_component_key(&url("file:///specs/pets.yaml#/components/schemas/Pet"));
        assert_eq!(key.as_str(), "pets_Pet");

        let whole = default_component_key(&url("https://example.com/shared/error.v2.json"));
        assert_eq!(whole.as_str(), "error");

        let escaped = default_component_key(&url("file:///api.yaml#/paths/~1pets~1{id}"));
        assert!(ComponentKey::is_valid(escaped.as_str()));
        assert!(escaped.as_str().starts_with("api_"));
    }

    #[test]
    fn test_default_component_key_is_stable() {
        let a = default_component_key(&url("file:///x/common.yaml#/Error"));
        let b = default_component_key(&url("file:///x/common.yaml#/Error"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_select_fragment() {
        let document = json!({"components": {"schemas": {"Pet": {"type": "object"}}}});

        let pet = select_fragment(&document, &url("file:///a.json#/components/schemas/Pet")).unwrap();
        assert_eq!(pet, json!({"type": "object"}));

        let whole = select_fragment(&document, &url("file:///a.json")).unwrap();
        assert_eq!(whole, document);

        let err = select_fragment(&document, &url("file:///a.json#/components/schemas/Cat"))
            .unwrap_err();
        match err {
            LoadError::PointerNotFound { locator, pointer } => {
                assert_eq!(locator, "file:///a.json");
                assert_eq!(pointer, "/components/schemas/Cat");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_memory_loader() {
        let loader = MemoryLoader::new().with_document(
            url("memory:///shared.json"),
            json!({"Pet": {"type": "object"}}),
        );

        let (value, messages) = loader.load(&url("memory:///shared.json#/Pet")).await.unwrap();
        assert_eq!(value, json!({"type": "object"}));
        assert!(messages.is_empty());

        let missing = loader.load(&url("memory:///other.json")).await;
        assert!(matches!(missing, Err(LoadError::Fetch { .. })));
    }
}
