//! Loader for documents on disk or behind HTTP

use crate::error::{LoadError, LoadResult};
use crate::loader::{
    default_component_key, document_locator, select_fragment, ExternalLoader, LoaderMessage,
};
use crate::settings::LoaderSettings;
use async_trait::async_trait;
use openapi_model::{ComponentKey, ComponentKind};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use url::Url;

/// Fetches `file://` and `http(s)://` documents, caching each whole document
pub struct DocumentLoader {
    client: reqwest::Client,
    /// Parsed documents keyed by their fragment-less locator
    cache: Arc<RwLock<HashMap<Url, Arc<Value>>>>,
    cache_documents: bool,
}

impl DocumentLoader {
    pub fn new(settings: &LoaderSettings) -> LoadResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()?;

        Ok(Self {
            client,
            cache: Arc::new(RwLock::new(HashMap::new())),
            cache_documents: settings.cache_documents,
        })
    }

    /// Number of documents currently cached
    pub async fn cached(&self) -> usize {
        self.cache.read().await.len()
    }

    async fn document(&self, locator: &Url) -> LoadResult<(Arc<Value>, Vec<LoaderMessage>)> {
        let document_url = document_locator(locator);

        if self.cache_documents {
            let cache = self.cache.read().await;
            if let Some(document) = cache.get(&document_url) {
                debug!("Using cached document {}", document_url);
                return Ok((document.clone(), Vec::new()));
            }
        }

        let content = match document_url.scheme() {
            "file" => self.read_file(&document_url).await?,
            "http" | "https" => self.fetch(&document_url).await?,
            _ => return Err(LoadError::InvalidLocator(locator.to_string())),
        };

        let document = Arc::new(parse_content(&document_url, &content)?);
        let messages = version_messages(&document_url, &document);

        if self.cache_documents {
            let mut cache = self.cache.write().await;
            cache.insert(document_url, document.clone());
        }

        Ok((document, messages))
    }

    async fn read_file(&self, url: &Url) -> LoadResult<String> {
        let path = url
            .to_file_path()
            .map_err(|_| LoadError::InvalidLocator(url.to_string()))?;
        info!("Reading external document {:?}", path);
        Ok(tokio::fs::read_to_string(&path).await?)
    }

    async fn fetch(&self, url: &Url) -> LoadResult<String> {
        info!("Fetching external document {}", url);

        let response = self
            .client
            .get(url.clone())
            .header("Accept", "application/json, application/yaml, text/yaml")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LoadError::Fetch {
                locator: url.to_string(),
                message: format!("HTTP {}", response.status()),
            });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl ExternalLoader for DocumentLoader {
    async fn load(&self, locator: &Url) -> LoadResult<(Value, Vec<LoaderMessage>)> {
        let (document, messages) = self.document(locator).await?;
        Ok((select_fragment(&document, locator)?, messages))
    }

    fn component_key(&self, _kind: ComponentKind, locator: &Url) -> LoadResult<ComponentKey> {
        Ok(default_component_key(locator))
    }
}

/// JSON for `.json` paths or text starting with `{`, YAML otherwise
fn parse_content(url: &Url, content: &str) -> LoadResult<Value> {
    let is_json = url.path().ends_with(".json") || content.trim_start().starts_with('{');
    if is_json {
        Ok(serde_json::from_str(content)?)
    } else {
        Ok(serde_yaml::from_str(content)?)
    }
}

/// Notes for documents that declare an OpenAPI version other than 3.x
fn version_messages(url: &Url, document: &Value) -> Vec<LoaderMessage> {
    match document.get("openapi").and_then(Value::as_str) {
        Some(version) if !version.starts_with("3.") => vec![LoaderMessage::new(
            url,
            format!("document declares OpenAPI {}", version),
        )],
        _ => Vec::new(),
    }
}
