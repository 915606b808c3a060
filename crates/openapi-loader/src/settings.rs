//! Loader configuration
//!
//! Stored as a plain camelCase JSON file. A missing file means defaults.

use crate::error::{LoadError, LoadResult};
use openapi_model::MergePolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Settings for fetching external documents and splicing them in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoaderSettings {
    /// How discovered components that collide with existing ones are handled
    pub merge_policy: MergePolicy,
    /// Base for relative locators when the document has no location of its own
    pub base_url: Option<String>,
    /// Request timeout for remote documents
    pub timeout_secs: u64,
    /// Keep fetched documents in memory for the lifetime of the loader
    pub cache_documents: bool,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            merge_policy: MergePolicy::default(),
            base_url: None,
            timeout_secs: 30,
            cache_documents: true,
        }
    }
}

impl LoaderSettings {
    /// Load settings from a JSON file, falling back to defaults if it does not exist
    pub fn load(path: &Path) -> LoadResult<Self> {
        if !path.exists() {
            debug!("No loader settings at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let settings: LoaderSettings = serde_json::from_str(&contents)?;
        debug!("Loaded loader settings from {:?}", path);
        Ok(settings)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn base_url(&self) -> LoadResult<Option<Url>> {
        self.base_url
            .as_deref()
            .map(|raw| Url::parse(raw).map_err(|_| LoadError::InvalidLocator(raw.to_string())))
            .transpose()
    }
}
