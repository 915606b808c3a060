//! Error types for loading external references

use openapi_model::ReferenceError;
use thiserror::Error;

/// Result type alias for loader operations
pub type LoadResult<T> = std::result::Result<T, LoadError>;

/// Errors raised while fetching documents or splicing them into a document
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to fetch {locator}: {message}")]
    Fetch { locator: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid locator '{0}'")]
    InvalidLocator(String),

    #[error("Pointer '{pointer}' not found in {locator}")]
    PointerNotFound { locator: String, pointer: String },

    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error("External reference cycle detected: {}", .path.join(" -> "))]
    Cycle { path: Vec<String> },

    #[error("Loader task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for LoadError {
    fn from(err: tokio::task::JoinError) -> Self {
        LoadError::Task(err.to_string())
    }
}

impl From<reqwest::Error> for LoadError {
    fn from(err: reqwest::Error) -> Self {
        LoadError::Fetch {
            locator: err
                .url()
                .map(|url| url.to_string())
                .unwrap_or_else(|| "<unknown>".to_string()),
            message: err.to_string(),
        }
    }
}
