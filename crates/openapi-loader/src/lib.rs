//! # openapi-loader
//!
//! Loads external `$ref` targets of an OpenAPI document into its components,
//! after which the document can be dereferenced locally.

mod document_loader;
mod error;
mod external;
mod loader;
mod settings;

pub use document_loader::DocumentLoader;
pub use error::{LoadError, LoadResult};
pub use external::{ExternalDocument, ExternallyDereferenceable, LoadContext, Loaded};
pub use loader::{
    default_component_key, document_locator, select_fragment, ExternalLoader, LoaderMessage,
    MemoryLoader,
};
pub use settings::LoaderSettings;
