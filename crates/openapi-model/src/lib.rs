//! # openapi-model
//!
//! Typed OpenAPI 3.x documents with shareable components.
//! Inline-or-reference fields are dereferenced against the document's own
//! components and then resolved into per-route views with inherited
//! servers, security and parameters merged in.

mod component_key;
mod components;
pub mod dereference;
mod either;
mod error;
mod ordered_map;
mod parser;
mod reference;
mod resolved;
mod schema;
mod security;
mod types;

pub use component_key::{ComponentKey, KEY_RULE};
pub use components::{ComponentMap, ComponentType, Components, MergePolicy};
pub use dereference::{Annotated, DereferencedDocument, LocallyDereferenceable, VisitedSet};
pub use either::Either;
pub use error::{
    InvalidComponentKey, KeyDecodingError, ParseError, ParseResult, ReferenceError,
    ReferenceResult,
};
pub use ordered_map::{KeySetMismatch, KeyStrategy, MapKey, OrderedMap};
pub use parser::DocumentParser;
pub use reference::{ComponentKind, InternalReference, Reference, ReferenceTarget};
pub use resolved::{ResolvedDocument, ResolvedEndpoint, ResolvedRoute};
pub use schema::{AdditionalProperties, JsonSchema};
pub use security::{ApiKeyLocation, OAuthFlow, OAuthFlows, SecurityRequirement, SecurityScheme};
pub use types::*;
