//! JSON Schema objects, modelled only as far as references reach into them

use crate::either::Either;
use crate::ordered_map::OrderedMap;
use serde::{Deserialize, Serialize};

/// A schema object
///
/// Subschema positions that may hold a `$ref` are typed; every other keyword
/// (`minimum`, `enum`, `pattern`, ...) is kept verbatim in `keywords`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonSchema {
    /// A type name or, in OpenAPI 3.1, an array of type names
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub properties: OrderedMap<String, Either<JsonSchema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Either<JsonSchema>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<AdditionalProperties>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<Either<JsonSchema>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<Either<JsonSchema>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub any_of: Vec<Either<JsonSchema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<Either<JsonSchema>>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prefix_items: Vec<Either<JsonSchema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_items: Option<AdditionalProperties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unevaluated_items: Option<AdditionalProperties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<Box<Either<JsonSchema>>>,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub pattern_properties: OrderedMap<String, Either<JsonSchema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unevaluated_properties: Option<AdditionalProperties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_names: Option<Box<Either<JsonSchema>>>,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub dependent_schemas: OrderedMap<String, Either<JsonSchema>>,
    #[serde(rename = "if", default, skip_serializing_if = "Option::is_none")]
    pub if_schema: Option<Box<Either<JsonSchema>>>,
    #[serde(rename = "then", default, skip_serializing_if = "Option::is_none")]
    pub then_schema: Option<Box<Either<JsonSchema>>>,
    #[serde(rename = "else", default, skip_serializing_if = "Option::is_none")]
    pub else_schema: Option<Box<Either<JsonSchema>>>,
    /// Local definitions; references into them are raw pointers, not components
    #[serde(rename = "$defs", default, skip_serializing_if = "OrderedMap::is_empty")]
    pub defs: OrderedMap<String, Either<JsonSchema>>,
    #[serde(flatten)]
    pub keywords: OrderedMap<String, serde_json::Value>,
}

impl JsonSchema {
    pub fn of_type(schema_type: &str) -> Self {
        Self {
            schema_type: Some(serde_json::Value::String(schema_type.to_string())),
            ..Default::default()
        }
    }
}

/// A boolean switch or a schema, as taken by `additionalProperties`,
/// `additionalItems` and the `unevaluated*` keywords
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Allowed(bool),
    Schema(Box<Either<JsonSchema>>),
}
