//! Fields that may hold a value inline or point at a shared component

use crate::components::ComponentType;
use crate::reference::Reference;
use serde::{Deserialize, Serialize};

/// An inline value or a reference to one stored in the components object
///
/// An object with a `$ref` always decodes as a reference. Sibling keywords
/// other than `summary` and `description` are dropped, so a 3.1 schema such
/// as `{"$ref": ..., "maxLength": 5}` loses its `maxLength`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
#[serde(bound(
    serialize = "T: Serialize",
    deserialize = "T: ComponentType + Deserialize<'de>"
))]
pub enum Either<T> {
    Reference(Reference<T>),
    Value(T),
}

impl<T> Either<T> {
    pub fn reference(&self) -> Option<&Reference<T>> {
        match self {
            Either::Reference(reference) => Some(reference),
            Either::Value(_) => None,
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Either::Value(value) => Some(value),
            Either::Reference(_) => None,
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Either::Reference(_))
    }
}

impl<T> From<Reference<T>> for Either<T> {
    fn from(reference: Reference<T>) -> Self {
        Either::Reference(reference)
    }
}

impl<T> From<T> for Either<T> {
    fn from(value: T) -> Self {
        Either::Value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::JsonSchema;
    use serde_json::json;

    #[test]
    fn test_decodes_reference_before_value() {
        let either: Either<JsonSchema> =
            serde_json::from_value(json!({"$ref": "#/components/schemas/Pet"})).unwrap();
        assert!(either.is_reference());

        let inline: Either<JsonSchema> = serde_json::from_value(json!({"type": "string"})).unwrap();
        assert_eq!(
            inline.value().and_then(|s| s.schema_type.clone()),
            Some(json!("string"))
        );
    }

    #[test]
    fn test_reference_siblings_other_than_overrides_are_dropped() {
        let either: Either<JsonSchema> = serde_json::from_value(json!({
            "$ref": "#/components/schemas/Name",
            "description": "Display name",
            "maxLength": 5
        }))
        .unwrap();

        let reference = either.reference().unwrap();
        assert_eq!(reference.description.as_deref(), Some("Display name"));
        assert_eq!(
            serde_json::to_value(&either).unwrap(),
            json!({"$ref": "#/components/schemas/Name", "description": "Display name"})
        );
    }
}
