use super::types::{dereference_security, DereferencedPathItem, DereferencedSecurityRequirement};
use super::{LocallyDereferenceable, VisitedSet};
use crate::error::ReferenceResult;
use crate::ordered_map::OrderedMap;
use crate::types::{Document, Extensions, ExternalDocs, Info, Server, Tag};
use serde::Serialize;
use tracing::debug;

/// A document with every internal reference inlined
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct DereferencedDocument {
    pub openapi: String,
    pub info: Info,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,
    pub paths: OrderedMap<String, DereferencedPathItem>,
    #[serde(skip_serializing_if = "OrderedMap::is_empty")]
    pub webhooks: OrderedMap<String, DereferencedPathItem>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<DereferencedSecurityRequirement>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_docs: Option<ExternalDocs>,
    #[serde(flatten)]
    pub extensions: Extensions,
}

impl Document {
    /// Inline every reference against this document's own components
    ///
    /// Fails on the first external, missing or cyclic reference in document
    /// order. The document itself is left untouched, so a caller can keep
    /// using it after a [`ReferenceCycle`](crate::ReferenceError::ReferenceCycle).
    pub fn locally_dereferenced(&self) -> ReferenceResult<DereferencedDocument> {
        debug!(
            "Dereferencing document '{}' ({} paths, {} webhooks)",
            self.info.title,
            self.paths.len(),
            self.webhooks.len()
        );

        let components = &self.components;
        let visited = VisitedSet::new();

        let paths = self.paths.dereferenced_in(components, &visited, None)?;
        let webhooks = self.webhooks.dereferenced_in(components, &visited, None)?;
        let security = dereference_security(&self.security, components, &visited)?;

        Ok(DereferencedDocument {
            openapi: self.openapi.clone(),
            info: self.info.clone(),
            servers: self.servers.clone(),
            paths,
            webhooks,
            security,
            tags: self.tags.clone(),
            external_docs: self.external_docs.clone(),
            extensions: self.extensions.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component_key::ComponentKey;
    use crate::error::ReferenceError;
    use crate::reference::ComponentKind;
    use crate::types::HttpMethod;
    use serde_json::{json, Value};

    fn petstore() -> Document {
        serde_json::from_value(json!({
            "openapi": "3.1.0",
            "info": {"title": "Petstore", "version": "1.0.0"},
            "security": [{"apiKey": []}],
            "paths": {
                "/pets/{petId}": {"$ref": "#/components/pathItems/PetById"},
                "/pets": {
                    "post": {
                        "requestBody": {"$ref": "#/components/requestBodies/NewPet"},
                        "responses": {
                            "201": {"$ref": "#/components/responses/Pet"}
                        },
                        "callbacks": {
                            "created": {"$ref": "#/components/callbacks/PetCreated"}
                        }
                    }
                }
            },
            "webhooks": {
                "adopted": {
                    "post": {
                        "responses": {"200": {"$ref": "#/components/responses/Pet"}}
                    }
                }
            },
            "components": {
                "schemas": {
                    "Pet": {
                        "type": "object",
                        "properties": {
                            "id": {"$ref": "#/components/schemas/PetId"},
                            "tags": {"type": "array", "items": {"$ref": "#/components/schemas/Tag"}}
                        },
                        "additionalProperties": {"$ref": "#/components/schemas/Tag"}
                    },
                    "PetId": {"type": "string"},
                    "Tag": {"type": "string"},
                    "PetAlias": {"$ref": "#/components/schemas/Pet"}
                },
                "parameters": {
                    "PetId": {"name": "petId", "in": "path", "required": true,
                              "schema": {"$ref": "#/components/schemas/PetId"}}
                },
                "requestBodies": {
                    "NewPet": {
                        "content": {"application/json": {"schema": {"$ref": "#/components/schemas/PetAlias"}}}
                    }
                },
                "responses": {
                    "Pet": {
                        "description": "A pet",
                        "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Pet"}}},
                        "links": {"owner": {"$ref": "#/components/links/Owner"}}
                    }
                },
                "links": {
                    "Owner": {"operationId": "getOwner"}
                },
                "callbacks": {
                    "PetCreated": {
                        "{$request.body#/callbackUrl}": {
                            "post": {"responses": {"200": {"$ref": "#/components/responses/Pet"}}}
                        }
                    }
                },
                "pathItems": {
                    "PetById": {
                        "parameters": [{"$ref": "#/components/parameters/PetId"}],
                        "get": {"responses": {"200": {"$ref": "#/components/responses/Pet"}}}
                    }
                },
                "securitySchemes": {
                    "apiKey": {"type": "apiKey", "name": "X-Api-Key", "in": "header"}
                }
            }
        }))
        .unwrap()
    }

    fn collect_refs(value: &Value, found: &mut Vec<String>) {
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    if key == "$ref" {
                        found.push(child.to_string());
                    }
                    collect_refs(child, found);
                }
            }
            Value::Array(items) => items.iter().for_each(|item| collect_refs(item, found)),
            _ => {}
        }
    }

    #[test]
    fn test_dereferenced_document_has_no_references() {
        let dereferenced = petstore().locally_dereferenced().unwrap();
        let rendered = serde_json::to_value(&dereferenced).unwrap();

        let mut refs = Vec::new();
        collect_refs(&rendered, &mut refs);
        assert!(refs.is_empty(), "references left behind: {:?}", refs);
    }

    #[test]
    fn test_component_names_survive_inlining() {
        let dereferenced = petstore().locally_dereferenced().unwrap();
        let key = |raw: &str| ComponentKey::new(raw).unwrap();

        let by_id = dereferenced.paths.get("/pets/{petId}").unwrap();
        assert_eq!(by_id.component_name, Some(key("PetById")));
        assert_eq!(by_id.parameters[0].component_name, Some(key("PetId")));

        let post = dereferenced
            .paths
            .get("/pets")
            .and_then(|item| item.operation(HttpMethod::Post))
            .unwrap();
        let body = post.request_body.as_ref().unwrap();
        assert_eq!(body.component_name, Some(key("NewPet")));

        // The alias resolves to the component that stores the value
        let schema = body.content.get("application/json").unwrap().schema.as_ref().unwrap();
        assert_eq!(schema.component_name, Some(key("Pet")));

        let callback = post.callbacks.get("created").unwrap();
        assert_eq!(callback.component_name, Some(key("PetCreated")));

        let scheme = dereferenced.security[0].get("apiKey").unwrap();
        assert_eq!(scheme.scheme.component_name, Some(key("apiKey")));

        let rendered = serde_json::to_value(&dereferenced).unwrap();
        assert_eq!(
            rendered["paths"]["/pets/{petId}"]["x-component-name"],
            json!("PetById")
        );
    }

    #[test]
    fn test_dereference_keeps_path_order() {
        let dereferenced = petstore().locally_dereferenced().unwrap();
        let paths: Vec<_> = dereferenced.paths.keys().map(String::as_str).collect();
        assert_eq!(paths, vec!["/pets/{petId}", "/pets"]);
        assert_eq!(dereferenced.webhooks.len(), 1);
    }

    #[test]
    fn test_cycle_in_document_is_reported() {
        let mut document = petstore();
        let pet = document
            .components
            .schemas
            .get_mut("Pet")
            .and_then(|either| match either {
                crate::Either::Value(schema) => Some(schema),
                crate::Either::Reference(_) => None,
            })
            .unwrap();
        pet.properties.insert(
            "parent".to_string(),
            crate::Either::Reference(crate::Reference::component(
                ComponentKey::new("PetAlias").unwrap(),
            )),
        );

        let err = document.locally_dereferenced().unwrap_err();
        assert!(matches!(err, ReferenceError::ReferenceCycle { .. }));
        // The source document stays usable
        assert_eq!(document.paths.len(), 2);
    }

    #[test]
    fn test_unknown_security_scheme_is_missing() {
        let mut document = petstore();
        document.security = vec![[(ComponentKey::new("oauth").unwrap(), vec![])].into()];

        let err = document.locally_dereferenced().unwrap_err();
        assert_eq!(
            err,
            ReferenceError::MissingComponent {
                name: "oauth".to_string(),
                kind: ComponentKind::SecuritySchemes,
            }
        );
    }
}
