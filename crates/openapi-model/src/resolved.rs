//! Per-route and per-endpoint views with inherited values merged in

use crate::dereference::{
    DereferencedCallbacks, DereferencedDocument, DereferencedOperation, DereferencedParameter,
    DereferencedPathItem, DereferencedRequestBody, DereferencedResponse,
    DereferencedSecurityRequirement,
};
use crate::error::ReferenceResult;
use crate::ordered_map::OrderedMap;
use crate::types::{
    Document, ExternalDocs, HttpMethod, ParameterIdentity, ParameterLocation, Server,
};
use serde::Serialize;
use tracing::debug;

/// A path with its route-level values and one endpoint per declared method
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRoute {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Route servers, or the document servers when the route declares none
    pub servers: Vec<Server>,
    /// Parameters declared on the path item itself
    pub parameters: Vec<DereferencedParameter>,
    pub endpoints: OrderedMap<HttpMethod, ResolvedEndpoint>,
}

impl ResolvedRoute {
    pub fn endpoint(&self, method: HttpMethod) -> Option<&ResolvedEndpoint> {
        self.endpoints.get(&method)
    }

    pub fn methods(&self) -> impl Iterator<Item = HttpMethod> + '_ {
        self.endpoints.keys().copied()
    }
}

/// One operation with servers, security and parameters as they apply to it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedEndpoint {
    pub path: String,
    pub method: HttpMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_docs: Option<ExternalDocs>,
    pub deprecated: bool,
    /// Operation parameters followed by the route parameters they don't override
    pub parameters: Vec<DereferencedParameter>,
    pub servers: Vec<Server>,
    pub security: Vec<DereferencedSecurityRequirement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<DereferencedRequestBody>,
    pub responses: OrderedMap<String, DereferencedResponse>,
    #[serde(skip_serializing_if = "OrderedMap::is_empty")]
    pub callbacks: OrderedMap<String, DereferencedCallbacks>,
}

impl ResolvedEndpoint {
    pub fn required_parameters(&self) -> impl Iterator<Item = &DereferencedParameter> {
        self.parameters.iter().filter(|parameter| parameter.required)
    }

    pub fn parameters_in(
        &self,
        location: ParameterLocation,
    ) -> impl Iterator<Item = &DereferencedParameter> {
        self.parameters
            .iter()
            .filter(move |parameter| parameter.location == location)
    }

    /// The operation id, or one derived from method and path
    ///
    /// `/users/{id}/posts` with GET becomes `get_users_id_posts`.
    pub fn endpoint_id(&self) -> String {
        self.operation_id.clone().unwrap_or_else(|| {
            let path_part = self
                .path
                .trim_start_matches('/')
                .replace('/', "_")
                .replace(['{', '}'], "");
            format!("{}_{}", self.method.field_name(), path_part)
        })
    }

    /// Whether no security requirement applies
    ///
    /// An empty requirement object inside the list also makes the endpoint
    /// callable anonymously.
    pub fn allows_anonymous(&self) -> bool {
        self.security.is_empty() || self.security.iter().any(OrderedMap::is_empty)
    }
}

/// Every route of a document, resolved
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedDocument {
    pub routes: Vec<ResolvedRoute>,
}

impl ResolvedDocument {
    pub fn endpoints(&self) -> impl Iterator<Item = &ResolvedEndpoint> {
        self.routes.iter().flat_map(|route| route.endpoints.values())
    }

    pub fn route(&self, path: &str) -> Option<&ResolvedRoute> {
        self.routes.iter().find(|route| route.path == path)
    }

    pub fn endpoint(&self, path: &str, method: HttpMethod) -> Option<&ResolvedEndpoint> {
        self.route(path).and_then(|route| route.endpoint(method))
    }

    /// Servers used by any endpoint, deduplicated in first-seen order
    pub fn all_servers(&self) -> Vec<&Server> {
        let mut servers: Vec<&Server> = Vec::new();
        for server in self.endpoints().flat_map(|endpoint| &endpoint.servers) {
            if !servers.contains(&server) {
                servers.push(server);
            }
        }
        servers
    }

    /// Tags used by any endpoint, deduplicated in first-seen order
    pub fn all_tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = Vec::new();
        for tag in self.endpoints().flat_map(|endpoint| &endpoint.tags) {
            if !tags.contains(&tag.as_str()) {
                tags.push(tag);
            }
        }
        tags
    }
}

impl DereferencedDocument {
    pub fn resolved_routes(&self) -> Vec<ResolvedRoute> {
        self.paths
            .iter()
            .map(|(path, item)| self.resolve_route(path, item))
            .collect()
    }

    pub fn resolved(&self) -> ResolvedDocument {
        let routes = self.resolved_routes();
        debug!(
            "Resolved {} routes with {} endpoints",
            routes.len(),
            routes.iter().map(|route| route.endpoints.len()).sum::<usize>()
        );
        ResolvedDocument { routes }
    }

    /// Resolve a single path item as if it were declared at `path`
    pub fn resolve_route(&self, path: &str, item: &DereferencedPathItem) -> ResolvedRoute {
        let route_servers = item.servers.as_ref().unwrap_or(&self.servers);

        let endpoints = item
            .endpoints()
            .map(|(method, operation)| {
                let endpoint = self.resolve_endpoint(path, method, item, operation);
                (method, endpoint)
            })
            .collect();

        ResolvedRoute {
            path: path.to_string(),
            summary: item.summary.clone(),
            description: item.description.clone(),
            servers: route_servers.clone(),
            parameters: item.parameters.clone(),
            endpoints,
        }
    }

    fn resolve_endpoint(
        &self,
        path: &str,
        method: HttpMethod,
        item: &DereferencedPathItem,
        operation: &DereferencedOperation,
    ) -> ResolvedEndpoint {
        // Presence decides, so an explicitly empty list still overrides
        let servers = operation
            .servers
            .as_ref()
            .or(item.servers.as_ref())
            .unwrap_or(&self.servers)
            .clone();
        let security = operation
            .security
            .as_ref()
            .unwrap_or(&self.security)
            .clone();

        ResolvedEndpoint {
            path: path.to_string(),
            method,
            route_summary: item.summary.clone(),
            route_description: item.description.clone(),
            summary: operation.summary.clone(),
            description: operation.description.clone(),
            operation_id: operation.operation_id.clone(),
            tags: operation.tags.clone(),
            external_docs: operation.external_docs.clone(),
            deprecated: operation.deprecated,
            parameters: merge_parameters(&operation.parameters, &item.parameters),
            servers,
            security,
            request_body: operation.request_body.clone(),
            responses: operation.responses.clone(),
            callbacks: operation.callbacks.clone(),
        }
    }
}

/// Union of both levels keyed by (name, location); the operation wins
fn merge_parameters(
    operation: &[DereferencedParameter],
    route: &[DereferencedParameter],
) -> Vec<DereferencedParameter> {
    let mut merged: OrderedMap<ParameterIdentity, DereferencedParameter> = operation
        .iter()
        .map(|parameter| (parameter.identity(), parameter.clone()))
        .collect();
    for parameter in route {
        let identity = parameter.identity();
        if !merged.contains_key(&identity) {
            merged.insert(identity, parameter.clone());
        }
    }
    merged.into_iter().map(|(_, parameter)| parameter).collect()
}

impl Document {
    /// Dereference, then resolve every route
    pub fn resolved(&self) -> ReferenceResult<ResolvedDocument> {
        Ok(self.locally_dereferenced()?.resolved())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(paths: serde_json::Value) -> Document {
        serde_json::from_value(json!({
            "openapi": "3.0.3",
            "info": {"title": "Inheritance", "version": "1"},
            "servers": [{"url": "https://a.example.com"}],
            "security": [{"token": []}],
            "paths": paths,
            "components": {
                "schemas": {
                    "Uuid": {"type": "string", "format": "uuid"}
                },
                "parameters": {
                    "Filter": {"name": "filter", "in": "query"}
                },
                "securitySchemes": {
                    "token": {"type": "http", "scheme": "bearer"}
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_operation_parameter_overrides_route_parameter() {
        let resolved = document(json!({
            "/items/{id}": {
                "parameters": [
                    {"name": "id", "in": "path", "required": true, "schema": {"type": "integer"}}
                ],
                "get": {
                    "parameters": [
                        {"$ref": "#/components/parameters/Filter"},
                        {"name": "id", "in": "path", "required": true,
                         "schema": {"$ref": "#/components/schemas/Uuid"}}
                    ],
                    "responses": {"200": {"description": "ok"}}
                }
            }
        }))
        .resolved()
        .unwrap();

        let endpoint = resolved.endpoint("/items/{id}", HttpMethod::Get).unwrap();
        let names: Vec<_> = endpoint.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["filter", "id"]);

        let id = &endpoint.parameters[1];
        assert_eq!(id.schema.as_ref().unwrap().format.as_deref(), Some("uuid"));
        assert_eq!(endpoint.required_parameters().count(), 1);
        assert_eq!(endpoint.parameters_in(ParameterLocation::Query).count(), 1);
    }

    #[test]
    fn test_route_parameters_follow_operation_parameters() {
        let resolved = document(json!({
            "/items/{id}": {
                "parameters": [
                    {"name": "id", "in": "path", "required": true},
                    {"name": "id", "in": "header"}
                ],
                "delete": {
                    "parameters": [{"name": "force", "in": "query"}],
                    "responses": {"204": {"description": "gone"}}
                }
            }
        }))
        .resolved()
        .unwrap();

        let endpoint = resolved.endpoint("/items/{id}", HttpMethod::Delete).unwrap();
        let identities: Vec<_> = endpoint
            .parameters
            .iter()
            .map(|p| (p.name.as_str(), p.location))
            .collect();
        assert_eq!(
            identities,
            vec![
                ("force", ParameterLocation::Query),
                ("id", ParameterLocation::Path),
                ("id", ParameterLocation::Header),
            ]
        );
    }

    #[test]
    fn test_server_override_presence_not_emptiness() {
        let resolved = document(json!({
            "/inherit": {
                "servers": [{"url": "https://b.example.com"}],
                "get": {"responses": {"200": {"description": "ok"}}},
                "post": {"servers": [], "responses": {"200": {"description": "ok"}}}
            },
            "/default": {
                "get": {"responses": {"200": {"description": "ok"}}}
            }
        }))
        .resolved()
        .unwrap();

        let get = resolved.endpoint("/inherit", HttpMethod::Get).unwrap();
        assert_eq!(get.servers, vec![Server::new("https://b.example.com")]);

        let post = resolved.endpoint("/inherit", HttpMethod::Post).unwrap();
        assert!(post.servers.is_empty());

        let fallback = resolved.endpoint("/default", HttpMethod::Get).unwrap();
        assert_eq!(fallback.servers, vec![Server::new("https://a.example.com")]);

        let urls: Vec<_> = resolved.all_servers().iter().map(|s| s.url.as_str()).collect();
        assert_eq!(urls, vec!["https://b.example.com", "https://a.example.com"]);
    }

    #[test]
    fn test_explicitly_empty_security_disables_document_security() {
        let resolved = document(json!({
            "/health": {
                "get": {"security": [], "responses": {"200": {"description": "ok"}}}
            },
            "/private": {
                "get": {"responses": {"200": {"description": "ok"}}}
            }
        }))
        .resolved()
        .unwrap();

        let health = resolved.endpoint("/health", HttpMethod::Get).unwrap();
        assert!(health.security.is_empty());
        assert!(health.allows_anonymous());

        let private = resolved.endpoint("/private", HttpMethod::Get).unwrap();
        assert_eq!(private.security.len(), 1);
        assert!(private.security[0].contains_key("token"));
        assert!(!private.allows_anonymous());
    }

    #[test]
    fn test_operation_fields_pass_through() {
        let resolved = document(json!({
            "/pets": {
                "summary": "Pets",
                "get": {
                    "operationId": "listPets",
                    "summary": "List pets",
                    "tags": ["pets"],
                    "deprecated": true,
                    "responses": {"200": {"description": "ok"}}
                },
                "put": {
                    "tags": ["pets", "admin"],
                    "responses": {"200": {"description": "ok"}}
                }
            }
        }))
        .resolved()
        .unwrap();

        let route = resolved.route("/pets").unwrap();
        assert_eq!(route.methods().collect::<Vec<_>>(), vec![HttpMethod::Get, HttpMethod::Put]);

        let get = route.endpoint(HttpMethod::Get).unwrap();
        assert_eq!(get.route_summary.as_deref(), Some("Pets"));
        assert_eq!(get.summary.as_deref(), Some("List pets"));
        assert!(get.deprecated);
        assert_eq!(get.endpoint_id(), "listPets");
        assert_eq!(get.responses.get("200").unwrap().description, "ok");

        let put = route.endpoint(HttpMethod::Put).unwrap();
        assert_eq!(put.endpoint_id(), "put_pets");
        assert_eq!(resolved.all_tags(), vec!["pets", "admin"]);
        assert_eq!(resolved.endpoints().count(), 2);
    }
}
