//! Dereferenced mirrors of the reference-bearing document objects
//!
//! These types are `#[non_exhaustive]`: they are produced by dereferencing a
//! document and cannot be assembled by hand outside this crate.

use super::{Annotated, LocallyDereferenceable, VisitedSet};
use crate::component_key::ComponentKey;
use crate::components::Components;
use crate::error::ReferenceResult;
use crate::ordered_map::OrderedMap;
use crate::reference::Reference;
use crate::schema::{AdditionalProperties, JsonSchema};
use crate::security::{SecurityRequirement, SecurityScheme};
use crate::types::{
    Callbacks, Encoding, Example, Extensions, ExternalDocs, Header, HttpMethod, Link, MediaType,
    Operation, Parameter, ParameterIdentity, ParameterLocation, PathItem, RequestBody, Response,
    Server,
};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct DereferencedSchema {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(skip_serializing_if = "OrderedMap::is_empty")]
    pub properties: OrderedMap<String, DereferencedSchema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<DereferencedSchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<DereferencedAdditionalProperties>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<DereferencedSchema>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<DereferencedSchema>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub any_of: Vec<DereferencedSchema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<DereferencedSchema>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub prefix_items: Vec<DereferencedSchema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_items: Option<DereferencedAdditionalProperties>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unevaluated_items: Option<DereferencedAdditionalProperties>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contains: Option<Box<DereferencedSchema>>,
    #[serde(skip_serializing_if = "OrderedMap::is_empty")]
    pub pattern_properties: OrderedMap<String, DereferencedSchema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unevaluated_properties: Option<DereferencedAdditionalProperties>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_names: Option<Box<DereferencedSchema>>,
    #[serde(skip_serializing_if = "OrderedMap::is_empty")]
    pub dependent_schemas: OrderedMap<String, DereferencedSchema>,
    #[serde(rename = "if", skip_serializing_if = "Option::is_none")]
    pub if_schema: Option<Box<DereferencedSchema>>,
    #[serde(rename = "then", skip_serializing_if = "Option::is_none")]
    pub then_schema: Option<Box<DereferencedSchema>>,
    #[serde(rename = "else", skip_serializing_if = "Option::is_none")]
    pub else_schema: Option<Box<DereferencedSchema>>,
    #[serde(rename = "$defs", skip_serializing_if = "OrderedMap::is_empty")]
    pub defs: OrderedMap<String, DereferencedSchema>,
    #[serde(flatten)]
    pub keywords: OrderedMap<String, serde_json::Value>,
    #[serde(rename = "x-component-name", skip_serializing_if = "Option::is_none")]
    pub component_name: Option<ComponentKey>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DereferencedAdditionalProperties {
    Allowed(bool),
    Schema(Box<DereferencedSchema>),
}

impl LocallyDereferenceable for JsonSchema {
    type Output = DereferencedSchema;

    fn dereferenced_in(
        &self,
        components: &Components,
        visited: &VisitedSet,
        name: Option<&ComponentKey>,
    ) -> ReferenceResult<Self::Output> {
        Ok(DereferencedSchema {
            schema_type: self.schema_type.clone(),
            format: self.format.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            required: self.required.clone(),
            properties: self.properties.dereferenced_in(components, visited, None)?,
            items: self.items.dereferenced_in(components, visited, None)?,
            additional_properties: self
                .additional_properties
                .dereferenced_in(components, visited, None)?,
            all_of: self.all_of.dereferenced_in(components, visited, None)?,
            one_of: self.one_of.dereferenced_in(components, visited, None)?,
            any_of: self.any_of.dereferenced_in(components, visited, None)?,
            not: self.not.dereferenced_in(components, visited, None)?,
            prefix_items: self.prefix_items.dereferenced_in(components, visited, None)?,
            additional_items: self.additional_items.dereferenced_in(components, visited, None)?,
            unevaluated_items: self
                .unevaluated_items
                .dereferenced_in(components, visited, None)?,
            contains: self.contains.dereferenced_in(components, visited, None)?,
            pattern_properties: self
                .pattern_properties
                .dereferenced_in(components, visited, None)?,
            unevaluated_properties: self
                .unevaluated_properties
                .dereferenced_in(components, visited, None)?,
            property_names: self.property_names.dereferenced_in(components, visited, None)?,
            dependent_schemas: self
                .dependent_schemas
                .dereferenced_in(components, visited, None)?,
            if_schema: self.if_schema.dereferenced_in(components, visited, None)?,
            then_schema: self.then_schema.dereferenced_in(components, visited, None)?,
            else_schema: self.else_schema.dereferenced_in(components, visited, None)?,
            defs: self.defs.dereferenced_in(components, visited, None)?,
            keywords: self.keywords.clone(),
            component_name: name.cloned(),
        })
    }
}

impl LocallyDereferenceable for AdditionalProperties {
    type Output = DereferencedAdditionalProperties;

    fn dereferenced_in(
        &self,
        components: &Components,
        visited: &VisitedSet,
        _name: Option<&ComponentKey>,
    ) -> ReferenceResult<Self::Output> {
        Ok(match self {
            AdditionalProperties::Allowed(allowed) => {
                DereferencedAdditionalProperties::Allowed(*allowed)
            }
            AdditionalProperties::Schema(schema) => DereferencedAdditionalProperties::Schema(
                schema.dereferenced_in(components, visited, None)?,
            ),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct DereferencedParameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub allow_empty_value: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<DereferencedSchema>,
    #[serde(skip_serializing_if = "OrderedMap::is_empty")]
    pub content: OrderedMap<String, DereferencedMediaType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "OrderedMap::is_empty")]
    pub examples: OrderedMap<String, Annotated<Example>>,
    #[serde(rename = "x-component-name", skip_serializing_if = "Option::is_none")]
    pub component_name: Option<ComponentKey>,
}

impl DereferencedParameter {
    pub fn identity(&self) -> ParameterIdentity {
        ParameterIdentity::new(self.name.clone(), self.location)
    }
}

impl LocallyDereferenceable for Parameter {
    type Output = DereferencedParameter;

    fn dereferenced_in(
        &self,
        components: &Components,
        visited: &VisitedSet,
        name: Option<&ComponentKey>,
    ) -> ReferenceResult<Self::Output> {
        Ok(DereferencedParameter {
            name: self.name.clone(),
            location: self.location,
            description: self.description.clone(),
            required: self.required,
            deprecated: self.deprecated,
            allow_empty_value: self.allow_empty_value,
            style: self.style.clone(),
            explode: self.explode,
            schema: self.schema.dereferenced_in(components, visited, None)?,
            content: self.content.dereferenced_in(components, visited, None)?,
            example: self.example.clone(),
            examples: self.examples.dereferenced_in(components, visited, None)?,
            component_name: name.cloned(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct DereferencedMediaType {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<DereferencedSchema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "OrderedMap::is_empty")]
    pub examples: OrderedMap<String, Annotated<Example>>,
    #[serde(skip_serializing_if = "OrderedMap::is_empty")]
    pub encoding: OrderedMap<String, DereferencedEncoding>,
}

impl LocallyDereferenceable for MediaType {
    type Output = DereferencedMediaType;

    fn dereferenced_in(
        &self,
        components: &Components,
        visited: &VisitedSet,
        _name: Option<&ComponentKey>,
    ) -> ReferenceResult<Self::Output> {
        Ok(DereferencedMediaType {
            schema: self.schema.dereferenced_in(components, visited, None)?,
            example: self.example.clone(),
            examples: self.examples.dereferenced_in(components, visited, None)?,
            encoding: self.encoding.dereferenced_in(components, visited, None)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct DereferencedEncoding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "OrderedMap::is_empty")]
    pub headers: OrderedMap<String, DereferencedHeader>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explode: Option<bool>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub allow_reserved: bool,
}

impl LocallyDereferenceable for Encoding {
    type Output = DereferencedEncoding;

    fn dereferenced_in(
        &self,
        components: &Components,
        visited: &VisitedSet,
        _name: Option<&ComponentKey>,
    ) -> ReferenceResult<Self::Output> {
        Ok(DereferencedEncoding {
            content_type: self.content_type.clone(),
            headers: self.headers.dereferenced_in(components, visited, None)?,
            style: self.style.clone(),
            explode: self.explode,
            allow_reserved: self.allow_reserved,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct DereferencedRequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub content: OrderedMap<String, DereferencedMediaType>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(rename = "x-component-name", skip_serializing_if = "Option::is_none")]
    pub component_name: Option<ComponentKey>,
}

impl LocallyDereferenceable for RequestBody {
    type Output = DereferencedRequestBody;

    fn dereferenced_in(
        &self,
        components: &Components,
        visited: &VisitedSet,
        name: Option<&ComponentKey>,
    ) -> ReferenceResult<Self::Output> {
        Ok(DereferencedRequestBody {
            description: self.description.clone(),
            content: self.content.dereferenced_in(components, visited, None)?,
            required: self.required,
            component_name: name.cloned(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct DereferencedResponse {
    pub description: String,
    #[serde(skip_serializing_if = "OrderedMap::is_empty")]
    pub headers: OrderedMap<String, DereferencedHeader>,
    #[serde(skip_serializing_if = "OrderedMap::is_empty")]
    pub content: OrderedMap<String, DereferencedMediaType>,
    #[serde(skip_serializing_if = "OrderedMap::is_empty")]
    pub links: OrderedMap<String, Annotated<Link>>,
    #[serde(rename = "x-component-name", skip_serializing_if = "Option::is_none")]
    pub component_name: Option<ComponentKey>,
}

impl LocallyDereferenceable for Response {
    type Output = DereferencedResponse;

    fn dereferenced_in(
        &self,
        components: &Components,
        visited: &VisitedSet,
        name: Option<&ComponentKey>,
    ) -> ReferenceResult<Self::Output> {
        Ok(DereferencedResponse {
            description: self.description.clone(),
            headers: self.headers.dereferenced_in(components, visited, None)?,
            content: self.content.dereferenced_in(components, visited, None)?,
            links: self.links.dereferenced_in(components, visited, None)?,
            component_name: name.cloned(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct DereferencedHeader {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<DereferencedSchema>,
    #[serde(skip_serializing_if = "OrderedMap::is_empty")]
    pub content: OrderedMap<String, DereferencedMediaType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "OrderedMap::is_empty")]
    pub examples: OrderedMap<String, Annotated<Example>>,
    #[serde(rename = "x-component-name", skip_serializing_if = "Option::is_none")]
    pub component_name: Option<ComponentKey>,
}

impl LocallyDereferenceable for Header {
    type Output = DereferencedHeader;

    fn dereferenced_in(
        &self,
        components: &Components,
        visited: &VisitedSet,
        name: Option<&ComponentKey>,
    ) -> ReferenceResult<Self::Output> {
        Ok(DereferencedHeader {
            description: self.description.clone(),
            required: self.required,
            deprecated: self.deprecated,
            schema: self.schema.dereferenced_in(components, visited, None)?,
            content: self.content.dereferenced_in(components, visited, None)?,
            example: self.example.clone(),
            examples: self.examples.dereferenced_in(components, visited, None)?,
            component_name: name.cloned(),
        })
    }
}

/// A security scheme together with the scopes a requirement asks for
#[derive(Debug, Clone, PartialEq, Serialize)]
#[non_exhaustive]
pub struct ScopedScheme {
    pub scheme: Annotated<SecurityScheme>,
    pub scopes: Vec<String>,
}

/// Security requirement with every scheme name resolved
pub type DereferencedSecurityRequirement = OrderedMap<ComponentKey, ScopedScheme>;

/// Resolve the scheme names of a requirement against `securitySchemes`
pub fn dereference_security_requirement(
    requirement: &SecurityRequirement,
    components: &Components,
    visited: &VisitedSet,
) -> ReferenceResult<DereferencedSecurityRequirement> {
    requirement.try_map_values(|name, scopes| {
        let scheme = Reference::<SecurityScheme>::component(name.clone())
            .dereferenced_in(components, visited, None)?;
        Ok(ScopedScheme {
            scheme,
            scopes: scopes.clone(),
        })
    })
}

pub(crate) fn dereference_security(
    requirements: &[SecurityRequirement],
    components: &Components,
    visited: &VisitedSet,
) -> ReferenceResult<Vec<DereferencedSecurityRequirement>> {
    requirements
        .iter()
        .map(|requirement| dereference_security_requirement(requirement, components, visited))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[non_exhaustive]
pub struct DereferencedCallbacks {
    #[serde(flatten)]
    pub expressions: OrderedMap<String, DereferencedPathItem>,
    #[serde(rename = "x-component-name", skip_serializing_if = "Option::is_none")]
    pub component_name: Option<ComponentKey>,
}

impl LocallyDereferenceable for Callbacks {
    type Output = DereferencedCallbacks;

    fn dereferenced_in(
        &self,
        components: &Components,
        visited: &VisitedSet,
        name: Option<&ComponentKey>,
    ) -> ReferenceResult<Self::Output> {
        Ok(DereferencedCallbacks {
            expressions: self.0.dereferenced_in(components, visited, None)?,
            component_name: name.cloned(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct DereferencedOperation {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_docs: Option<ExternalDocs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<DereferencedParameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<DereferencedRequestBody>,
    pub responses: OrderedMap<String, DereferencedResponse>,
    #[serde(skip_serializing_if = "OrderedMap::is_empty")]
    pub callbacks: OrderedMap<String, DereferencedCallbacks>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<Vec<DereferencedSecurityRequirement>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servers: Option<Vec<Server>>,
    #[serde(flatten)]
    pub extensions: Extensions,
}

impl LocallyDereferenceable for Operation {
    type Output = DereferencedOperation;

    fn dereferenced_in(
        &self,
        components: &Components,
        visited: &VisitedSet,
        _name: Option<&ComponentKey>,
    ) -> ReferenceResult<Self::Output> {
        let security = self
            .security
            .as_deref()
            .map(|requirements| dereference_security(requirements, components, visited))
            .transpose()?;

        Ok(DereferencedOperation {
            tags: self.tags.clone(),
            summary: self.summary.clone(),
            description: self.description.clone(),
            external_docs: self.external_docs.clone(),
            operation_id: self.operation_id.clone(),
            parameters: self.parameters.dereferenced_in(components, visited, None)?,
            request_body: self.request_body.dereferenced_in(components, visited, None)?,
            responses: self.responses.dereferenced_in(components, visited, None)?,
            callbacks: self.callbacks.dereferenced_in(components, visited, None)?,
            deprecated: self.deprecated,
            security,
            servers: self.servers.clone(),
            extensions: self.extensions.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct DereferencedPathItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servers: Option<Vec<Server>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<DereferencedParameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<DereferencedOperation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<DereferencedOperation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<DereferencedOperation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<DereferencedOperation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<DereferencedOperation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<DereferencedOperation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<DereferencedOperation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<DereferencedOperation>,
    #[serde(flatten)]
    pub extensions: Extensions,
    #[serde(rename = "x-component-name", skip_serializing_if = "Option::is_none")]
    pub component_name: Option<ComponentKey>,
}

impl DereferencedPathItem {
    pub fn operation(&self, method: HttpMethod) -> Option<&DereferencedOperation> {
        match method {
            HttpMethod::Get => self.get.as_ref(),
            HttpMethod::Put => self.put.as_ref(),
            HttpMethod::Post => self.post.as_ref(),
            HttpMethod::Delete => self.delete.as_ref(),
            HttpMethod::Options => self.options.as_ref(),
            HttpMethod::Head => self.head.as_ref(),
            HttpMethod::Patch => self.patch.as_ref(),
            HttpMethod::Trace => self.trace.as_ref(),
        }
    }

    pub fn endpoints(&self) -> impl Iterator<Item = (HttpMethod, &DereferencedOperation)> {
        HttpMethod::ALL
            .into_iter()
            .filter_map(|method| self.operation(method).map(|op| (method, op)))
    }
}

impl LocallyDereferenceable for PathItem {
    type Output = DereferencedPathItem;

    fn dereferenced_in(
        &self,
        components: &Components,
        visited: &VisitedSet,
        name: Option<&ComponentKey>,
    ) -> ReferenceResult<Self::Output> {
        Ok(DereferencedPathItem {
            summary: self.summary.clone(),
            description: self.description.clone(),
            servers: self.servers.clone(),
            parameters: self.parameters.dereferenced_in(components, visited, None)?,
            get: self.get.dereferenced_in(components, visited, None)?,
            put: self.put.dereferenced_in(components, visited, None)?,
            post: self.post.dereferenced_in(components, visited, None)?,
            delete: self.delete.dereferenced_in(components, visited, None)?,
            options: self.options.dereferenced_in(components, visited, None)?,
            head: self.head.dereferenced_in(components, visited, None)?,
            patch: self.patch.dereferenced_in(components, visited, None)?,
            trace: self.trace.dereferenced_in(components, visited, None)?,
            extensions: self.extensions.clone(),
            component_name: name.cloned(),
        })
    }
}
