//! Splicing external references into a document's own components
//!
//! Every external `$ref` is fetched through an [`ExternalLoader`], stored as a
//! component under the name the loader picks, and replaced by an internal
//! reference to that component. Internal references inside a fetched
//! document are relative to that document and are followed the same way.
//!
//! Sequences and maps load their elements concurrently, one task per
//! element. The first failure aborts the remaining siblings.

use crate::error::{LoadError, LoadResult};
use crate::loader::{ExternalLoader, LoaderMessage};
use crate::settings::LoaderSettings;
use async_trait::async_trait;
use openapi_model::{
    AdditionalProperties, Callbacks, ComponentType, Components, Document, Either, Encoding,
    Example, Header, JsonSchema, Link, MediaType, MergePolicy, Operation, OrderedMap, Parameter,
    PathItem, Reference, RequestBody, Response, SecurityScheme,
};
use serde::de::DeserializeOwned;
use std::hash::Hash;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use url::Url;

/// A node together with the components and diagnostics its loading produced
#[derive(Debug, Clone)]
pub struct Loaded<T> {
    pub value: T,
    pub components: Components,
    pub messages: Vec<LoaderMessage>,
}

impl<T> Loaded<T> {
    /// A node that needed no loading
    pub fn unchanged(value: T) -> Self {
        Self {
            value,
            components: Components::new(),
            messages: Vec::new(),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Loaded<U> {
        Loaded {
            value: f(self.value),
            components: self.components,
            messages: self.messages,
        }
    }
}

/// State shared by one branch of an external dereference
#[derive(Clone)]
pub struct LoadContext {
    loader: Arc<dyn ExternalLoader>,
    policy: MergePolicy,
    base: Option<Url>,
    /// The fetched document the current node came from
    document: Option<Url>,
    /// Locators entered between the root and the current node
    trail: Vec<Url>,
}

impl LoadContext {
    pub fn new(loader: Arc<dyn ExternalLoader>, policy: MergePolicy, base: Option<Url>) -> Self {
        Self {
            loader,
            policy,
            base,
            document: None,
            trail: Vec::new(),
        }
    }

    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    /// Absolute locator for a reference found at the current node
    ///
    /// `None` for internal references of the root document, which stay as
    /// they are.
    fn locate<T>(&self, reference: &Reference<T>) -> LoadResult<Option<Url>> {
        let raw = reference.to_string();
        let relative_to = if reference.is_internal() {
            match &self.document {
                Some(document) => document,
                None => return Ok(None),
            }
        } else {
            match self.document.as_ref().or(self.base.as_ref()) {
                Some(base) => base,
                None => {
                    return Url::parse(&raw)
                        .map(Some)
                        .map_err(|_| LoadError::InvalidLocator(raw));
                }
            }
        };
        relative_to
            .join(&raw)
            .map(Some)
            .map_err(|_| LoadError::InvalidLocator(raw))
    }

    /// Context for the contents of the node at `locator`
    fn entering(&self, locator: &Url) -> LoadResult<LoadContext> {
        if let Some(start) = self.trail.iter().position(|entry| entry == locator) {
            let mut path: Vec<String> = self.trail[start..].iter().map(Url::to_string).collect();
            path.push(locator.to_string());
            return Err(LoadError::Cycle { path });
        }

        let mut next = self.clone();
        next.document = Some(crate::loader::document_locator(locator));
        next.trail.push(locator.clone());
        Ok(next)
    }

    fn collector(&self) -> Collector {
        Collector {
            components: Components::new(),
            messages: Vec::new(),
            policy: self.policy,
        }
    }
}

/// Accumulates what child nodes discovered while a parent is rebuilt
struct Collector {
    components: Components,
    messages: Vec<LoaderMessage>,
    policy: MergePolicy,
}

impl Collector {
    fn take<T>(&mut self, loaded: Loaded<T>) -> LoadResult<T> {
        self.components.merge(loaded.components, self.policy)?;
        self.messages.extend(loaded.messages);
        Ok(loaded.value)
    }

    fn finish<T>(self, value: T) -> Loaded<T> {
        Loaded {
            value,
            components: self.components,
            messages: self.messages,
        }
    }
}

/// Nodes whose external references can be loaded into components
#[async_trait]
pub trait ExternallyDereferenceable: Sized + Send + 'static {
    async fn externally_dereferenced(self, context: &LoadContext) -> LoadResult<Loaded<Self>>;
}

#[async_trait]
impl<T> ExternallyDereferenceable for Reference<T>
where
    T: ComponentType + ExternallyDereferenceable + DeserializeOwned,
{
    async fn externally_dereferenced(self, context: &LoadContext) -> LoadResult<Loaded<Self>> {
        let locator = match context.locate(&self)? {
            Some(locator) => locator,
            None => return Ok(Loaded::unchanged(self)),
        };
        let inner = context.entering(&locator)?;

        info!("Loading external {} from {}", T::KIND, locator);
        let (raw, messages) = context.loader.load(&locator).await?;
        for message in &messages {
            warn!("{}", message);
        }
        let node: Either<T> = serde_json::from_value(raw)?;
        let key = context.loader.component_key(T::KIND, &locator)?;

        let loaded = node.externally_dereferenced(&inner).await?;
        let mut collector = context.collector();
        collector.messages.extend(messages);
        let node = collector.take(loaded)?;

        let mut discovered = Components::new();
        discovered.insert::<T>(key.clone(), node);
        collector.components.merge(discovered, context.policy)?;
        debug!("Stored {} as {}/{}", locator, T::KIND, key);

        let mut replacement = Reference::<T>::component(key);
        replacement.summary = self.summary;
        replacement.description = self.description;
        Ok(collector.finish(replacement))
    }
}

#[async_trait]
impl<T> ExternallyDereferenceable for Either<T>
where
    T: ComponentType + ExternallyDereferenceable + DeserializeOwned,
{
    async fn externally_dereferenced(self, context: &LoadContext) -> LoadResult<Loaded<Self>> {
        match self {
            Either::Value(value) => Ok(value
                .externally_dereferenced(context)
                .await?
                .map(Either::Value)),
            Either::Reference(reference) => Ok(reference
                .externally_dereferenced(context)
                .await?
                .map(Either::Reference)),
        }
    }
}

#[async_trait]
impl<T: ExternallyDereferenceable> ExternallyDereferenceable for Option<T> {
    async fn externally_dereferenced(self, context: &LoadContext) -> LoadResult<Loaded<Self>> {
        match self {
            Some(value) => Ok(value.externally_dereferenced(context).await?.map(Some)),
            None => Ok(Loaded::unchanged(None)),
        }
    }
}

#[async_trait]
impl<T: ExternallyDereferenceable> ExternallyDereferenceable for Box<T> {
    async fn externally_dereferenced(self, context: &LoadContext) -> LoadResult<Loaded<Self>> {
        Ok((*self).externally_dereferenced(context).await?.map(Box::new))
    }
}

#[async_trait]
impl<T: ExternallyDereferenceable> ExternallyDereferenceable for Vec<T> {
    async fn externally_dereferenced(self, context: &LoadContext) -> LoadResult<Loaded<Self>> {
        fan_out(self, context).await
    }
}

#[async_trait]
impl<K, V> ExternallyDereferenceable for OrderedMap<K, V>
where
    K: Hash + Eq + Send + 'static,
    V: ExternallyDereferenceable,
{
    async fn externally_dereferenced(self, context: &LoadContext) -> LoadResult<Loaded<Self>> {
        let (keys, values): (Vec<K>, Vec<V>) = self.into_iter().unzip();
        let loaded = fan_out(values, context).await?;
        Ok(loaded.map(|values| keys.into_iter().zip(values).collect()))
    }
}

/// Load every element on its own task and reassemble them in order
///
/// Components are merged in element order regardless of completion order.
/// Dropping the task set aborts whatever is still running, so a failure
/// also cancels the loads nested below the aborted siblings.
async fn fan_out<T: ExternallyDereferenceable>(
    items: Vec<T>,
    context: &LoadContext,
) -> LoadResult<Loaded<Vec<T>>> {
    if items.is_empty() {
        return Ok(Loaded::unchanged(items));
    }

    let count = items.len();
    let mut tasks = JoinSet::new();
    for (index, item) in items.into_iter().enumerate() {
        let context = context.clone();
        tasks.spawn(async move { (index, item.externally_dereferenced(&context).await) });
    }

    let mut finished = Vec::with_capacity(count);
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, Ok(loaded))) => finished.push((index, loaded)),
            Ok((_, Err(err))) => {
                debug!("Aborting {} sibling loads after failure", tasks.len());
                return Err(err);
            }
            Err(err) => {
                debug!("Aborting {} sibling loads after failure", tasks.len());
                return Err(LoadError::from(err));
            }
        }
    }

    finished.sort_by_key(|(index, _)| *index);
    let mut collector = context.collector();
    let mut values = Vec::with_capacity(count);
    for (_, loaded) in finished {
        values.push(collector.take(loaded)?);
    }
    Ok(collector.finish(values))
}

/// Leaf components with nothing to load below them
macro_rules! no_external_children {
    ($($ty:ty),* $(,)?) => {
        $(
            #[async_trait]
            impl ExternallyDereferenceable for $ty {
                async fn externally_dereferenced(
                    self,
                    _context: &LoadContext,
                ) -> LoadResult<Loaded<Self>> {
                    Ok(Loaded::unchanged(self))
                }
            }
        )*
    };
}

no_external_children!(Example, Link, SecurityScheme);

#[async_trait]
impl ExternallyDereferenceable for JsonSchema {
    async fn externally_dereferenced(mut self, context: &LoadContext) -> LoadResult<Loaded<Self>> {
        let mut collector = context.collector();
        self.properties = collector.take(self.properties.externally_dereferenced(context).await?)?;
        self.items = collector.take(self.items.externally_dereferenced(context).await?)?;
        self.additional_properties =
            collector.take(self.additional_properties.externally_dereferenced(context).await?)?;
        self.all_of = collector.take(self.all_of.externally_dereferenced(context).await?)?;
        self.one_of = collector.take(self.one_of.externally_dereferenced(context).await?)?;
        self.any_of = collector.take(self.any_of.externally_dereferenced(context).await?)?;
        self.not = collector.take(self.not.externally_dereferenced(context).await?)?;
        self.prefix_items =
            collector.take(self.prefix_items.externally_dereferenced(context).await?)?;
        self.additional_items =
            collector.take(self.additional_items.externally_dereferenced(context).await?)?;
        self.unevaluated_items =
            collector.take(self.unevaluated_items.externally_dereferenced(context).await?)?;
        self.contains = collector.take(self.contains.externally_dereferenced(context).await?)?;
        self.pattern_properties =
            collector.take(self.pattern_properties.externally_dereferenced(context).await?)?;
        self.unevaluated_properties =
            collector.take(self.unevaluated_properties.externally_dereferenced(context).await?)?;
        self.property_names =
            collector.take(self.property_names.externally_dereferenced(context).await?)?;
        self.dependent_schemas =
            collector.take(self.dependent_schemas.externally_dereferenced(context).await?)?;
        self.if_schema = collector.take(self.if_schema.externally_dereferenced(context).await?)?;
        self.then_schema =
            collector.take(self.then_schema.externally_dereferenced(context).await?)?;
        self.else_schema =
            collector.take(self.else_schema.externally_dereferenced(context).await?)?;
        self.defs = collector.take(self.defs.externally_dereferenced(context).await?)?;
        Ok(collector.finish(self))
    }
}

#[async_trait]
impl ExternallyDereferenceable for AdditionalProperties {
    async fn externally_dereferenced(self, context: &LoadContext) -> LoadResult<Loaded<Self>> {
        match self {
            AdditionalProperties::Allowed(allowed) => {
                Ok(Loaded::unchanged(AdditionalProperties::Allowed(allowed)))
            }
            AdditionalProperties::Schema(schema) => Ok(schema
                .externally_dereferenced(context)
                .await?
                .map(AdditionalProperties::Schema)),
        }
    }
}

#[async_trait]
impl ExternallyDereferenceable for Parameter {
    async fn externally_dereferenced(mut self, context: &LoadContext) -> LoadResult<Loaded<Self>> {
        let mut collector = context.collector();
        self.schema = collector.take(self.schema.externally_dereferenced(context).await?)?;
        self.content = collector.take(self.content.externally_dereferenced(context).await?)?;
        self.examples = collector.take(self.examples.externally_dereferenced(context).await?)?;
        Ok(collector.finish(self))
    }
}

#[async_trait]
impl ExternallyDereferenceable for MediaType {
    async fn externally_dereferenced(mut self, context: &LoadContext) -> LoadResult<Loaded<Self>> {
        let mut collector = context.collector();
        self.schema = collector.take(self.schema.externally_dereferenced(context).await?)?;
        self.examples = collector.take(self.examples.externally_dereferenced(context).await?)?;
        self.encoding = collector.take(self.encoding.externally_dereferenced(context).await?)?;
        Ok(collector.finish(self))
    }
}

#[async_trait]
impl ExternallyDereferenceable for Encoding {
    async fn externally_dereferenced(mut self, context: &LoadContext) -> LoadResult<Loaded<Self>> {
        let mut collector = context.collector();
        self.headers = collector.take(self.headers.externally_dereferenced(context).await?)?;
        Ok(collector.finish(self))
    }
}

#[async_trait]
impl ExternallyDereferenceable for RequestBody {
    async fn externally_dereferenced(mut self, context: &LoadContext) -> LoadResult<Loaded<Self>> {
        let mut collector = context.collector();
        self.content = collector.take(self.content.externally_dereferenced(context).await?)?;
        Ok(collector.finish(self))
    }
}

#[async_trait]
impl ExternallyDereferenceable for Response {
    async fn externally_dereferenced(mut self, context: &LoadContext) -> LoadResult<Loaded<Self>> {
        let mut collector = context.collector();
        self.headers = collector.take(self.headers.externally_dereferenced(context).await?)?;
        self.content = collector.take(self.content.externally_dereferenced(context).await?)?;
        self.links = collector.take(self.links.externally_dereferenced(context).await?)?;
        Ok(collector.finish(self))
    }
}

#[async_trait]
impl ExternallyDereferenceable for Header {
    async fn externally_dereferenced(mut self, context: &LoadContext) -> LoadResult<Loaded<Self>> {
        let mut collector = context.collector();
        self.schema = collector.take(self.schema.externally_dereferenced(context).await?)?;
        self.content = collector.take(self.content.externally_dereferenced(context).await?)?;
        self.examples = collector.take(self.examples.externally_dereferenced(context).await?)?;
        Ok(collector.finish(self))
    }
}

#[async_trait]
impl ExternallyDereferenceable for Callbacks {
    async fn externally_dereferenced(self, context: &LoadContext) -> LoadResult<Loaded<Self>> {
        Ok(self.0.externally_dereferenced(context).await?.map(Callbacks))
    }
}

#[async_trait]
impl ExternallyDereferenceable for Operation {
    async fn externally_dereferenced(mut self, context: &LoadContext) -> LoadResult<Loaded<Self>> {
        let mut collector = context.collector();
        self.parameters = collector.take(self.parameters.externally_dereferenced(context).await?)?;
        self.request_body =
            collector.take(self.request_body.externally_dereferenced(context).await?)?;
        self.responses = collector.take(self.responses.externally_dereferenced(context).await?)?;
        self.callbacks = collector.take(self.callbacks.externally_dereferenced(context).await?)?;
        Ok(collector.finish(self))
    }
}

#[async_trait]
impl ExternallyDereferenceable for PathItem {
    async fn externally_dereferenced(mut self, context: &LoadContext) -> LoadResult<Loaded<Self>> {
        let mut collector = context.collector();
        self.parameters = collector.take(self.parameters.externally_dereferenced(context).await?)?;
        self.get = collector.take(self.get.externally_dereferenced(context).await?)?;
        self.put = collector.take(self.put.externally_dereferenced(context).await?)?;
        self.post = collector.take(self.post.externally_dereferenced(context).await?)?;
        self.delete = collector.take(self.delete.externally_dereferenced(context).await?)?;
        self.options = collector.take(self.options.externally_dereferenced(context).await?)?;
        self.head = collector.take(self.head.externally_dereferenced(context).await?)?;
        self.patch = collector.take(self.patch.externally_dereferenced(context).await?)?;
        self.trace = collector.take(self.trace.externally_dereferenced(context).await?)?;
        Ok(collector.finish(self))
    }
}

#[async_trait]
impl ExternallyDereferenceable for Components {
    async fn externally_dereferenced(mut self, context: &LoadContext) -> LoadResult<Loaded<Self>> {
        let mut collector = context.collector();
        self.schemas = collector.take(self.schemas.externally_dereferenced(context).await?)?;
        self.responses = collector.take(self.responses.externally_dereferenced(context).await?)?;
        self.parameters = collector.take(self.parameters.externally_dereferenced(context).await?)?;
        self.examples = collector.take(self.examples.externally_dereferenced(context).await?)?;
        self.request_bodies =
            collector.take(self.request_bodies.externally_dereferenced(context).await?)?;
        self.headers = collector.take(self.headers.externally_dereferenced(context).await?)?;
        self.security_schemes =
            collector.take(self.security_schemes.externally_dereferenced(context).await?)?;
        self.links = collector.take(self.links.externally_dereferenced(context).await?)?;
        self.callbacks = collector.take(self.callbacks.externally_dereferenced(context).await?)?;
        self.path_items = collector.take(self.path_items.externally_dereferenced(context).await?)?;
        Ok(collector.finish(self))
    }
}

/// Loading the external references of a whole document
#[async_trait]
pub trait ExternalDocument: Sized + Send {
    /// Replace every external reference with a reference to a new component
    ///
    /// Discovered components are merged into the document's own components
    /// under `settings.merge_policy`. `base` locates the document itself and
    /// falls back to `settings.base_url`.
    async fn externally_dereferenced(
        self,
        loader: Arc<dyn ExternalLoader>,
        settings: &LoaderSettings,
        base: Option<Url>,
    ) -> LoadResult<(Self, Vec<LoaderMessage>)>;
}

#[async_trait]
impl ExternalDocument for Document {
    async fn externally_dereferenced(
        mut self,
        loader: Arc<dyn ExternalLoader>,
        settings: &LoaderSettings,
        base: Option<Url>,
    ) -> LoadResult<(Self, Vec<LoaderMessage>)> {
        let base = match base {
            Some(base) => Some(base),
            None => settings.base_url()?,
        };
        let context = LoadContext::new(loader, settings.merge_policy, base);
        let mut collector = context.collector();

        let paths = std::mem::take(&mut self.paths);
        self.paths = collector.take(paths.externally_dereferenced(&context).await?)?;
        let webhooks = std::mem::take(&mut self.webhooks);
        self.webhooks = collector.take(webhooks.externally_dereferenced(&context).await?)?;
        let components = std::mem::take(&mut self.components);
        let components = collector.take(components.externally_dereferenced(&context).await?)?;

        let Loaded {
            components: discovered,
            messages,
            ..
        } = collector.finish(());
        self.components = components;
        self.components.merge(discovered, settings.merge_policy)?;

        debug!(
            "External dereference of '{}' finished with {} messages",
            self.info.title,
            messages.len()
        );
        Ok((self, messages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MemoryLoader;
    use openapi_model::{ComponentKey, ComponentKind, HttpMethod, ReferenceError};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn url(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    fn key(raw: &str) -> ComponentKey {
        ComponentKey::new(raw).unwrap()
    }

    fn shared_loader() -> Arc<dyn ExternalLoader> {
        Arc::new(
            MemoryLoader::new()
                .with_document(
                    url("memory:///api/common.json"),
                    json!({
                        "components": {
                            "schemas": {
                                "Error": {
                                    "type": "object",
                                    "properties": {"code": {"$ref": "#/components/schemas/Code"}}
                                },
                                "Code": {"type": "integer"}
                            },
                            "parameters": {
                                "Limit": {"name": "limit", "in": "query",
                                          "schema": {"$ref": "types.json#/Count"}}
                            }
                        }
                    }),
                )
                .with_document(url("memory:///api/types.json"), json!({"Count": {"type": "integer"}}))
                .with_document(
                    url("memory:///api/loop.json"),
                    json!({
                        "A": {"$ref": "#/B"},
                        "B": {"$ref": "#/A"}
                    }),
                ),
        )
    }

    fn document(paths: serde_json::Value) -> Document {
        serde_json::from_value(json!({
            "openapi": "3.1.0",
            "info": {"title": "Root", "version": "1"},
            "paths": paths,
            "components": {
                "schemas": {
                    "Local": {"type": "string"}
                }
            }
        }))
        .unwrap()
    }

    fn settings() -> LoaderSettings {
        LoaderSettings {
            base_url: Some("memory:///api/root.json".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_external_references_become_components() {
        let document = document(json!({
            "/items": {
                "get": {
                    "parameters": [
                        {"$ref": "common.json#/components/parameters/Limit"},
                        {"name": "q", "in": "query", "schema": {"$ref": "#/components/schemas/Local"}}
                    ],
                    "responses": {
                        "default": {
                            "description": "failure",
                            "content": {"application/json": {
                                "schema": {"$ref": "common.json#/components/schemas/Error"}
                            }}
                        }
                    }
                }
            }
        }));

        let (document, messages) = document
            .externally_dereferenced(shared_loader(), &settings(), None)
            .await
            .unwrap();
        assert!(messages.is_empty());

        let names: Vec<_> = document
            .components
            .names(ComponentKind::Schemas)
            .into_iter()
            .map(ComponentKey::as_str)
            .collect();
        assert!(names.contains(&"Local"));
        assert!(names.contains(&"common_Error"));
        assert!(names.contains(&"common_Code"));
        assert!(names.contains(&"types_Count"));
        assert!(document
            .components
            .names(ComponentKind::Parameters)
            .contains(&&key("common_Limit")));

        // Everything is local now, so the document dereferences fully
        let resolved = document.resolved().unwrap();
        let get = resolved.endpoint("/items", HttpMethod::Get).unwrap();
        assert_eq!(get.parameters[0].name, "limit");
        assert_eq!(get.parameters[0].component_name, Some(key("common_Limit")));
        let error = get.responses.get("default").unwrap().content.get("application/json").unwrap();
        let schema = error.schema.as_ref().unwrap();
        assert_eq!(schema.component_name, Some(key("common_Error")));
        assert_eq!(
            schema.properties.get("code").unwrap().component_name,
            Some(key("common_Code"))
        );
    }

    #[tokio::test]
    async fn test_repeated_reference_collapses_to_one_component() {
        let document = document(json!({
            "/a": {"get": {"responses": {"200": {"description": "ok", "content": {
                "application/json": {"schema": {"$ref": "types.json#/Count"}}}}}}},
            "/b": {"get": {"responses": {"200": {"description": "ok", "content": {
                "application/json": {"schema": {"$ref": "types.json#/Count"}}}}}}}
        }));

        let (document, _) = document
            .externally_dereferenced(shared_loader(), &settings(), None)
            .await
            .unwrap();
        assert_eq!(document.components.schemas.len(), 2);
        assert!(document.components.schemas.contains_key("types_Count"));
    }

    #[tokio::test]
    async fn test_cycle_across_locators_is_reported() {
        let document = document(json!({
            "/loop": {"get": {"responses": {"200": {"description": "ok", "content": {
                "application/json": {"schema": {"$ref": "loop.json#/A"}}}}}}}
        }));

        let err = document
            .externally_dereferenced(shared_loader(), &settings(), None)
            .await
            .unwrap_err();
        match err {
            LoadError::Cycle { path } => {
                assert_eq!(path.first(), path.last());
                assert_eq!(path.len(), 3);
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_conflicting_component_under_error_policy() {
        let mut document = document(json!({
            "/a": {"get": {"responses": {"200": {"description": "ok", "content": {
                "application/json": {"schema": {"$ref": "types.json#/Count"}}}}}}}
        }));
        document
            .components
            .insert(key("types_Count"), JsonSchema::of_type("string"));

        let err = document
            .clone()
            .externally_dereferenced(shared_loader(), &settings(), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LoadError::Reference(ReferenceError::ComponentConflict { .. })
        ));

        let first_wins = LoaderSettings {
            merge_policy: MergePolicy::FirstWins,
            ..settings()
        };
        let (kept, _) = document
            .externally_dereferenced(shared_loader(), &first_wins, None)
            .await
            .unwrap();
        let stored = kept.components.schemas.get("types_Count").unwrap();
        assert_eq!(stored.value().unwrap().schema_type, Some(json!("string")));
    }

    /// Fails `broken.json` after a second and stalls every other locator
    #[derive(Default)]
    struct FailingLoader {
        started: AtomicUsize,
        completed: AtomicUsize,
    }

    #[async_trait]
    impl ExternalLoader for FailingLoader {
        async fn load(&self, locator: &Url) -> LoadResult<(serde_json::Value, Vec<LoaderMessage>)> {
            self.started.fetch_add(1, Ordering::SeqCst);
            if locator.path().ends_with("broken.json") {
                tokio::time::sleep(Duration::from_secs(1)).await;
                return Err(LoadError::Fetch {
                    locator: locator.to_string(),
                    message: "unreachable".to_string(),
                });
            }
            tokio::time::sleep(Duration::from_secs(3600)).await;
            self.completed.fetch_add(1, Ordering::SeqCst);
            Ok((json!({"type": "string"}), Vec::new()))
        }

        fn component_key(
            &self,
            _kind: ComponentKind,
            locator: &Url,
        ) -> LoadResult<ComponentKey> {
            Ok(crate::loader::default_component_key(locator))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_failure_aborts_siblings() {
        let schema: JsonSchema = serde_json::from_value(json!({
            "allOf": [
                {"$ref": "memory:///slow.json"},
                {"$ref": "memory:///broken.json"},
                {"$ref": "memory:///slower.json"}
            ]
        }))
        .unwrap();

        let loader = Arc::new(FailingLoader::default());
        let context = LoadContext::new(loader.clone(), MergePolicy::Error, None);
        let err = schema.externally_dereferenced(&context).await.unwrap_err();
        assert!(matches!(err, LoadError::Fetch { .. }));
        assert_eq!(loader.started.load(Ordering::SeqCst), 3);

        tokio::time::sleep(Duration::from_secs(7200)).await;
        assert_eq!(loader.completed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_failure_aborts_nested_loads() {
        let parameters: Vec<Either<Parameter>> = serde_json::from_value(json!([
            {"$ref": "memory:///broken.json"},
            {
                "name": "filter",
                "in": "query",
                "content": {
                    "application/json": {"schema": {"$ref": "memory:///slow.json"}},
                    "application/xml": {"schema": {"$ref": "memory:///slower.json"}}
                }
            }
        ]))
        .unwrap();

        let loader = Arc::new(FailingLoader::default());
        let context = LoadContext::new(loader.clone(), MergePolicy::Error, None);
        let err = parameters.externally_dereferenced(&context).await.unwrap_err();
        assert!(matches!(err, LoadError::Fetch { .. }));
        // Both media types were loading when the sibling failed
        assert_eq!(loader.started.load(Ordering::SeqCst), 3);

        tokio::time::sleep(Duration::from_secs(7200)).await;
        assert_eq!(loader.completed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_order_is_kept_for_sequences() {
        let schema: JsonSchema = serde_json::from_value(json!({
            "oneOf": [
                {"$ref": "memory:///api/types.json#/Count"},
                {"type": "boolean"},
                {"$ref": "memory:///api/common.json#/components/schemas/Code"}
            ]
        }))
        .unwrap();

        let context = LoadContext::new(shared_loader(), MergePolicy::Error, None);
        let loaded = schema.externally_dereferenced(&context).await.unwrap();
        let rendered: Vec<String> = loaded
            .value
            .one_of
            .iter()
            .map(|either| match either {
                Either::Reference(reference) => reference.to_string(),
                Either::Value(_) => "inline".to_string(),
            })
            .collect();
        assert_eq!(
            rendered,
            vec![
                "#/components/schemas/types_Count",
                "inline",
                "#/components/schemas/common_Code",
            ]
        );
        assert_eq!(loaded.components.schemas.len(), 2);
    }
}
