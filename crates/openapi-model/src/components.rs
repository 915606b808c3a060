//! The components object: one registry of reusable values per kind

use crate::component_key::ComponentKey;
use crate::dereference::VisitedSet;
use crate::either::Either;
use crate::error::{ReferenceError, ReferenceResult};
use crate::ordered_map::OrderedMap;
use crate::reference::{ComponentKind, InternalReference, Reference, ReferenceTarget};
use crate::schema::JsonSchema;
use crate::security::SecurityScheme;
use crate::types::{Callbacks, Example, Header, Link, Parameter, PathItem, RequestBody, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Registry of one component kind
pub type ComponentMap<T> = OrderedMap<ComponentKey, Either<T>>;

/// Types that can be stored in, and referenced from, the components object
pub trait ComponentType: Sized {
    const KIND: ComponentKind;

    fn registry(components: &Components) -> &ComponentMap<Self>;

    fn registry_mut(components: &mut Components) -> &mut ComponentMap<Self>;
}

macro_rules! component_type {
    ($ty:ty, $kind:ident, $field:ident) => {
        impl ComponentType for $ty {
            const KIND: ComponentKind = ComponentKind::$kind;

            fn registry(components: &Components) -> &ComponentMap<Self> {
                &components.$field
            }

            fn registry_mut(components: &mut Components) -> &mut ComponentMap<Self> {
                &mut components.$field
            }
        }
    };
}

component_type!(JsonSchema, Schemas, schemas);
component_type!(Response, Responses, responses);
component_type!(Parameter, Parameters, parameters);
component_type!(Example, Examples, examples);
component_type!(RequestBody, RequestBodies, request_bodies);
component_type!(Header, Headers, headers);
component_type!(SecurityScheme, SecuritySchemes, security_schemes);
component_type!(Link, Links, links);
component_type!(Callbacks, Callbacks, callbacks);
component_type!(PathItem, PathItems, path_items);

/// How [`Components::merge`] treats a name present on both sides with different values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MergePolicy {
    /// Keep the value already stored
    FirstWins,
    /// Replace the stored value with the incoming one
    LastWins,
    /// Fail with [`ReferenceError::ComponentConflict`]
    #[default]
    Error,
}

/// Reusable objects addressable by kind and [`ComponentKey`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Components {
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub schemas: ComponentMap<JsonSchema>,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub responses: ComponentMap<Response>,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub parameters: ComponentMap<Parameter>,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub examples: ComponentMap<Example>,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub request_bodies: ComponentMap<RequestBody>,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub headers: ComponentMap<Header>,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub security_schemes: ComponentMap<SecurityScheme>,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub links: ComponentMap<Link>,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub callbacks: ComponentMap<Callbacks>,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub path_items: ComponentMap<PathItem>,
}

impl Components {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        ComponentKind::ALL.iter().all(|kind| self.names(*kind).is_empty())
    }

    /// Names registered under `kind`, in declaration order
    pub fn names(&self, kind: ComponentKind) -> Vec<&ComponentKey> {
        match kind {
            ComponentKind::Schemas => self.schemas.keys().collect(),
            ComponentKind::Responses => self.responses.keys().collect(),
            ComponentKind::Parameters => self.parameters.keys().collect(),
            ComponentKind::Examples => self.examples.keys().collect(),
            ComponentKind::RequestBodies => self.request_bodies.keys().collect(),
            ComponentKind::Headers => self.headers.keys().collect(),
            ComponentKind::SecuritySchemes => self.security_schemes.keys().collect(),
            ComponentKind::Links => self.links.keys().collect(),
            ComponentKind::Callbacks => self.callbacks.keys().collect(),
            ComponentKind::PathItems => self.path_items.keys().collect(),
        }
    }

    /// Store a component, returning the value previously stored under `name`
    pub fn insert<T: ComponentType>(
        &mut self,
        name: ComponentKey,
        value: impl Into<Either<T>>,
    ) -> Option<Either<T>> {
        T::registry_mut(self).insert(name, value.into())
    }

    /// Whether the reference's target is registered
    ///
    /// Raw pointers are never registered. External references cannot be
    /// answered locally and fail with [`ReferenceError::RemoteReference`].
    pub fn contains<T: ComponentType>(&self, reference: &Reference<T>) -> ReferenceResult<bool> {
        match reference.target() {
            ReferenceTarget::External { .. } => {
                Err(ReferenceError::RemoteReference(reference.to_string()))
            }
            ReferenceTarget::Internal(InternalReference::Component { name, .. }) => {
                Ok(T::registry(self).contains_key(name))
            }
            ReferenceTarget::Internal(InternalReference::Pointer(_)) => Ok(false),
        }
    }

    /// The stored entry for an internal component reference, if any
    pub fn get<T: ComponentType>(&self, reference: &Reference<T>) -> Option<&Either<T>> {
        reference
            .component_name()
            .and_then(|name| T::registry(self).get(name))
    }

    /// Look up the stored entry one level deep
    ///
    /// The entry is returned as stored; if it is itself a reference it is not
    /// followed.
    pub fn lookup<T: ComponentType>(&self, reference: &Reference<T>) -> ReferenceResult<&Either<T>> {
        match reference.target() {
            ReferenceTarget::External { .. } => {
                Err(ReferenceError::RemoteReference(reference.to_string()))
            }
            ReferenceTarget::Internal(InternalReference::Component { name, kind }) => T::registry(self)
                .get(name)
                .ok_or_else(|| ReferenceError::MissingComponent {
                    name: name.to_string(),
                    kind: *kind,
                }),
            ReferenceTarget::Internal(InternalReference::Pointer(raw)) => {
                Err(ReferenceError::MissingComponent {
                    name: raw.clone(),
                    kind: T::KIND,
                })
            }
        }
    }

    /// Follow a chain of component-to-component references to the stored value
    pub fn lookup_value<T: ComponentType>(&self, reference: &Reference<T>) -> ReferenceResult<&T> {
        let mut visited = VisitedSet::new();
        let mut current = reference;
        loop {
            visited = visited.entering(current)?;
            match self.lookup(current)? {
                Either::Value(value) => return Ok(value),
                Either::Reference(next) => current = next,
            }
        }
    }

    /// Resolve an inline-or-referenced field to its value
    pub fn force_dereference<'a, T: ComponentType>(
        &'a self,
        either: &'a Either<T>,
    ) -> ReferenceResult<&'a T> {
        match either {
            Either::Value(value) => Ok(value),
            Either::Reference(reference) => self.lookup_value(reference),
        }
    }

    /// Create a reference to a component that is already registered
    pub fn reference<T: ComponentType>(&self, name: &str) -> ReferenceResult<Reference<T>> {
        T::registry(self)
            .keys()
            .find(|key| key.as_str() == name)
            .map(|key| Reference::component(key.clone()))
            .ok_or_else(|| ReferenceError::MissingComponentOnCreation {
                name: name.to_string(),
                kind: T::KIND,
            })
    }

    /// Add every component from `other`
    ///
    /// Entries equal on both sides are not conflicts. With
    /// [`MergePolicy::Error`] nothing is modified when a conflict is found.
    pub fn merge(&mut self, other: Components, policy: MergePolicy) -> ReferenceResult<()> {
        if policy == MergePolicy::Error {
            check_conflicts(&self.schemas, &other.schemas)?;
            check_conflicts(&self.responses, &other.responses)?;
            check_conflicts(&self.parameters, &other.parameters)?;
            check_conflicts(&self.examples, &other.examples)?;
            check_conflicts(&self.request_bodies, &other.request_bodies)?;
            check_conflicts(&self.headers, &other.headers)?;
            check_conflicts(&self.security_schemes, &other.security_schemes)?;
            check_conflicts(&self.links, &other.links)?;
            check_conflicts(&self.callbacks, &other.callbacks)?;
            check_conflicts(&self.path_items, &other.path_items)?;
        }

        merge_registry(&mut self.schemas, other.schemas, policy);
        merge_registry(&mut self.responses, other.responses, policy);
        merge_registry(&mut self.parameters, other.parameters, policy);
        merge_registry(&mut self.examples, other.examples, policy);
        merge_registry(&mut self.request_bodies, other.request_bodies, policy);
        merge_registry(&mut self.headers, other.headers, policy);
        merge_registry(&mut self.security_schemes, other.security_schemes, policy);
        merge_registry(&mut self.links, other.links, policy);
        merge_registry(&mut self.callbacks, other.callbacks, policy);
        merge_registry(&mut self.path_items, other.path_items, policy);
        Ok(())
    }
}

fn check_conflicts<T: ComponentType + PartialEq>(
    existing: &ComponentMap<T>,
    incoming: &ComponentMap<T>,
) -> ReferenceResult<()> {
    for (name, value) in incoming {
        if let Some(current) = existing.get(name) {
            if current != value {
                return Err(ReferenceError::ComponentConflict {
                    name: name.clone(),
                    kind: T::KIND,
                });
            }
        }
    }
    Ok(())
}

fn merge_registry<T: ComponentType>(
    existing: &mut ComponentMap<T>,
    incoming: ComponentMap<T>,
    policy: MergePolicy,
) {
    if !incoming.is_empty() {
        debug!("Merging {} {} components", incoming.len(), T::KIND);
    }
    existing.merge(incoming, |current, new| match policy {
        MergePolicy::LastWins => new,
        MergePolicy::FirstWins | MergePolicy::Error => current,
    });
}
