//! Replacing references with the values they point at
//!
//! Dereferencing walks a node and produces its `Dereferenced*` mirror, in
//! which every field that could hold a reference holds the resolved value
//! instead. Only components of the same document are resolved; external
//! references fail with [`ReferenceError::RemoteReference`] and have to be
//! loaded first.
//!
//! Each branch of the walk carries its own [`VisitedSet`] of the components
//! entered between the root and the current node. Siblings never see each
//! other's entries, so two independent references to one component are
//! fine, while a component reached again through itself is a cycle.

mod document;
mod types;

pub use document::DereferencedDocument;
pub use types::*;

use crate::component_key::ComponentKey;
use crate::components::{ComponentType, Components};
use crate::either::Either;
use crate::error::{ReferenceError, ReferenceResult};
use crate::ordered_map::OrderedMap;
use crate::reference::{ComponentKind, InternalReference, Reference, ReferenceTarget};
use indexmap::IndexSet;
use serde::Serialize;
use std::hash::Hash;
use std::ops::Deref;

/// Components entered on the path from the root to the current node
#[derive(Debug, Clone, Default)]
pub struct VisitedSet {
    entries: IndexSet<(ComponentKind, ComponentKey)>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, kind: ComponentKind, name: &ComponentKey) -> bool {
        self.entries.contains(&(kind, name.clone()))
    }

    /// The set for the branch below `reference`
    ///
    /// Fails with [`ReferenceError::ReferenceCycle`] when the referenced
    /// component is already on this branch. References without a component
    /// identity (raw pointers, external references) leave the set unchanged.
    pub fn entering<T>(&self, reference: &Reference<T>) -> ReferenceResult<VisitedSet> {
        let identity = match reference.target() {
            ReferenceTarget::Internal(InternalReference::Component { kind, name }) => {
                (*kind, name.clone())
            }
            _ => return Ok(self.clone()),
        };

        if self.entries.contains(&identity) {
            let mut path: Vec<String> = self
                .entries
                .iter()
                .skip_while(|entry| **entry != identity)
                .map(render_identity)
                .collect();
            path.push(render_identity(&identity));
            return Err(ReferenceError::ReferenceCycle { path });
        }

        let mut next = self.clone();
        next.entries.insert(identity);
        Ok(next)
    }
}

fn render_identity((kind, name): &(ComponentKind, ComponentKey)) -> String {
    InternalReference::Component {
        kind: *kind,
        name: name.clone(),
    }
    .to_string()
}

/// Nodes that can be fully inlined against a document's components
pub trait LocallyDereferenceable {
    type Output;

    /// Dereference starting from an empty branch
    fn dereferenced(&self, components: &Components) -> ReferenceResult<Self::Output> {
        self.dereferenced_in(components, &VisitedSet::new(), None)
    }

    /// Dereference below the components in `visited`
    ///
    /// `name` is the component this node was loaded from, if any, and is
    /// recorded on the output.
    fn dereferenced_in(
        &self,
        components: &Components,
        visited: &VisitedSet,
        name: Option<&ComponentKey>,
    ) -> ReferenceResult<Self::Output>;
}

impl<T> LocallyDereferenceable for Reference<T>
where
    T: ComponentType + LocallyDereferenceable,
{
    type Output = T::Output;

    fn dereferenced_in(
        &self,
        components: &Components,
        visited: &VisitedSet,
        _name: Option<&ComponentKey>,
    ) -> ReferenceResult<Self::Output> {
        let visited = visited.entering(self)?;
        let target = components.lookup(self)?;
        target.dereferenced_in(components, &visited, self.component_name())
    }
}

impl<T> LocallyDereferenceable for Either<T>
where
    T: ComponentType + LocallyDereferenceable,
{
    type Output = T::Output;

    fn dereferenced_in(
        &self,
        components: &Components,
        visited: &VisitedSet,
        name: Option<&ComponentKey>,
    ) -> ReferenceResult<Self::Output> {
        match self {
            Either::Value(value) => value.dereferenced_in(components, visited, name),
            Either::Reference(reference) => reference.dereferenced_in(components, visited, name),
        }
    }
}

impl<T: LocallyDereferenceable> LocallyDereferenceable for Option<T> {
    type Output = Option<T::Output>;

    fn dereferenced_in(
        &self,
        components: &Components,
        visited: &VisitedSet,
        name: Option<&ComponentKey>,
    ) -> ReferenceResult<Self::Output> {
        self.as_ref()
            .map(|value| value.dereferenced_in(components, visited, name))
            .transpose()
    }
}

impl<T: LocallyDereferenceable> LocallyDereferenceable for Box<T> {
    type Output = Box<T::Output>;

    fn dereferenced_in(
        &self,
        components: &Components,
        visited: &VisitedSet,
        name: Option<&ComponentKey>,
    ) -> ReferenceResult<Self::Output> {
        self.as_ref()
            .dereferenced_in(components, visited, name)
            .map(Box::new)
    }
}

impl<T: LocallyDereferenceable> LocallyDereferenceable for Vec<T> {
    type Output = Vec<T::Output>;

    fn dereferenced_in(
        &self,
        components: &Components,
        visited: &VisitedSet,
        _name: Option<&ComponentKey>,
    ) -> ReferenceResult<Self::Output> {
        self.iter()
            .map(|item| item.dereferenced_in(components, visited, None))
            .collect()
    }
}

impl<K, V> LocallyDereferenceable for OrderedMap<K, V>
where
    K: Hash + Eq + Clone,
    V: LocallyDereferenceable,
{
    type Output = OrderedMap<K, V::Output>;

    fn dereferenced_in(
        &self,
        components: &Components,
        visited: &VisitedSet,
        _name: Option<&ComponentKey>,
    ) -> ReferenceResult<Self::Output> {
        self.try_map_values(|_, value| value.dereferenced_in(components, visited, None))
    }
}

/// A dereferenced value that contains no references of its own
#[derive(Debug, Clone, PartialEq, Serialize)]
#[non_exhaustive]
pub struct Annotated<T> {
    #[serde(flatten)]
    pub value: T,
    /// Component the value was inlined from
    #[serde(rename = "x-component-name", skip_serializing_if = "Option::is_none")]
    pub component_name: Option<ComponentKey>,
}

impl<T> Deref for Annotated<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

macro_rules! annotated_leaf {
    ($($ty:ty),* $(,)?) => {
        $(
            impl LocallyDereferenceable for $ty {
                type Output = Annotated<$ty>;

                fn dereferenced_in(
                    &self,
                    _components: &Components,
                    _visited: &VisitedSet,
                    name: Option<&ComponentKey>,
                ) -> ReferenceResult<Self::Output> {
                    Ok(Annotated {
                        value: self.clone(),
                        component_name: name.cloned(),
                    })
                }
            }
        )*
    };
}

annotated_leaf!(
    crate::types::Example,
    crate::types::Link,
    crate::security::SecurityScheme,
);
