//! `$ref` pointers to reusable components
//!
//! A [`Reference<T>`] is typed by the component it points at, so a schema
//! reference can never be looked up in the response registry. The type
//! parameter takes no part in equality or hashing: two references are equal
//! when their targets are.

use crate::component_key::ComponentKey;
use crate::components::ComponentType;
use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

const COMPONENTS_PREFIX: &str = "#/components/";

/// Registry section of the components object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComponentKind {
    Schemas,
    Responses,
    Parameters,
    Examples,
    RequestBodies,
    Headers,
    SecuritySchemes,
    Links,
    Callbacks,
    PathItems,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 10] = [
        ComponentKind::Schemas,
        ComponentKind::Responses,
        ComponentKind::Parameters,
        ComponentKind::Examples,
        ComponentKind::RequestBodies,
        ComponentKind::Headers,
        ComponentKind::SecuritySchemes,
        ComponentKind::Links,
        ComponentKind::Callbacks,
        ComponentKind::PathItems,
    ];

    /// Key of this section inside the components object
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Schemas => "schemas",
            ComponentKind::Responses => "responses",
            ComponentKind::Parameters => "parameters",
            ComponentKind::Examples => "examples",
            ComponentKind::RequestBodies => "requestBodies",
            ComponentKind::Headers => "headers",
            ComponentKind::SecuritySchemes => "securitySchemes",
            ComponentKind::Links => "links",
            ComponentKind::Callbacks => "callbacks",
            ComponentKind::PathItems => "pathItems",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pointer into the current document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InternalReference {
    /// `#/components/<kind>/<name>`
    Component {
        kind: ComponentKind,
        name: ComponentKey,
    },
    /// Any other JSON pointer; kept verbatim and never resolved
    Pointer(String),
}

impl InternalReference {
    /// Parse a fragment (with its leading `#`) as a pointer to a component of `kind`
    pub fn parse(raw: &str, kind: ComponentKind) -> Self {
        let component = raw
            .strip_prefix(COMPONENTS_PREFIX)
            .and_then(|rest| rest.split_once('/'))
            .filter(|(section, _)| *section == kind.as_str())
            .and_then(|(_, name)| {
                if name.contains('/') {
                    return None;
                }
                ComponentKey::new(decode_pointer_segment(name)).ok()
            });

        match component {
            Some(name) => InternalReference::Component { kind, name },
            None => InternalReference::Pointer(raw.to_string()),
        }
    }

    pub fn component_name(&self) -> Option<&ComponentKey> {
        match self {
            InternalReference::Component { name, .. } => Some(name),
            InternalReference::Pointer(_) => None,
        }
    }
}

impl fmt::Display for InternalReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InternalReference::Component { kind, name } => {
                write!(f, "{}{}/{}", COMPONENTS_PREFIX, kind, name)
            }
            InternalReference::Pointer(raw) => f.write_str(raw),
        }
    }
}

/// Where a reference points
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReferenceTarget {
    Internal(InternalReference),
    /// Another document, optionally with a pointer inside it
    External {
        locator: String,
        fragment: Option<InternalReference>,
    },
}

impl fmt::Display for ReferenceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceTarget::Internal(internal) => internal.fmt(f),
            ReferenceTarget::External { locator, fragment } => match fragment {
                Some(fragment) => write!(f, "{}{}", locator, fragment),
                None => f.write_str(locator),
            },
        }
    }
}

/// A `$ref` to a value of type `T`
pub struct Reference<T> {
    target: ReferenceTarget,
    /// Overrides the summary of the referenced component (OpenAPI 3.1)
    pub summary: Option<String>,
    /// Overrides the description of the referenced component (OpenAPI 3.1)
    pub description: Option<String>,
    marker: PhantomData<fn() -> T>,
}

impl<T> Reference<T> {
    pub fn from_target(target: ReferenceTarget) -> Self {
        Self {
            target,
            summary: None,
            description: None,
            marker: PhantomData,
        }
    }

    pub fn target(&self) -> &ReferenceTarget {
        &self.target
    }

    pub fn is_internal(&self) -> bool {
        matches!(self.target, ReferenceTarget::Internal(_))
    }

    pub fn is_external(&self) -> bool {
        matches!(self.target, ReferenceTarget::External { .. })
    }

    /// Component name for `#/components/...` references
    pub fn component_name(&self) -> Option<&ComponentKey> {
        match &self.target {
            ReferenceTarget::Internal(internal) => internal.component_name(),
            ReferenceTarget::External { .. } => None,
        }
    }

    /// Document locator of an external reference
    pub fn locator(&self) -> Option<&str> {
        match &self.target {
            ReferenceTarget::External { locator, .. } => Some(locator),
            ReferenceTarget::Internal(_) => None,
        }
    }
}

impl<T: ComponentType> Reference<T> {
    /// Reference to a component in the current document
    ///
    /// Prefer [`Components::reference`](crate::Components::reference), which
    /// checks that the component exists.
    pub fn component(name: ComponentKey) -> Self {
        Self::from_target(ReferenceTarget::Internal(InternalReference::Component {
            kind: T::KIND,
            name,
        }))
    }

    /// Parse `$ref` text
    pub fn parse(raw: &str) -> Self {
        let target = if raw.starts_with('#') {
            ReferenceTarget::Internal(InternalReference::parse(raw, T::KIND))
        } else {
            match raw.split_once('#') {
                Some((locator, fragment)) => ReferenceTarget::External {
                    locator: locator.to_string(),
                    fragment: Some(InternalReference::parse(&format!("#{}", fragment), T::KIND)),
                },
                None => ReferenceTarget::External {
                    locator: raw.to_string(),
                    fragment: None,
                },
            }
        };
        Self::from_target(target)
    }

    pub fn external(locator: &str) -> Self {
        let parsed = Self::parse(locator);
        if parsed.is_internal() {
            // A bare fragment has no document part; keep it as an external
            // pointer into the current locator.
            return Self::from_target(ReferenceTarget::External {
                locator: String::new(),
                fragment: Some(InternalReference::parse(locator, T::KIND)),
            });
        }
        parsed
    }
}

impl<T> Clone for Reference<T> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            summary: self.summary.clone(),
            description: self.description.clone(),
            marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Reference<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reference")
            .field("target", &self.target.to_string())
            .field("summary", &self.summary)
            .field("description", &self.description)
            .finish()
    }
}

impl<T> fmt::Display for Reference<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.target.fmt(f)
    }
}

impl<T> PartialEq for Reference<T> {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target
    }
}

impl<T> Eq for Reference<T> {}

impl<T> Hash for Reference<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.target.hash(state);
    }
}

impl<T> Serialize for Reference<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = 1 + usize::from(self.summary.is_some()) + usize::from(self.description.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("$ref", &self.target.to_string())?;
        if let Some(summary) = &self.summary {
            map.serialize_entry("summary", summary)?;
        }
        if let Some(description) = &self.description {
            map.serialize_entry("description", description)?;
        }
        map.end()
    }
}

#[derive(Deserialize)]
struct RawReference {
    #[serde(rename = "$ref")]
    reference: String,
    summary: Option<String>,
    description: Option<String>,
}

impl<'de, T: ComponentType> Deserialize<'de> for Reference<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawReference::deserialize(deserializer)?;
        let mut reference = Self::parse(&raw.reference);
        reference.summary = raw.summary;
        reference.description = raw.description;
        Ok(reference)
    }
}

/// Decode a JSON pointer segment (`~1` is `/`, `~0` is `~`)
fn decode_pointer_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}
