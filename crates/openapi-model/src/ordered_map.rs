//! Insertion-ordered map used for every registry and ordered field in a document
//!
//! Keys are unique. Inserting a new key appends it, inserting an existing key
//! replaces the value in place, and removal keeps the relative order of the
//! remaining entries.
//!
//! The wire shape depends on the key type. Keys that have a string form encode
//! as an object in insertion order; any other key type encodes as a flat array
//! alternating key, value, key, value. The choice is made per key type through
//! [`MapKey::STRATEGY`], so decoding never has to guess.

use crate::error::KeyDecodingError;
use indexmap::{Equivalent, IndexMap};
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{self, SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use thiserror::Error;

/// How a key type is represented when its map is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStrategy {
    /// The key is a plain string
    Text,
    /// The key converts losslessly to and from a string (numbers)
    Lossless,
    /// The key is one of a fixed set of raw string values
    RawValue,
    /// The key has no string form; encode as an alternating key/value array
    Sequence,
}

/// Key types usable in an [`OrderedMap`]
pub trait MapKey: Eq + Hash + Clone {
    const STRATEGY: KeyStrategy;

    /// String form of the key for object-shaped encoding
    fn encode_key(&self) -> Option<String> {
        None
    }

    /// Rebuild a key from its string form
    fn decode_key(raw: &str) -> Result<Self, KeyDecodingError> {
        Err(KeyDecodingError::new(raw))
    }
}

impl MapKey for String {
    const STRATEGY: KeyStrategy = KeyStrategy::Text;

    fn encode_key(&self) -> Option<String> {
        Some(self.clone())
    }

    fn decode_key(raw: &str) -> Result<Self, KeyDecodingError> {
        Ok(raw.to_string())
    }
}

macro_rules! lossless_map_key {
    ($($ty:ty),* $(,)?) => {
        $(
            impl MapKey for $ty {
                const STRATEGY: KeyStrategy = KeyStrategy::Lossless;

                fn encode_key(&self) -> Option<String> {
                    Some(self.to_string())
                }

                fn decode_key(raw: &str) -> Result<Self, KeyDecodingError> {
                    raw.parse::<$ty>().map_err(|_| {
                        KeyDecodingError::with_hint(
                            raw,
                            concat!("expected a value of type ", stringify!($ty)),
                        )
                    })
                }
            }
        )*
    };
}

lossless_map_key!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);

/// The other map's key set differs from this one
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Cannot reorder map: key sets differ ({left} keys vs {right} keys, or mismatched names)")]
pub struct KeySetMismatch {
    pub left: usize,
    pub right: usize,
}

/// Unique-keyed map that remembers insertion order
#[derive(Debug, Clone)]
pub struct OrderedMap<K, V>(IndexMap<K, V>);

impl<K, V> Default for OrderedMap<K, V> {
    fn default() -> Self {
        Self(IndexMap::new())
    }
}

impl<K: Hash + Eq, V> OrderedMap<K, V> {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(IndexMap::with_capacity(capacity))
    }

    /// Insert a value, returning the previous value for an existing key
    ///
    /// An existing key keeps its position.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.0.insert(key, value)
    }

    /// Remove a key, keeping the order of the remaining entries
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        self.0.shift_remove(key)
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        self.0.get(key)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        self.0.get_mut(key)
    }

    pub fn get_index(&self, index: usize) -> Option<(&K, &V)> {
        self.0.get_index(index)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<(&K, &V)> {
        self.0.first()
    }

    pub fn keys(&self) -> indexmap::map::Keys<'_, K, V> {
        self.0.keys()
    }

    pub fn values(&self) -> indexmap::map::Values<'_, K, V> {
        self.0.values()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, K, V> {
        self.0.iter()
    }

    /// Iterate with mutable access to values; keys and order stay fixed
    pub fn iter_mut(&mut self) -> indexmap::map::IterMut<'_, K, V> {
        self.0.iter_mut()
    }

    pub fn retain(&mut self, keep: impl FnMut(&K, &mut V) -> bool) {
        self.0.retain(keep);
    }

    /// Insert every entry of `other`, combining values on key collisions
    ///
    /// Existing keys keep their position; new keys are appended in `other`'s order.
    pub fn merge(&mut self, other: OrderedMap<K, V>, mut combine: impl FnMut(V, V) -> V) {
        let mut incoming = other.0;
        let mut merged = IndexMap::with_capacity(self.0.len() + incoming.len());
        for (key, existing) in std::mem::take(&mut self.0) {
            let value = match incoming.shift_remove(&key) {
                Some(new) => combine(existing, new),
                None => existing,
            };
            merged.insert(key, value);
        }
        merged.extend(incoming);
        self.0 = merged;
    }

    /// Same keys in the same order, with every value transformed
    pub fn map_values<U>(self, mut f: impl FnMut(&K, V) -> U) -> OrderedMap<K, U> {
        OrderedMap(
            self.0
                .into_iter()
                .map(|(k, v)| {
                    let mapped = f(&k, v);
                    (k, mapped)
                })
                .collect(),
        )
    }

    /// Fallible [`map_values`](Self::map_values); stops at the first error in key order
    pub fn try_map_values<U, E>(
        &self,
        mut f: impl FnMut(&K, &V) -> Result<U, E>,
    ) -> Result<OrderedMap<K, U>, E>
    where
        K: Clone,
    {
        let mut mapped = IndexMap::with_capacity(self.0.len());
        for (k, v) in &self.0 {
            mapped.insert(k.clone(), f(k, v)?);
        }
        Ok(OrderedMap(mapped))
    }

    /// Reorder entries to match the key order of `other`
    ///
    /// Fails without modifying `self` when the two key sets are not identical.
    pub fn sort_keys_to_match<U>(&mut self, other: &OrderedMap<K, U>) -> Result<(), KeySetMismatch> {
        let same_keys =
            self.0.len() == other.0.len() && other.0.keys().all(|k| self.0.contains_key(k));
        if !same_keys {
            return Err(KeySetMismatch {
                left: self.0.len(),
                right: other.0.len(),
            });
        }

        self.0
            .sort_by(|a, _, b, _| other.0.get_index_of(a).cmp(&other.0.get_index_of(b)));
        Ok(())
    }
}

impl<K: Hash + Eq, V: PartialEq> PartialEq for OrderedMap<K, V> {
    /// Equal when entries match pairwise in order
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && self.0.iter().zip(other.0.iter()).all(|(a, b)| a == b)
    }
}

impl<K: Hash + Eq, V: Eq> Eq for OrderedMap<K, V> {}

impl<K: Hash + Eq, V> FromIterator<(K, V)> for OrderedMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(IndexMap::from_iter(iter))
    }
}

impl<K: Hash + Eq, V, const N: usize> From<[(K, V); N]> for OrderedMap<K, V> {
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl<K: Hash + Eq, V> Extend<(K, V)> for OrderedMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl<K, V> IntoIterator for OrderedMap<K, V> {
    type Item = (K, V);
    type IntoIter = indexmap::map::IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a, K, V> IntoIterator for &'a OrderedMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = indexmap::map::Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<K, V> Serialize for OrderedMap<K, V>
where
    K: MapKey + Serialize,
    V: Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match K::STRATEGY {
            KeyStrategy::Sequence => {
                let mut seq = serializer.serialize_seq(Some(self.0.len() * 2))?;
                for (key, value) in &self.0 {
                    seq.serialize_element(key)?;
                    seq.serialize_element(value)?;
                }
                seq.end()
            }
            KeyStrategy::Text | KeyStrategy::Lossless | KeyStrategy::RawValue => {
                let mut map = serializer.serialize_map(Some(self.0.len()))?;
                for (key, value) in &self.0 {
                    let encoded = key.encode_key().ok_or_else(|| {
                        <S::Error as ser::Error>::custom("map key has no string form")
                    })?;
                    map.serialize_entry(&encoded, value)?;
                }
                map.end()
            }
        }
    }
}

impl<'de, K, V> Deserialize<'de> for OrderedMap<K, V>
where
    K: MapKey + Deserialize<'de>,
    V: Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let visitor = OrderedMapVisitor {
            marker: PhantomData,
        };
        match K::STRATEGY {
            KeyStrategy::Sequence => deserializer.deserialize_seq(visitor),
            KeyStrategy::Text | KeyStrategy::Lossless | KeyStrategy::RawValue => {
                deserializer.deserialize_map(visitor)
            }
        }
    }
}

struct OrderedMapVisitor<K, V> {
    marker: PhantomData<fn() -> OrderedMap<K, V>>,
}

impl<'de, K, V> Visitor<'de> for OrderedMapVisitor<K, V>
where
    K: MapKey + Deserialize<'de>,
    V: Deserialize<'de>,
{
    type Value = OrderedMap<K, V>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match K::STRATEGY {
            KeyStrategy::Sequence => formatter.write_str("an array alternating keys and values"),
            _ => formatter.write_str("an object"),
        }
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        if K::STRATEGY == KeyStrategy::Sequence {
            return Err(de::Error::invalid_type(de::Unexpected::Map, &self));
        }

        let mut map = IndexMap::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((raw, value)) = access.next_entry::<RawKey, V>()? {
            let key = K::decode_key(&raw.0).map_err(de::Error::custom)?;
            map.insert(key, value);
        }
        Ok(OrderedMap(map))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        if K::STRATEGY != KeyStrategy::Sequence {
            return Err(de::Error::invalid_type(de::Unexpected::Seq, &self));
        }

        let mut map = IndexMap::with_capacity(seq.size_hint().unwrap_or(0) / 2);
        while let Some(key) = seq.next_element::<K>()? {
            let value = seq.next_element::<V>()?.ok_or_else(|| {
                de::Error::custom("ordered map array ends with a key that has no value")
            })?;
            map.insert(key, value);
        }
        Ok(OrderedMap(map))
    }
}

/// Object key as written, accepting the scalar keys YAML allows (`200:`, `true:`)
struct RawKey(String);

impl<'de> Deserialize<'de> for RawKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RawKeyVisitor;

        impl Visitor<'_> for RawKeyVisitor {
            type Value = RawKey;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string, number or boolean map key")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<RawKey, E> {
                Ok(RawKey(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<RawKey, E> {
                Ok(RawKey(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<RawKey, E> {
                Ok(RawKey(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<RawKey, E> {
                Ok(RawKey(v.to_string()))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<RawKey, E> {
                Ok(RawKey(v.to_string()))
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<RawKey, E> {
                Ok(RawKey(v.to_string()))
            }
        }

        deserializer.deserialize_any(RawKeyVisitor)
    }
}
