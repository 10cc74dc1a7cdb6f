//! Nested capability values attached to provider records.
//!
//! Inventory documents are loosely typed: a provider entry is a tree of
//! tables, arrays and scalars. [`CapabilityValue`] keeps that shape as a
//! tagged variant so requirement paths can be resolved without falling back
//! to dynamic lookups on raw JSON or TOML values.

use core::fmt;
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// A single value in a provider's capability tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CapabilityValue {
    /// Explicit null (JSON `null`)
    Null,
    /// Boolean flag
    Bool(bool),
    /// Signed integer
    Integer(i64),
    /// Floating point number
    Float(f64),
    /// String value
    String(String),
    /// Ordered list of values
    List(Vec<CapabilityValue>),
    /// Nested table
    Map(CapabilityMap),
}

impl CapabilityValue {
    /// Whether this value counts as "present" for a requirement.
    ///
    /// `null`, `false`, `""`, `0`, `0.0`, empty lists and empty maps are
    /// falsy. Everything else is truthy, including whitespace-only strings.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(flag) => *flag,
            Self::Integer(number) => *number != 0,
            Self::Float(number) => *number != 0.0,
            Self::String(text) => !text.is_empty(),
            Self::List(items) => !items.is_empty(),
            Self::Map(map) => !map.is_empty(),
        }
    }

    /// Borrow the string contents, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(text) => Some(text),
            _ => None,
        }
    }

    /// Borrow the nested map, if this is a map.
    pub fn as_map(&self) -> Option<&CapabilityMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Short type name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }
}

impl From<&str> for CapabilityValue {
    fn from(text: &str) -> Self {
        Self::String(text.to_owned())
    }
}

impl From<String> for CapabilityValue {
    fn from(text: String) -> Self {
        Self::String(text)
    }
}

impl From<bool> for CapabilityValue {
    fn from(flag: bool) -> Self {
        Self::Bool(flag)
    }
}

impl From<i64> for CapabilityValue {
    fn from(number: i64) -> Self {
        Self::Integer(number)
    }
}

impl From<CapabilityMap> for CapabilityValue {
    fn from(map: CapabilityMap) -> Self {
        Self::Map(map)
    }
}

impl<'de> Deserialize<'de> for CapabilityValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(CapabilityValueVisitor)
    }
}

/// Visitor accepting any self-describing value.
struct CapabilityValueVisitor;

impl<'de> Visitor<'de> for CapabilityValueVisitor {
    type Value = CapabilityValue;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a capability value")
    }

    fn visit_bool<E: de::Error>(self, flag: bool) -> Result<Self::Value, E> {
        Ok(CapabilityValue::Bool(flag))
    }

    fn visit_i64<E: de::Error>(self, number: i64) -> Result<Self::Value, E> {
        Ok(CapabilityValue::Integer(number))
    }

    fn visit_u64<E: de::Error>(self, number: u64) -> Result<Self::Value, E> {
        Ok(i64::try_from(number)
            .map_or(CapabilityValue::Float(number as f64), CapabilityValue::Integer))
    }

    fn visit_f64<E: de::Error>(self, number: f64) -> Result<Self::Value, E> {
        Ok(CapabilityValue::Float(number))
    }

    fn visit_str<E: de::Error>(self, text: &str) -> Result<Self::Value, E> {
        Ok(CapabilityValue::String(text.to_owned()))
    }

    fn visit_string<E: de::Error>(self, text: String) -> Result<Self::Value, E> {
        Ok(CapabilityValue::String(text))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(CapabilityValue::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(CapabilityValue::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        CapabilityValue::deserialize(deserializer)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(CapabilityValue::List(items))
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = BTreeMap::new();
        while let Some((key, value)) = access.next_entry::<String, CapabilityValue>()? {
            entries.insert(key, value);
        }
        Ok(CapabilityValue::Map(CapabilityMap(entries)))
    }
}

/// String-keyed table of capability values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityMap(BTreeMap<String, CapabilityValue>);

/// Outcome of walking a key sequence through a [`CapabilityMap`].
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<'map> {
    /// Every key exists and the leaf is truthy
    Satisfied(&'map CapabilityValue),
    /// The key at `depth` does not exist
    Missing {
        /// Zero-based index of the missing segment
        depth: usize,
    },
    /// The value at `depth` should have been a map but is not
    NotAMap {
        /// Zero-based index of the non-map segment
        depth: usize,
        /// Type name of the value found there
        found: &'static str,
    },
    /// The leaf exists but is falsy
    Falsy(&'map CapabilityValue),
}

impl Resolution<'_> {
    /// Whether the path resolved to a truthy leaf.
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::Satisfied(_))
    }
}

impl CapabilityMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Inserts a value, returning the previous one for that key.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<CapabilityValue>,
    ) -> Option<CapabilityValue> {
        self.0.insert(key.into(), value.into())
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<CapabilityValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Removes a top-level key, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<CapabilityValue> {
        self.0.remove(key)
    }

    /// Looks up a top-level key.
    pub fn get(&self, key: &str) -> Option<&CapabilityValue> {
        self.0.get(key)
    }

    /// Whether the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of top-level entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &CapabilityValue)> {
        self.0.iter()
    }

    /// Returns the value at `segments` without applying the falsy policy.
    pub fn lookup(&self, segments: &[String]) -> Option<&CapabilityValue> {
        match self.resolve(segments) {
            Resolution::Satisfied(value) | Resolution::Falsy(value) => Some(value),
            Resolution::Missing { .. } | Resolution::NotAMap { .. } => None,
        }
    }

    /// Walks `segments` through nested maps.
    ///
    /// A non-map value in the middle of the path is reported as
    /// [`Resolution::NotAMap`]; callers treat it exactly like a missing key.
    /// An empty segment list resolves against the map itself.
    pub fn resolve(&self, segments: &[String]) -> Resolution<'_> {
        let Some((last, parents)) = segments.split_last() else {
            return Resolution::Missing { depth: 0 };
        };

        let mut current = self;
        for (depth, key) in parents.iter().enumerate() {
            match current.0.get(key) {
                None => return Resolution::Missing { depth },
                Some(CapabilityValue::Map(nested)) => current = nested,
                Some(other) => {
                    return Resolution::NotAMap {
                        depth,
                        found: other.kind(),
                    };
                }
            }
        }

        match current.0.get(last) {
            None => Resolution::Missing {
                depth: parents.len(),
            },
            Some(value) if value.is_truthy() => Resolution::Satisfied(value),
            Some(value) => Resolution::Falsy(value),
        }
    }
}

impl FromIterator<(String, CapabilityValue)> for CapabilityMap {
    fn from_iter<I: IntoIterator<Item = (String, CapabilityValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
