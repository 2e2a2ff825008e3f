//! Generic decoded document tree.
//!
//! Every input format (JSON, GraphQL responses, CSV, XML)
//! is reduced to a [`NestedValue`] before any selector or column logic runs.
//! Mappings keep insertion order and are looked up by exact key.

use serde::ser::{SerializeMap, SerializeSeq};
use rustc_hash::FxHashMap;
use serde::{Serialize, Serializer};

/// A decoded document node: scalar, ordered sequence, or keyed mapping.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum NestedValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Sequence(Vec<NestedValue>),
    Mapping(Mapping),
}

impl NestedValue {
    /// Returns `true` for anything that is not a sequence or a mapping.
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Self::Sequence(_) | Self::Mapping(_))
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, Self::Sequence(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[NestedValue]> {
        match self {
            Self::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Self::Mapping(m) => Some(m),
            _ => None,
        }
    }

    /// Returns `true` for the empty string, the value substituted for an
    /// absent selector.
    pub fn is_empty_string(&self) -> bool {
        matches!(self, Self::String(s) if s.is_empty())
    }

    /// Textual rendering used for labels and for string-based parsing.
    ///
    /// Null renders as the empty string, sequences join their items with
    /// `,`, and mappings render as the empty string.
    pub fn to_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => format_number(*n),
            Self::String(s) => s.clone(),
            Self::Sequence(items) => items
                .iter()
                .map(NestedValue::to_text)
                .collect::<Vec<_>>()
                .join(","),
            Self::Mapping(_) => String::new(),
        }
    }
}

/// Render a number the way a script runtime prints it: integral values carry
/// no fractional part and non-finite values use their long names. Magnitudes
/// of 1e21 and above or below 1e-6 switch to exponent notation (`1e-7`,
/// `1.5e+21`).
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let name = if n > 0.0 { "Infinity" } else { "-Infinity" };
        name.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.abs() >= 1e21 || n.abs() < 1e-6 {
        let text = format!("{n:e}");
        match text.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
            _ => text,
        }
    } else {
        n.to_string()
    }
}

impl From<&str> for NestedValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for NestedValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<f64> for NestedValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for NestedValue {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<bool> for NestedValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Vec<NestedValue>> for NestedValue {
    fn from(items: Vec<NestedValue>) -> Self {
        Self::Sequence(items)
    }
}

impl From<Mapping> for NestedValue {
    fn from(m: Mapping) -> Self {
        Self::Mapping(m)
    }
}

impl From<serde_json::Value> for NestedValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Sequence(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => {
                let mut m = Mapping::with_capacity(map.len());
                for (k, v) in map {
                    m.insert(k, NestedValue::from(v));
                }
                Self::Mapping(m)
            }
        }
    }
}

impl Serialize for NestedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::String(s) => serializer.serialize_str(s),
            Self::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Mapping(m) => m.serialize(serializer),
        }
    }
}

// ============================================================================
// Mapping: ordered string-keyed entries
// ============================================================================

/// Ordered key/value entries with a hashed key index.
///
/// Keys are unique; [`Mapping::insert`] replaces an existing key in place
/// and keeps its position. Lookup and insert are O(1) on average, so decoding
/// wide objects stays linear.
#[derive(Debug, Clone, Default)]
pub struct Mapping {
    entries: Vec<(String, NestedValue)>,
    index: FxHashMap<String, usize>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    pub fn get(&self, key: &str) -> Option<&NestedValue> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut NestedValue> {
        let i = self.index.get(key).copied()?;
        Some(&mut self.entries[i].1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<NestedValue>) {
        let key = key.into();
        let value = value.into();
        match self.index.get(&key).copied() {
            Some(i) => self.entries[i].1 = value,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NestedValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// The index is derived from the entries.
impl PartialEq for Mapping {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<K: Into<String>, V: Into<NestedValue>> FromIterator<(K, V)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut m = Mapping::with_capacity(iter.size_hint().0);
        for (k, v) in iter {
            m.insert(k, v);
        }
        m
    }
}

impl IntoIterator for Mapping {
    type Item = (String, NestedValue);
    type IntoIter = std::vec::IntoIter<(String, NestedValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for Mapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}
