//! Structured values and property maps
//!
//! Every resource input and output is a [`PropertyMap`]: a keyed bag of
//! [`Value`]s. Values carry two markers beyond plain data:
//!
//! - [`Value::Secret`] wraps a value that must be redacted in display and
//!   persisted encrypted by the engine.
//! - [`Value::Unknown`] stands in for a value that only exists once the
//!   remote operation has run (preview mode).
//!
//! Equality treats secrecy as transparent: `Secret("x") == "x"`. The diff
//! engine relies on this so that marking a field secret is never a change.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A single structured value
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(PropertyMap),
    /// A value that must not be shown or stored in plaintext
    Secret(Box<Value>),
    /// A value that is not known until the remote operation runs
    Unknown,
}

impl Value {
    /// Wrap a value as secret, without nesting secret markers
    pub fn secret(inner: impl Into<Self>) -> Self {
        match inner.into() {
            secret @ Self::Secret(_) => secret,
            other => Self::Secret(Box::new(other)),
        }
    }

    /// The value underneath any secret markers
    pub fn unwrap_secret(&self) -> &Self {
        let mut current = self;
        while let Self::Secret(inner) = current {
            current = inner;
        }
        current
    }

    /// Consume the value, dropping any secret markers
    pub fn into_unsecret(self) -> Self {
        match self {
            Self::Secret(inner) => inner.into_unsecret(),
            other => other,
        }
    }

    pub const fn is_secret(&self) -> bool {
        matches!(self, Self::Secret(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self.unwrap_secret(), Self::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self.unwrap_secret(), Self::Unknown)
    }

    /// Whether the value is semantically present (anything but null)
    pub fn has_value(&self) -> bool {
        !self.is_null()
    }

    /// Whether this value or anything nested in it is unknown
    pub fn contains_unknowns(&self) -> bool {
        match self.unwrap_secret() {
            Self::Unknown => true,
            Self::Array(items) => items.iter().any(Self::contains_unknowns),
            Self::Object(map) => map.values().any(Self::contains_unknowns),
            _ => false,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.unwrap_secret() {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.unwrap_secret() {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Integral numbers only
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_i64(&self) -> Option<i64> {
        self.as_f64()
            .filter(|n| n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER)
            .map(|n| n as i64)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.unwrap_secret() {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Self]> {
        match self.unwrap_secret() {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&PropertyMap> {
        match self.unwrap_secret() {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Short name of the value's kind, for messages
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Secret(_) => "secret",
            Self::Unknown => "unknown",
        }
    }

    /// Sort an array value in place; other kinds are left alone
    pub fn sort_array_by<F>(&mut self, mut compare: F)
    where
        F: FnMut(&Self, &Self) -> std::cmp::Ordering,
    {
        match self {
            Self::Array(items) => items.sort_by(|a, b| compare(a, b)),
            Self::Secret(inner) => inner.sort_array_by(compare),
            _ => {}
        }
    }

    /// Plain JSON view of the value
    ///
    /// Secrets are unwrapped and unknowns become `null`. Integral numbers are
    /// emitted as integers so typed structs with integer fields deserialize.
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_native(&self) -> serde_json::Value {
        match self.unwrap_secret() {
            Self::Null | Self::Unknown | Self::Secret(_) => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER => {
                serde_json::Value::from(*n as i64)
            }
            Self::Number(n) => serde_json::Number::from_f64(*n)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Array(items) => {
                serde_json::Value::Array(items.iter().map(Self::to_native).collect())
            }
            Self::Object(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_native()))
                    .collect(),
            ),
        }
    }

    /// Build a value from plain JSON (no secret or unknown markers)
    pub fn from_native(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Self::Null, Self::Number),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Self::from_native).collect())
            }
            serde_json::Value::Object(map) => Self::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from_native(v)))
                    .collect(),
            ),
        }
    }
}

/// 2^53, the largest range where f64 holds every integer exactly
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self.unwrap_secret(), other.unwrap_secret()) {
            (Self::Null, Self::Null) | (Self::Unknown, Self::Unknown) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a.to_bits() == b.to_bits(),
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Object(map) => write!(f, "{map}"),
            Self::Secret(_) => write!(f, "[secret]"),
            Self::Unknown => write!(f, "[unknown]"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for Value {
    #[allow(clippy::cast_precision_loss)]
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Self::String(s.clone())
    }
}

impl From<PropertyMap> for Value {
    fn from(map: PropertyMap) -> Self {
        Self::Object(map)
    }
}

impl<T: Into<Self>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Null, Into::into)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        crate::wire::encode(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        crate::wire::decode(json).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// PropertyMap
// ============================================================================

/// A keyed bag of values, ordered by key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyMap(BTreeMap<String, Value>);

impl PropertyMap {
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.0.get_mut(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Present and not null
    pub fn has_value(&self, key: &str) -> bool {
        self.0.get(key).is_some_and(Value::has_value)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.0.values()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.0.iter()
    }

    pub fn retain<F: FnMut(&str, &mut Value) -> bool>(&mut self, mut keep: F) {
        self.0.retain(|k, v| keep(k, v));
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    pub fn get_array(&self, key: &str) -> Option<&[Value]> {
        self.get(key).and_then(Value::as_array)
    }

    pub fn get_object(&self, key: &str) -> Option<&PropertyMap> {
        self.get(key).and_then(Value::as_object)
    }

    /// String elements of an array field; non-strings are skipped
    pub fn get_strings(&self, key: &str) -> Vec<String> {
        self.get_array(key)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Copy of this map with null entries removed
    #[must_use]
    pub fn without_nulls(&self) -> Self {
        self.0
            .iter()
            .filter(|(_, v)| v.has_value())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Whether any value in the map is unknown
    pub fn contains_unknowns(&self) -> bool {
        self.0.values().any(Value::contains_unknowns)
    }

    /// Decode the map into a typed struct through its plain JSON view
    pub fn to_typed<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_value(Value::Object(self.clone()).to_native())
    }

    /// Encode a typed struct into a map; top-level nulls are dropped
    pub fn from_typed<T: Serialize>(typed: &T) -> serde_json::Result<Self> {
        match Value::from_native(serde_json::to_value(typed)?) {
            Value::Object(map) => Ok(map.without_nulls()),
            other => Err(serde::ser::Error::custom(format!(
                "expected an object, found {}",
                other.type_name()
            ))),
        }
    }
}

impl fmt::Display for PropertyMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{key}: {value}")?;
        }
        write!(f, "}}")
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for PropertyMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl IntoIterator for PropertyMap {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a PropertyMap {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<BTreeMap<String, Value>> for PropertyMap {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

impl Serialize for PropertyMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PropertyMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        BTreeMap::<String, Value>::deserialize(deserializer).map(Self)
    }
}
