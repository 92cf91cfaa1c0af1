//! Feature records handed to the classifier and the labels it returns.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ElementId;
use crate::schema::fields;

/// Ordered field → value mapping for one element.
///
/// Serializes as a JSON object whose keys keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureRecord {
    fields: Vec<(String, String)>,
}

impl FeatureRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record with exactly `names`, in that order.
    pub fn from_fields<'a>(
        names: impl IntoIterator<Item = &'a str>,
        mut value: impl FnMut(&str) -> String,
    ) -> Self {
        let fields = names
            .into_iter()
            .map(|name| (name.to_string(), value(name)))
            .collect();
        Self { fields }
    }

    /// Set a field, replacing an existing value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn element_id(&self) -> Option<ElementId> {
        self.get(fields::ELEMENT_ID)?.parse().ok().map(ElementId)
    }
}

impl Serialize for FeatureRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Collects a JSON object of string values without losing key order.
struct OrderedStringMap;

impl<'de> Visitor<'de> for OrderedStringMap {
    type Value = Vec<(String, String)>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object of string values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((k, v)) = access.next_entry::<String, String>()? {
            entries.push((k, v));
        }
        Ok(entries)
    }
}

impl<'de> Deserialize<'de> for FeatureRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = deserializer.deserialize_map(OrderedStringMap)?;
        let mut record = FeatureRecord::new();
        for (k, v) in entries {
            record.insert(k, v);
        }
        Ok(record)
    }
}

/// Records in scan order: category order, then collection order within a category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureRecordSet {
    records: Vec<FeatureRecord>,
}

impl FeatureRecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: FeatureRecord) {
        self.records.push(record);
    }

    pub fn first(&self) -> Option<&FeatureRecord> {
        self.records.first()
    }

    /// Tabular column headers: the keys of the first record.
    pub fn headers(&self) -> Vec<&str> {
        self.first().map(|r| r.keys().collect()).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<FeatureRecord> for FeatureRecordSet {
    fn from_iter<I: IntoIterator<Item = FeatureRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

/// Object id (string form) → classification code, in the order the
/// classifier wrote them.
///
/// Keys are kept verbatim; whether a key names an element is decided when
/// the result is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassificationResult {
    entries: Vec<(String, String)>,
}

impl ClassificationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ClassificationResult {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl Serialize for ClassificationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ClassificationResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = deserializer.deserialize_map(OrderedStringMap)?;
        Ok(Self { entries })
    }
}
