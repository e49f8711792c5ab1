use crate::{Key, TypesError, TypesResult, Value};
use crate::value::json_type_name;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An untyped entity payload: field name to scalar value.
///
/// Saving a `Fields` replaces the stored entity wholesale, so a field missing
/// here is a field removed from the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fields(BTreeMap<String, Value>);

impl Fields {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a field bag from any serde type that serializes to a flat object.
    ///
    /// Nested objects and arrays are rejected; `None` fields serialize as
    /// `Value::Null`.
    pub fn from_serialize<T: Serialize + ?Sized>(data: &T) -> TypesResult<Self> {
        match serde_json::to_value(data)? {
            serde_json::Value::Object(map) => map
                .into_iter()
                .map(|(field, json)| match Value::from_json(&json) {
                    Some(value) => Ok((field, value)),
                    None => Err(TypesError::UnsupportedValue {
                        found: json_type_name(&json),
                        field,
                    }),
                })
                .collect(),
            other => Err(TypesError::NotAnObject(json_type_name(&other))),
        }
    }

    /// Decodes the field bag into a serde type.
    pub fn decode<T: DeserializeOwned>(&self) -> TypesResult<T> {
        let object: serde_json::Map<String, serde_json::Value> = self
            .0
            .iter()
            .map(|(field, value)| (field.clone(), value.to_json()))
            .collect();
        Ok(serde_json::from_value(serde_json::Value::Object(object))?)
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Value)> for Fields {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Fields {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Fields {
    type Item = (&'a String, &'a Value);
    type IntoIter = std::collections::btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A stored entity: its key alongside its fields.
///
/// The key is sidecar data. It never appears in `fields`, so comparing a
/// read-back entity with a fixture is `entity.into_fields() == fixture`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub key: Key,
    pub fields: Fields,
}

impl Entity {
    #[must_use]
    pub const fn new(key: Key, fields: Fields) -> Self {
        Self { key, fields }
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Drops the key half of the pair.
    #[must_use]
    pub fn into_fields(self) -> Fields {
        self.fields
    }

    /// Decodes the fields into a serde type.
    pub fn decode<T: DeserializeOwned>(&self) -> TypesResult<T> {
        self.fields.decode()
    }
}
