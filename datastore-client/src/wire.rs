//! JSON shapes of the Cloud Datastore REST v1 API.
//!
//! Only the subset used by the four store operations is modelled. Shared by
//! the HTTP client and the local emulator server so both ends agree on the
//! encoding.

use crate::error::{StoreError, StoreResult};
use datastore_types::{Entity, Fields, Identifier, Key, Kind, Value};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionId {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathElement {
    pub kind: String,
    /// int64 ids travel as decimal strings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_id: Option<PartitionId>,
    pub path: Vec<PathElement>,
}

impl WireKey {
    pub fn from_key(key: &Key, partition: &PartitionId) -> Self {
        let (id, name) = match key.identifier() {
            Some(Identifier::Id(id)) => (Some(id.to_string()), None),
            Some(Identifier::Name(name)) => (None, Some(name.clone())),
            None => (None, None),
        };
        Self {
            partition_id: Some(partition.clone()),
            path: vec![PathElement {
                kind: key.kind().to_string(),
                id,
                name,
            }],
        }
    }

    /// Maps the last path element onto a [`Key`]. Ancestor elements are not
    /// modelled and are dropped.
    pub fn to_key(&self) -> StoreResult<Key> {
        let leaf = self
            .path
            .last()
            .ok_or_else(|| StoreError::InvalidResponse("key with empty path".to_string()))?;
        let kind = Kind::new(leaf.kind.clone())?;
        let identifier = match (&leaf.id, &leaf.name) {
            (Some(id), _) => Some(Identifier::Id(id.parse().map_err(|_| {
                StoreError::InvalidResponse(format!("non-numeric key id `{id}`"))
            })?)),
            (None, Some(name)) => Some(Identifier::Name(name.clone())),
            (None, None) => None,
        };
        Ok(Key::from_parts(kind, identifier))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireEntity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<WireKey>,
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl WireEntity {
    pub fn from_entity(entity: &Entity, partition: &PartitionId) -> Self {
        Self {
            key: Some(WireKey::from_key(&entity.key, partition)),
            properties: encode_fields(&entity.fields),
        }
    }

    pub fn into_entity(self) -> StoreResult<Entity> {
        let key = self
            .key
            .ok_or_else(|| StoreError::InvalidResponse("entity without key".to_string()))?
            .to_key()?;
        let fields = decode_properties(&self.properties)?;
        Ok(Entity::new(key, fields))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityResult {
    pub entity: WireEntity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupRequest {
    pub keys: Vec<WireKey>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LookupResponse {
    #[serde(default)]
    pub found: Vec<EntityResult>,
    #[serde(default)]
    pub missing: Vec<EntityResult>,
    /// Keys the backend did not get to; they must be looked up again.
    #[serde(default)]
    pub deferred: Vec<WireKey>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KindExpression {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyReference {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyFilter {
    pub property: PropertyReference,
    pub op: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireFilter {
    pub property_filter: PropertyFilter,
}

pub const OP_EQUAL: &str = "EQUAL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireQuery {
    pub kind: Vec<KindExpression>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<WireFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_id: Option<PartitionId>,
    pub query: WireQuery,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MoreResults {
    NotFinished,
    MoreResultsAfterLimit,
    MoreResultsAfterCursor,
    #[default]
    NoMoreResults,
    #[serde(other)]
    MoreResultsTypeUnspecified,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResultBatch {
    #[serde(default)]
    pub entity_results: Vec<EntityResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_cursor: Option<String>,
    #[serde(default)]
    pub more_results: MoreResults,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunQueryResponse {
    #[serde(default)]
    pub batch: QueryResultBatch,
}

pub const MODE_NON_TRANSACTIONAL: &str = "NON_TRANSACTIONAL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mutation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert: Option<WireEntity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upsert: Option<WireEntity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitRequest {
    pub mode: String,
    pub mutations: Vec<Mutation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MutationResult {
    /// Present only when the mutation completed an incomplete key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<WireKey>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitResponse {
    #[serde(default)]
    pub mutation_results: Vec<MutationResult>,
}

/// Google API error envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Encodes a scalar into its typed REST representation.
pub fn encode_value(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Boolean(b) => json!({ "booleanValue": b }),
        Value::Integer(i) => json!({ "integerValue": i.to_string() }),
        Value::Double(d) if d.is_nan() => json!({ "doubleValue": "NaN" }),
        Value::Double(d) if d.is_infinite() => {
            json!({ "doubleValue": if *d > 0.0 { "Infinity" } else { "-Infinity" } })
        }
        Value::Double(d) => json!({ "doubleValue": d }),
        Value::String(s) => json!({ "stringValue": s }),
    }
}

/// Decodes a typed REST value. Timestamps are surfaced as RFC 3339 strings;
/// arrays, embedded entities, keys, blobs and geo points are rejected.
pub fn decode_value(raw: &serde_json::Value) -> StoreResult<Value> {
    let object = raw
        .as_object()
        .ok_or_else(|| StoreError::InvalidResponse(format!("value is not an object: {raw}")))?;

    if object.contains_key("nullValue") {
        return Ok(Value::Null);
    }
    if let Some(b) = object.get("booleanValue") {
        return b
            .as_bool()
            .map(Value::Boolean)
            .ok_or_else(|| invalid("booleanValue", b));
    }
    if let Some(i) = object.get("integerValue") {
        let parsed = match i {
            serde_json::Value::String(s) => s.parse().ok(),
            other => other.as_i64(),
        };
        return parsed.map(Value::Integer).ok_or_else(|| invalid("integerValue", i));
    }
    if let Some(d) = object.get("doubleValue") {
        let parsed = match d {
            serde_json::Value::String(s) => match s.as_str() {
                "NaN" => Some(f64::NAN),
                "Infinity" => Some(f64::INFINITY),
                "-Infinity" => Some(f64::NEG_INFINITY),
                other => other.parse().ok(),
            },
            other => other.as_f64(),
        };
        return parsed.map(Value::Double).ok_or_else(|| invalid("doubleValue", d));
    }
    if let Some(s) = object.get("stringValue").or_else(|| object.get("timestampValue")) {
        return s
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(|| invalid("stringValue", s));
    }

    let found = object.keys().next().map_or("<empty>", String::as_str);
    Err(StoreError::InvalidResponse(format!(
        "unsupported value type `{found}`"
    )))
}

pub fn encode_fields(fields: &Fields) -> serde_json::Map<String, serde_json::Value> {
    fields
        .iter()
        .map(|(name, value)| (name.clone(), encode_value(value)))
        .collect()
}

pub fn decode_properties(
    properties: &serde_json::Map<String, serde_json::Value>,
) -> StoreResult<Fields> {
    properties
        .iter()
        .map(|(name, raw)| decode_value(raw).map(|value| (name.clone(), value)))
        .collect()
}

fn invalid(field: &str, raw: &serde_json::Value) -> StoreError {
    StoreError::InvalidResponse(format!("malformed {field}: {raw}"))
}
