//! Structured node payloads with a raw-bytes fallback.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Map;
use serde_json::Value;

use crate::PayloadError;

/// Contents of a node as seen by the coordination recipes.
///
/// Writers always produce a JSON object. Readers must tolerate nodes written
/// by other tools, so anything that does not decode to a JSON object is kept
/// as raw bytes instead of failing the read.
#[derive(Debug, Clone, PartialEq)]
pub enum NodePayload {
    /// A JSON object.
    Structured(Map<String, Value>),
    /// Bytes that could not be decoded as a JSON object.
    Raw(Vec<u8>),
}

impl Default for NodePayload {
    fn default() -> Self {
        Self::Structured(Map::new())
    }
}

impl NodePayload {
    /// Build a structured payload from any value that serializes to a JSON object.
    pub fn from_serializable<T: Serialize + ?Sized>(value: &T) -> Result<Self, PayloadError> {
        match serde_json::to_value(value)? {
            Value::Object(map) => Ok(Self::Structured(map)),
            other => Err(PayloadError::NotAnObject {
                kind: json_kind(&other),
            }),
        }
    }

    /// Decode stored bytes, falling back to [`NodePayload::Raw`].
    pub fn decode(bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return Self::Raw(Vec::new());
        }
        match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::Object(map)) => Self::Structured(map),
            _ => Self::Raw(bytes.to_vec()),
        }
    }

    /// Encode for storage.
    pub fn to_bytes(&self) -> Result<Vec<u8>, PayloadError> {
        match self {
            Self::Structured(map) => Ok(serde_json::to_vec(map)?),
            Self::Raw(bytes) => Ok(bytes.clone()),
        }
    }

    /// Returns true if the payload decoded as a JSON object.
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Structured(_))
    }

    /// The JSON object, if structured.
    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Structured(map) => Some(map),
            Self::Raw(_) => None,
        }
    }

    /// The raw bytes, if decoding failed.
    pub fn as_raw(&self) -> Option<&[u8]> {
        match self {
            Self::Structured(_) => None,
            Self::Raw(bytes) => Some(bytes),
        }
    }

    /// Look up a top-level field of a structured payload.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Insert a top-level field. Raw payloads are left untouched.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        if let Self::Structured(map) = self {
            map.insert(key.into(), value);
        }
    }

    /// Merge another structured payload's fields into this one.
    pub fn merge(&mut self, other: &NodePayload) {
        if let (Self::Structured(map), Some(extra)) = (&mut *self, other.as_object()) {
            for (k, v) in extra {
                map.insert(k.clone(), v.clone());
            }
        }
    }

    /// Best-effort typed view of a structured payload.
    pub fn decode_as<T: DeserializeOwned>(&self) -> Option<T> {
        let map = self.as_object()?;
        serde_json::from_value(Value::Object(map.clone())).ok()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
