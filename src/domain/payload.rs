use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::log_level::LogLevel;
use super::metadata::MetadataKey;

pub type NormalizedMap = BTreeMap<MetadataKey, NormalizedValue>;

/// Metadata after flattening: no pids, crash descriptors, records or tuples.
///
/// Symbols and keyword lists survive until the safety pass.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Atom(String),
    List(Vec<NormalizedValue>),
    Map(NormalizedMap),
    Keyword(Vec<(String, NormalizedValue)>),
}

/// Output of the field and metadata normalizers.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedLogRecord {
    pub timestamp: String,
    pub level: LogLevel,
    pub message: String,
    pub metadata: NormalizedMap,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitContext {
    pub system: NormalizedMap,
    pub user: NormalizedMap,
}

/// A normalized record whose metadata has been partitioned.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextSplitRecord {
    pub timestamp: String,
    pub level: LogLevel,
    pub message: String,
    pub context: SplitContext,
}

/// JSON-safe payload ready for an external transport.
///
/// `metadata` holds the user fields flat plus a `context` object with the
/// recognized system fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedPayload {
    pub timestamp: String,
    pub level: String,
    pub message: String,
    pub metadata: Map<String, Value>,
}

impl EncodedPayload {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn into_value(self) -> Value {
        let mut object = Map::new();
        object.insert("timestamp".to_string(), Value::String(self.timestamp));
        object.insert("level".to_string(), Value::String(self.level));
        object.insert("message".to_string(), Value::String(self.message));
        object.insert("metadata".to_string(), Value::Object(self.metadata));
        Value::Object(object)
    }

    pub fn context(&self) -> Option<&Map<String, Value>> {
        self.metadata.get("context").and_then(Value::as_object)
    }
}
