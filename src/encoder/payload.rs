//! Stage four: reassembly, jsonify and the final charlist pass.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use tracing::debug;

use super::charlist::encode_json_charlists;
use crate::domain::{
    ContextSplitRecord, EncodeError, EncodedPayload, MetadataKey, NormalizedMap, NormalizedValue,
};

pub const CONTEXT_KEY: &str = "context";

/// What to do when user metadata already has a key named `context`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextCollision {
    /// The injected system context replaces the user value.
    #[default]
    Overwrite,
    /// The event is rejected with `EncodeError::ReservedKeyCollision`.
    Reject,
}

/// Wire-shaped record before jsonify.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledRecord {
    pub timestamp: String,
    pub level: String,
    pub message: String,
    pub metadata: NormalizedMap,
}

/// Puts user fields at the top level of `metadata` and the system fields
/// under `context`.
pub fn reassemble(
    record: ContextSplitRecord,
    policy: ContextCollision,
) -> Result<AssembledRecord, EncodeError> {
    let ContextSplitRecord {
        timestamp,
        level,
        message,
        context,
    } = record;

    let mut metadata = context.user;
    let colliding: Vec<MetadataKey> = metadata
        .keys()
        .filter(|key| key.name() == CONTEXT_KEY)
        .cloned()
        .collect();

    if !colliding.is_empty() {
        match policy {
            ContextCollision::Reject => {
                return Err(EncodeError::ReservedKeyCollision(CONTEXT_KEY.to_string()));
            }
            ContextCollision::Overwrite => {
                debug!("User metadata key 'context' overwritten by system context");
                for key in &colliding {
                    metadata.remove(key);
                }
            }
        }
    }

    metadata.insert(
        MetadataKey::atom(CONTEXT_KEY),
        NormalizedValue::Map(context.system),
    );

    Ok(AssembledRecord {
        timestamp,
        level: level.as_str().to_string(),
        message,
        metadata,
    })
}

/// Renders symbols as text and keyword lists as objects.
///
/// Keys are rendered by name; if a symbol key and a string key share a name
/// the string key wins, as does the last pair of a keyword list.
pub fn jsonify(value: &NormalizedValue) -> Value {
    match value {
        NormalizedValue::Null => Value::Null,
        NormalizedValue::Bool(b) => Value::Bool(*b),
        NormalizedValue::Integer(i) => Value::Number(Number::from(*i)),
        // Non-finite floats have no JSON form.
        NormalizedValue::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
        NormalizedValue::Text(text) | NormalizedValue::Atom(text) => Value::String(text.clone()),
        NormalizedValue::List(items) => Value::Array(items.iter().map(jsonify).collect()),
        NormalizedValue::Map(map) => Value::Object(jsonify_map(map)),
        NormalizedValue::Keyword(pairs) => Value::Object(
            pairs
                .iter()
                .map(|(key, value)| (key.clone(), jsonify(value)))
                .collect(),
        ),
    }
}

pub fn jsonify_map(map: &NormalizedMap) -> Map<String, Value> {
    map.iter()
        .map(|(key, value)| (key.name().to_string(), jsonify(value)))
        .collect()
}

/// Final safety pass over an already JSON-shaped value. Idempotent.
pub fn safety_pass(value: Value) -> Value {
    encode_json_charlists(value)
}

pub fn assemble(
    record: ContextSplitRecord,
    policy: ContextCollision,
) -> Result<EncodedPayload, EncodeError> {
    let assembled = reassemble(record, policy)?;

    let metadata = jsonify_map(&assembled.metadata)
        .into_iter()
        .map(|(key, value)| (key, safety_pass(value)))
        .collect();

    Ok(EncodedPayload {
        timestamp: assembled.timestamp,
        level: assembled.level,
        message: assembled.message,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LogLevel, SplitContext};
    use serde_json::json;

    fn split(system: NormalizedMap, user: NormalizedMap) -> ContextSplitRecord {
        ContextSplitRecord {
            timestamp: "2024-05-01T12:30:00.000000+00:00".to_string(),
            level: LogLevel::Warning,
            message: "hello".to_string(),
            context: SplitContext { system, user },
        }
    }

    fn text(value: &str) -> NormalizedValue {
        NormalizedValue::Text(value.to_string())
    }

    #[test]
    fn test_assemble_builds_wire_shape() {
        let system = NormalizedMap::from([(MetadataKey::atom("module"), text("Foo"))]);
        let user = NormalizedMap::from([(MetadataKey::atom("request_id"), text("abc"))]);

        let payload = assemble(split(system, user), ContextCollision::Overwrite).unwrap();

        assert_eq!(payload.level, "warning");
        assert_eq!(
            Value::Object(payload.metadata),
            json!({"request_id": "abc", "context": {"module": "Foo"}})
        );
    }

    #[test]
    fn test_assemble_empty_metadata() {
        let payload = assemble(
            split(NormalizedMap::new(), NormalizedMap::new()),
            ContextCollision::Overwrite,
        )
        .unwrap();
        assert_eq!(Value::Object(payload.metadata), json!({"context": {}}));
    }

    #[test]
    fn test_context_collision_overwrite() {
        let system = NormalizedMap::from([(MetadataKey::atom("module"), text("Foo"))]);
        let user = NormalizedMap::from([
            (MetadataKey::text("context"), text("user supplied")),
            (MetadataKey::atom("context"), text("user supplied too")),
        ]);

        let payload = assemble(split(system, user), ContextCollision::Overwrite).unwrap();
        assert_eq!(
            Value::Object(payload.metadata),
            json!({"context": {"module": "Foo"}})
        );
    }

    #[test]
    fn test_context_collision_reject() {
        let user = NormalizedMap::from([(MetadataKey::atom("context"), text("mine"))]);
        let result = assemble(split(NormalizedMap::new(), user), ContextCollision::Reject);
        assert_eq!(
            result.unwrap_err(),
            EncodeError::ReservedKeyCollision("context".to_string())
        );
    }

    #[test]
    fn test_jsonify_symbols_and_keywords() {
        let value = NormalizedValue::Map(NormalizedMap::from([
            (MetadataKey::atom("status"), NormalizedValue::Atom("ok".to_string())),
            (
                MetadataKey::atom("opts"),
                NormalizedValue::Keyword(vec![
                    ("timeout".to_string(), NormalizedValue::Integer(5)),
                    ("mode".to_string(), NormalizedValue::Atom("fast".to_string())),
                    ("timeout".to_string(), NormalizedValue::Integer(10)),
                ]),
            ),
        ]));

        assert_eq!(
            jsonify(&value),
            json!({"status": "ok", "opts": {"timeout": 10, "mode": "fast"}})
        );
    }

    #[test]
    fn test_jsonify_string_key_wins_over_symbol_key() {
        let map = NormalizedMap::from([
            (MetadataKey::atom("id"), NormalizedValue::Integer(1)),
            (MetadataKey::text("id"), NormalizedValue::Integer(2)),
        ]);
        assert_eq!(Value::Object(jsonify_map(&map)), json!({"id": 2}));
    }

    #[test]
    fn test_jsonify_non_finite_floats_become_null() {
        assert_eq!(jsonify(&NormalizedValue::Float(f64::NAN)), Value::Null);
        assert_eq!(jsonify(&NormalizedValue::Float(1.5)), json!(1.5));
    }

    #[test]
    fn test_safety_pass_is_idempotent() {
        let value = json!({"a": [104, 105], "b": [[1, 2], {"c": [111, 107]}], "d": null});
        let once = safety_pass(value);
        let twice = safety_pass(once.clone());
        assert_eq!(once, twice);
        assert_eq!(once, json!({"a": "hi", "b": [[1, 2], {"c": "ok"}], "d": null}));
    }
}
