//! Stage three: system/user context partition.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::domain::{ContextSplitRecord, MetadataKey, NormalizedLogRecord, SplitContext};

/// Metadata key names routed to the `system` context.
///
/// Matching is by name, so a symbol key and a string key with the same name
/// are treated alike.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecognizedKeys(BTreeSet<String>);

impl RecognizedKeys {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(keys.into_iter().map(Into::into).collect())
    }

    /// Metadata keys populated by the Erlang/Elixir logger itself.
    pub fn logger_defaults() -> Self {
        Self::new([
            "application",
            "module",
            "function",
            "file",
            "line",
            "pid",
            "crash_reason",
            "initial_call",
            "registered_name",
            "domain",
            "gl",
            "mfa",
            "time",
        ])
    }

    pub fn contains(&self, key: &MetadataKey) -> bool {
        self.0.contains(key.name())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for RecognizedKeys {
    fn default() -> Self {
        Self::logger_defaults()
    }
}

pub fn split_context(record: NormalizedLogRecord, keys: &RecognizedKeys) -> ContextSplitRecord {
    let (system, user) = record
        .metadata
        .into_iter()
        .partition(|(key, _)| keys.contains(key));

    ContextSplitRecord {
        timestamp: record.timestamp,
        level: record.level,
        message: record.message,
        context: SplitContext { system, user },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LogLevel, NormalizedMap, NormalizedValue};

    fn record(metadata: NormalizedMap) -> NormalizedLogRecord {
        NormalizedLogRecord {
            timestamp: "2024-05-01T12:30:00.000000+00:00".to_string(),
            level: LogLevel::Info,
            message: "hello".to_string(),
            metadata,
        }
    }

    fn text(value: &str) -> NormalizedValue {
        NormalizedValue::Text(value.to_string())
    }

    #[test]
    fn test_split_routes_recognized_keys_to_system() {
        let keys = RecognizedKeys::new(["module", "function", "file", "line"]);
        let metadata = NormalizedMap::from([
            (MetadataKey::atom("module"), text("Foo")),
            (MetadataKey::atom("request_id"), text("abc")),
        ]);

        let split = split_context(record(metadata), &keys);

        assert_eq!(
            split.context.system,
            NormalizedMap::from([(MetadataKey::atom("module"), text("Foo"))])
        );
        assert_eq!(
            split.context.user,
            NormalizedMap::from([(MetadataKey::atom("request_id"), text("abc"))])
        );
        assert_eq!(split.message, "hello");
    }

    #[test]
    fn test_split_matches_string_keys_by_name() {
        let keys = RecognizedKeys::new(["line"]);
        let metadata = NormalizedMap::from([(MetadataKey::text("line"), NormalizedValue::Integer(3))]);

        let split = split_context(record(metadata), &keys);
        assert_eq!(split.context.system.len(), 1);
        assert!(split.context.user.is_empty());
    }

    #[test]
    fn test_split_loses_no_keys() {
        let keys = RecognizedKeys::logger_defaults();
        let metadata: NormalizedMap = ["pid", "module", "user_id", "trace", "line", "custom"]
            .into_iter()
            .map(|name| (MetadataKey::atom(name), text(name)))
            .collect();

        let split = split_context(record(metadata.clone()), &keys);

        assert_eq!(
            split.context.system.len() + split.context.user.len(),
            metadata.len()
        );
        for key in split.context.system.keys() {
            assert!(keys.contains(key));
            assert!(!split.context.user.contains_key(key));
        }
        for key in split.context.user.keys() {
            assert!(!keys.contains(key));
        }
    }

    #[test]
    fn test_empty_metadata_splits_into_empty_buckets() {
        let split = split_context(record(NormalizedMap::new()), &RecognizedKeys::default());
        assert_eq!(split.context, SplitContext::default());
    }
}
