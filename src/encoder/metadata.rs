//! Stage two: metadata flattening.

use tracing::trace;

use super::charlist::encode_metadata_charlists;
use super::stacktrace::StacktraceFormatter;
use crate::domain::{
    CrashReason, EncodeError, Metadata, MetadataKey, MetadataValue, NormalizedMap,
    NormalizedValue,
};

pub const PID_KEY: &str = "pid";
pub const CRASH_REASON_KEY: &str = "crash_reason";
pub const STACKTRACE_KEY: &str = "stacktrace";

/// Runs the full metadata stage: pid and crash encodings, recursive
/// flattening, then charlist detection.
pub fn normalize_metadata(
    metadata: &Metadata,
    formatter: &dyn StacktraceFormatter,
) -> Result<NormalizedMap, EncodeError> {
    let metadata = encode_pid(metadata.clone());
    let metadata = encode_crash_reason(metadata, formatter)?;

    let flattened: NormalizedMap = metadata
        .iter()
        .map(|(key, value)| (key.clone(), traverse_convert(value, formatter)))
        .collect();

    Ok(encode_metadata_charlists(flattened))
}

fn reserved_key(metadata: &Metadata, name: &str) -> Option<MetadataKey> {
    metadata.keys().find(|key| key.name() == name).cloned()
}

/// Replaces a process identifier under the `pid` key with its display string.
pub fn encode_pid(mut metadata: Metadata) -> Metadata {
    if let Some(key) = reserved_key(&metadata, PID_KEY)
        && let Some(MetadataValue::Pid(pid)) = metadata.get(&key)
    {
        let rendered = pid.to_string();
        trace!(pid = %rendered, "Encoded pid metadata");
        metadata.insert(key, MetadataValue::Text(rendered));
    }
    metadata
}

/// Drops `crash_reason` and adds a `stacktrace` key with the formatted trace.
///
/// A null crash reason is left untouched; any shape other than an
/// `(error, stacktrace)` pair is a precondition violation.
pub fn encode_crash_reason(
    mut metadata: Metadata,
    formatter: &dyn StacktraceFormatter,
) -> Result<Metadata, EncodeError> {
    let Some(key) = reserved_key(&metadata, CRASH_REASON_KEY) else {
        return Ok(metadata);
    };

    match metadata.get(&key) {
        Some(MetadataValue::Null) | None => Ok(metadata),
        Some(MetadataValue::CrashReason(crash)) => {
            let formatted = formatter.format(&crash.stacktrace);
            metadata.remove(&key);
            metadata.insert(
                key.renamed(STACKTRACE_KEY),
                MetadataValue::Text(formatted),
            );
            trace!("Encoded crash_reason metadata");
            Ok(metadata)
        }
        Some(other) => Err(EncodeError::MalformedCrashReason(other.kind().to_string())),
    }
}

fn crash_to_map(crash: &CrashReason, formatter: &dyn StacktraceFormatter) -> NormalizedValue {
    let mut map = NormalizedMap::new();
    map.insert(
        MetadataKey::atom(STACKTRACE_KEY),
        NormalizedValue::Text(formatter.format(&crash.stacktrace)),
    );
    NormalizedValue::Map(map)
}

/// Recursively reduces a metadata term to primitives, lists and maps.
///
/// Records lose their type tag, tuples become lists, and pids or crash
/// reasons outside the reserved keys are rendered like their reserved
/// counterparts.
pub fn traverse_convert(value: &MetadataValue, formatter: &dyn StacktraceFormatter) -> NormalizedValue {
    match value {
        MetadataValue::Null => NormalizedValue::Null,
        MetadataValue::Bool(b) => NormalizedValue::Bool(*b),
        MetadataValue::Integer(i) => NormalizedValue::Integer(*i),
        MetadataValue::Float(f) => NormalizedValue::Float(*f),
        MetadataValue::Text(text) => NormalizedValue::Text(text.clone()),
        MetadataValue::Atom(atom) => NormalizedValue::Atom(atom.clone()),
        MetadataValue::List(items) | MetadataValue::Tuple(items) => NormalizedValue::List(
            items
                .iter()
                .map(|item| traverse_convert(item, formatter))
                .collect(),
        ),
        MetadataValue::Map(map) => NormalizedValue::Map(
            map.iter()
                .map(|(key, value)| (key.clone(), traverse_convert(value, formatter)))
                .collect(),
        ),
        MetadataValue::Keyword(pairs) => NormalizedValue::Keyword(
            pairs
                .iter()
                .map(|(key, value)| (key.clone(), traverse_convert(value, formatter)))
                .collect(),
        ),
        MetadataValue::Record(record) => NormalizedValue::Map(
            record
                .fields
                .iter()
                .map(|(field, value)| {
                    (
                        MetadataKey::atom(field.as_str()),
                        traverse_convert(value, formatter),
                    )
                })
                .collect(),
        ),
        MetadataValue::Pid(pid) => NormalizedValue::Text(pid.to_string()),
        MetadataValue::CrashReason(crash) => crash_to_map(crash, formatter),
    }
}
