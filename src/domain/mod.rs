//! Domain layer for rask-log-encoder.
//!
//! Contains the canonical types shared across the encoding pipeline:
//! - `RawLogEvent`: The loosely-typed event handed over by a logging front end
//! - `MetadataValue`: Arbitrary metadata terms (pids, crash reasons, records, tuples)
//! - `NormalizedValue`: Metadata after flattening, before the safety pass
//! - `EncodedPayload`: The JSON-safe wire shape
//! - `LogLevel`: Logger severity tag
//! - `EncodeError`: Fatal precondition errors

pub mod error;
pub mod log_event;
pub mod log_level;
pub mod metadata;
pub mod payload;

pub use error::EncodeError;
pub use log_event::{Chardata, LogMessage, LoggerTimestamp, RawLogEvent};
pub use log_level::LogLevel;
pub use metadata::{
    CrashReason, Metadata, MetadataKey, MetadataValue, ProcessId, Record, StackFrame,
    StructuredRecord,
};
pub use payload::{
    ContextSplitRecord, EncodedPayload, NormalizedLogRecord, NormalizedMap, NormalizedValue,
    SplitContext,
};
