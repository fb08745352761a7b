//! The four-stage encoding pipeline.
//!
//! ```text
//! RawLogEvent ─► fields ─► metadata ─► context ─► payload ─► EncodedPayload
//! ```
//!
//! Every stage is a pure function returning a new value; the `Encoder` only
//! carries the injected collaborators and is safe to share across threads.

pub mod charlist;
pub mod context;
pub mod fields;
pub mod metadata;
pub mod payload;
pub mod stacktrace;
pub mod time_zone;

pub use context::RecognizedKeys;
pub use payload::ContextCollision;
pub use stacktrace::{ElixirStacktraceFormatter, StacktraceFormatter};
pub use time_zone::{FixedTimeZone, LocalTimeZone, TimeZoneResolver, TimeZoneSetting};

use tracing::trace;

use crate::domain::{
    EncodeError, EncodedPayload, LogLevel, LogMessage, LoggerTimestamp, Metadata,
    NormalizedLogRecord, RawLogEvent,
};

#[derive(Debug, Clone, Default)]
pub struct EncoderConfig {
    pub recognized_keys: RecognizedKeys,
    pub context_collision: ContextCollision,
    pub time_zone: TimeZoneSetting,
}

#[derive(Debug)]
pub struct Encoder {
    recognized_keys: RecognizedKeys,
    context_collision: ContextCollision,
    time_zone: Box<dyn TimeZoneResolver>,
    formatter: Box<dyn StacktraceFormatter>,
}

impl Encoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self {
            time_zone: config.time_zone.resolver(),
            recognized_keys: config.recognized_keys,
            context_collision: config.context_collision,
            formatter: Box::new(ElixirStacktraceFormatter),
        }
    }

    pub fn with_time_zone(mut self, resolver: impl TimeZoneResolver + 'static) -> Self {
        self.time_zone = Box::new(resolver);
        self
    }

    pub fn with_stacktrace_formatter(
        mut self,
        formatter: impl StacktraceFormatter + 'static,
    ) -> Self {
        self.formatter = Box::new(formatter);
        self
    }

    pub fn recognized_keys(&self) -> &RecognizedKeys {
        &self.recognized_keys
    }

    /// Stages one and two.
    pub fn normalize(
        &self,
        timestamp: &LoggerTimestamp,
        level: LogLevel,
        message: &LogMessage,
        metadata: &Metadata,
    ) -> Result<NormalizedLogRecord, EncodeError> {
        let message = fields::normalize_message(message)?;
        let timestamp = fields::normalize_timestamp(timestamp, self.time_zone.as_ref())?;
        let metadata = metadata::normalize_metadata(metadata, self.formatter.as_ref())?;
        trace!(keys = metadata.len(), "Normalized log record");

        Ok(NormalizedLogRecord {
            timestamp,
            level,
            message,
            metadata,
        })
    }

    pub fn encode(
        &self,
        timestamp: &LoggerTimestamp,
        level: LogLevel,
        message: &LogMessage,
        metadata: &Metadata,
    ) -> Result<EncodedPayload, EncodeError> {
        let record = self.normalize(timestamp, level, message, metadata)?;
        let split = context::split_context(record, &self.recognized_keys);
        trace!(
            system = split.context.system.len(),
            user = split.context.user.len(),
            "Split metadata context"
        );
        payload::assemble(split, self.context_collision)
    }

    pub fn encode_event(&self, event: &RawLogEvent) -> Result<EncodedPayload, EncodeError> {
        self.encode(
            &event.timestamp,
            event.level,
            &event.message,
            &event.metadata,
        )
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new(EncoderConfig::default())
    }
}
