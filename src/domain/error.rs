use thiserror::Error;

/// Fatal precondition violations raised while encoding a single event.
///
/// No partial payload is ever produced; the calling front end decides whether
/// to drop the event or substitute a fallback.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Malformed crash_reason: expected an (error, stacktrace) pair, got {0}")]
    MalformedCrashReason(String),

    #[error("User metadata key '{0}' collides with the injected context key")]
    ReservedKeyCollision(String),

    #[error("Time zone resolution failed: {0}")]
    TimeZone(String),
}
