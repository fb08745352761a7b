use super::log_level::LogLevel;
use super::metadata::Metadata;

/// Local wall-clock time as handed over by the logger, without a zone.
///
/// Mirrors the `{{year, month, day}, {hour, minute, second, millisecond}}`
/// shape emitted by Erlang/Elixir logger front ends. Nothing is validated at
/// construction; the field normalizer rejects impossible calendar values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggerTimestamp {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub millisecond: u32,
}

impl LoggerTimestamp {
    pub fn new(date: (i32, u32, u32), time: (u32, u32, u32, u32)) -> Self {
        let (year, month, day) = date;
        let (hour, minute, second, millisecond) = time;
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
            millisecond,
        }
    }
}

/// A chardata fragment: text, raw UTF-8 bytes, a single code point, or a
/// nested list of further fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chardata {
    Text(String),
    Bytes(Vec<u8>),
    Char(u32),
    List(Vec<Chardata>),
}

impl From<&str> for Chardata {
    fn from(value: &str) -> Self {
        Chardata::Text(value.to_string())
    }
}

impl From<String> for Chardata {
    fn from(value: String) -> Self {
        Chardata::Text(value)
    }
}

/// Log message as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogMessage {
    Text(String),
    Fragments(Vec<Chardata>),
}

impl From<&str> for LogMessage {
    fn from(value: &str) -> Self {
        LogMessage::Text(value.to_string())
    }
}

impl From<String> for LogMessage {
    fn from(value: String) -> Self {
        LogMessage::Text(value)
    }
}

impl From<Vec<&str>> for LogMessage {
    fn from(value: Vec<&str>) -> Self {
        LogMessage::Fragments(value.into_iter().map(Chardata::from).collect())
    }
}

impl From<Vec<Chardata>> for LogMessage {
    fn from(value: Vec<Chardata>) -> Self {
        LogMessage::Fragments(value)
    }
}

/// The loosely-typed event handed to the encoder. Read-only for the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct RawLogEvent {
    pub timestamp: LoggerTimestamp,
    pub level: LogLevel,
    pub message: LogMessage,
    pub metadata: Metadata,
}
