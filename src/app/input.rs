//! Newline-delimited JSON wire form of raw logger events.
//!
//! Plain JSON values map onto their obvious `MetadataValue` counterparts.
//! Terms JSON cannot express are written as single-tag objects:
//!
//! | tag        | wire form                                                      |
//! |------------|----------------------------------------------------------------|
//! | `$atom`    | `{"$atom": "ok"}`                                              |
//! | `$pid`     | `{"$pid": "<0.120.0>"}`                                        |
//! | `$tuple`   | `{"$tuple": [1, 2]}`                                           |
//! | `$keyword` | `{"$keyword": [["timeout", 5]]}`                               |
//! | `$record`  | `{"$record": "Elixir.HttpError", "fields": {"status": 500}}`   |
//! | `$crash`   | `{"$crash": {"error": {"$atom": "badarg"}, "stacktrace": []}}` |
//!
//! A tagged object holds nothing but its tag, except `fields` beside
//! `$record`; any other key is rejected. Integers must fit in an `i64`.
//!
//! Message fragments may additionally use `{"$bytes": [..]}` for raw bytes.

use serde::Deserialize;
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::domain::{
    Chardata, CrashReason, LogLevel, LogMessage, LoggerTimestamp, Metadata, MetadataKey,
    MetadataValue, ProcessId, RawLogEvent, Record, StackFrame,
};

const ATOM_TAG: &str = "$atom";
const PID_TAG: &str = "$pid";
const TUPLE_TAG: &str = "$tuple";
const KEYWORD_TAG: &str = "$keyword";
const RECORD_TAG: &str = "$record";
const CRASH_TAG: &str = "$crash";
const BYTES_TAG: &str = "$bytes";
const RECORD_FIELDS: &str = "fields";

const TERM_TAGS: [&str; 6] = [ATOM_TAG, PID_TAG, TUPLE_TAG, KEYWORD_TAG, RECORD_TAG, CRASH_TAG];

#[derive(Error, Debug)]
pub enum InputError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid log level: {0}")]
    InvalidLevel(String),
    #[error("Invalid message: {0}")]
    InvalidMessage(String),
    #[error("Integer {0} does not fit in 64 signed bits")]
    IntegerOutOfRange(String),
    #[error("Invalid {tag} value: {reason}")]
    InvalidTag { tag: &'static str, reason: String },
}

impl InputError {
    fn tag(tag: &'static str, reason: impl Into<String>) -> Self {
        InputError::InvalidTag {
            tag,
            reason: reason.into(),
        }
    }
}

type WireTimestamp = ((i32, u32, u32), (u32, u32, u32, u32));

#[derive(Debug, Deserialize)]
struct WireEvent {
    timestamp: WireTimestamp,
    level: String,
    message: Value,
    #[serde(default)]
    metadata: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct WireFrame {
    #[serde(default)]
    application: Option<String>,
    module: String,
    function: String,
    arity: u32,
    #[serde(default)]
    file: Option<String>,
    #[serde(default)]
    line: Option<u32>,
}

impl From<WireFrame> for StackFrame {
    fn from(frame: WireFrame) -> Self {
        StackFrame {
            application: frame.application,
            module: frame.module,
            function: frame.function,
            arity: frame.arity,
            file: frame.file,
            line: frame.line,
        }
    }
}

pub fn decode_event(line: &str) -> Result<RawLogEvent, InputError> {
    let wire: WireEvent = serde_json::from_str(line)?;

    let (date, time) = wire.timestamp;
    let level = wire
        .level
        .parse::<LogLevel>()
        .map_err(|_| InputError::InvalidLevel(wire.level.clone()))?;
    let message = decode_message(&wire.message)?;

    // Logger metadata keys are symbols at the top level.
    let metadata = wire
        .metadata
        .iter()
        .map(|(key, value)| Ok((MetadataKey::atom(key), decode_value(value)?)))
        .collect::<Result<Metadata, InputError>>()?;

    Ok(RawLogEvent {
        timestamp: LoggerTimestamp::new(date, time),
        level,
        message,
        metadata,
    })
}

pub fn decode_message(value: &Value) -> Result<LogMessage, InputError> {
    match value {
        Value::String(text) => Ok(LogMessage::Text(text.clone())),
        Value::Array(items) => Ok(LogMessage::Fragments(
            items.iter().map(decode_chardata).collect::<Result<_, _>>()?,
        )),
        other => Err(InputError::InvalidMessage(format!(
            "expected text or fragment list, got {other}"
        ))),
    }
}

fn decode_chardata(value: &Value) -> Result<Chardata, InputError> {
    match value {
        Value::String(text) => Ok(Chardata::Text(text.clone())),
        Value::Number(number) => number
            .as_u64()
            .and_then(|code| u32::try_from(code).ok())
            .map(Chardata::Char)
            .ok_or_else(|| InputError::InvalidMessage(format!("invalid code point {number}"))),
        Value::Array(items) => Ok(Chardata::List(
            items.iter().map(decode_chardata).collect::<Result<_, _>>()?,
        )),
        Value::Object(object) => match object.get(BYTES_TAG) {
            Some(Value::Array(bytes)) => bytes
                .iter()
                .map(|byte| {
                    byte.as_u64()
                        .and_then(|b| u8::try_from(b).ok())
                        .ok_or_else(|| InputError::tag(BYTES_TAG, format!("{byte} is not a byte")))
                })
                .collect::<Result<Vec<u8>, _>>()
                .map(Chardata::Bytes),
            _ => Err(InputError::InvalidMessage(format!(
                "unsupported fragment {value}"
            ))),
        },
        other => Err(InputError::InvalidMessage(format!(
            "unsupported fragment {other}"
        ))),
    }
}

pub fn decode_value(value: &Value) -> Result<MetadataValue, InputError> {
    match value {
        Value::Null => Ok(MetadataValue::Null),
        Value::Bool(b) => Ok(MetadataValue::Bool(*b)),
        Value::Number(number) => decode_number(number),
        Value::String(text) => Ok(MetadataValue::Text(text.clone())),
        Value::Array(items) => Ok(MetadataValue::List(decode_list(items)?)),
        Value::Object(object) => decode_object(object),
    }
}

fn decode_list(items: &[Value]) -> Result<Vec<MetadataValue>, InputError> {
    items.iter().map(decode_value).collect()
}

fn decode_number(number: &Number) -> Result<MetadataValue, InputError> {
    if let Some(integer) = number.as_i64() {
        return Ok(MetadataValue::Integer(integer));
    }
    // Only u64 values above i64::MAX are left among the integers.
    if number.is_u64() {
        return Err(InputError::IntegerOutOfRange(number.to_string()));
    }
    number
        .as_f64()
        .map(MetadataValue::Float)
        .ok_or_else(|| InputError::IntegerOutOfRange(number.to_string()))
}

fn decode_object(object: &Map<String, Value>) -> Result<MetadataValue, InputError> {
    let Some((tag, value)) = TERM_TAGS
        .iter()
        .find_map(|tag| object.get(*tag).map(|value| (*tag, value)))
    else {
        let map = object
            .iter()
            .map(|(key, value)| Ok((MetadataKey::text(key), decode_value(value)?)))
            .collect::<Result<Metadata, InputError>>()?;
        return Ok(MetadataValue::Map(map));
    };

    let companion = (tag == RECORD_TAG).then_some(RECORD_FIELDS);
    if let Some(extra) = object
        .keys()
        .find(|key| key.as_str() != tag && Some(key.as_str()) != companion)
    {
        return Err(InputError::tag(tag, format!("unexpected key \"{extra}\" beside the tag")));
    }

    match tag {
        ATOM_TAG => value
            .as_str()
            .map(MetadataValue::atom)
            .ok_or_else(|| InputError::tag(ATOM_TAG, "expected a string")),
        PID_TAG => value
            .as_str()
            .ok_or_else(|| InputError::tag(PID_TAG, "expected a string"))?
            .parse::<ProcessId>()
            .map(MetadataValue::Pid)
            .map_err(|reason| InputError::tag(PID_TAG, reason)),
        TUPLE_TAG => {
            let items = value
                .as_array()
                .ok_or_else(|| InputError::tag(TUPLE_TAG, "expected an array"))?;
            Ok(MetadataValue::Tuple(decode_list(items)?))
        }
        KEYWORD_TAG => decode_keyword(value),
        RECORD_TAG => decode_record(value, object.get(RECORD_FIELDS)),
        _ => decode_crash(value),
    }
}

fn decode_record(type_name: &Value, fields: Option<&Value>) -> Result<MetadataValue, InputError> {
    let type_name = type_name
        .as_str()
        .ok_or_else(|| InputError::tag(RECORD_TAG, "expected a type name"))?;
    let fields: BTreeMap<String, MetadataValue> = match fields {
        Some(Value::Object(fields)) => fields
            .iter()
            .map(|(key, value)| Ok((key.clone(), decode_value(value)?)))
            .collect::<Result<_, InputError>>()?,
        None => BTreeMap::new(),
        Some(_) => return Err(InputError::tag(RECORD_TAG, "fields must be an object")),
    };

    Ok(MetadataValue::Record(Record {
        type_name: type_name.to_string(),
        fields,
    }))
}

fn decode_keyword(value: &Value) -> Result<MetadataValue, InputError> {
    let pairs = value
        .as_array()
        .ok_or_else(|| InputError::tag(KEYWORD_TAG, "expected an array of pairs"))?;

    pairs
        .iter()
        .map(|pair| match pair.as_array().map(Vec::as_slice) {
            Some([Value::String(key), value]) => Ok((key.clone(), decode_value(value)?)),
            _ => Err(InputError::tag(
                KEYWORD_TAG,
                format!("{pair} is not a [key, value] pair"),
            )),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(MetadataValue::Keyword)
}

fn decode_crash(value: &Value) -> Result<MetadataValue, InputError> {
    let error = value
        .get("error")
        .ok_or_else(|| InputError::tag(CRASH_TAG, "missing error"))?;
    let stacktrace = match value.get("stacktrace") {
        Some(frames) => Vec::<WireFrame>::deserialize(frames)
            .map_err(|e| InputError::tag(CRASH_TAG, e.to_string()))?,
        None => Vec::new(),
    };

    Ok(MetadataValue::CrashReason(CrashReason::new(
        decode_value(error)?,
        stacktrace.into_iter().map(StackFrame::from).collect(),
    )))
}
