//! Stage one: message and timestamp coercion.

use chrono::{NaiveDate, NaiveDateTime, TimeZone};

use super::time_zone::TimeZoneResolver;
use crate::domain::{Chardata, EncodeError, LogMessage, LoggerTimestamp};

/// Extended ISO-8601 with microsecond precision and a `+HH:MM` offset.
pub const ISO_EXTENDED_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f%:z";

pub fn normalize_message(message: &LogMessage) -> Result<String, EncodeError> {
    match message {
        LogMessage::Text(text) => Ok(text.clone()),
        LogMessage::Fragments(fragments) => {
            let mut buffer = String::new();
            for fragment in fragments {
                append_chardata(&mut buffer, fragment)?;
            }
            Ok(buffer)
        }
    }
}

fn append_chardata(buffer: &mut String, fragment: &Chardata) -> Result<(), EncodeError> {
    match fragment {
        Chardata::Text(text) => buffer.push_str(text),
        Chardata::Bytes(bytes) => {
            let text = std::str::from_utf8(bytes).map_err(|e| {
                EncodeError::InvalidMessage(format!("fragment is not valid UTF-8: {e}"))
            })?;
            buffer.push_str(text);
        }
        Chardata::Char(code) => {
            let ch = char::from_u32(*code).ok_or_else(|| {
                EncodeError::InvalidMessage(format!("{code} is not a valid code point"))
            })?;
            buffer.push(ch);
        }
        Chardata::List(nested) => {
            for item in nested {
                append_chardata(buffer, item)?;
            }
        }
    }
    Ok(())
}

pub fn to_naive(timestamp: &LoggerTimestamp) -> Result<NaiveDateTime, EncodeError> {
    let date = NaiveDate::from_ymd_opt(timestamp.year, timestamp.month, timestamp.day)
        .ok_or_else(|| {
            EncodeError::InvalidTimestamp(format!(
                "{:04}-{:02}-{:02} is not a calendar date",
                timestamp.year, timestamp.month, timestamp.day
            ))
        })?;

    if timestamp.millisecond >= 1000 {
        return Err(EncodeError::InvalidTimestamp(format!(
            "millisecond {} is out of range",
            timestamp.millisecond
        )));
    }

    date.and_hms_milli_opt(
        timestamp.hour,
        timestamp.minute,
        timestamp.second,
        timestamp.millisecond,
    )
    .ok_or_else(|| {
        EncodeError::InvalidTimestamp(format!(
            "{:02}:{:02}:{:02} is not a time of day",
            timestamp.hour, timestamp.minute, timestamp.second
        ))
    })
}

pub fn normalize_timestamp(
    timestamp: &LoggerTimestamp,
    zone: &dyn TimeZoneResolver,
) -> Result<String, EncodeError> {
    let naive = to_naive(timestamp)?;
    let offset = zone.offset_for(&naive)?;
    let zoned = offset.from_local_datetime(&naive).single().ok_or_else(|| {
        EncodeError::TimeZone(format!("{naive} cannot be placed at offset {offset}"))
    })?;
    Ok(zoned.format(ISO_EXTENDED_FORMAT).to_string())
}
