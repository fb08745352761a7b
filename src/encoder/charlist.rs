//! Charlist detection.
//!
//! A non-empty list whose every element is a printable character code is
//! rendered as text. This is a lossy heuristic: a list of small integers that
//! happen to be printable (`[104, 105]`) is indistinguishable from the text
//! `"hi"` and will be reinterpreted. The ingestion service relies on this
//! behavior, so it is kept as is.

use serde_json::Value;

use crate::domain::{NormalizedMap, NormalizedValue};

/// Printable per Erlang's ASCII printable-list rules: `' '..='~'` plus the
/// common escapes (`\n \r \t \v \b \f \e \a`).
pub fn printable_char(code: i64) -> Option<char> {
    let ch = u32::try_from(code).ok().and_then(char::from_u32)?;
    match ch {
        ' '..='~' | '\n' | '\r' | '\t' | '\u{0b}' | '\u{08}' | '\u{0c}' | '\u{1b}' | '\u{07}' => {
            Some(ch)
        }
        _ => None,
    }
}

fn render<I>(codes: I, len: usize) -> Option<String>
where
    I: Iterator<Item = Option<i64>>,
{
    if len == 0 {
        return None;
    }
    codes.map(|code| code.and_then(printable_char)).collect()
}

/// Text rendering of a normalized list, if it reads as a charlist.
pub fn normalized_as_text(items: &[NormalizedValue]) -> Option<String> {
    render(
        items.iter().map(|item| match item {
            NormalizedValue::Integer(code) => Some(*code),
            _ => None,
        }),
        items.len(),
    )
}

/// Text rendering of a JSON array, if it reads as a charlist.
pub fn json_as_text(items: &[Value]) -> Option<String> {
    render(items.iter().map(Value::as_i64), items.len())
}

pub fn encode_normalized_charlists(value: NormalizedValue) -> NormalizedValue {
    match value {
        NormalizedValue::List(items) => match normalized_as_text(&items) {
            Some(text) => NormalizedValue::Text(text),
            None => NormalizedValue::List(
                items.into_iter().map(encode_normalized_charlists).collect(),
            ),
        },
        NormalizedValue::Map(map) => NormalizedValue::Map(encode_metadata_charlists(map)),
        NormalizedValue::Keyword(pairs) => NormalizedValue::Keyword(
            pairs
                .into_iter()
                .map(|(key, value)| (key, encode_normalized_charlists(value)))
                .collect(),
        ),
        other => other,
    }
}

pub fn encode_metadata_charlists(map: NormalizedMap) -> NormalizedMap {
    map.into_iter()
        .map(|(key, value)| (key, encode_normalized_charlists(value)))
        .collect()
}

pub fn encode_json_charlists(value: Value) -> Value {
    match value {
        Value::Array(items) => match json_as_text(&items) {
            Some(text) => Value::String(text),
            None => Value::Array(items.into_iter().map(encode_json_charlists).collect()),
        },
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key, encode_json_charlists(value)))
                .collect(),
        ),
        other => other,
    }
}
