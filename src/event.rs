//! Event records and their validation.

use crate::error::{Error, Result};
use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Format of event timestamps: microsecond precision, fraction always present.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S.%6f";

/// Event as it appears in the input file.
///
/// Fields are kept as raw JSON so that a record of the wrong shape is
/// reported by index instead of aborting the whole deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(default)]
    pub timestamp: Value,
    #[serde(default)]
    pub duration: Value,
}

/// Duration of a delivery, integer or fractional as given in the input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DurationValue {
    Int(i64),
    Float(f64),
}

impl DurationValue {
    pub fn as_f64(self) -> f64 {
        match self {
            DurationValue::Int(val) => val as f64,
            DurationValue::Float(val) => val,
        }
    }
}

/// Validated event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    pub timestamp: NaiveDateTime,
    pub duration: DurationValue,
}

impl Event {
    pub fn new(timestamp: NaiveDateTime, duration: DurationValue) -> Self {
        Self {
            timestamp,
            duration,
        }
    }
}

/// Convert the elements of the input array into raw records.
///
/// Every element must be a JSON object; the first one that is not is
/// reported by index.
pub fn raw_events_from_values(values: Vec<Value>) -> Result<Vec<RawEvent>> {
    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            let record = value.to_string();
            let reason = match value {
                Value::Object(_) => match serde_json::from_value::<RawEvent>(value) {
                    Ok(raw) => return Ok(raw),
                    Err(err) => err.to_string(),
                },
                _ => "event must be an object".to_string(),
            };
            Err(Error::MalformedInput {
                index,
                record,
                reason,
            })
        })
        .collect()
}

/// Validate raw records into events, keeping their order.
///
/// Fails on the first malformed record; nothing is returned in that case.
pub fn parse_events(raw_events: &[RawEvent]) -> Result<Vec<Event>> {
    raw_events
        .iter()
        .enumerate()
        .map(|(index, raw)| parse_event(raw).map_err(|reason| malformed(index, raw, reason)))
        .collect()
}

fn parse_event(raw: &RawEvent) -> std::result::Result<Event, String> {
    let timestamp = match &raw.timestamp {
        Value::String(text) => NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
            .map_err(|err| format!("invalid timestamp format: {err}"))?,
        Value::Null => return Err("missing timestamp".to_string()),
        _ => return Err("timestamp must be a string".to_string()),
    };

    // chrono accepts a leap second as second 60.
    if timestamp.nanosecond() >= 1_000_000_000 {
        return Err("invalid timestamp format: second out of range".to_string());
    }

    let duration = match &raw.duration {
        Value::Number(num) => {
            if let Some(val) = num.as_i64() {
                DurationValue::Int(val)
            } else if let Some(val) = num.as_f64() {
                DurationValue::Float(val)
            } else {
                return Err(format!("duration {num} is not representable"));
            }
        }
        Value::Null => return Err("missing duration".to_string()),
        _ => return Err("duration must be a number".to_string()),
    };
    if duration.as_f64() < 0.0 {
        return Err("duration must be non-negative".to_string());
    }

    Ok(Event::new(timestamp, duration))
}

fn malformed(index: usize, raw: &RawEvent, reason: String) -> Error {
    let record = serde_json::to_string(raw).unwrap_or_else(|_| format!("{raw:?}"));
    Error::MalformedInput {
        index,
        record,
        reason,
    }
}
