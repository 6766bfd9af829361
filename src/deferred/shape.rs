use serde_json::{Map, Value};

use crate::citation::types::{RawCitationRecord, RawTimestamps};

/// Structural shape of a parsed citation block.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockShape {
    /// `[ {record}, ... ]`
    Flat(Vec<Value>),
    /// `{ "attachment_id": [ {record}, ... ], ... }`, in document order.
    Grouped(Vec<(String, Vec<Value>)>),
    Unrecognized,
}

impl BlockShape {
    pub fn detect(value: Value) -> Self {
        match value {
            Value::Array(items) => BlockShape::Flat(items),
            Value::Object(map) if map.is_empty() => BlockShape::Grouped(Vec::new()),
            // A lone record instead of an array of one. Checked before groups
            // since its `line_ids` is an array too.
            Value::Object(map) if map.contains_key("full_phrase") || map.contains_key("f") => {
                BlockShape::Flat(vec![Value::Object(map)])
            }
            Value::Object(map) if map.values().any(Value::is_array) => BlockShape::Grouped(
                map.into_iter()
                    .filter_map(|(key, v)| match v {
                        Value::Array(items) => Some((key, items)),
                        _ => None,
                    })
                    .collect(),
            ),
            _ => BlockShape::Unrecognized,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BlockShape::Flat(_) => "flat",
            BlockShape::Grouped(_) => "grouped",
            BlockShape::Unrecognized => "unrecognized",
        }
    }

    /// Flatten into records, in order. Group keys become `attachment_id`.
    pub fn into_records(self) -> Vec<RawCitationRecord> {
        match self {
            BlockShape::Flat(items) => items.iter().filter_map(expand_value).collect(),
            BlockShape::Grouped(groups) => groups
                .into_iter()
                .flat_map(|(attachment_id, items)| {
                    items
                        .iter()
                        .filter_map(expand_value)
                        .map(|mut record| {
                            record.attachment_id = Some(attachment_id.clone());
                            record
                        })
                        .collect::<Vec<_>>()
                })
                .collect(),
            BlockShape::Unrecognized => Vec::new(),
        }
    }
}

/// Parsed block value to ordered records.
pub fn normalize_block(value: Value) -> Vec<RawCitationRecord> {
    BlockShape::detect(value).into_records()
}

fn expand_value(value: &Value) -> Option<RawCitationRecord> {
    value.as_object().map(expand_record)
}

/// Look up a field by canonical name, then by its compact alias. Nulls count as absent.
fn field<'a>(map: &'a Map<String, Value>, canonical: &str, compact: &str) -> Option<&'a Value> {
    map.get(canonical)
        .filter(|v| !v.is_null())
        .or_else(|| map.get(compact).filter(|v| !v.is_null()))
}

/// Expand a record that may mix full and compact keys.
pub fn expand_record(map: &Map<String, Value>) -> RawCitationRecord {
    RawCitationRecord {
        id: field(map, "id", "n").and_then(as_int),
        attachment_id: field(map, "attachment_id", "a").and_then(as_text),
        reasoning: field(map, "reasoning", "r").and_then(as_text),
        full_phrase: field(map, "full_phrase", "f").and_then(as_text),
        anchor_text: field(map, "anchor_text", "k").and_then(as_text),
        page_id: field(map, "page_id", "p").and_then(as_text),
        line_ids: field(map, "line_ids", "l").and_then(as_int_list),
        timestamps: field(map, "timestamps", "t").and_then(as_timestamps),
    }
}

fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_int_list(value: &Value) -> Option<Vec<i64>> {
    match value {
        Value::Array(items) => Some(items.iter().filter_map(as_int).collect()),
        other => as_int(other).map(|n| vec![n]),
    }
}

fn as_timestamps(value: &Value) -> Option<RawTimestamps> {
    let map = value.as_object()?;
    let timestamps = RawTimestamps {
        start_time: field(map, "start_time", "s").and_then(as_text),
        end_time: field(map, "end_time", "e").and_then(as_text),
    };
    if timestamps.start_time.is_none() && timestamps.end_time.is_none() {
        return None;
    }
    Some(timestamps)
}
