//! Typed wire values.
//!
//! Record fields and predicate literals travel as JSON, with non-scalar
//! types wrapped in `$type`-tagged objects. This module converts between
//! those tagged shapes and the SDK's typed leaves. Objects carrying an
//! unrecognized `$type` pass through untouched so that newer servers stay
//! readable.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};

use crate::asset::Asset;
use crate::error::{Error, Result};
use crate::geo::Geolocation;
use crate::reference::Reference;

/// A decoded record field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Date(DateTime<Utc>),
    Geo(Geolocation),
    Ref(Reference),
    Asset(Asset),
    /// Scalars, arrays, and objects without a recognized `$type` tag.
    Plain(Value),
}

/// Encode a date the way the record store expects it, millisecond precision
/// with a `Z` suffix.
pub fn date(value: DateTime<Utc>) -> Value {
    json!({
        "$type": "date",
        "$date": value.to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

pub(crate) fn decode_date(value: &Value) -> Result<DateTime<Utc>> {
    let raw = value
        .get("$date")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            Error::MalformedWireValue("date value requires a string $date".to_string())
        })?;
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::MalformedWireValue(format!("bad $date {:?}: {}", raw, e)))
}

/// Decode a single wire value into its typed form.
pub fn decode_value(value: &Value) -> Result<FieldValue> {
    let tag = value.get("$type").and_then(Value::as_str);
    match tag {
        Some("date") => Ok(FieldValue::Date(decode_date(value)?)),
        Some("geo") => Ok(FieldValue::Geo(Geolocation::from_wire(value)?)),
        Some("ref") => Ok(FieldValue::Ref(Reference::from_wire(value)?)),
        Some("asset") => Ok(FieldValue::Asset(Asset::from_wire(value)?)),
        _ => Ok(FieldValue::Plain(value.clone())),
    }
}

/// Re-encode a typed value to its wire form.
pub fn encode_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Date(dt) => date(*dt),
        FieldValue::Geo(loc) => loc.to_wire(),
        FieldValue::Ref(reference) => reference.to_wire(),
        FieldValue::Asset(asset) => asset.to_wire(),
        FieldValue::Plain(raw) => raw.clone(),
    }
}

/// Validate every `$type`-tagged object reachable from `value`, leaving the
/// raw JSON untouched. Used by the predicate decoder on literal subtrees.
pub(crate) fn check_wire_value(value: &Value) -> Result<()> {
    match value {
        Value::Array(items) => {
            for item in items {
                check_wire_value(item)?;
            }
            Ok(())
        }
        Value::Object(map) => {
            decode_value(value)?;
            if map.get("$type").and_then(Value::as_str).is_none() {
                for item in map.values() {
                    check_wire_value(item)?;
                }
            }
            Ok(())
        }
        _ => Ok(()),
    }
}
