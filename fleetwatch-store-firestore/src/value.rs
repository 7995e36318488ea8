//! Firestore typed values as they appear in REST payloads.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A single typed field value, e.g. `{"stringValue": "op-1"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) enum Value {
    NullValue(()),
    BooleanValue(bool),
    /// int64 values travel as decimal strings.
    IntegerValue(String),
    DoubleValue(f64),
    TimestampValue(String),
    StringValue(String),
    BytesValue(String),
    ReferenceValue(String),
    GeoPointValue(serde_json::Value),
    ArrayValue(serde_json::Value),
    MapValue(serde_json::Value),
}

impl Value {
    pub(crate) fn string(raw: &str) -> Self {
        Value::StringValue(raw.to_owned())
    }

    pub(crate) fn integer(number: u32) -> Self {
        Value::IntegerValue(number.to_string())
    }

    pub(crate) fn as_str(&self) -> Option<&str> {
        match self {
            Value::StringValue(raw) | Value::ReferenceValue(raw) => Some(raw),
            _ => None,
        }
    }

    pub(crate) fn as_f64(&self) -> Option<f64> {
        match self {
            Value::DoubleValue(number) => Some(*number),
            Value::IntegerValue(raw) => raw.parse().ok(),
            _ => None,
        }
    }

    pub(crate) fn as_u32(&self) -> Option<u32> {
        match self {
            Value::IntegerValue(raw) => raw.parse().ok(),
            _ => None,
        }
    }

    pub(crate) fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::TimestampValue(raw) | Value::StringValue(raw) => DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|instant| instant.with_timezone(&Utc)),
            _ => None,
        }
    }

    /// Calendar day of a `YYYY-MM-DD` string.
    ///
    /// Timestamps are rejected: their day depends on the zone the report runs in,
    /// which the store does not know.
    pub(crate) fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::StringValue(raw) => raw
                .get(..10)
                .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()),
            _ => None,
        }
    }

    pub(crate) fn is_null(&self) -> bool {
        matches!(self, Value::NullValue(()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_rest_encodings() {
        let integer: Value = serde_json::from_value(json!({"integerValue": "42"})).expect("integer");
        let null: Value = serde_json::from_value(json!({"nullValue": null})).expect("null");
        let map: Value = serde_json::from_value(json!({"mapValue": {"fields": {}}})).expect("map");

        assert_eq!(integer.as_f64(), Some(42.0), "integers widen to f64");
        assert!(null.is_null(), "explicit null");
        assert!(matches!(map, Value::MapValue(_)), "maps kept as raw json");
    }

    #[test]
    fn dates_are_local_day_strings() {
        let day = NaiveDate::from_ymd_opt(2026, 10, 19);

        assert_eq!(Value::string("2026-10-19").as_date(), day, "plain day");
        assert_eq!(
            Value::string("2026-10-19T22:30:00-03:00").as_date(),
            day,
            "day prefix of an ISO string"
        );
        assert_eq!(
            Value::TimestampValue("2026-10-20T01:30:00Z".to_owned()).as_date(),
            None,
            "a timestamp has no zone-free calendar day"
        );
        assert_eq!(Value::string("19/10/2026").as_date(), None, "other formats rejected");
    }
}
