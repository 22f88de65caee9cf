// Resolved field values and the coercion rules shared by every operator

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;

/// A value resolved out of a record payload.
///
/// Mirrors the JSON data model but carries numbers as `f64` so that every
/// numeric operator works on one representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "boolean",
            FieldValue::Number(_) => "number",
            FieldValue::String(_) => "string",
            FieldValue::Array(_) => "array",
            FieldValue::Map(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Numeric coercion used by `greater_than`, `less_than` and `between`.
    ///
    /// Booleans become 0/1, strings are parsed as numbers and then as dates
    /// (epoch millis). Anything else, including empty strings, is `NaN`.
    pub fn to_number(&self) -> f64 {
        match self {
            FieldValue::Number(n) => *n,
            FieldValue::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            FieldValue::String(s) => coerce_str_to_number(s),
            FieldValue::Null | FieldValue::Array(_) | FieldValue::Map(_) => f64::NAN,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Null => false,
            FieldValue::Bool(b) => *b,
            FieldValue::Number(n) => *n != 0.0 && !n.is_nan(),
            FieldValue::String(s) => !s.is_empty(),
            FieldValue::Array(_) | FieldValue::Map(_) => true,
        }
    }

    /// Type-coercing equality used by `equals`, `contains` on arrays and `in`.
    pub fn loose_eq(&self, other: &FieldValue) -> bool {
        match (self, other) {
            (FieldValue::Null, FieldValue::Null) => true,
            (FieldValue::Null, _) | (_, FieldValue::Null) => false,
            (FieldValue::Bool(a), b) | (b, FieldValue::Bool(a)) => *a == b.is_truthy(),
            (FieldValue::Number(a), FieldValue::Number(b)) => a == b,
            (FieldValue::Number(a), FieldValue::String(s))
            | (FieldValue::String(s), FieldValue::Number(a)) => {
                let b = coerce_str_to_number(s);
                !b.is_nan() && *a == b
            }
            (FieldValue::String(a), FieldValue::String(b)) => {
                a == b || a.to_lowercase() == b.to_lowercase()
            }
            (a, b) => a == b,
        }
    }

    /// Text used for substring and regex matching.
    pub fn as_text(&self) -> String {
        match self {
            FieldValue::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            FieldValue::Null => JsonValue::Null,
            FieldValue::Bool(b) => JsonValue::Bool(*b),
            FieldValue::Number(n) => number_to_json(*n),
            FieldValue::String(s) => JsonValue::String(s.clone()),
            FieldValue::Array(items) => JsonValue::Array(items.iter().map(|v| v.to_json()).collect()),
            FieldValue::Map(map) => JsonValue::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl From<&JsonValue> for FieldValue {
    fn from(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => FieldValue::Null,
            JsonValue::Bool(b) => FieldValue::Bool(*b),
            JsonValue::Number(n) => FieldValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            JsonValue::String(s) => FieldValue::String(s.clone()),
            JsonValue::Array(items) => FieldValue::Array(items.iter().map(FieldValue::from).collect()),
            JsonValue::Object(map) => FieldValue::Map(
                map.iter().map(|(k, v)| (k.clone(), FieldValue::from(v))).collect(),
            ),
        }
    }
}

impl From<JsonValue> for FieldValue {
    fn from(value: JsonValue) -> Self {
        FieldValue::from(&value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(s) => write!(f, "{}", s),
            FieldValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Null => write!(f, "null"),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

/// Integral floats go back to JSON as integers so `100` stays `100`.
pub fn number_to_json(n: f64) -> JsonValue {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        JsonValue::Number((n as i64).into())
    } else {
        serde_json::Number::from_f64(n)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null)
    }
}

/// Parse a string as a number, falling back to a date (epoch millis), else `NaN`.
pub fn coerce_str_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return f64::NAN;
    }

    // EDGE CASE: "inf" and "NaN" parse as f64 but are not numeric input
    if let Ok(n) = trimmed.parse::<f64>() {
        if n.is_finite() {
            return n;
        }
        return f64::NAN;
    }

    parse_date_millis(trimmed).map(|ms| ms as f64).unwrap_or(f64::NAN)
}

/// Epoch millis for RFC 3339 timestamps, naive ISO date-times (read as UTC) and plain dates.
pub fn parse_date_millis(s: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp_millis())
}
