// Analytics model: profiled fields, per-field statistics, trends, correlations

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

/// JSON type of an observed value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
}

impl FieldType {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => FieldType::Null,
            Value::Bool(_) => FieldType::Boolean,
            Value::Number(_) => FieldType::Number,
            Value::String(_) => FieldType::String,
            Value::Array(_) => FieldType::Array,
            Value::Object(_) => FieldType::Object,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, FieldType::Array | FieldType::Object)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Null => "null",
            FieldType::Boolean => "boolean",
            FieldType::Number => "number",
            FieldType::String => "string",
            FieldType::Array => "array",
            FieldType::Object => "object",
        };
        write!(f, "{}", name)
    }
}

/// One profiled node of one record. Borrows the value from the record.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo<'a> {
    pub path: String,
    pub field_type: FieldType,
    pub value: &'a Value,
    pub approximate_size: u64,
    pub record_id: &'a str,
    pub timestamp: i64,
    pub record_size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueCount {
    pub value: Value,
    pub count: u64,
    /// Share of this path's observations, in [0, 1]
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesPoint {
    /// Bucket start, epoch millis
    pub bucket_start: i64,
    pub count: u64,
    pub average_size: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldStatistics {
    pub path: String,
    pub data_type: BTreeSet<FieldType>,
    pub total_observations: u64,
    #[serde(default)]
    pub null_count: u64,
    pub unique_value_count: u64,
    /// Records in the analysed corpus (denominator of `coverage`)
    #[serde(default)]
    pub record_count: u64,
    pub coverage: f64,
    pub top_values: Vec<ValueCount>,
    #[serde(default)]
    pub trend: Vec<TimeSeriesPoint>,
    /// True once `top_values` has been cut to the retention limit
    #[serde(default)]
    pub truncated: bool,
}

impl FieldStatistics {
    /// `(observations - nulls) / records`, 0 for an empty corpus.
    pub fn compute_coverage(total_observations: u64, null_count: u64, record_count: u64) -> f64 {
        if record_count == 0 {
            return 0.0;
        }
        total_observations.saturating_sub(null_count) as f64 / record_count as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeInterval {
    Minute,
    #[default]
    Hour,
    Day,
}

impl TimeInterval {
    pub fn millis(&self) -> i64 {
        match self {
            TimeInterval::Minute => 60_000,
            TimeInterval::Hour => 3_600_000,
            TimeInterval::Day => 86_400_000,
        }
    }

    /// Start of the UTC bucket containing `timestamp` (epoch millis).
    pub fn bucket_start(&self, timestamp: i64) -> i64 {
        timestamp - timestamp.rem_euclid(self.millis())
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minute" => Some(TimeInterval::Minute),
            "hour" => Some(TimeInterval::Hour),
            "day" => Some(TimeInterval::Day),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationEntry {
    pub field_a: String,
    pub field_b: String,
    pub correlation: f64,
    pub significance: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bucket_start() {
        let hour = TimeInterval::Hour;
        assert_eq!(hour.bucket_start(0), 0);
        assert_eq!(hour.bucket_start(3_599_999), 0);
        assert_eq!(hour.bucket_start(3_600_000), 3_600_000);
        // EDGE CASE: pre-epoch timestamps still floor downwards
        assert_eq!(hour.bucket_start(-1), -3_600_000);
        assert_eq!(TimeInterval::Minute.bucket_start(61_000), 60_000);
        assert_eq!(TimeInterval::Day.bucket_start(86_400_001), 86_400_000);
    }

    #[test]
    fn test_field_type_of() {
        assert_eq!(FieldType::of(&json!(null)), FieldType::Null);
        assert_eq!(FieldType::of(&json!(1.5)), FieldType::Number);
        assert_eq!(FieldType::of(&json!({"a": 1})), FieldType::Object);
        assert!(FieldType::Array.is_container());
        assert!(!FieldType::String.is_container());
    }

    #[test]
    fn test_interval_serde() {
        assert_eq!(serde_json::to_value(TimeInterval::Minute).unwrap(), json!("minute"));
        assert_eq!(TimeInterval::parse(" Day "), Some(TimeInterval::Day));
        assert_eq!(TimeInterval::parse("week"), None);
        assert_eq!(TimeInterval::default(), TimeInterval::Hour);
    }

    #[test]
    fn test_coverage() {
        assert_eq!(FieldStatistics::compute_coverage(3, 1, 4), 0.5);
        assert_eq!(FieldStatistics::compute_coverage(3, 0, 0), 0.0);
    }
}
