// Leaf predicate evaluation

use crate::resolver::FieldResolver;
use ahash::AHashMap;
use parking_lot::RwLock;
use regex::{Regex, RegexBuilder};
use serde_json::Value;
use sluice_core::{Condition, FieldValue, Operator, Record};
use tracing::warn;

/// Evaluates single conditions against records.
///
/// Compiled patterns are memoised per pattern string, including patterns
/// that fail to compile, so a bad pattern is reported once and then treated
/// as a non-match.
pub struct ConditionEvaluator {
    patterns: RwLock<AHashMap<String, Option<Regex>>>,
    max_patterns: usize,
}

impl Default for ConditionEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl ConditionEvaluator {
    /// Compiled program size limit per pattern
    const REGEX_SIZE_LIMIT: usize = 1 << 20;
    const DEFAULT_MAX_PATTERNS: usize = 1_024;

    pub fn new() -> Self {
        Self::with_pattern_capacity(Self::DEFAULT_MAX_PATTERNS)
    }

    pub fn with_pattern_capacity(max_patterns: usize) -> Self {
        Self {
            patterns: RwLock::new(AHashMap::new()),
            max_patterns: max_patterns.max(1),
        }
    }

    /// Resolve the condition's path on `record` and evaluate it.
    pub fn evaluate(&self, record: &Record, condition: &Condition) -> bool {
        let value = FieldResolver::resolve(record, &condition.field_path);
        self.evaluate_value(value.as_ref(), condition)
    }

    /// Evaluate against an already resolved value (`None` = unresolved).
    pub fn evaluate_value(&self, value: Option<&FieldValue>, condition: &Condition) -> bool {
        let operand = condition.value.as_ref().map(FieldValue::from);

        match condition.operator {
            Operator::Exists => Self::exists(value),
            Operator::NotExists => !Self::exists(value),
            Operator::Equals => Self::equals(value, operand.as_ref()),
            Operator::NotEquals => !Self::equals(value, operand.as_ref()),
            Operator::Contains => Self::contains(value, operand.as_ref()),
            Operator::NotContains => !Self::contains(value, operand.as_ref()),
            Operator::Regex => self.regex_matches(value, operand.as_ref()),
            Operator::NotRegex => !self.regex_matches(value, operand.as_ref()),
            Operator::GreaterThan => Self::compare(value, operand.as_ref(), |a, b| a > b),
            Operator::LessThan => Self::compare(value, operand.as_ref(), |a, b| a < b),
            Operator::Between => {
                let high = condition.secondary_value.as_ref().map(FieldValue::from);
                Self::between(value, operand.as_ref(), high.as_ref())
            }
            Operator::In => Self::in_list(value, condition.value.as_ref()),
            Operator::NotIn => !Self::in_list(value, condition.value.as_ref()),
            // Unrecognised operators pass; validation rejects them at the boundary
            Operator::Unknown => true,
        }
    }

    /// Patterns currently memoised, valid or not.
    pub fn cached_patterns(&self) -> usize {
        self.patterns.read().len()
    }

    pub fn clear_patterns(&self) {
        self.patterns.write().clear();
    }

    fn exists(value: Option<&FieldValue>) -> bool {
        value.map_or(false, |v| !v.is_null())
    }

    fn equals(value: Option<&FieldValue>, operand: Option<&FieldValue>) -> bool {
        match (value, operand) {
            (Some(value), Some(operand)) => value.loose_eq(operand),
            _ => false,
        }
    }

    fn contains(value: Option<&FieldValue>, operand: Option<&FieldValue>) -> bool {
        let (value, operand) = match (value, operand) {
            (Some(value), Some(operand)) => (value, operand),
            _ => return false,
        };

        match value {
            FieldValue::Array(items) => items.iter().any(|item| item.loose_eq(operand)),
            FieldValue::Null | FieldValue::Map(_) => false,
            scalar => {
                let needle = operand.as_text();
                // EDGE CASE: empty needle is contained in every string
                if needle.is_empty() {
                    return true;
                }
                scalar
                    .as_text()
                    .to_lowercase()
                    .contains(&needle.to_lowercase())
            }
        }
    }

    fn compare<F>(value: Option<&FieldValue>, operand: Option<&FieldValue>, cmp: F) -> bool
    where
        F: Fn(f64, f64) -> bool,
    {
        match (value, operand) {
            // NaN on either side compares false
            (Some(value), Some(operand)) => cmp(value.to_number(), operand.to_number()),
            _ => false,
        }
    }

    fn between(value: Option<&FieldValue>, low: Option<&FieldValue>, high: Option<&FieldValue>) -> bool {
        match (value, low, high) {
            (Some(value), Some(low), Some(high)) => {
                let n = value.to_number();
                // Bounds are not swapped: low > high matches nothing
                n >= low.to_number() && n <= high.to_number()
            }
            _ => false,
        }
    }

    fn in_list(value: Option<&FieldValue>, operand: Option<&Value>) -> bool {
        let (value, operand) = match (value, operand) {
            (Some(value), Some(operand)) => (value, operand),
            _ => return false,
        };
        Self::operand_list(operand)
            .iter()
            .any(|candidate| value.loose_eq(candidate))
    }

    /// Candidate list for `in`/`not_in`: an array, a JSON-array string,
    /// a comma-separated string, or a single scalar.
    pub fn operand_list(operand: &Value) -> Vec<FieldValue> {
        match operand {
            Value::Array(items) => items.iter().map(FieldValue::from).collect(),
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.starts_with('[') {
                    if let Ok(items) = serde_json::from_str::<Vec<Value>>(trimmed) {
                        return items.iter().map(FieldValue::from).collect();
                    }
                }
                trimmed
                    .split(',')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(FieldValue::from)
                    .collect()
            }
            other => vec![FieldValue::from(other)],
        }
    }

    fn regex_matches(&self, value: Option<&FieldValue>, pattern: Option<&FieldValue>) -> bool {
        let (value, pattern) = match (value, pattern) {
            (Some(value), Some(pattern)) if !value.is_null() => (value, pattern.as_text()),
            _ => return false,
        };

        let haystack = match value {
            FieldValue::Array(_) | FieldValue::Map(_) => value.to_json().to_string(),
            scalar => scalar.as_text(),
        };

        self.compiled(&pattern)
            .map_or(false, |regex| regex.is_match(&haystack))
    }

    fn compiled(&self, pattern: &str) -> Option<Regex> {
        if let Some(entry) = self.patterns.read().get(pattern) {
            return entry.clone();
        }

        let compiled = match RegexBuilder::new(pattern)
            .case_insensitive(true)
            .size_limit(Self::REGEX_SIZE_LIMIT)
            .build()
        {
            Ok(regex) => Some(regex),
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "Invalid regex pattern, treating as non-match");
                None
            }
        };

        let mut patterns = self.patterns.write();
        if patterns.len() >= self.max_patterns {
            patterns.clear();
        }
        patterns
            .entry(pattern.to_string())
            .or_insert(compiled)
            .clone()
    }
}
