// Filter tree data model: leaf conditions grouped under AND/OR nodes
// Plain owned tree, serializable unchanged to and from JSON filter profiles

use crate::path::FieldPath;
use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    Regex,
    NotRegex,
    Exists,
    NotExists,
    GreaterThan,
    LessThan,
    Between,
    In,
    NotIn,
    /// Any operator name this version does not know
    #[serde(other)]
    Unknown,
}

impl Operator {
    pub const ALL: [Operator; 13] = [
        Operator::Equals,
        Operator::NotEquals,
        Operator::Contains,
        Operator::NotContains,
        Operator::Regex,
        Operator::NotRegex,
        Operator::Exists,
        Operator::NotExists,
        Operator::GreaterThan,
        Operator::LessThan,
        Operator::Between,
        Operator::In,
        Operator::NotIn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "not_equals",
            Operator::Contains => "contains",
            Operator::NotContains => "not_contains",
            Operator::Regex => "regex",
            Operator::NotRegex => "not_regex",
            Operator::Exists => "exists",
            Operator::NotExists => "not_exists",
            Operator::GreaterThan => "greater_than",
            Operator::LessThan => "less_than",
            Operator::Between => "between",
            Operator::In => "in",
            Operator::NotIn => "not_in",
            Operator::Unknown => "unknown",
        }
    }

    /// Every operator except `exists`/`not_exists` needs an operand.
    pub fn requires_value(&self) -> bool {
        !matches!(self, Operator::Exists | Operator::NotExists)
    }

    pub fn requires_secondary_value(&self) -> bool {
        matches!(self, Operator::Between)
    }

    pub fn is_regex(&self) -> bool {
        matches!(self, Operator::Regex | Operator::NotRegex)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupOperator {
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

impl fmt::Display for GroupOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupOperator::And => write!(f, "AND"),
            GroupOperator::Or => write!(f, "OR"),
        }
    }
}

fn enabled_by_default() -> bool {
    true
}

// EDGE CASE: an explicit `null` operand is a value; only an absent key is `None`
fn present_operand<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Leaf predicate: `fieldPath operator value [secondaryValue]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub id: String,
    pub field_path: String,
    pub operator: Operator,
    #[serde(default, deserialize_with = "present_operand", skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, deserialize_with = "present_operand", skip_serializing_if = "Option::is_none")]
    pub secondary_value: Option<Value>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

impl Condition {
    pub fn new(id: impl Into<String>, field_path: impl Into<String>, operator: Operator, value: Value) -> Self {
        Self {
            id: id.into(),
            field_path: field_path.into(),
            operator,
            value: Some(value),
            secondary_value: None,
            enabled: true,
        }
    }

    pub fn exists(id: impl Into<String>, field_path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            field_path: field_path.into(),
            operator: Operator::Exists,
            value: None,
            secondary_value: None,
            enabled: true,
        }
    }

    pub fn not_exists(id: impl Into<String>, field_path: impl Into<String>) -> Self {
        Self {
            operator: Operator::NotExists,
            ..Self::exists(id, field_path)
        }
    }

    pub fn between(id: impl Into<String>, field_path: impl Into<String>, low: Value, high: Value) -> Self {
        Self {
            secondary_value: Some(high),
            ..Self::new(id, field_path, Operator::Between, low)
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Same path, operator and operands.
    pub fn same_predicate(&self, other: &Condition) -> bool {
        self.field_path == other.field_path
            && self.operator == other.operator
            && self.value == other.value
            && self.secondary_value == other.secondary_value
    }

    /// Structural checks for a single condition.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::Validation(format!(
                "Condition on '{}' has an empty id",
                self.field_path
            )));
        }

        FieldPath::parse(&self.field_path).map_err(|e| {
            Error::Validation(format!("Condition '{}': {}", self.id, e))
        })?;

        if self.operator == Operator::Unknown {
            return Err(Error::UnknownOperator(format!(
                "condition '{}' uses an unrecognised operator",
                self.id
            )));
        }

        if self.operator.requires_value() && self.value.is_none() {
            return Err(Error::Validation(format!(
                "Condition '{}': operator '{}' requires a value",
                self.id, self.operator
            )));
        }

        if self.operator.requires_secondary_value() && self.secondary_value.is_none() {
            return Err(Error::Validation(format!(
                "Condition '{}': operator '{}' requires a secondary value",
                self.id, self.operator
            )));
        }

        Ok(())
    }
}

/// Internal node combining conditions and nested groups with AND/OR
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterGroup {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub operator: GroupOperator,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub groups: Vec<FilterGroup>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

impl FilterGroup {
    pub fn new(id: impl Into<String>, operator: GroupOperator) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            operator,
            conditions: Vec::new(),
            groups: Vec::new(),
            enabled: true,
        }
    }

    pub fn and(id: impl Into<String>) -> Self {
        Self::new(id, GroupOperator::And)
    }

    pub fn or(id: impl Into<String>) -> Self {
        Self::new(id, GroupOperator::Or)
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_group(mut self, group: FilterGroup) -> Self {
        self.groups.push(group);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Nesting depth, counting this group as 1.
    pub fn depth(&self) -> usize {
        1 + self.groups.iter().map(FilterGroup::depth).max().unwrap_or(0)
    }

    /// Every condition in the tree, enabled or not, depth first.
    pub fn all_conditions(&self) -> Vec<&Condition> {
        let mut out = Vec::new();
        self.collect_conditions(&mut out, false);
        out
    }

    /// Conditions that can actually be evaluated: enabled, under enabled groups.
    pub fn active_conditions(&self) -> Vec<&Condition> {
        let mut out = Vec::new();
        if self.enabled {
            self.collect_conditions(&mut out, true);
        }
        out
    }

    fn collect_conditions<'a>(&'a self, out: &mut Vec<&'a Condition>, active_only: bool) {
        out.extend(self.conditions.iter().filter(|c| !active_only || c.enabled));
        for group in &self.groups {
            if !active_only || group.enabled {
                group.collect_conditions(out, active_only);
            }
        }
    }

    /// Reject structurally malformed trees before any record is evaluated.
    ///
    /// Disabled nodes are validated too: a filter profile must round-trip
    /// whatever its enable flags say.
    pub fn validate(&self, max_depth: usize) -> Result<()> {
        let depth = self.depth();
        if depth > max_depth {
            return Err(Error::Validation(format!(
                "Filter nesting depth {} exceeds maximum {}",
                depth, max_depth
            )));
        }

        let mut seen = HashSet::new();
        for condition in self.all_conditions() {
            condition.validate()?;
            if !seen.insert(condition.id.as_str()) {
                return Err(Error::Validation(format!(
                    "Duplicate condition id '{}'",
                    condition.id
                )));
            }
        }

        Ok(())
    }
}
