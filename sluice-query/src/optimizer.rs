// Advisory filter optimizer: cost ordering, dedup, complexity, suggestions

use serde::Serialize;
use sluice_core::{Condition, FilterGroup, Operator};

/// Weight applied to a nested group's complexity
const NESTED_GROUP_WEIGHT: f64 = 1.5;
/// Enabled regex conditions tolerated in one group before flagging
const MAX_REGEX_PER_GROUP: usize = 2;
/// Nesting depth tolerated before flagging
const MAX_RECOMMENDED_DEPTH: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    RegexOveruse,
    DisabledConditions,
    DuplicateConditions,
    SuboptimalOrdering,
    DeepNesting,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub kind: SuggestionKind,
    pub group_id: String,
    pub message: String,
}

/// Everything the optimizer has to say about one filter.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationReport {
    pub optimized: FilterGroup,
    pub complexity: f64,
    pub optimized_complexity: f64,
    pub suggestions: Vec<Suggestion>,
}

/// Pure transforms over filter trees. Never mutates its input.
pub struct FilterOptimizer;

impl FilterOptimizer {
    /// Relative evaluation cost of an operator
    pub fn operator_cost(operator: Operator) -> u32 {
        match operator {
            Operator::Exists | Operator::NotExists => 1,
            Operator::Equals | Operator::NotEquals => 2,
            Operator::GreaterThan | Operator::LessThan | Operator::Between => 3,
            Operator::In | Operator::NotIn => 4,
            Operator::Contains | Operator::NotContains => 5,
            Operator::Regex | Operator::NotRegex => 10,
            Operator::Unknown => 5,
        }
    }

    /// Optimised copy: disabled nodes dropped, duplicate predicates removed
    /// (first occurrence kept), conditions stably sorted by ascending cost.
    /// Evaluates to the same result as `group` on every record.
    pub fn optimize(group: &FilterGroup) -> FilterGroup {
        let mut conditions: Vec<Condition> = Vec::with_capacity(group.conditions.len());
        for condition in group.conditions.iter().filter(|c| c.enabled) {
            if !conditions.iter().any(|kept| kept.same_predicate(condition)) {
                conditions.push(condition.clone());
            }
        }
        conditions.sort_by_key(|c| Self::operator_cost(c.operator));

        FilterGroup {
            id: group.id.clone(),
            name: group.name.clone(),
            operator: group.operator,
            conditions,
            groups: group
                .groups
                .iter()
                .filter(|g| g.enabled)
                .map(Self::optimize)
                .collect(),
            enabled: group.enabled,
        }
    }

    /// Weighted sum of enabled condition costs; nested groups count ×1.5.
    pub fn estimate_complexity(group: &FilterGroup) -> f64 {
        let own: f64 = group
            .conditions
            .iter()
            .filter(|c| c.enabled)
            .map(|c| Self::operator_cost(c.operator) as f64)
            .sum();
        let nested: f64 = group
            .groups
            .iter()
            .filter(|g| g.enabled)
            .map(|g| Self::estimate_complexity(g) * NESTED_GROUP_WEIGHT)
            .sum();
        own + nested
    }

    pub fn suggestions(group: &FilterGroup) -> Vec<Suggestion> {
        let mut out = Vec::new();

        let depth = group.depth();
        if depth > MAX_RECOMMENDED_DEPTH {
            out.push(Suggestion {
                kind: SuggestionKind::DeepNesting,
                group_id: group.id.clone(),
                message: format!(
                    "Filter nests {} levels deep; consider flattening to {} or fewer",
                    depth, MAX_RECOMMENDED_DEPTH
                ),
            });
        }

        Self::collect_suggestions(group, &mut out);
        out
    }

    pub fn report(group: &FilterGroup) -> OptimizationReport {
        let optimized = Self::optimize(group);
        OptimizationReport {
            complexity: Self::estimate_complexity(group),
            optimized_complexity: Self::estimate_complexity(&optimized),
            suggestions: Self::suggestions(group),
            optimized,
        }
    }

    fn collect_suggestions(group: &FilterGroup, out: &mut Vec<Suggestion>) {
        let label = if group.name.is_empty() {
            group.id.as_str()
        } else {
            group.name.as_str()
        };
        let enabled: Vec<&Condition> = group.conditions.iter().filter(|c| c.enabled).collect();

        let regex_count = enabled.iter().filter(|c| c.operator.is_regex()).count();
        if regex_count > MAX_REGEX_PER_GROUP {
            out.push(Suggestion {
                kind: SuggestionKind::RegexOveruse,
                group_id: group.id.clone(),
                message: format!(
                    "Group '{}' has {} regex conditions; prefer equals/contains where possible",
                    label, regex_count
                ),
            });
        }

        let disabled = group.conditions.len() - enabled.len();
        if disabled > 0 {
            out.push(Suggestion {
                kind: SuggestionKind::DisabledConditions,
                group_id: group.id.clone(),
                message: format!(
                    "Group '{}' carries {} disabled condition(s) that can be removed",
                    label, disabled
                ),
            });
        }

        let duplicates = enabled
            .iter()
            .enumerate()
            .filter(|(i, c)| enabled[..*i].iter().any(|prev| prev.same_predicate(c)))
            .count();
        if duplicates > 0 {
            out.push(Suggestion {
                kind: SuggestionKind::DuplicateConditions,
                group_id: group.id.clone(),
                message: format!(
                    "Group '{}' repeats {} condition(s) with identical path, operator and value",
                    label, duplicates
                ),
            });
        }

        let out_of_order = enabled.windows(2).any(|pair| {
            Self::operator_cost(pair[0].operator) > Self::operator_cost(pair[1].operator)
        });
        if out_of_order {
            out.push(Suggestion {
                kind: SuggestionKind::SuboptimalOrdering,
                group_id: group.id.clone(),
                message: format!(
                    "Group '{}' evaluates expensive conditions before cheaper ones",
                    label
                ),
            });
        }

        for child in &group.groups {
            Self::collect_suggestions(child, out);
        }
    }
}
