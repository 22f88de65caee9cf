// AND/OR filter tree evaluation

use crate::cache::{condition_fingerprint, ResultCache};
use crate::condition::ConditionEvaluator;
use crate::resolver::FieldResolver;
use ahash::AHashMap;
use sluice_core::{Condition, FilterGroup, GroupOperator, Record};

/// Per-pass state threaded through the recursion: the evaluator, an optional
/// result cache and precomputed predicate fingerprints.
pub struct EvalContext<'a> {
    evaluator: &'a ConditionEvaluator,
    cache: Option<&'a mut ResultCache>,
    fingerprints: AHashMap<&'a str, u64>,
    evaluations: u64,
}

impl<'a> EvalContext<'a> {
    pub fn new(evaluator: &'a ConditionEvaluator) -> Self {
        Self {
            evaluator,
            cache: None,
            fingerprints: AHashMap::new(),
            evaluations: 0,
        }
    }

    pub fn with_cache(evaluator: &'a ConditionEvaluator, cache: &'a mut ResultCache) -> Self {
        Self {
            evaluator,
            cache: Some(cache),
            fingerprints: AHashMap::new(),
            evaluations: 0,
        }
    }

    /// Precompute fingerprints for every active condition of `root`.
    pub fn prepare(mut self, root: &'a FilterGroup) -> Self {
        for condition in root.active_conditions() {
            self.fingerprints
                .insert(condition.id.as_str(), condition_fingerprint(condition));
        }
        self
    }

    /// Leaf evaluations requested so far, cached or not.
    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    fn evaluate_condition(&mut self, record: &Record, condition: &Condition) -> bool {
        self.evaluations += 1;

        let fingerprint = match self.fingerprints.get(condition.id.as_str()) {
            Some(fp) => *fp,
            None => condition_fingerprint(condition),
        };

        let cache = match self.cache.as_deref_mut() {
            Some(cache) => cache,
            None => return self.evaluator.evaluate(record, condition),
        };

        if let Some(matched) = cache.outcome(&record.id, &condition.id, fingerprint) {
            return matched;
        }

        let matched = {
            let value = cache.value_or_resolve(&record.id, &condition.field_path, || {
                FieldResolver::resolve(record, &condition.field_path)
            });
            self.evaluator.evaluate_value(value, condition)
        };
        cache.store_outcome(&record.id, &condition.id, fingerprint, matched);
        matched
    }
}

/// Evaluates a filter tree against one record.
///
/// A disabled group is true and contributes nothing to its parent; a group
/// with no enabled children is true. Every enabled child is evaluated, then
/// combined with AND (all) or OR (any).
pub struct FilterTreeEvaluator;

impl FilterTreeEvaluator {
    /// Uncached evaluation.
    pub fn evaluate(evaluator: &ConditionEvaluator, record: &Record, root: &FilterGroup) -> bool {
        let mut ctx = EvalContext::new(evaluator);
        Self::evaluate_with(&mut ctx, record, root)
    }

    pub fn evaluate_with(ctx: &mut EvalContext<'_>, record: &Record, group: &FilterGroup) -> bool {
        if !group.enabled {
            return true;
        }

        let mut results = Vec::with_capacity(group.conditions.len() + group.groups.len());
        for condition in group.conditions.iter().filter(|c| c.enabled) {
            results.push(ctx.evaluate_condition(record, condition));
        }
        for child in group.groups.iter().filter(|g| g.enabled) {
            results.push(Self::evaluate_with(ctx, record, child));
        }

        // EDGE CASE: no enabled children passes everything
        if results.is_empty() {
            return true;
        }

        match group.operator {
            GroupOperator::And => results.iter().all(|r| *r),
            GroupOperator::Or => results.iter().any(|r| *r),
        }
    }
}
