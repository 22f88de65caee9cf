// Per-record memo of resolved field values and condition outcomes

use ahash::AHashMap;
use serde::Serialize;
use sluice_core::{Condition, FieldValue};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub value_hits: u64,
    pub value_misses: u64,
    pub outcome_hits: u64,
    pub outcome_misses: u64,
}

impl CacheStats {
    pub fn hits(&self) -> u64 {
        self.value_hits + self.outcome_hits
    }

    pub fn misses(&self) -> u64 {
        self.value_misses + self.outcome_misses
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.hits() + self.misses();
        if total == 0 {
            0.0
        } else {
            self.hits() as f64 / total as f64
        }
    }

    /// Counters accumulated since `earlier`.
    pub fn since(&self, earlier: &CacheStats) -> CacheStats {
        CacheStats {
            value_hits: self.value_hits.saturating_sub(earlier.value_hits),
            value_misses: self.value_misses.saturating_sub(earlier.value_misses),
            outcome_hits: self.outcome_hits.saturating_sub(earlier.outcome_hits),
            outcome_misses: self.outcome_misses.saturating_sub(earlier.outcome_misses),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedOutcome {
    fingerprint: u64,
    matched: bool,
}

/// Two-level memo keyed by record id.
///
/// Values: record id -> path -> resolved value (`None` = unresolved).
/// Outcomes: record id -> condition id -> result, tagged with the fingerprint
/// of the predicate it was computed for. A condition id reused with a
/// different predicate misses instead of returning a stale outcome.
///
/// Entries live until cleared; the owner decides when.
#[derive(Debug, Default)]
pub struct ResultCache {
    values: AHashMap<String, AHashMap<String, Option<FieldValue>>>,
    outcomes: AHashMap<String, AHashMap<String, CachedOutcome>>,
    stats: CacheStats,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached value for `(record_id, path)`, resolving and storing it on a miss.
    pub fn value_or_resolve<F>(&mut self, record_id: &str, path: &str, resolve: F) -> Option<&FieldValue>
    where
        F: FnOnce() -> Option<FieldValue>,
    {
        if !self.values.contains_key(record_id) {
            self.values.insert(record_id.to_string(), AHashMap::new());
        }
        let per_record = self.values.get_mut(record_id)?;

        if per_record.contains_key(path) {
            self.stats.value_hits += 1;
        } else {
            self.stats.value_misses += 1;
            per_record.insert(path.to_string(), resolve());
        }

        per_record.get(path).and_then(Option::as_ref)
    }

    /// Cached value without resolving. Outer `None` = not cached.
    pub fn peek_value(&self, record_id: &str, path: &str) -> Option<Option<&FieldValue>> {
        self.values
            .get(record_id)
            .and_then(|per_record| per_record.get(path))
            .map(Option::as_ref)
    }

    /// Cached outcome, only if it was stored for the same predicate fingerprint.
    pub fn outcome(&mut self, record_id: &str, condition_id: &str, fingerprint: u64) -> Option<bool> {
        let cached = self
            .outcomes
            .get(record_id)
            .and_then(|per_record| per_record.get(condition_id))
            .filter(|cached| cached.fingerprint == fingerprint)
            .map(|cached| cached.matched);

        match cached {
            Some(_) => self.stats.outcome_hits += 1,
            None => self.stats.outcome_misses += 1,
        }
        cached
    }

    pub fn store_outcome(&mut self, record_id: &str, condition_id: &str, fingerprint: u64, matched: bool) {
        if !self.outcomes.contains_key(record_id) {
            self.outcomes.insert(record_id.to_string(), AHashMap::new());
        }
        if let Some(per_record) = self.outcomes.get_mut(record_id) {
            per_record.insert(
                condition_id.to_string(),
                CachedOutcome {
                    fingerprint,
                    matched,
                },
            );
        }
    }

    /// Drop everything cached for one record.
    pub fn invalidate_record(&mut self, record_id: &str) {
        self.values.remove(record_id);
        self.outcomes.remove(record_id);
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.outcomes.clear();
    }

    pub fn clear_values(&mut self) {
        self.values.clear();
    }

    pub fn clear_outcomes(&mut self) {
        self.outcomes.clear();
    }

    pub fn value_entries(&self) -> usize {
        self.values.values().map(|m| m.len()).sum()
    }

    pub fn outcome_entries(&self) -> usize {
        self.outcomes.values().map(|m| m.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.value_entries() == 0 && self.outcome_entries() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = CacheStats::default();
    }
}

/// Hash of a condition's predicate: path, operator and operands.
pub fn condition_fingerprint(condition: &Condition) -> u64 {
    let mut hasher = DefaultHasher::new();
    condition.field_path.hash(&mut hasher);
    condition.operator.as_str().hash(&mut hasher);
    // serde_json::Value has no Hash impl; its compact text is stable for a given value
    condition.value.as_ref().map(|v| v.to_string()).hash(&mut hasher);
    condition
        .secondary_value
        .as_ref()
        .map(|v| v.to_string())
        .hash(&mut hasher);
    hasher.finish()
}
