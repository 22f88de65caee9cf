// Batch filtering over record sets

use crate::cache::ResultCache;
use crate::condition::ConditionEvaluator;
use crate::resolver::FieldResolver;
use crate::tree::{EvalContext, FilterTreeEvaluator};
use ahash::AHashSet;
use sluice_core::{
    EngineConfig, Error, FilterGroup, FilterMetrics, FilterRequest, FilterResponse, Record,
    Result,
};
use std::collections::BTreeSet;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Records kept by one pass, in input order, plus pass metrics.
#[derive(Debug, Clone)]
pub struct FilterOutcome<'r> {
    pub kept: Vec<&'r Record>,
    pub metrics: FilterMetrics,
}

/// Filters record batches through a filter tree.
///
/// Owns the result cache; entries persist across calls until `clear_cache`.
/// Records are identified by id in the cache, so ids must be unique and
/// stable for the cache's lifetime.
pub struct FilterEngine {
    config: EngineConfig,
    evaluator: ConditionEvaluator,
    cache: ResultCache,
}

impl Default for FilterEngine {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            evaluator: ConditionEvaluator::new(),
            cache: ResultCache::new(),
        }
    }
}

impl FilterEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_cache(config, ResultCache::new())
    }

    /// Engine reusing a cache populated elsewhere.
    pub fn with_cache(config: EngineConfig, cache: ResultCache) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            evaluator: ConditionEvaluator::new(),
            cache,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut ResultCache {
        &mut self.cache
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
        self.evaluator.clear_patterns();
    }

    /// Keep the records that pass `root`, preserving input order.
    pub fn filter_messages<'r>(
        &mut self,
        records: &'r [Record],
        root: &FilterGroup,
    ) -> Result<FilterOutcome<'r>> {
        let (indices, metrics) = self.run(records, root)?;
        Ok(FilterOutcome {
            kept: indices.into_iter().map(|i| &records[i]).collect(),
            metrics,
        })
    }

    /// Request boundary: validate, filter and move kept records into the response.
    pub fn handle(&mut self, request: FilterRequest) -> Result<FilterResponse> {
        let FilterRequest { records, filter } = request;
        let (indices, metrics) = self.run(&records, &filter)?;

        let mut keep = vec![false; records.len()];
        for i in indices {
            keep[i] = true;
        }
        let kept = records
            .into_iter()
            .zip(keep)
            .filter_map(|(record, keep)| keep.then_some(record))
            .collect();

        Ok(FilterResponse { kept, metrics })
    }

    fn run(&mut self, records: &[Record], root: &FilterGroup) -> Result<(Vec<usize>, FilterMetrics)> {
        let start = Instant::now();

        if let Err(e) = root.validate(self.config.max_group_depth) {
            warn!(filter = %root.id, error = %e, "Rejected filter");
            return Err(e);
        }
        if let Err(e) = Self::check_unique_ids(records) {
            warn!(filter = %root.id, error = %e, "Rejected batch");
            return Err(e);
        }

        let before = self.cache.stats();

        if self.config.prefetch_fields {
            self.prefetch(records, root);
        }

        let mut ctx = EvalContext::with_cache(&self.evaluator, &mut self.cache).prepare(root);
        let indices: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, record)| FilterTreeEvaluator::evaluate_with(&mut ctx, record, root))
            .map(|(i, _)| i)
            .collect();
        let evaluations = ctx.evaluations();

        let delta = self.cache.stats().since(&before);
        let metrics = FilterMetrics {
            total_records: records.len(),
            kept_records: indices.len(),
            duration_ms: start.elapsed().as_secs_f64() * 1000.0,
            condition_evaluations: evaluations,
            cache_hits: delta.hits(),
            cache_misses: delta.misses(),
        };

        info!(
            filter = %root.id,
            total = metrics.total_records,
            kept = metrics.kept_records,
            evaluations = metrics.condition_evaluations,
            cache_hits = metrics.cache_hits,
            duration_ms = metrics.duration_ms,
            "Filter pass completed"
        );

        Ok((indices, metrics))
    }

    // Cached values and outcomes are keyed by record id
    fn check_unique_ids(records: &[Record]) -> Result<()> {
        let mut seen = AHashSet::with_capacity(records.len());
        for record in records {
            if !seen.insert(record.id.as_str()) {
                return Err(Error::Validation(format!(
                    "Duplicate record id '{}' in batch",
                    record.id
                )));
            }
        }
        Ok(())
    }

    /// Resolve every distinct active path once per record into the cache.
    fn prefetch(&mut self, records: &[Record], root: &FilterGroup) {
        let paths: BTreeSet<&str> = root
            .active_conditions()
            .into_iter()
            .map(|c| c.field_path.as_str())
            .collect();
        if paths.is_empty() || records.is_empty() {
            return;
        }

        for record in records {
            for path in &paths {
                self.cache
                    .value_or_resolve(&record.id, path, || FieldResolver::resolve(record, path));
            }
        }

        debug!(
            records = records.len(),
            paths = paths.len(),
            "Prefetched filter fields"
        );
    }
}
