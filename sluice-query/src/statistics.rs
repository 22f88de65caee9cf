// Per-field frequency tables, coverage and trends, with incremental merge

use ahash::AHashMap;
use serde_json::Value;
use sluice_core::{
    EngineConfig, FieldInfo, FieldStatistics, FieldType, Record, TimeInterval, TimeSeriesPoint,
    ValueCount,
};
use std::collections::{BTreeMap, BTreeSet};

/// Aggregates profiler output into [`FieldStatistics`].
///
/// Values are tallied under their compact JSON text, so `1` and `"1"` are
/// distinct values. Top values are ordered by count descending, then by that
/// text ascending, which keeps ranking identical between a full analysis and
/// an incremental merge of the same corpus.
pub struct StatisticsEngine {
    max_unique_values: usize,
    interval: TimeInterval,
    enable_time_series: bool,
}

impl Default for StatisticsEngine {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl StatisticsEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            max_unique_values: config.max_unique_values.max(1),
            interval: config.time_series_interval,
            enable_time_series: config.enable_time_series,
        }
    }

    /// Statistics for every profiled path, sorted by path.
    pub fn analyze(&self, infos: &[FieldInfo<'_>], records: &[Record]) -> Vec<FieldStatistics> {
        let mut by_path: BTreeMap<&str, PathAccumulator> = BTreeMap::new();
        for info in infos {
            by_path
                .entry(info.path.as_str())
                .or_default()
                .observe(info, self.interval, self.enable_time_series);
        }

        let record_count = records.len() as u64;
        by_path
            .into_iter()
            .map(|(path, acc)| acc.finish(path, record_count, self.max_unique_values, None))
            .collect()
    }

    /// Fold a new batch into one path's existing statistics.
    ///
    /// Only `new_infos` entries for `existing.path` are used; `new_records`
    /// is the whole new batch and grows the coverage denominator.
    pub fn merge(
        &self,
        existing: &FieldStatistics,
        new_infos: &[FieldInfo<'_>],
        new_records: &[Record],
    ) -> FieldStatistics {
        let mut acc = PathAccumulator::from_statistics(existing);
        for info in new_infos.iter().filter(|i| i.path == existing.path) {
            acc.observe(info, self.interval, self.enable_time_series);
        }

        let record_count = prior_record_count(existing) + new_records.len() as u64;
        acc.finish(&existing.path, record_count, self.max_unique_values, Some(existing))
    }

    /// Merge a new batch into a whole statistics map. Paths only present in
    /// the existing map keep their tallies with coverage recomputed against
    /// the larger corpus; paths only present in the batch are added.
    pub fn merge_all(
        &self,
        existing: &BTreeMap<String, FieldStatistics>,
        new_infos: &[FieldInfo<'_>],
        new_records: &[Record],
    ) -> BTreeMap<String, FieldStatistics> {
        // The prior corpus size is only known through its per-path stats: a prior
        // batch that profiled no paths at all (every body null) contributes no
        // records, and merged coverage is relative to the remaining records.
        let prior_records = existing.values().map(prior_record_count).max().unwrap_or(0);
        let record_count = prior_records + new_records.len() as u64;

        let mut by_path: BTreeMap<&str, PathAccumulator> = existing
            .iter()
            .map(|(path, stats)| (path.as_str(), PathAccumulator::from_statistics(stats)))
            .collect();
        for info in new_infos {
            by_path
                .entry(info.path.as_str())
                .or_default()
                .observe(info, self.interval, self.enable_time_series);
        }

        by_path
            .into_iter()
            .map(|(path, acc)| {
                let stats = acc.finish(path, record_count, self.max_unique_values, existing.get(path));
                (path.to_string(), stats)
            })
            .collect()
    }

    /// Record counts and average record size per interval bucket.
    pub fn time_series(&self, records: &[Record]) -> Vec<TimeSeriesPoint> {
        let mut buckets: BTreeMap<i64, Bucket> = BTreeMap::new();
        for record in records {
            buckets
                .entry(self.interval.bucket_start(record.timestamp))
                .or_default()
                .add(record.size_estimate());
        }
        buckets
            .into_iter()
            .map(|(start, bucket)| bucket.point(start))
            .collect()
    }
}

/// Record count behind existing statistics. Older payloads may lack
/// `recordCount`; derive it from coverage when possible.
fn prior_record_count(stats: &FieldStatistics) -> u64 {
    if stats.record_count > 0 {
        return stats.record_count;
    }
    let resolved = stats.total_observations.saturating_sub(stats.null_count);
    if stats.coverage > 0.0 && stats.coverage.is_finite() {
        (resolved as f64 / stats.coverage).round() as u64
    } else {
        stats.total_observations
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Bucket {
    count: u64,
    total_size: f64,
}

impl Bucket {
    fn add(&mut self, size: u64) {
        self.count += 1;
        self.total_size += size as f64;
    }

    fn point(&self, bucket_start: i64) -> TimeSeriesPoint {
        let average_size = if self.count == 0 {
            0.0
        } else {
            self.total_size / self.count as f64
        };
        TimeSeriesPoint {
            bucket_start,
            count: self.count,
            average_size,
        }
    }
}

#[derive(Debug, Default)]
struct PathAccumulator {
    data_type: BTreeSet<FieldType>,
    observations: u64,
    nulls: u64,
    frequencies: AHashMap<String, (Value, u64)>,
    buckets: BTreeMap<i64, Bucket>,
}

impl PathAccumulator {
    fn from_statistics(stats: &FieldStatistics) -> Self {
        let frequencies = stats
            .top_values
            .iter()
            .map(|vc| (vc.value.to_string(), (vc.value.clone(), vc.count)))
            .collect();
        let buckets = stats
            .trend
            .iter()
            .map(|p| {
                let bucket = Bucket {
                    count: p.count,
                    total_size: p.average_size * p.count as f64,
                };
                (p.bucket_start, bucket)
            })
            .collect();

        Self {
            data_type: stats.data_type.clone(),
            observations: stats.total_observations,
            nulls: stats.null_count,
            frequencies,
            buckets,
        }
    }

    fn observe(&mut self, info: &FieldInfo<'_>, interval: TimeInterval, track_trend: bool) {
        self.data_type.insert(info.field_type);
        self.observations += 1;
        if info.value.is_null() {
            self.nulls += 1;
        }

        let key = info.value.to_string();
        match self.frequencies.get_mut(&key) {
            Some((_, count)) => *count += 1,
            None => {
                self.frequencies.insert(key, (info.value.clone(), 1));
            }
        }

        if track_trend {
            self.buckets
                .entry(interval.bucket_start(info.timestamp))
                .or_default()
                .add(info.record_size);
        }
    }

    fn finish(
        self,
        path: &str,
        record_count: u64,
        max_unique_values: usize,
        previous: Option<&FieldStatistics>,
    ) -> FieldStatistics {
        let distinct = self.frequencies.len() as u64;
        let mut entries: Vec<(String, Value, u64)> = self
            .frequencies
            .into_iter()
            .map(|(key, (value, count))| (key, value, count))
            .collect();
        entries.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.0.cmp(&b.0)));

        let previously_truncated = previous.map_or(false, |p| p.truncated);
        let truncated = previously_truncated || entries.len() > max_unique_values;
        entries.truncate(max_unique_values);

        // EDGE CASE: values cut earlier are gone, keep the larger distinct count
        let unique_value_count = match previous {
            Some(p) if p.truncated => p.unique_value_count.max(distinct),
            _ => distinct,
        };

        let observations = self.observations;
        let top_values = entries
            .into_iter()
            .map(|(_, value, count)| ValueCount {
                value,
                count,
                percentage: if observations == 0 {
                    0.0
                } else {
                    count as f64 / observations as f64
                },
            })
            .collect();

        FieldStatistics {
            path: path.to_string(),
            data_type: self.data_type,
            total_observations: observations,
            null_count: self.nulls,
            unique_value_count,
            record_count,
            coverage: FieldStatistics::compute_coverage(observations, self.nulls, record_count),
            top_values,
            trend: self
                .buckets
                .into_iter()
                .map(|(start, bucket)| bucket.point(start))
                .collect(),
            truncated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiler::FieldProfiler;
    use serde_json::json;

    const HOUR: i64 = 3_600_000;

    fn batch_a() -> Vec<Record> {
        vec![
            Record::new("a1", json!({"type": "order", "amount": 100})).with_timestamp(0),
            Record::new("a2", json!({"type": "order", "amount": 50})).with_timestamp(10),
            Record::new("a3", json!({"type": "payment"})).with_timestamp(HOUR + 5),
        ]
    }

    fn batch_b() -> Vec<Record> {
        vec![
            Record::new("b1", json!({"type": "payment", "amount": 100})).with_timestamp(HOUR),
            Record::new("b2", json!({"type": "payment", "note": null})).with_timestamp(2 * HOUR),
        ]
    }

    fn analyze_map(engine: &StatisticsEngine, records: &[Record]) -> BTreeMap<String, FieldStatistics> {
        let infos = FieldProfiler::default().profile(records);
        engine
            .analyze(&infos, records)
            .into_iter()
            .map(|s| (s.path.clone(), s))
            .collect()
    }

    #[test]
    fn test_analyze_basic() {
        let engine = StatisticsEngine::default();
        let stats = analyze_map(&engine, &batch_a());

        let amount = &stats["amount"];
        assert_eq!(amount.total_observations, 2);
        assert_eq!(amount.unique_value_count, 2);
        assert!((amount.coverage - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(amount.data_type, BTreeSet::from([FieldType::Number]));

        let kind = &stats["type"];
        assert_eq!(kind.top_values[0].value, json!("order"));
        assert_eq!(kind.top_values[0].count, 2);
        assert!((kind.top_values[0].percentage - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(kind.trend.len(), 2);
        assert_eq!(kind.trend[0].bucket_start, 0);
        assert_eq!(kind.trend[0].count, 2);
        assert_eq!(kind.trend[1].bucket_start, HOUR);
    }

    #[test]
    fn test_null_observations() {
        let engine = StatisticsEngine::default();
        let stats = analyze_map(&engine, &batch_b());
        let note = &stats["note"];
        assert_eq!(note.total_observations, 1);
        assert_eq!(note.null_count, 1);
        assert_eq!(note.coverage, 0.0);
        assert_eq!(note.top_values[0].value, Value::Null);
    }

    #[test]
    fn test_truncation() {
        let config = EngineConfig {
            max_unique_values: 2,
            ..Default::default()
        };
        let engine = StatisticsEngine::new(&config);
        let records: Vec<Record> = (0..5)
            .map(|i| Record::new(format!("m{}", i), json!({"n": i % 3})))
            .collect();
        let stats = analyze_map(&engine, &records);
        let n = &stats["n"];
        assert!(n.truncated);
        assert_eq!(n.unique_value_count, 3);
        assert_eq!(n.top_values.len(), 2);
        // 0 and 1 appear twice, 2 once; ties broken by text
        assert_eq!(n.top_values[0].value, json!(0));
        assert_eq!(n.top_values[1].value, json!(1));
    }

    #[test]
    fn test_merge_matches_full_analysis() {
        let engine = StatisticsEngine::default();
        let a = batch_a();
        let b = batch_b();
        let combined: Vec<Record> = a.iter().chain(b.iter()).cloned().collect();

        let full = analyze_map(&engine, &combined);
        let infos_b = FieldProfiler::default().profile(&b);
        let merged = engine.merge_all(&analyze_map(&engine, &a), &infos_b, &b);

        assert_eq!(full.keys().collect::<Vec<_>>(), merged.keys().collect::<Vec<_>>());
        for (path, expected) in &full {
            let actual = &merged[path];
            assert_eq!(actual.total_observations, expected.total_observations, "{}", path);
            assert_eq!(actual.record_count, expected.record_count, "{}", path);
            assert!((actual.coverage - expected.coverage).abs() < 1e-12, "{}", path);
            assert_eq!(actual.top_values.len(), expected.top_values.len(), "{}", path);
            for (x, y) in actual.top_values.iter().zip(&expected.top_values) {
                assert_eq!(x.value, y.value, "{}", path);
                assert_eq!(x.count, y.count, "{}", path);
            }
            let counts = |s: &FieldStatistics| s.trend.iter().map(|p| (p.bucket_start, p.count)).collect::<Vec<_>>();
            assert_eq!(counts(actual), counts(expected), "{}", path);
        }
    }

    #[test]
    fn test_merge_single_path() {
        let engine = StatisticsEngine::default();
        let a = batch_a();
        let b = batch_b();
        let existing = analyze_map(&engine, &a).remove("type").unwrap();
        let infos_b = FieldProfiler::default().profile(&b);

        let merged = engine.merge(&existing, &infos_b, &b);
        assert_eq!(merged.total_observations, 5);
        assert_eq!(merged.record_count, 5);
        assert_eq!(merged.top_values[0].value, json!("payment"));
        assert_eq!(merged.top_values[0].count, 3);
        assert!((merged.top_values[0].percentage - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_missing_record_count_derived_from_coverage() {
        let mut stats = analyze_map(&StatisticsEngine::default(), &batch_a()).remove("amount").unwrap();
        stats.record_count = 0;
        assert_eq!(prior_record_count(&stats), 3);
    }

    #[test]
    fn test_merge_into_empty_map_counts_new_records_only() {
        let engine = StatisticsEngine::default();
        let records = vec![
            Record::new("m1", json!({"a": 1})),
            Record::new("m2", json!({"b": 2})),
        ];
        let infos = FieldProfiler::default().profile(&records);
        let merged = engine.merge_all(&BTreeMap::new(), &infos, &records);
        assert_eq!(merged["a"].record_count, 2);
        assert_eq!(merged["a"].coverage, 0.5);
    }

    #[test]
    fn test_time_series() {
        let engine = StatisticsEngine::default();
        let records = vec![
            Record::new("m1", json!({})).with_timestamp(HOUR + 1).with_size(10),
            Record::new("m2", json!({})).with_timestamp(5).with_size(30),
            Record::new("m3", json!({})).with_timestamp(7).with_size(10),
        ];
        let series = engine.time_series(&records);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].bucket_start, 0);
        assert_eq!(series[0].count, 2);
        assert_eq!(series[0].average_size, 20.0);
        assert_eq!(series[1].bucket_start, HOUR);
    }

    #[test]
    fn test_trend_disabled() {
        let config = EngineConfig {
            enable_time_series: false,
            ..Default::default()
        };
        let stats = analyze_map(&StatisticsEngine::new(&config), &batch_a());
        assert!(stats.values().all(|s| s.trend.is_empty()));
    }
}
