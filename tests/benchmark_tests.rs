use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;
use sluice_core::{AnalysisRequest, Condition, FilterGroup, Operator, Record};
use sluice_query::{AnalyticsEngine, FieldProfiler, FilterEngine, StatisticsEngine};

fn sample_records(count: usize) -> Vec<Record> {
    (0..count)
        .map(|i| {
            Record::new(
                format!("m{}", i),
                json!({
                    "type": if i % 3 == 0 { "payment" } else { "order" },
                    "amount": (i * 37) % 500,
                    "customer": {"id": i % 100, "tier": if i % 7 == 0 { "gold" } else { "basic" }},
                    "lines": [{"sku": format!("sku-{}", i % 13), "qty": i % 5}]
                }),
            )
            .with_timestamp(i as i64 * 1_000)
            .with_property("tenant", json!(format!("tenant-{}", i % 4)))
        })
        .collect()
}

fn sample_filter() -> FilterGroup {
    FilterGroup::and("root")
        .with_condition(Condition::new("c1", "type", Operator::Equals, json!("order")))
        .with_condition(Condition::between("c2", "amount", json!(50), json!(400)))
        .with_group(
            FilterGroup::or("tier")
                .with_condition(Condition::new("c3", "customer.tier", Operator::Regex, json!("^g")))
                .with_condition(Condition::new("c4", "properties.tenant", Operator::In, json!(["tenant-1", "tenant-2"]))),
        )
}

fn bench_filter_cold(c: &mut Criterion) {
    let records = sample_records(10_000);
    let filter = sample_filter();

    c.bench_function("filter_10k_cold_cache", |b| {
        b.iter(|| {
            let mut engine = FilterEngine::default();
            engine
                .filter_messages(black_box(&records), black_box(&filter))
                .map(|outcome| outcome.kept.len())
        })
    });
}

fn bench_filter_warm(c: &mut Criterion) {
    let records = sample_records(10_000);
    let filter = sample_filter();
    let mut engine = FilterEngine::default();
    let _ = engine.filter_messages(&records, &filter);

    c.bench_function("filter_10k_warm_cache", |b| {
        b.iter(|| {
            engine
                .filter_messages(black_box(&records), black_box(&filter))
                .map(|outcome| outcome.kept.len())
        })
    });
}

fn bench_profile_and_statistics(c: &mut Criterion) {
    let records = sample_records(5_000);
    let profiler = FieldProfiler::default();
    let statistics = StatisticsEngine::default();

    c.bench_function("profile_statistics_5k", |b| {
        b.iter(|| {
            let infos = profiler.profile(black_box(&records));
            statistics.analyze(&infos, &records).len()
        })
    });
}

fn bench_full_analysis(c: &mut Criterion) {
    let request = AnalysisRequest {
        records: sample_records(2_000),
        connection_id: "bench".to_string(),
        existing_statistics: None,
    };
    let engine = AnalyticsEngine::default();

    c.bench_function("analysis_2k", |b| {
        b.iter(|| engine.analyze(black_box(&request)).map(|r| r.statistics.len()))
    });
}

criterion_group!(
    benches,
    bench_filter_cold,
    bench_filter_warm,
    bench_profile_and_statistics,
    bench_full_analysis
);
criterion_main!(benches);
