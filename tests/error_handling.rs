// Error handling: structural rejection at the boundary, degradation during evaluation

use serde_json::json;
use sluice_core::{
    Condition, EngineConfig, Error, FieldPath, FilterGroup, FilterRequest, Operator, Record,
};
use sluice_query::{AnalyticsEngine, FilterEngine};

fn records() -> Vec<Record> {
    vec![Record::new("m1", json!({"a": 1}))]
}

// ============================================================================
// STRUCTURAL ERRORS
// ============================================================================

#[test]
fn test_missing_value_rejected() {
    let mut condition = Condition::new("c1", "a", Operator::GreaterThan, json!(1));
    condition.value = None;
    let filter = FilterGroup::and("root").with_condition(condition);
    let mut engine = FilterEngine::default();
    assert!(matches!(
        engine.filter_messages(&records(), &filter),
        Err(Error::Validation(_))
    ));
}

#[test]
fn test_missing_secondary_value_rejected() {
    let mut condition = Condition::between("c1", "a", json!(1), json!(2));
    condition.secondary_value = None;
    let filter = FilterGroup::and("root").with_condition(condition);
    assert!(filter.validate(32).is_err());
}

#[test]
fn test_unknown_operator_rejected_from_json() {
    let filter: FilterGroup = serde_json::from_value(json!({
        "id": "root",
        "operator": "OR",
        "conditions": [{"id": "c1", "fieldPath": "a", "operator": "starts_with", "value": "x"}]
    }))
    .unwrap();
    assert_eq!(filter.conditions[0].operator, Operator::Unknown);

    let mut engine = FilterEngine::default();
    assert!(matches!(
        engine.filter_messages(&records(), &filter),
        Err(Error::UnknownOperator(_))
    ));
}

#[test]
fn test_duplicate_condition_ids_rejected() {
    let filter = FilterGroup::and("root")
        .with_condition(Condition::exists("same", "a"))
        .with_group(FilterGroup::or("inner").with_condition(Condition::exists("same", "b")));
    assert!(matches!(filter.validate(32), Err(Error::Validation(_))));
}

#[test]
fn test_duplicate_record_ids_rejected() {
    let records = vec![
        Record::new("dup", json!({"amount": 100})),
        Record::new("dup", json!({"amount": 5})),
    ];
    let filter = FilterGroup::and("root").with_condition(Condition::new(
        "c1",
        "amount",
        Operator::GreaterThan,
        json!(50),
    ));
    let mut engine = FilterEngine::default();
    assert!(matches!(
        engine.filter_messages(&records, &filter),
        Err(Error::Validation(_))
    ));
    assert!(engine.cache().is_empty());

    let request = FilterRequest { records, filter };
    assert!(engine.handle(request).is_err());
}

#[test]
fn test_disabled_conditions_still_validated() {
    let filter = FilterGroup::and("root").with_condition(Condition::exists("c1", "a..b").disabled());
    assert!(filter.validate(32).is_err());
}

#[test]
fn test_excessive_nesting_rejected() {
    let mut group = FilterGroup::and("g0");
    for i in 1..10 {
        group = FilterGroup::and(format!("g{}", i)).with_group(group);
    }
    let mut engine = FilterEngine::new(EngineConfig {
        max_group_depth: 5,
        ..Default::default()
    })
    .unwrap();
    assert!(engine.filter_messages(&records(), &group).is_err());
}

#[test]
fn test_malformed_paths() {
    for path in ["", "a..b", "a[", "a[x]", "a]b", "a[1]b", "bad\npath"] {
        assert!(
            matches!(FieldPath::parse(path), Err(Error::InvalidPath { .. })),
            "{:?}",
            path
        );
    }
    assert!(FieldPath::parse(&"a".repeat(FieldPath::MAX_PATH_LENGTH + 1)).is_err());
    assert!(FieldPath::parse("a.b[0].c").is_ok());
}

#[test]
fn test_malformed_request_json() {
    let result: Result<FilterRequest, _> = serde_json::from_value(json!({"records": "nope"}));
    let err: Error = result.unwrap_err().into();
    assert!(matches!(err, Error::Deserialization(_)));
}

#[test]
fn test_invalid_config_rejected() {
    assert!(matches!(
        FilterEngine::new(EngineConfig {
            max_field_depth: 0,
            ..Default::default()
        }),
        Err(Error::Configuration(_))
    ));
    assert!(AnalyticsEngine::new(EngineConfig {
        correlation_threshold: -0.1,
        ..Default::default()
    })
    .is_err());
}

// ============================================================================
// DEGRADATION (never errors)
// ============================================================================

#[test]
fn test_bad_operands_degrade_to_false() {
    let records = vec![Record::new("m1", json!({"n": 5, "s": "text"}))];
    let mut engine = FilterEngine::default();
    for condition in [
        Condition::new("c1", "n", Operator::GreaterThan, json!("not a number")),
        Condition::new("c1", "s", Operator::LessThan, json!(10)),
        Condition::between("c1", "n", json!(null), json!(10)),
        Condition::new("c1", "n", Operator::Regex, json!("(")),
        Condition::new("c1", "n", Operator::In, json!({"not": "a list"})),
    ] {
        let filter = FilterGroup::and("root").with_condition(condition);
        let outcome = engine.filter_messages(&records, &filter).unwrap();
        assert!(outcome.kept.is_empty(), "{:?}", filter.conditions[0]);
    }
}

#[test]
fn test_one_bad_record_does_not_abort_batch() {
    let records = vec![
        Record::new("m1", json!({"amount": 10})),
        Record::new("m2", json!("just a string")),
        Record::new("m3", json!([1, 2, 3])),
        Record::new("m4", json!({"amount": {"nested": true}})),
        Record::new("m5", json!({"amount": 99})),
    ];
    let filter = FilterGroup::and("root").with_condition(Condition::new(
        "c1",
        "amount",
        Operator::GreaterThan,
        json!(5),
    ));
    let mut engine = FilterEngine::default();
    let ids: Vec<String> = engine
        .filter_messages(&records, &filter)
        .unwrap()
        .kept
        .iter()
        .map(|r| r.id.clone())
        .collect();
    assert_eq!(ids, vec!["m1", "m5"]);
}
