// Filter optimizer tests: equivalence with the original filter, costs, suggestions

use serde_json::json;
use sluice_core::{Condition, FilterGroup, Operator, Record};
use sluice_query::{FilterEngine, FilterOptimizer, SuggestionKind};

fn records() -> Vec<Record> {
    vec![
        Record::new("m1", json!({"type": "order", "amount": 100, "note": "rush delivery"})),
        Record::new("m2", json!({"type": "order", "amount": 50})),
        Record::new("m3", json!({"type": "payment", "amount": 200, "note": "Refund"})),
        Record::new("m4", json!({"type": "refund", "amount": -20, "note": "manual"})),
    ]
}

fn noisy_filter() -> FilterGroup {
    FilterGroup::and("root")
        .with_condition(Condition::new("r1", "note", Operator::NotRegex, json!("^refund")))
        .with_condition(Condition::new("e1", "type", Operator::NotEquals, json!("payment")))
        .with_condition(Condition::new("e2", "type", Operator::NotEquals, json!("payment")))
        .with_condition(Condition::exists("x1", "amount"))
        .with_condition(Condition::new("off", "amount", Operator::LessThan, json!(0)).disabled())
        .with_group(
            FilterGroup::or("inner")
                .with_condition(Condition::new("c1", "note", Operator::Contains, json!("rush")))
                .with_condition(Condition::between("b1", "amount", json!(0), json!(60))),
        )
        .with_group(FilterGroup::and("dead").with_condition(Condition::exists("z", "zzz")).disabled())
}

fn kept(filter: &FilterGroup) -> Vec<String> {
    let mut engine = FilterEngine::default();
    engine
        .filter_messages(&records(), filter)
        .unwrap()
        .kept
        .iter()
        .map(|r| r.id.clone())
        .collect()
}

#[test]
fn test_optimized_filter_keeps_same_records() {
    let filter = noisy_filter();
    let optimized = FilterOptimizer::optimize(&filter);
    assert_eq!(kept(&filter), kept(&optimized));
    assert_eq!(kept(&filter), vec!["m1", "m2"]);
}

#[test]
fn test_optimize_does_not_mutate_input() {
    let filter = noisy_filter();
    let snapshot = filter.clone();
    let _ = FilterOptimizer::optimize(&filter);
    let _ = FilterOptimizer::suggestions(&filter);
    assert_eq!(filter, snapshot);
}

#[test]
fn test_optimized_shape() {
    let optimized = FilterOptimizer::optimize(&noisy_filter());
    let ids: Vec<&str> = optimized.conditions.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["x1", "e1", "r1"]);
    assert_eq!(optimized.groups.len(), 1);
    let inner: Vec<&str> = optimized.groups[0].conditions.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(inner, vec!["b1", "c1"]);
}

#[test]
fn test_complexity_weights() {
    let filter = noisy_filter();
    // 10 + 2 + 2 + 1 at the root, (5 + 3) * 1.5 for the enabled subgroup
    assert_eq!(FilterOptimizer::estimate_complexity(&filter), 15.0 + 12.0);
    let optimized = FilterOptimizer::optimize(&filter);
    assert_eq!(FilterOptimizer::estimate_complexity(&optimized), 13.0 + 12.0);
}

#[test]
fn test_operator_cost_ranking() {
    let cheapest = FilterOptimizer::operator_cost(Operator::Exists);
    let priciest = FilterOptimizer::operator_cost(Operator::NotRegex);
    for op in Operator::ALL {
        let cost = FilterOptimizer::operator_cost(op);
        assert!(cost >= cheapest && cost <= priciest, "{}", op);
    }
    assert_eq!(
        FilterOptimizer::operator_cost(Operator::NotExists),
        FilterOptimizer::operator_cost(Operator::Exists)
    );
}

#[test]
fn test_suggestions_for_noisy_filter() {
    let suggestions = FilterOptimizer::suggestions(&noisy_filter());
    let root: Vec<SuggestionKind> = suggestions
        .iter()
        .filter(|s| s.group_id == "root")
        .map(|s| s.kind)
        .collect();
    assert!(root.contains(&SuggestionKind::DisabledConditions));
    assert!(root.contains(&SuggestionKind::DuplicateConditions));
    assert!(root.contains(&SuggestionKind::SuboptimalOrdering));
    assert!(!root.contains(&SuggestionKind::RegexOveruse));
    assert!(suggestions.iter().all(|s| !s.message.is_empty()));
}

#[test]
fn test_report_serializes() {
    let report = FilterOptimizer::report(&noisy_filter());
    let value = serde_json::to_value(&report).unwrap();
    assert!(value["optimized"]["conditions"].is_array());
    assert!(value["complexity"].as_f64().unwrap() > value["optimizedComplexity"].as_f64().unwrap());
    assert!(value["suggestions"][0]["kind"].is_string());
}
