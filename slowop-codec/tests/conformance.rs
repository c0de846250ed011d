//! End-to-end behaviour of the analyzer on realistic slow query lines

use proptest::prelude::*;
use serde_json::{json, Map, Value};
use slowop_codec::{Analyzer, ClassifyError, LogRecord, OperationKind};

fn analyzer() -> Analyzer {
    Analyzer::new().expect("analyzer")
}

fn parse(line: &str) -> LogRecord {
    serde_json::from_str(line).expect("valid log line")
}

fn line(component: &str, op_type: &str, ns: &str, command: Value) -> LogRecord {
    parse(
        &json!({
            "t": {"$date": "2023-01-01T00:00:00.000Z"},
            "s": "I",
            "c": component,
            "id": 51803,
            "ctx": "conn12",
            "msg": "Slow query",
            "attr": {
                "type": op_type,
                "ns": ns,
                "command": command,
                "planSummary": "COLLSCAN",
                "durationMillis": 250,
                "reslen": 1024
            }
        })
        .to_string(),
    )
}

#[test]
fn insert_pattern_is_not_applicable_regardless_of_content() {
    let analyzer = analyzer();
    for command in [
        json!({"insert": "orders", "documents": [{"a": 1}]}),
        json!({"insert": "orders", "filter": {"status": "A"}}),
        json!({"insert": "orders", "pipeline": [{"$match": {}}]}),
    ] {
        let stat = analyzer
            .analyze(&line("WRITE", "insert", "shop.orders", command))
            .unwrap();
        assert_eq!(stat.op, Some(OperationKind::Insert));
        assert_eq!(stat.query_pattern, "N/A");
    }
}

#[test]
fn create_indexes_pattern_is_not_applicable() {
    let stat = analyzer()
        .analyze(&line(
            "COMMAND",
            "command",
            "shop.orders",
            json!({"createIndexes": "orders", "indexes": [{"key": {"a": 1}, "name": "a_1"}]}),
        ))
        .unwrap();
    assert_eq!(stat.op, Some(OperationKind::CreateIndexes));
    assert_eq!(stat.query_pattern, "N/A");
}

#[test]
fn update_without_q_or_query_is_missing_filter() {
    let record = line(
        "WRITE",
        "update",
        "shop.orders",
        json!({"u": {"$inc": {"n": 1}}, "filter": {"a": 1}, "multi": true}),
    );
    assert_eq!(analyzer().analyze(&record), Err(ClassifyError::MissingFilter));
}

#[test]
fn remove_uses_q_filter() {
    let stat = analyzer()
        .analyze(&line(
            "WRITE",
            "remove",
            "shop.orders",
            json!({"q": {"expired": true, "ts": {"$lt": 1700000000}}, "limit": 0}),
        ))
        .unwrap();
    assert_eq!(stat.op, Some(OperationKind::Remove));
    assert_eq!(stat.query_pattern, r#"{"expired":1,"ts":{"$lt":1}}"#);
}

#[test]
fn get_more_reports_continuation_with_originating_shape() {
    let mut record = line(
        "COMMAND",
        "command",
        "shop.orders",
        json!({"getMore": 8_812_345_678_i64, "collection": "orders", "batchSize": 101}),
    );
    record.attributes.originating_command = Some(
        json!({
            "aggregate": "orders",
            "pipeline": [
                {"$match": {"status": "A", "total": {"$gte": 100}}},
                {"$group": {"_id": "$cust", "sum": {"$sum": "$total"}}}
            ],
            "cursor": {}
        })
        .as_object()
        .unwrap()
        .clone(),
    );
    let stat = analyzer().analyze(&record).unwrap();
    assert_eq!(stat.op, Some(OperationKind::GetMore));
    assert_eq!(stat.query_pattern, r#"{"status":1,"total":{"$gte":1}}"#);
}

#[test]
fn regex_leaf_renders_options_without_anchor() {
    let stat = analyzer()
        .analyze(&line(
            "COMMAND",
            "command",
            "crm.people",
            json!({
                "find": "people",
                "filter": {"name": {"$regularExpression": {"pattern": "^abc", "options": "i"}}}
            }),
        ))
        .unwrap();
    assert!(
        stat.query_pattern.contains("name:/abc.../i"),
        "pattern was {}",
        stat.query_pattern
    );
    assert!(!stat.query_pattern.contains('^'));
}

#[test]
fn regex_leaf_keeps_sibling_values_collapsed() {
    let stat = analyzer()
        .analyze(&line(
            "COMMAND",
            "command",
            "crm.people",
            json!({
                "find": "people",
                "filter": {
                    "age": 44,
                    "name": {"$regularExpression": {"pattern": "smith", "options": ""}}
                }
            }),
        ))
        .unwrap();
    assert_eq!(stat.query_pattern, r#"{"age":1,name:/smith.../}"#);
}

#[test]
fn repeated_sentinels_collapse() {
    let stat = analyzer()
        .analyze(&line(
            "COMMAND",
            "command",
            "shop.orders",
            json!({"find": "orders", "filter": {"sku": {"$in": ["a", "b", "c"]}}}),
        ))
        .unwrap();
    assert_eq!(stat.query_pattern, r#"{"sku":{"$in":[...]}}"#);
}

#[test]
fn in_lists_of_different_lengths_group_together() {
    let analyzer = analyzer();
    let short = analyzer
        .analyze(&line(
            "COMMAND",
            "command",
            "shop.orders",
            json!({"find": "orders", "filter": {"sku": {"$in": [1, 2]}}}),
        ))
        .unwrap();
    let long = analyzer
        .analyze(&line(
            "COMMAND",
            "command",
            "shop.orders",
            json!({"find": "orders", "filter": {"sku": {"$in": [1, 2, 3, 4, 5, 6]}}}),
        ))
        .unwrap();
    assert_eq!(short.query_pattern, long.query_pattern);
}

#[test]
fn match_and_sort_wrappers_unwrap() {
    let analyzer = analyzer();
    for (stage, expected) in [
        (json!({"$match": {"a": 5}}), r#"{"a":1}"#),
        (json!({"$sort": {"ts": -1}}), r#"{"ts":1}"#),
        (
            json!({"$facet": {"x": [{"$count": "n"}], "y": [{"$limit": 3}]}}),
            r#"{"$facet":...}"#,
        ),
    ] {
        let stat = analyzer
            .analyze(&line(
                "COMMAND",
                "command",
                "shop.orders",
                json!({"aggregate": "orders", "pipeline": [stage]}),
            ))
            .unwrap();
        assert_eq!(stat.query_pattern, expected);
    }
}

fn match_stage_regex(field: &str, pattern: &str, options: &str) -> LogRecord {
    line(
        "COMMAND",
        "command",
        "shop.orders",
        json!({
            "aggregate": "orders",
            "pipeline": [{"$match": {field: {
                "$regularExpression": {"pattern": pattern, "options": options}
            }}}]
        }),
    )
}

#[test]
fn match_wrapper_unwraps_around_regex_with_structural_characters() {
    let analyzer = analyzer();
    for (field, pattern, options, expected) in [
        ("sku", r"^\[A", "", r"sku:/\\[A.../"),
        ("name", r"^a\}", "i", r"name:/a\\}.../i"),
        ("name", "^a\"b", "i", r#"name:/a\"b.../i"#),
        ("name", "^a,b]", "", "name:/a,b].../"),
    ] {
        let stat = analyzer
            .analyze(&match_stage_regex(field, pattern, options))
            .unwrap();
        assert_eq!(stat.query_pattern, format!("{{{}}}", expected));
    }
}

#[test]
fn regex_text_is_not_collapsed() {
    let stat = analyzer()
        .analyze(&line(
            "COMMAND",
            "command",
            "crm.people",
            json!({
                "find": "people",
                "filter": {
                    "age": 44,
                    "name": {"$regularExpression": {"pattern": "^[1,1]x", "options": ""}}
                }
            }),
        ))
        .unwrap();
    assert_eq!(stat.query_pattern, r#"{"age":1,name:/[1,1]x.../}"#);
}

#[test]
fn sort_by_count_first_stage_keeps_its_shape() {
    let stat = analyzer()
        .analyze(&line(
            "COMMAND",
            "command",
            "shop.orders",
            json!({"aggregate": "orders", "pipeline": [{"$sortByCount": "$status"}]}),
        ))
        .unwrap();
    assert_eq!(stat.query_pattern, r#"{"$sortByCount":1}"#);
}

#[test]
fn empty_pipeline_is_missing_pipeline() {
    let record = line(
        "COMMAND",
        "command",
        "shop.orders",
        json!({"aggregate": "orders", "pipeline": []}),
    );
    assert_eq!(
        analyzer().analyze(&record),
        Err(ClassifyError::MissingPipeline)
    );
}

#[test]
fn system_namespaces_are_rejected_before_classification() {
    let analyzer = analyzer();
    let mut record = line(
        "COMMAND",
        "command",
        "admin.system.users",
        json!({"find": "system.users"}),
    );
    assert_eq!(analyzer.analyze(&record), Err(ClassifyError::SystemDatabase));

    record.attributes.command = None;
    assert_eq!(analyzer.analyze(&record), Err(ClassifyError::SystemDatabase));

    record.attributes.namespace = "shop.$cmd".into();
    assert_eq!(analyzer.analyze(&record), Err(ClassifyError::SystemCommand));

    record.attributes.namespace.clear();
    assert_eq!(analyzer.analyze(&record), Err(ClassifyError::MissingNamespace));
}

#[test]
fn unsupported_component_is_rejected() {
    let record = line("STORAGE", "command", "shop.orders", json!({"find": "orders"}));
    assert_eq!(
        analyzer().analyze(&record),
        Err(ClassifyError::UnsupportedComponent)
    );
}

#[test]
fn find_scenario_collapses_values() {
    let stat = analyzer()
        .analyze(&line(
            "COMMAND",
            "none",
            "shop.orders",
            json!({"find": "orders", "filter": {"status": "A", "qty": {"$gt": 10}}}),
        ))
        .unwrap();
    assert_eq!(stat.op, Some(OperationKind::Find));
    assert_eq!(stat.query_pattern, r#"{"qty":{"$gt":1},"status":1}"#);
    assert_eq!(stat.index, "COLLSCAN");
    assert_eq!(stat.milli, 250);
    assert_eq!(stat.reslen, 1024);
}

fn arb_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[A-Za-z0-9 _-]{0,12}".prop_map(|s| Value::from(format!("lit-{}", s))),
    ]
}

fn arb_value() -> impl Strategy<Value = Value> {
    arb_leaf().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-h]{1,6}", inner, 0..4)
                .prop_map(|map| Value::Object(map.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

fn arb_filter() -> impl Strategy<Value = Value> {
    prop::collection::btree_map("[a-h]{1,6}", arb_value(), 0..5)
        .prop_map(|map| Value::Object(map.into_iter().collect::<Map<_, _>>()))
}

proptest! {
    #[test]
    fn analysis_is_deterministic(filter in arb_filter()) {
        let analyzer = analyzer();
        let raw = line(
            "COMMAND",
            "command",
            "shop.orders",
            json!({"find": "orders", "filter": filter}),
        );
        let first = analyzer.analyze(&raw).unwrap();
        let reparsed = parse(&serde_json::to_string(&raw).unwrap());
        let second = analyzer.analyze(&reparsed).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn literal_values_never_leak(filter in arb_filter()) {
        let stat = analyzer()
            .analyze(&line(
                "COMMAND",
                "command",
                "shop.orders",
                json!({"find": "orders", "filter": filter}),
            ))
            .unwrap();
        prop_assert!(!stat.query_pattern.contains("lit-"));
        prop_assert!(!stat.query_pattern.contains("true"));
        prop_assert!(!stat.query_pattern.contains("null"));
    }

    #[test]
    fn insert_is_always_not_applicable(filter in arb_filter()) {
        let stat = analyzer()
            .analyze(&line(
                "WRITE",
                "insert",
                "shop.orders",
                json!({"insert": "orders", "filter": filter}),
            ))
            .unwrap();
        prop_assert_eq!(stat.query_pattern, "N/A");
    }
}
