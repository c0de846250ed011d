//! slowop Codec - Operation classifier and query shape normalizer
//!
//! This crate turns one structured log record into one operation statistic:
//!
//! - Namespace filtering of internal databases and commands
//! - Operation classification, including cursor continuations
//! - Query document extraction (filter, query or first pipeline stage)
//! - Shape canonicalization (literal values replaced by a sentinel)
//! - Ordered textual post-processing of the serialized shape
//!
//! The [`Analyzer`] owns the read-only tables (operation vocabulary and
//! compiled rewrite rules). Build it once and share it by reference; every
//! call to [`Analyzer::analyze`] is independent.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod canonical;
pub mod classify;
pub mod extract;
pub mod pattern;
pub mod vocabulary;

// Re-export commonly used types
pub use slowop_format::{
    ClassifyError, Document, LogRecord, OperationKind, OperationStatistic, Result, SlowopError,
};

// Re-export our own types
pub use classify::{classify, Classification};
pub use extract::{extract, QueryDocument};
pub use pattern::{PatternRules, StageWrapper};
pub use vocabulary::OperationVocabulary;

use serde_json::Value;
use slowop_format::constants::{PATTERN_EMPTY, PATTERN_NOT_APPLICABLE, SHAPED_STAGE_OPERATORS};
use slowop_format::{check_namespace, index_descriptor};

/// Classifies records and normalizes their query shapes
#[derive(Debug, Clone)]
pub struct Analyzer {
    vocabulary: OperationVocabulary,
    rules: PatternRules,
}

impl Analyzer {
    /// Analyzer with the default vocabulary and freshly compiled rules.
    pub fn new() -> Result<Self> {
        Ok(Self {
            vocabulary: OperationVocabulary::default(),
            rules: PatternRules::new()?,
        })
    }

    /// Compiled rewrite rules
    pub fn rules(&self) -> &PatternRules {
        &self.rules
    }

    /// Turn one record into its operation statistic.
    ///
    /// Records whose command matches no known operation are accepted with an
    /// empty kind and an empty pattern.
    pub fn analyze(
        &self,
        record: &LogRecord,
    ) -> std::result::Result<OperationStatistic, ClassifyError> {
        let attributes = &record.attributes;
        check_namespace(&attributes.namespace)?;
        let classification = classify(record, &self.vocabulary)?;

        let mut stat = OperationStatistic {
            op: classification.reported_kind(),
            namespace: attributes.namespace.clone(),
            milli: attributes.milli,
            reslen: attributes.reslen,
            index: index_descriptor(&attributes.plan_summary),
            query_pattern: String::new(),
        };

        if let Some(kind) = classification.kind {
            stat.query_pattern = self.query_pattern(kind, classification.command)?;
        }
        Ok(stat)
    }

    /// Pattern of `command` when executed as an operation of `kind`.
    pub fn query_pattern(
        &self,
        kind: OperationKind,
        command: &Document,
    ) -> std::result::Result<String, ClassifyError> {
        Ok(match extract(kind, command)? {
            QueryDocument::NotApplicable => PATTERN_NOT_APPLICABLE.to_string(),
            QueryDocument::Filter(filter) => self.normalize(filter, false),
            QueryDocument::Stage(stage) => self.normalize(stage, true),
        })
    }

    /// Canonicalize, serialize and post-process one query document.
    ///
    /// A pipeline stage that mentions none of the filtering or sorting stage
    /// operators has no shape worth grouping on and yields `{}`.
    pub fn normalize(&self, document: &Document, pipeline_stage: bool) -> String {
        let shape = Value::Object(canonical::canonicalize_document(document));
        let has_regex = canonical::contains_regex(&shape);
        if pipeline_stage
            && !has_regex
            && !canonical::contains_key_with_prefix(&shape, &SHAPED_STAGE_OPERATORS)
        {
            return PATTERN_EMPTY.to_string();
        }
        let serialized = canonical::to_compact_string(&shape);
        self.rules
            .apply(&serialized, has_regex, StageWrapper::of(&shape))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().expect("object").clone()
    }

    fn analyzer() -> Analyzer {
        Analyzer::new().expect("analyzer")
    }

    fn command_record(op_type: &str, command: Value) -> LogRecord {
        LogRecord::command("COMMAND", op_type, "shop.orders", doc(command))
    }

    #[test]
    fn test_find_end_to_end() {
        let mut record = command_record(
            "none",
            json!({"find": "orders", "filter": {"status": "A", "qty": {"$gt": 10}}}),
        );
        record.attributes.milli = 120;
        record.attributes.reslen = 512;
        record.attributes.plan_summary = "IXSCAN { status: 1 }".into();

        let stat = analyzer().analyze(&record).unwrap();
        assert_eq!(stat.op, Some(OperationKind::Find));
        assert_eq!(stat.namespace, "shop.orders");
        assert_eq!(stat.milli, 120);
        assert_eq!(stat.reslen, 512);
        assert_eq!(stat.index, "{ status: 1 }");
        assert_eq!(stat.query_pattern, r#"{"qty":{"$gt":1},"status":1}"#);
    }

    #[test]
    fn test_namespace_checked_before_component() {
        let mut record = command_record("command", json!({"find": "users"}));
        record.component = "NETWORK".into();
        record.attributes.namespace = "admin.system.users".into();
        assert_eq!(
            analyzer().analyze(&record),
            Err(ClassifyError::SystemDatabase)
        );
    }

    #[test]
    fn test_insert_is_not_applicable() {
        let record = command_record(
            "command",
            json!({"insert": "orders", "documents": [{"a": 1}], "filter": {"x": 1}}),
        );
        let stat = analyzer().analyze(&record).unwrap();
        assert_eq!(stat.op, Some(OperationKind::Insert));
        assert_eq!(stat.query_pattern, "N/A");
    }

    #[test]
    fn test_update_without_filter() {
        let record = command_record("update", json!({"u": {"$set": {"a": 1}}}));
        assert_eq!(
            analyzer().analyze(&record),
            Err(ClassifyError::MissingFilter)
        );
    }

    #[test]
    fn test_update_with_query_key() {
        let record = command_record("update", json!({"query": {"sku": "abc"}, "u": {}}));
        let stat = analyzer().analyze(&record).unwrap();
        assert_eq!(stat.op, Some(OperationKind::Update));
        assert_eq!(stat.query_pattern, r#"{"sku":1}"#);
    }

    #[test]
    fn test_unclassified_record() {
        let record = command_record("command", json!({"listIndexes": "orders"}));
        let stat = analyzer().analyze(&record).unwrap();
        assert_eq!(stat.op, None);
        assert_eq!(stat.query_pattern, "");
    }

    #[test]
    fn test_aggregate_match_stage() {
        let record = command_record(
            "command",
            json!({
                "aggregate": "orders",
                "pipeline": [{"$match": {"status": "A"}}, {"$group": {"_id": "$cust"}}]
            }),
        );
        let stat = analyzer().analyze(&record).unwrap();
        assert_eq!(stat.op, Some(OperationKind::Aggregate));
        assert_eq!(stat.query_pattern, r#"{"status":1}"#);
    }

    #[test]
    fn test_aggregate_unshaped_stage() {
        let record = command_record(
            "command",
            json!({"aggregate": "orders", "pipeline": [{"$group": {"_id": "$cust"}}]}),
        );
        let stat = analyzer().analyze(&record).unwrap();
        assert_eq!(stat.query_pattern, "{}");
    }

    #[test]
    fn test_aggregate_facet_stage() {
        let record = command_record(
            "command",
            json!({"aggregate": "orders", "pipeline": [{"$facet": {"x": [{"$match": {"a": 1}}]}}]}),
        );
        let stat = analyzer().analyze(&record).unwrap();
        assert_eq!(stat.query_pattern, r#"{"$facet":...}"#);
    }

    #[test]
    fn test_aggregate_sort_by_count_stage_keeps_shape() {
        let record = command_record(
            "command",
            json!({"aggregate": "orders", "pipeline": [{"$sortByCount": "$status"}]}),
        );
        let stat = analyzer().analyze(&record).unwrap();
        assert_eq!(stat.query_pattern, r#"{"$sortByCount":1}"#);
    }

    #[test]
    fn test_get_more_uses_originating_pipeline() {
        let mut record = command_record("command", json!({"getMore": 7, "collection": "orders"}));
        record.attributes.originating_command = Some(doc(json!({
            "aggregate": "orders",
            "pipeline": [{"$match": {"cust": "x", "ts": {"$gte": 5}}}]
        })));
        let stat = analyzer().analyze(&record).unwrap();
        assert_eq!(stat.op, Some(OperationKind::GetMore));
        assert_eq!(stat.query_pattern, r#"{"cust":1,"ts":{"$gte":1}}"#);
    }

    #[test]
    fn test_regex_leaf() {
        let record = command_record(
            "command",
            json!({
                "find": "users",
                "filter": {"name": {"$regularExpression": {"pattern": "^abc", "options": "i"}}}
            }),
        );
        let stat = analyzer().analyze(&record).unwrap();
        assert!(stat.query_pattern.contains("name:/abc.../i"), "{}", stat.query_pattern);
    }

    #[test]
    fn test_object_id_collapse() {
        let record = command_record(
            "command",
            json!({"find": "orders", "filter": {"_id": {"$oid": "5f1d7a3c9b1e8a4d2c3b4a59"}}}),
        );
        let stat = analyzer().analyze(&record).unwrap();
        assert_eq!(stat.query_pattern, r#"{"_id":1}"#);
    }

    #[test]
    fn test_analyzer_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Analyzer>();
    }
}
