//! Structured log records and the statistics derived from them

use crate::constants::PLAN_IXSCAN;
use crate::types::OperationKind;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// A command document: string keys mapped to arbitrary JSON values.
pub type Document = Map<String, Value>;

/// One structured log line
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Subsystem that emitted the line (`COMMAND`, `WRITE`, ...)
    #[serde(rename = "c", default)]
    pub component: String,
    /// Log message (`Slow query` for operation lines)
    #[serde(rename = "msg", default)]
    pub message: String,
    /// Operation attributes
    #[serde(rename = "attr", default)]
    pub attributes: Attributes,
}

/// Attributes attached to a slow operation line
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
    /// Operation type hint (`command`, `none`, `update`, ...)
    #[serde(rename = "type", default)]
    pub op_type: String,
    /// Target namespace (`db.collection`)
    #[serde(rename = "ns", default)]
    pub namespace: String,
    /// Elapsed time in milliseconds
    #[serde(rename = "durationMillis", default)]
    pub milli: i64,
    /// Response size in bytes
    #[serde(default)]
    pub reslen: i64,
    /// Query plan summary
    #[serde(rename = "planSummary", default)]
    pub plan_summary: String,
    /// Command payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Document>,
    /// Command that opened the cursor, for continuations
    #[serde(
        rename = "originatingCommand",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub originating_command: Option<Document>,
}

impl LogRecord {
    /// Build a record for a command with the given type hint and namespace.
    pub fn command(component: &str, op_type: &str, namespace: &str, command: Document) -> Self {
        Self {
            component: component.to_string(),
            message: crate::constants::SLOW_QUERY_MESSAGE.to_string(),
            attributes: Attributes {
                op_type: op_type.to_string(),
                namespace: namespace.to_string(),
                command: Some(command),
                ..Attributes::default()
            },
        }
    }
}

/// Per-record statistic handed to aggregation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationStatistic {
    /// Operation kind; `None` when the command matched no known operation
    #[serde(
        serialize_with = "serialize_op",
        deserialize_with = "deserialize_op",
        default
    )]
    pub op: Option<OperationKind>,
    /// Target namespace
    #[serde(rename = "ns")]
    pub namespace: String,
    /// Elapsed time in milliseconds
    pub milli: i64,
    /// Response size in bytes
    pub reslen: i64,
    /// Index descriptor derived from the plan summary
    pub index: String,
    /// Normalized query shape
    #[serde(rename = "pattern")]
    pub query_pattern: String,
}

impl OperationStatistic {
    /// Operation name, empty for unclassified records
    pub fn op_name(&self) -> &'static str {
        self.op.map(|kind| kind.as_str()).unwrap_or("")
    }
}

fn serialize_op<S: Serializer>(
    op: &Option<OperationKind>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(op.map(|kind| kind.as_str()).unwrap_or(""))
}

fn deserialize_op<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<OperationKind>, D::Error> {
    let name = String::deserialize(deserializer)?;
    if name.is_empty() {
        return Ok(None);
    }
    OperationKind::from_name(&name)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("unknown operation kind: {}", name)))
}

/// Derive the index descriptor from a plan summary.
///
/// `IXSCAN { a: 1 }` becomes `{ a: 1 }`; other plans are reported verbatim.
pub fn index_descriptor(plan_summary: &str) -> String {
    match plan_summary.strip_prefix(PLAN_IXSCAN) {
        Some(rest) => rest.strip_prefix(' ').unwrap_or(rest).to_string(),
        None => plan_summary.to_string(),
    }
}
