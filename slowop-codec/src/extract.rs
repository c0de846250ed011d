//! Query document extractor

use serde_json::Value;
use slowop_format::constants::{PIPELINE_KEY, READ_FILTER_KEYS, WRITE_FILTER_KEYS};
use slowop_format::{ClassifyError, Document, OperationKind};

/// Sub-document selected as the representative shape of an operation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QueryDocument<'a> {
    /// The operation has no filterable shape (`N/A`)
    NotApplicable,
    /// Filter or query document
    Filter(&'a Document),
    /// First stage of an aggregation pipeline
    Stage(&'a Document),
}

/// Select the sub-document relevant to `kind` from `command`.
pub fn extract(
    kind: OperationKind,
    command: &Document,
) -> Result<QueryDocument<'_>, ClassifyError> {
    if kind.is_insert_like() {
        return Ok(QueryDocument::NotApplicable);
    }
    if kind.is_write_like() {
        return find_filter(command, &WRITE_FILTER_KEYS).map(QueryDocument::Filter);
    }
    if kind == OperationKind::Aggregate {
        return first_stage(command).map(QueryDocument::Stage);
    }
    find_filter(command, &READ_FILTER_KEYS).map(QueryDocument::Filter)
}

/// The first non-null value under `keys` must be an object.
fn find_filter<'a>(command: &'a Document, keys: &[&str]) -> Result<&'a Document, ClassifyError> {
    let value = keys
        .iter()
        .filter_map(|key| command.get(*key))
        .find(|value| !value.is_null());
    match value {
        Some(Value::Object(filter)) => Ok(filter),
        _ => Err(ClassifyError::MissingFilter),
    }
}

fn first_stage(command: &Document) -> Result<&Document, ClassifyError> {
    match command.get(PIPELINE_KEY) {
        Some(Value::Array(stages)) => match stages.first() {
            Some(Value::Object(stage)) => Ok(stage),
            _ => Err(ClassifyError::MissingPipeline),
        },
        _ => Err(ClassifyError::MissingPipeline),
    }
}
