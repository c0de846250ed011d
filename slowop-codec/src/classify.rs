//! Operation classifier

use crate::vocabulary::OperationVocabulary;
use slowop_format::constants::SUPPORTED_COMPONENTS;
use slowop_format::{ClassifyError, Document, LogRecord, OperationKind};

/// Outcome of classifying a log record
#[derive(Debug, Clone, PartialEq)]
pub struct Classification<'a> {
    /// Kind that drives query document extraction; `None` when unclassified
    pub kind: Option<OperationKind>,
    /// Document the query shape is taken from
    pub command: &'a Document,
    /// Record is a cursor continuation of `command`
    pub continuation: bool,
}

impl Classification<'_> {
    /// Kind reported in the statistic.
    ///
    /// Continuations are always reported as `getMore`, whatever the
    /// originating command resolved to.
    pub fn reported_kind(&self) -> Option<OperationKind> {
        if self.continuation {
            Some(OperationKind::GetMore)
        } else {
            self.kind
        }
    }
}

/// Determine the operation kind of a record and the document to shape.
pub fn classify<'a>(
    record: &'a LogRecord,
    vocabulary: &OperationVocabulary,
) -> Result<Classification<'a>, ClassifyError> {
    if !SUPPORTED_COMPONENTS.contains(&record.component.as_str()) {
        return Err(ClassifyError::UnsupportedComponent);
    }

    let attributes = &record.attributes;
    let command = attributes
        .command
        .as_ref()
        .ok_or(ClassifyError::MissingCommand)?;

    let kind = vocabulary
        .resolve_hint(&attributes.op_type)
        .or_else(|| vocabulary.infer(command));

    if kind != Some(OperationKind::GetMore) {
        return Ok(Classification {
            kind,
            command,
            continuation: false,
        });
    }

    let originating = attributes
        .originating_command
        .as_ref()
        .ok_or(ClassifyError::MissingCommand)?;
    // A continuation of a continuation carries no shape of its own.
    let kind = vocabulary
        .infer(originating)
        .filter(|inner| *inner != OperationKind::GetMore);

    Ok(Classification {
        kind,
        command: originating,
        continuation: true,
    })
}
