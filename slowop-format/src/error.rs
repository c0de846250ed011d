//! Error types for slowop

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Reasons a log record does not produce an operation statistic.
///
/// These are ordinary outcomes of classification, not failures of the tool:
/// callers count or log them and keep going.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ClassifyError {
    /// Component tag outside the analyzed subsystems.
    #[error("unsupported component")]
    UnsupportedComponent,
    /// Record has no namespace.
    #[error("missing namespace")]
    MissingNamespace,
    /// Namespace belongs to an internal database.
    #[error("system database")]
    SystemDatabase,
    /// Namespace is a database command pseudo-collection.
    #[error("system command")]
    SystemCommand,
    /// No command payload to classify.
    #[error("missing command document")]
    MissingCommand,
    /// Operation lacks a filter under every recognized key.
    #[error("missing filter")]
    MissingFilter,
    /// Aggregate with an empty or absent stage sequence.
    #[error("missing pipeline")]
    MissingPipeline,
}

impl ClassifyError {
    /// Every variant, in declaration order.
    pub const ALL: [ClassifyError; 7] = [
        ClassifyError::UnsupportedComponent,
        ClassifyError::MissingNamespace,
        ClassifyError::SystemDatabase,
        ClassifyError::SystemCommand,
        ClassifyError::MissingCommand,
        ClassifyError::MissingFilter,
        ClassifyError::MissingPipeline,
    ];

    /// Stable reason string, identical to the `Display` output.
    pub fn reason(&self) -> &'static str {
        match self {
            ClassifyError::UnsupportedComponent => "unsupported component",
            ClassifyError::MissingNamespace => "missing namespace",
            ClassifyError::SystemDatabase => "system database",
            ClassifyError::SystemCommand => "system command",
            ClassifyError::MissingCommand => "missing command document",
            ClassifyError::MissingFilter => "missing filter",
            ClassifyError::MissingPipeline => "missing pipeline",
        }
    }

    /// True when the record is well formed but not a user operation.
    pub fn is_system(&self) -> bool {
        matches!(
            self,
            ClassifyError::SystemDatabase | ClassifyError::SystemCommand
        )
    }
}

impl Serialize for ClassifyError {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.reason())
    }
}

/// slowop infrastructure errors
#[derive(Debug, Error)]
pub enum SlowopError {
    /// I/O operation failed while reading input or writing output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON parsing or serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// A pattern rewrite rule failed to compile.
    #[error("Invalid rewrite rule: {0}")]
    InvalidRule(String),
    /// Configuration value is out of range or inconsistent.
    #[error("Invalid configuration: {0}")]
    Config(String),
    /// Internal invariant was violated.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, SlowopError>;
