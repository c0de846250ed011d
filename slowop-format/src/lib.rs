//! slowop Format - Core types for slow operation analysis
//!
//! This crate provides the data model shared by every slowop crate with no
//! I/O dependencies. It includes:
//!
//! - Structured log records and per-operation statistics
//! - The operation kind vocabulary
//! - Constants (component tags, system namespaces, pattern markers)
//! - The classification error taxonomy and infrastructure errors
//! - The namespace filter and index descriptor

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod constants;
pub mod error;
pub mod namespace;
pub mod record;
pub mod types;

// Re-export commonly used types
pub use error::{ClassifyError, Result, SlowopError};
pub use namespace::check_namespace;
pub use record::{index_descriptor, Attributes, Document, LogRecord, OperationStatistic};
pub use types::OperationKind;
