//! Operation kind enumeration

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kinds of database operations reported in statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    /// Aggregation pipeline
    #[serde(rename = "aggregate")]
    Aggregate,
    /// Document count
    #[serde(rename = "count")]
    Count,
    /// Index build
    #[serde(rename = "createIndexes")]
    CreateIndexes,
    /// Delete command
    #[serde(rename = "delete")]
    Delete,
    /// Distinct values
    #[serde(rename = "distinct")]
    Distinct,
    /// Find query
    #[serde(rename = "find")]
    Find,
    /// Atomic find-and-modify
    #[serde(rename = "findandmodify")]
    FindAndModify,
    /// Cursor continuation
    #[serde(rename = "getMore")]
    GetMore,
    /// Insert command
    #[serde(rename = "insert")]
    Insert,
    /// Legacy remove operation
    #[serde(rename = "remove")]
    Remove,
    /// Update command
    #[serde(rename = "update")]
    Update,
}

impl OperationKind {
    /// Canonical name used in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Aggregate => "aggregate",
            OperationKind::Count => "count",
            OperationKind::CreateIndexes => "createIndexes",
            OperationKind::Delete => "delete",
            OperationKind::Distinct => "distinct",
            OperationKind::Find => "find",
            OperationKind::FindAndModify => "findandmodify",
            OperationKind::GetMore => "getMore",
            OperationKind::Insert => "insert",
            OperationKind::Remove => "remove",
            OperationKind::Update => "update",
        }
    }

    /// Resolve a type hint or command name.
    ///
    /// Accepts the canonical names plus the spellings servers emit for the
    /// same operation (`findAndModify`, `getmore`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "aggregate" => Some(OperationKind::Aggregate),
            "count" => Some(OperationKind::Count),
            "createIndexes" => Some(OperationKind::CreateIndexes),
            "delete" => Some(OperationKind::Delete),
            "distinct" => Some(OperationKind::Distinct),
            "find" => Some(OperationKind::Find),
            "findandmodify" | "findAndModify" => Some(OperationKind::FindAndModify),
            "getMore" | "getmore" => Some(OperationKind::GetMore),
            "insert" => Some(OperationKind::Insert),
            "remove" => Some(OperationKind::Remove),
            "update" => Some(OperationKind::Update),
            _ => None,
        }
    }

    /// Operations whose pattern is always `N/A`.
    pub fn is_insert_like(&self) -> bool {
        matches!(self, OperationKind::Insert | OperationKind::CreateIndexes)
    }

    /// Operations that carry their filter under `q` or `query`.
    pub fn is_write_like(&self) -> bool {
        matches!(
            self,
            OperationKind::Update | OperationKind::Remove | OperationKind::Delete
        )
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
