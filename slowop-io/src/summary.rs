//! Grouped operation reports
//!
//! Statistics sharing the same operation, namespace and query pattern are
//! folded into one [`OpSummary`] row.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use slowop_format::constants::PLAN_COLLSCAN;
use slowop_format::{OperationStatistic, SlowopError};

/// One report row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpSummary {
    /// Operation name, empty for unclassified commands
    pub op: String,
    /// Namespace
    pub ns: String,
    /// Number of operations in the group
    pub count: u64,
    /// Mean elapsed milliseconds
    pub avg_ms: f64,
    /// Slowest operation in milliseconds
    pub max_ms: i64,
    /// Sum of elapsed milliseconds
    pub total_ms: i64,
    /// Sum of response sizes in bytes
    pub reslen: i64,
    /// Distinct index descriptors seen, sorted
    pub indexes: Vec<String>,
    /// Normalized query pattern
    pub pattern: String,
}

impl OpSummary {
    /// Index descriptors joined for display
    pub fn index(&self) -> String {
        self.indexes.join(", ")
    }

    /// True when any operation in the group scanned the whole collection
    pub fn is_collscan(&self) -> bool {
        self.indexes.iter().any(|index| index == PLAN_COLLSCAN)
    }
}

/// Report column to order rows by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderBy {
    /// Number of operations
    Count,
    /// Mean elapsed time
    #[default]
    AvgMs,
    /// Slowest operation
    MaxMs,
    /// Total elapsed time
    TotalMs,
    /// Total response size
    Reslen,
    /// Operation name
    Op,
    /// Namespace
    Ns,
    /// Index descriptor
    #[serde(alias = "_index")]
    Index,
    /// Query pattern
    Pattern,
}

impl OrderBy {
    /// Every column, in display order
    pub const ALL: [OrderBy; 9] = [
        OrderBy::Count,
        OrderBy::AvgMs,
        OrderBy::MaxMs,
        OrderBy::TotalMs,
        OrderBy::Reslen,
        OrderBy::Op,
        OrderBy::Ns,
        OrderBy::Index,
        OrderBy::Pattern,
    ];

    /// Column name as accepted on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderBy::Count => "count",
            OrderBy::AvgMs => "avg_ms",
            OrderBy::MaxMs => "max_ms",
            OrderBy::TotalMs => "total_ms",
            OrderBy::Reslen => "reslen",
            OrderBy::Op => "op",
            OrderBy::Ns => "ns",
            OrderBy::Index => "index",
            OrderBy::Pattern => "pattern",
        }
    }

    /// Names sort ascending, measurements descending.
    pub fn default_order(&self) -> SortOrder {
        match self {
            OrderBy::Op | OrderBy::Ns => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderBy {
    type Err = SlowopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "_index" {
            return Ok(OrderBy::Index);
        }
        OrderBy::ALL
            .into_iter()
            .find(|column| column.as_str() == s)
            .ok_or_else(|| SlowopError::Config(format!("unknown order-by column: {}", s)))
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Smallest first
    Asc,
    /// Largest first
    Desc,
}

impl FromStr for SortOrder {
    type Err = SlowopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(SlowopError::Config(format!("unknown sort order: {}", s))),
        }
    }
}

/// How grouped rows are filtered and ordered
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportOptions {
    /// Column to order by
    pub order_by: OrderBy,
    /// Direction; the column's default when unset
    pub order: Option<SortOrder>,
    /// Keep only groups that performed a collection scan
    pub collscan_only: bool,
    /// Keep only the first N rows
    pub top: Option<usize>,
}

#[derive(Debug, Default)]
struct Accumulator {
    count: u64,
    total_ms: i64,
    max_ms: i64,
    reslen: i64,
    indexes: BTreeSet<String>,
}

/// Folds operation statistics into report rows
#[derive(Debug, Default)]
pub struct SummaryBuilder {
    groups: BTreeMap<(String, String, String), Accumulator>,
}

impl SummaryBuilder {
    /// Empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one statistic to its group.
    pub fn add(&mut self, stat: &OperationStatistic) {
        let key = (
            stat.op_name().to_string(),
            stat.namespace.clone(),
            stat.query_pattern.clone(),
        );
        let group = self.groups.entry(key).or_default();
        if group.count == 0 || stat.milli > group.max_ms {
            group.max_ms = stat.milli;
        }
        group.count += 1;
        group.total_ms = group.total_ms.saturating_add(stat.milli);
        group.reslen = group.reslen.saturating_add(stat.reslen);
        group.indexes.insert(stat.index.clone());
    }

    /// Number of distinct groups so far
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// True when nothing was added
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Filter, order and truncate the grouped rows.
    pub fn finish(self, options: &ReportOptions) -> Vec<OpSummary> {
        let mut rows: Vec<OpSummary> = self
            .groups
            .into_iter()
            .map(|((op, ns, pattern), group)| OpSummary {
                op,
                ns,
                count: group.count,
                avg_ms: group.total_ms as f64 / group.count as f64,
                max_ms: group.max_ms,
                total_ms: group.total_ms,
                reslen: group.reslen,
                indexes: group.indexes.into_iter().collect(),
                pattern,
            })
            .filter(|row| !options.collscan_only || row.is_collscan())
            .collect();

        let order = options
            .order
            .unwrap_or_else(|| options.order_by.default_order());
        rows.sort_by(|a, b| {
            let ordering = match options.order_by {
                OrderBy::Count => a.count.cmp(&b.count),
                OrderBy::AvgMs => a.avg_ms.total_cmp(&b.avg_ms),
                OrderBy::MaxMs => a.max_ms.cmp(&b.max_ms),
                OrderBy::TotalMs => a.total_ms.cmp(&b.total_ms),
                OrderBy::Reslen => a.reslen.cmp(&b.reslen),
                OrderBy::Op => a.op.cmp(&b.op),
                OrderBy::Ns => a.ns.cmp(&b.ns),
                OrderBy::Index => a.indexes.cmp(&b.indexes),
                OrderBy::Pattern => a.pattern.cmp(&b.pattern),
            };
            match order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        if let Some(top) = options.top {
            rows.truncate(top);
        }
        rows
    }
}
