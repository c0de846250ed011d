//! Optional TOML configuration file
//!
//! ```toml
//! [analyze]
//! all_messages = false
//! threads = 4
//! batch_records = 8192
//!
//! [report]
//! format = "table"
//! order_by = "avg_ms"
//! order = "desc"
//! collscan = false
//! top = 25
//! ```
//!
//! Every key is optional. Command-line flags win over file values.

use serde::Deserialize;
use slowop_format::SlowopError;
use slowop_io::{AnalyzeOptions, OrderBy, ParallelConfig, ReportOptions, SortOrder};
use std::path::Path;

/// Output format for grouped reports
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StatsFormat {
    /// Tab separated table
    #[default]
    Table,
    /// JSON document with rows and run metrics
    Json,
}

/// Contents of a configuration file
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// Reading and analysis settings
    pub analyze: AnalyzeSection,
    /// Report settings
    pub report: ReportSection,
}

/// `[analyze]` table
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyzeSection {
    /// Analyze every well formed line, not only slow queries
    pub all_messages: Option<bool>,
    /// Worker thread cap
    pub threads: Option<usize>,
    /// Records handed to the analyzer at once
    pub batch_records: Option<usize>,
}

/// `[report]` table
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportSection {
    /// Output format
    pub format: Option<StatsFormat>,
    /// Column to order by
    pub order_by: Option<OrderBy>,
    /// Sort direction
    pub order: Option<SortOrder>,
    /// Only collection scans
    pub collscan: Option<bool>,
    /// Row limit
    pub top: Option<usize>,
}

/// Analysis flags given on the command line
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyzeFlags {
    /// `--all-messages`
    pub all_messages: bool,
    /// `--threads`
    pub threads: Option<usize>,
}

/// Report flags given on the command line
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportFlags {
    /// `--format`
    pub format: Option<StatsFormat>,
    /// `--order-by`
    pub order_by: Option<OrderBy>,
    /// `--order`
    pub order: Option<SortOrder>,
    /// `--collscan`
    pub collscan: bool,
    /// `--top`
    pub top: Option<usize>,
}

impl CliConfig {
    /// Parse a configuration document.
    pub fn parse(text: &str) -> Result<Self, SlowopError> {
        toml::from_str(text).map_err(|e| SlowopError::Config(e.to_string()))
    }

    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self, SlowopError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text).map_err(|err| match err {
            SlowopError::Config(msg) => {
                SlowopError::Config(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// File at `path`, or an empty configuration.
    pub fn load_optional(path: Option<&Path>) -> Result<Self, SlowopError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Analysis options: flags, then file, then defaults.
    pub fn analyze_options(&self, flags: &AnalyzeFlags) -> AnalyzeOptions {
        let defaults = AnalyzeOptions::default();
        AnalyzeOptions {
            all_messages: flags.all_messages || self.analyze.all_messages.unwrap_or(false),
            batch_records: self
                .analyze
                .batch_records
                .unwrap_or(defaults.batch_records),
            parallel: ParallelConfig {
                max_threads: flags.threads.or(self.analyze.threads),
                ..defaults.parallel
            },
        }
    }

    /// Report options and output format: flags, then file, then defaults.
    pub fn report_options(&self, flags: &ReportFlags) -> (ReportOptions, StatsFormat) {
        let options = ReportOptions {
            order_by: flags
                .order_by
                .or(self.report.order_by)
                .unwrap_or_default(),
            order: flags.order.or(self.report.order),
            collscan_only: flags.collscan || self.report.collscan.unwrap_or(false),
            top: flags.top.or(self.report.top),
        };
        let format = flags.format.or(self.report.format).unwrap_or_default();
        (options, format)
    }
}
