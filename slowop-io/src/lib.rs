//! slowop I/O - Streaming log analysis and high-level APIs
//!
//! This crate provides the file layer and high-level APIs for slowop:
//!
//! - Line oriented log reading with transparent gzip support
//! - Batch analysis on a rayon pool with input-order results
//! - Per-run metrics (malformed lines, rejections by reason)
//! - Grouped reports ordered by any column

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod parallel;
pub mod reader;
pub mod summary;

// Re-export commonly used types
pub use parallel::{should_use_parallel, BatchAnalyzer, ParallelConfig, ParallelDecision};
pub use reader::{InputSource, LogReader, ReaderStats};
pub use slowop_codec::Analyzer;
pub use slowop_format::{ClassifyError, LogRecord, OperationStatistic, Result, SlowopError};
pub use summary::{OpSummary, OrderBy, ReportOptions, SortOrder, SummaryBuilder};

use serde::Serialize;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const DEFAULT_BATCH_RECORDS: usize = 8_192;

/// High-level analysis options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzeOptions {
    /// Analyze every well formed line, not only `Slow query` lines
    pub all_messages: bool,
    /// Records handed to the analyzer at once
    pub batch_records: usize,
    /// Parallel heuristic configuration
    pub parallel: ParallelConfig,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            all_messages: false,
            batch_records: DEFAULT_BATCH_RECORDS,
            parallel: ParallelConfig::default(),
        }
    }
}

/// Input plus options for one analysis run
#[derive(Debug)]
pub struct AnalyzeRequest {
    /// Log source
    pub input: InputSource,
    /// Run options
    pub options: AnalyzeOptions,
}

/// Counters for one analysis run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalyzeMetrics {
    /// Lines consumed from the input
    pub lines_read: u64,
    /// Empty lines
    pub blank_lines: u64,
    /// Lines that were not a JSON log object
    pub malformed_lines: u64,
    /// Lines skipped because of their message
    pub skipped_messages: u64,
    /// Records turned into statistics
    pub accepted: u64,
    /// Accepted records whose command matched no operation
    pub unclassified: u64,
    /// Rejected records per reason
    pub rejected: BTreeMap<ClassifyError, u64>,
}

impl AnalyzeMetrics {
    /// Records rejected for any reason
    pub fn total_rejected(&self) -> u64 {
        self.rejected.values().sum()
    }

    /// Records that reached the analyzer
    pub fn records_seen(&self) -> u64 {
        self.accepted + self.total_rejected()
    }

    fn absorb_reader(&mut self, stats: &ReaderStats) {
        self.lines_read = stats.lines_read;
        self.blank_lines = stats.blank_lines;
        self.malformed_lines = stats.malformed_lines;
        self.skipped_messages = stats.skipped_messages;
    }
}

/// Outcome of an analysis run
#[derive(Debug, Clone)]
pub struct AnalyzeSummary {
    /// Run counters
    pub metrics: AnalyzeMetrics,
    /// Execution mode that was chosen
    pub decision: ParallelDecision,
    /// Wall-clock duration
    pub elapsed: Duration,
}

/// Grouped report plus the run that produced it
#[derive(Debug, Clone)]
pub struct StatsReport {
    /// Ordered report rows
    pub rows: Vec<OpSummary>,
    /// Run outcome
    pub summary: AnalyzeSummary,
}

/// Analyze every record of the input, handing each accepted statistic to
/// `sink` in input order.
pub fn analyze_records<F>(request: AnalyzeRequest, mut sink: F) -> Result<AnalyzeSummary>
where
    F: FnMut(OperationStatistic) -> Result<()>,
{
    let AnalyzeRequest { input, options } = request;
    let started = Instant::now();

    let decision = should_use_parallel(&input, &options.parallel);
    debug!(
        parallel = decision.use_parallel,
        threads = decision.thread_count,
        reason = %decision.reason,
        "selected execution mode"
    );

    let analyzer = Analyzer::new()?;
    let batches = BatchAnalyzer::new(&analyzer, &decision, &options.parallel)?;
    let mut reader =
        LogReader::new(input.into_buf_read()?).with_all_messages(options.all_messages);

    let batch_size = options.batch_records.max(1);
    let mut batch: Vec<LogRecord> = Vec::with_capacity(batch_size);
    let mut metrics = AnalyzeMetrics::default();

    loop {
        let next = reader.next().transpose()?;
        let exhausted = next.is_none();
        if let Some(record) = next {
            batch.push(record);
        }

        if batch.len() >= batch_size || (exhausted && !batch.is_empty()) {
            let results = batches.analyze_batch(&batch);
            for (record, result) in batch.iter().zip(results) {
                match result {
                    Ok(stat) => {
                        metrics.accepted += 1;
                        if stat.op.is_none() {
                            metrics.unclassified += 1;
                        }
                        sink(stat)?;
                    }
                    Err(reason) => {
                        *metrics.rejected.entry(reason).or_insert(0) += 1;
                        debug!(ns = %record.attributes.namespace, %reason, "record rejected");
                    }
                }
            }
            batch.clear();
        }

        if exhausted {
            break;
        }
    }

    metrics.absorb_reader(reader.stats());
    let elapsed = started.elapsed();
    info!(
        lines = metrics.lines_read,
        accepted = metrics.accepted,
        rejected = metrics.total_rejected(),
        malformed = metrics.malformed_lines,
        elapsed_ms = elapsed.as_millis() as u64,
        "analysis finished"
    );

    Ok(AnalyzeSummary {
        metrics,
        decision,
        elapsed,
    })
}

/// Analyze the input and collect every accepted statistic.
pub fn collect_statistics(
    request: AnalyzeRequest,
) -> Result<(Vec<OperationStatistic>, AnalyzeSummary)> {
    let mut stats = Vec::new();
    let summary = analyze_records(request, |stat| {
        stats.push(stat);
        Ok(())
    })?;
    Ok((stats, summary))
}

/// Analyze the input and build the grouped report.
pub fn execute_stats(request: AnalyzeRequest, report: &ReportOptions) -> Result<StatsReport> {
    let mut builder = SummaryBuilder::new();
    let summary = analyze_records(request, |stat| {
        builder.add(&stat);
        Ok(())
    })?;
    debug!(groups = builder.len(), "grouped statistics");
    Ok(StatsReport {
        rows: builder.finish(report),
        summary,
    })
}
