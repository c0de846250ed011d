//! Parallel analysis support.
//!
//! Records are read sequentially and analyzed in batches. When the host has
//! more than one core and the input is large enough, each batch is fanned
//! out over a rayon pool; results always come back in input order.

use crate::InputSource;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use slowop_codec::Analyzer;
use slowop_format::{ClassifyError, LogRecord, OperationStatistic, Result, SlowopError};

const SMALL_INPUT_THRESHOLD_BYTES: u64 = 4 * 1024 * 1024;
const MAX_PARALLEL_THREADS: usize = 16;
const DEFAULT_MIN_PARALLEL_RECORDS: usize = 512;

/// Configuration controlling how the parallel heuristic behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelConfig {
    /// Optional cap on worker thread count after applying heuristics.
    pub max_threads: Option<usize>,
    /// Batches smaller than this are analyzed on the calling thread.
    pub min_parallel_records: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            max_threads: None,
            min_parallel_records: DEFAULT_MIN_PARALLEL_RECORDS,
        }
    }
}

/// Outcome of the parallel heuristic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParallelDecision {
    /// Whether batches may be analyzed on the pool.
    pub use_parallel: bool,
    /// Number of worker threads when parallelism is enabled.
    pub thread_count: usize,
    /// Human-readable explanation of the chosen mode.
    pub reason: String,
}

impl ParallelDecision {
    fn sequential(reason: impl Into<String>) -> Self {
        Self {
            use_parallel: false,
            thread_count: 1,
            reason: reason.into(),
        }
    }
}

/// Decide whether analysis of `input` should use a thread pool.
pub fn should_use_parallel(input: &InputSource, config: &ParallelConfig) -> ParallelDecision {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    evaluate_parallel_decision(cores, input.size_hint(), config)
}

fn evaluate_parallel_decision(
    cores: usize,
    input_size_hint: Option<u64>,
    config: &ParallelConfig,
) -> ParallelDecision {
    if cores < 2 {
        return ParallelDecision::sequential("Single-core system detected");
    }

    let user_cap = config
        .max_threads
        .map(|cap| cap.max(1))
        .unwrap_or(MAX_PARALLEL_THREADS)
        .min(MAX_PARALLEL_THREADS);
    let thread_count = cores.min(user_cap).min(MAX_PARALLEL_THREADS);

    if thread_count < 2 {
        return ParallelDecision::sequential(
            "Sequential mode forced by thread cap (--threads 1 or equivalent)",
        );
    }

    if let Some(size) = input_size_hint {
        if size < SMALL_INPUT_THRESHOLD_BYTES {
            return ParallelDecision::sequential(format!(
                "Small input file ({:.1} MiB) - parallel overhead exceeds benefit",
                bytes_to_mib(size),
            ));
        }
    }

    let reason = if config.max_threads.is_some() && thread_count < cores {
        format!("Using {}/{} requested threads", thread_count, user_cap)
    } else {
        format!("Using {}/{} cores for parallel analysis", thread_count, cores)
    };

    ParallelDecision {
        use_parallel: true,
        thread_count,
        reason,
    }
}

fn bytes_to_mib(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

/// Analyzes batches of records, on a pool when the decision allows it.
pub struct BatchAnalyzer<'a> {
    analyzer: &'a Analyzer,
    pool: Option<ThreadPool>,
    min_parallel_records: usize,
}

impl<'a> BatchAnalyzer<'a> {
    /// Build the worker pool described by `decision`.
    pub fn new(
        analyzer: &'a Analyzer,
        decision: &ParallelDecision,
        config: &ParallelConfig,
    ) -> Result<Self> {
        let pool = if decision.use_parallel {
            let pool = ThreadPoolBuilder::new()
                .num_threads(decision.thread_count)
                .thread_name(|idx| format!("slowop-analyze-{}", idx))
                .build()
                .map_err(|e| {
                    SlowopError::Internal(format!("Failed to create thread pool: {}", e))
                })?;
            Some(pool)
        } else {
            None
        };

        Ok(Self {
            analyzer,
            pool,
            min_parallel_records: config.min_parallel_records,
        })
    }

    /// True when a worker pool was built
    pub fn is_parallel(&self) -> bool {
        self.pool.is_some()
    }

    /// Analyze every record; the i-th result belongs to the i-th record.
    pub fn analyze_batch(
        &self,
        records: &[LogRecord],
    ) -> Vec<std::result::Result<OperationStatistic, ClassifyError>> {
        let analyzer = self.analyzer;
        match &self.pool {
            Some(pool) if records.len() >= self.min_parallel_records => pool.install(|| {
                records
                    .par_iter()
                    .map(|record| analyzer.analyze(record))
                    .collect()
            }),
            _ => records.iter().map(|record| analyzer.analyze(record)).collect(),
        }
    }
}
