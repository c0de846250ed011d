//! slowop CLI - Command-line tool for MongoDB slow operation analysis
//!
//! This binary provides command-line interfaces for:
//! - stats: group slow operations by query pattern and report timings
//! - ops: emit one operation statistic per slow query line (NDJSON)
//! - pattern: normalize a single command document

mod config;
mod logging;

use clap::{Args, Parser, Subcommand};
use config::{AnalyzeFlags, CliConfig, ReportFlags, StatsFormat};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use slowop_codec::Analyzer;
use slowop_format::constants::COMPONENT_COMMAND;
use slowop_format::LogRecord;
use slowop_io::{
    analyze_records, AnalyzeMetrics, AnalyzeRequest, AnalyzeSummary, InputSource, OpSummary,
    OrderBy, SortOrder, SummaryBuilder,
};
use std::error::Error;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

#[derive(Parser)]
#[command(name = "slowop")]
#[command(about = "MongoDB slow operation analyzer")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Increase diagnostic output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Group slow operations by pattern and report timings
    ///
    /// Examples:
    ///   slowop stats mongod.log
    ///   slowop stats mongod.log.gz --order-by max_ms --top 20
    ///   slowop stats mongod.log --collscan --format json
    Stats(StatsArgs),
    /// Emit one statistic per slow operation as NDJSON
    Ops(OpsArgs),
    /// Normalize a single command document
    ///
    /// Examples:
    ///   slowop pattern '{"find":"orders","filter":{"status":"A"}}'
    ///   echo '{"q":{"a":1}}' | slowop pattern - --type update
    Pattern(PatternArgs),
}

#[derive(Args)]
struct StatsArgs {
    /// Log file, plain or gzip compressed ("-" for stdin)
    input: PathBuf,
    /// Output format (table, json)
    #[arg(long, value_enum)]
    format: Option<StatsFormat>,
    /// Column to order by (count, avg_ms, max_ms, total_ms, reslen, op, ns, index, pattern)
    #[arg(long)]
    order_by: Option<OrderBy>,
    /// Sort direction (asc, desc)
    #[arg(long)]
    order: Option<SortOrder>,
    /// Only report patterns that scanned a whole collection
    #[arg(long)]
    collscan: bool,
    /// Only report the first N rows
    #[arg(long)]
    top: Option<usize>,
    #[command(flatten)]
    analyze: AnalyzeArgs,
    /// Show progress spinner while analyzing
    #[arg(long)]
    progress: bool,
}

#[derive(Args)]
struct OpsArgs {
    /// Log file, plain or gzip compressed ("-" for stdin)
    input: PathBuf,
    /// Output file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,
    #[command(flatten)]
    analyze: AnalyzeArgs,
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Maximum worker threads
    #[arg(long)]
    threads: Option<usize>,
    /// Analyze every log line, not only "Slow query" lines
    #[arg(long)]
    all_messages: bool,
}

impl AnalyzeArgs {
    fn flags(&self) -> AnalyzeFlags {
        AnalyzeFlags {
            all_messages: self.all_messages,
            threads: self.threads,
        }
    }
}

#[derive(Args)]
struct PatternArgs {
    /// Command document as JSON ("-" for stdin)
    command: String,
    /// Operation type hint
    #[arg(long = "type", default_value = "command")]
    op_type: String,
    /// Namespace the command ran against
    #[arg(long, default_value = "test.collection")]
    ns: String,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);
    let config = CliConfig::load_optional(cli.config.as_deref())?;

    match cli.command {
        Commands::Stats(args) => {
            let mut stdout = std::io::stdout().lock();
            handle_stats(&args, &config, &mut stdout)?;
        }
        Commands::Ops(args) => {
            handle_ops(&args, &config)?;
        }
        Commands::Pattern(args) => {
            let mut stdout = std::io::stdout().lock();
            handle_pattern(&args, &mut stdout)?;
        }
    }

    Ok(())
}

fn resolve_input_source(path: &Path) -> InputSource {
    if path == Path::new("-") {
        InputSource::Stdin
    } else {
        InputSource::Path(path.to_path_buf())
    }
}

fn handle_stats(
    args: &StatsArgs,
    config: &CliConfig,
    writer: &mut dyn Write,
) -> Result<(), Box<dyn Error>> {
    let (report, format) = config.report_options(&ReportFlags {
        format: args.format,
        order_by: args.order_by,
        order: args.order,
        collscan: args.collscan,
        top: args.top,
    });
    let request = AnalyzeRequest {
        input: resolve_input_source(&args.input),
        options: config.analyze_options(&args.analyze.flags()),
    };
    debug!(?request, ?report, "running stats");

    let mut progress_bar = args.progress.then(|| create_spinner("Analyzing slow operations"));
    let mut builder = SummaryBuilder::new();
    let summary = analyze_records(request, |stat| {
        builder.add(&stat);
        if let Some(pb) = progress_bar.as_ref() {
            pb.inc(1);
        }
        Ok(())
    })?;
    let rows = builder.finish(&report);

    if let Some(pb) = progress_bar.take() {
        pb.finish_with_message(format!(
            "Analyzed {} operations into {} patterns in {:.2?}",
            summary.metrics.accepted,
            rows.len(),
            summary.elapsed
        ));
    }

    match format {
        StatsFormat::Table => print_stats_table(writer, &rows)?,
        StatsFormat::Json => print_stats_json(writer, &rows, &summary.metrics)?,
    }
    writer.flush()?;
    report_analyze_summary(&summary, &args.input)?;
    Ok(())
}

fn handle_ops(args: &OpsArgs, config: &CliConfig) -> Result<(), Box<dyn Error>> {
    let target: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(std::fs::File::create(path)?),
        None => Box::new(std::io::stdout().lock()),
    };
    let mut writer = BufWriter::new(target);
    let request = AnalyzeRequest {
        input: resolve_input_source(&args.input),
        options: config.analyze_options(&args.analyze.flags()),
    };

    let summary = analyze_records(request, |stat| {
        serde_json::to_writer(&mut writer, &stat)?;
        writer.write_all(b"\n")?;
        Ok(())
    })?;
    writer.flush()?;
    report_analyze_summary(&summary, &args.input)?;
    Ok(())
}

fn handle_pattern(args: &PatternArgs, writer: &mut dyn Write) -> Result<(), Box<dyn Error>> {
    let text = if args.command == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        args.command.clone()
    };

    let command = match serde_json::from_str::<Value>(text.trim())? {
        Value::Object(map) => map,
        other => {
            return Err(format!("command must be a JSON object, got {}", json_type(&other)).into())
        }
    };

    let analyzer = Analyzer::new()?;
    let record = LogRecord::command(COMPONENT_COMMAND, &args.op_type, &args.ns, command);
    let stat = analyzer
        .analyze(&record)
        .map_err(|reason| format!("command rejected: {}", reason))?;

    serde_json::to_writer(&mut *writer, &stat)?;
    writeln!(writer)?;
    Ok(())
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn print_stats_table(writer: &mut dyn Write, rows: &[OpSummary]) -> Result<(), Box<dyn Error>> {
    writeln!(
        writer,
        "Op\tNamespace\tCount\tAvg ms\tMax ms\tTotal ms\tReslen\tIndex\tPattern"
    )?;
    for row in rows {
        writeln!(
            writer,
            "{}\t{}\t{}\t{:.1}\t{}\t{}\t{}\t{}\t{}",
            row.op,
            row.ns,
            row.count,
            row.avg_ms,
            row.max_ms,
            row.total_ms,
            row.reslen,
            row.index(),
            row.pattern
        )?;
    }
    Ok(())
}

fn print_stats_json(
    writer: &mut dyn Write,
    rows: &[OpSummary],
    metrics: &AnalyzeMetrics,
) -> Result<(), Box<dyn Error>> {
    let document = serde_json::json!({
        "ops": rows,
        "metrics": metrics,
    });
    serde_json::to_writer_pretty(&mut *writer, &document)?;
    writeln!(writer)?;
    Ok(())
}

fn report_analyze_summary(summary: &AnalyzeSummary, input: &Path) -> Result<(), Box<dyn Error>> {
    let metrics = &summary.metrics;
    let secs = summary.elapsed.as_secs_f64().max(f64::EPSILON);
    let mut stderr = std::io::stderr().lock();
    writeln!(
        &mut stderr,
        "Analyzed {} (lines: {}, accepted: {}, rejected: {}, malformed: {}, skipped: {}, elapsed: {:.2?}, {:.1} lines/s, {} threads)",
        input.display(),
        metrics.lines_read,
        metrics.accepted,
        metrics.total_rejected(),
        metrics.malformed_lines,
        metrics.skipped_messages,
        summary.elapsed,
        metrics.lines_read as f64 / secs,
        summary.decision.thread_count,
    )?;
    if !metrics.rejected.is_empty() {
        let reasons = metrics
            .rejected
            .iter()
            .map(|(reason, count)| format!("{}: {}", reason, count))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(&mut stderr, "Rejected by reason: {}", reasons)?;
    }
    Ok(())
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {pos} {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
