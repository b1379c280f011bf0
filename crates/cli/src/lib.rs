//! CLI for perf-gate.
//!
//! This crate provides the command-line interface for the performance
//! regression gate: the `check` subcommand runs the benchmark and enforces
//! the baseline, `diff` compares two stored reports offline.

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use perf_gate_benchmarks::io::{
    self, DEFAULT_BASELINE_PATH, DEFAULT_DELTA_REPORT_PATH, DEFAULT_REPORT_PATH,
};
use perf_gate_benchmarks::{
    compute_delta, markdown, run_gate, BaselineError, BenchCommand, CommandRunner, DeltaReport,
    DeltaStatus, GateConfig, GateError, GateOutcome, MetricDelta, RunnerError, EXIT_CONFIG,
    EXIT_OK,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// perf-gate CLI.
#[derive(Parser, Debug)]
#[command(name = "perf-gate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log debug output to stderr (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log line format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Log line format on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the benchmark, check the baseline and write reports.
    ///
    /// Exit status is 0 when every ceiling holds, 1 when a ceiling is
    /// exceeded or the benchmark fails, and 2 on configuration errors.
    Check(CheckArgs),

    /// Compare two stored run reports without running anything.
    Diff(DiffArgs),
}

/// Options for `check`.
#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Workload path passed to the benchmark.
    #[arg(
        long,
        visible_alias = "vault",
        env = "PERF_GATE_WORKLOAD",
        default_value = "Knowledge.vault"
    )]
    pub workload: String,

    /// Query string passed to the benchmark.
    #[arg(long, env = "PERF_GATE_QUERY", default_value = "note")]
    pub query: String,

    /// Iterations inside one benchmark run.
    #[arg(long, env = "PERF_GATE_ITERATIONS", default_value_t = 20)]
    pub iterations: u32,

    /// Path to baseline JSON.
    #[arg(long, env = "PERF_GATE_BASELINE", default_value = DEFAULT_BASELINE_PATH)]
    pub baseline: PathBuf,

    /// Path to write the latest run report.
    #[arg(long, env = "PERF_GATE_REPORT_OUT", default_value = DEFAULT_REPORT_PATH)]
    pub report_out: PathBuf,

    /// Baseline profile key when the baseline JSON is profile-based.
    #[arg(long, env = "PERF_GATE_BASELINE_PROFILE", default_value = "default")]
    pub baseline_profile: String,

    /// Number of benchmark runs to aggregate with median (at least 1).
    #[arg(
        long,
        env = "PERF_GATE_RETRIES",
        default_value_t = 1,
        allow_negative_numbers = true
    )]
    pub retries: i64,

    /// Optional previous run report for delta comparison.
    #[arg(long, env = "PERF_GATE_PREVIOUS_REPORT")]
    pub previous_report: Option<PathBuf>,

    /// Path to write the delta report.
    #[arg(
        long,
        env = "PERF_GATE_DELTA_REPORT_OUT",
        default_value = DEFAULT_DELTA_REPORT_PATH
    )]
    pub delta_report_out: PathBuf,

    /// Benchmark executable.
    #[arg(long, env = "PERF_GATE_BENCH_PROGRAM", default_value = "cargo")]
    pub bench_program: String,

    /// Leading benchmark argument, repeatable (default: `run -p xtask -- perf`).
    #[arg(long = "bench-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub bench_args: Vec<String>,

    /// Also write a markdown summary to this path.
    #[arg(long, env = "PERF_GATE_SUMMARY_OUT")]
    pub summary_out: Option<PathBuf>,
}

impl CheckArgs {
    /// Library configuration for these options.
    pub fn gate_config(&self) -> GateConfig {
        GateConfig {
            workload: self.workload.clone(),
            query: self.query.clone(),
            iterations: self.iterations,
            baseline: self.baseline.clone(),
            report_out: self.report_out.clone(),
            baseline_profile: self.baseline_profile.clone(),
            retries: u32::try_from(self.retries.max(1)).unwrap_or(u32::MAX),
            previous_report: self
                .previous_report
                .clone()
                .filter(|p| !p.as_os_str().is_empty()),
            delta_report_out: self.delta_report_out.clone(),
        }
    }

    /// Benchmark command for these options.
    pub fn bench_command(&self) -> BenchCommand {
        let mut command = BenchCommand {
            program: self.bench_program.clone(),
            ..BenchCommand::default()
        };
        if !self.bench_args.is_empty() {
            command.args = self.bench_args.clone();
        }
        command
    }
}

/// Options for `diff`.
#[derive(Args, Debug, Clone)]
pub struct DiffArgs {
    /// Current run report.
    #[arg(long)]
    pub current: PathBuf,

    /// Previous run report.
    #[arg(long)]
    pub previous: PathBuf,

    /// Write the delta report to this path.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// Install the global tracing subscriber on stderr.
pub fn init_logging(verbose: bool, format: LogFormat) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    // A subscriber may already be installed when embedded in tests.
    let _ = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

/// Run the CLI with the process arguments.
///
/// # Returns
///
/// The process exit status on success, or an error for unexpected
/// failures that should be reported as-is.
pub fn run() -> anyhow::Result<i32> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_format);

    match cli.command {
        Commands::Check(args) => cmd_check(&args),
        Commands::Diff(args) => cmd_diff(&args),
    }
}

fn cmd_check(args: &CheckArgs) -> anyhow::Result<i32> {
    let config = args.gate_config();
    let runner = CommandRunner::new(args.bench_command());
    info!(profile = %config.baseline_profile, runs = config.run_count(), "starting perf gate");

    let outcome = match run_gate(&config, &runner) {
        Ok(outcome) => outcome,
        Err(err) => {
            report_gate_error(&err);
            return Ok(err.exit_code());
        }
    };

    print_outcome(&config, &outcome);

    if let Some(path) = &args.summary_out {
        let summary = markdown::generate_summary(&outcome.report, &outcome.delta_report);
        io::ensure_parent_dir(path)
            .and_then(|()| std::fs::write(path, summary))
            .with_context(|| format!("failed to write summary {}", path.display()))?;
        println!("perf-summary: {}", path.display());
    }

    print_verdict(&outcome);
    Ok(outcome.exit_code())
}

fn report_gate_error(err: &GateError) {
    match err {
        GateError::Baseline(BaselineError::ProfileNotFound { profile, available }) => {
            println!("baseline profile not found: {profile}");
            println!("available profiles: {}", available.join(", "));
        }
        GateError::Runner(RunnerError::Failed { output, .. }) => {
            println!("{output}");
            println!("{}", err.to_string().red());
        }
        other => println!("{other}"),
    }
}

fn print_outcome(config: &GateConfig, outcome: &GateOutcome) {
    println!("perf-metrics:");
    for (key, value) in &outcome.report.metrics {
        println!("  {key}: {value}");
    }
    println!("perf-runs: {}", outcome.report.raw_runs.len());
    println!("perf-report: {}", config.report_out.display());
    print_delta(&outcome.delta_report.metric_delta);
    println!("perf-delta-report: {}", config.delta_report_out.display());
}

fn print_delta(delta: &MetricDelta) {
    match delta.status {
        DeltaStatus::Ok => {
            println!("perf-delta:");
            for (key, record) in delta.metrics.iter().flatten() {
                println!(
                    "  {key}: {} -> {} ({:+})",
                    record.previous, record.current, record.delta
                );
            }
        }
        DeltaStatus::NoPreviousReport => println!("perf-delta: no previous report"),
        DeltaStatus::InvalidPreviousReport => println!("perf-delta: invalid previous report"),
    }
}

fn print_verdict(outcome: &GateOutcome) {
    if outcome.report.is_ok() {
        println!("perf-baseline-check: {}", "OK".green().bold());
        return;
    }

    println!("perf-baseline-check: {}", "FAILED".red().bold());
    for item in &outcome.report.verdict.failures {
        println!("  - {item}");
    }
}

fn cmd_diff(args: &DiffArgs) -> anyhow::Result<i32> {
    let current = match io::read_run_report(&args.current) {
        Ok(report) => report,
        Err(err) => {
            println!("current report unreadable: {}: {err}", args.current.display());
            return Ok(EXIT_CONFIG);
        }
    };

    let previous = io::load_previous_report(&args.previous);
    let metric_delta = compute_delta(&current.metrics, previous.as_ref());
    print_delta(&metric_delta);

    if let Some(out) = &args.out {
        let report = DeltaReport::new(
            current.baseline_profile.clone(),
            Some(args.previous.clone()),
            metric_delta,
        );
        io::write_json(&report, out)
            .with_context(|| format!("failed to write delta report {}", out.display()))?;
        println!("perf-delta-report: {}", out.display());
    }

    Ok(EXIT_OK)
}
