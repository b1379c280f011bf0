//! Performance regression gate.
//!
//! This crate runs a benchmark command, extracts `key: value` metrics from
//! its output, aggregates repeated runs, checks the result against a
//! baseline of maximum allowed values and writes a run report plus a delta
//! report against an earlier run.
//!
//! # Quick Start
//!
//! ```no_run
//! use perf_gate_benchmarks::{run_gate, CommandRunner, GateConfig};
//!
//! let config = GateConfig::default();
//! let outcome = run_gate(&config, &CommandRunner::default())?;
//!
//! for (key, value) in &outcome.report.metrics {
//!     println!("{key}: {value}");
//! }
//! std::process::exit(outcome.exit_code());
//! # Ok::<(), perf_gate_benchmarks::GateError>(())
//! ```
//!
//! # Modules
//!
//! - [`metric`] - Metric values and the output grammar
//! - [`aggregate`] - Median-based aggregation of repeated runs
//! - [`baseline`] - Flat and profile-keyed baselines
//! - [`evaluate`] - Ceiling checks
//! - [`delta`] - Deltas against a previous report
//! - [`report`] - Persisted report documents
//! - [`runner`] - External benchmark invocation
//! - [`io`] - Reading and writing reports
//! - [`markdown`] - Markdown job summaries

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod aggregate;
pub mod baseline;
pub mod delta;
pub mod evaluate;
pub mod io;
pub mod markdown;
pub mod metric;
pub mod report;
pub mod runner;

pub use aggregate::aggregate_runs;
pub use baseline::{Baseline, BaselineError, Ceilings};
pub use delta::{compute_delta, DeltaRecord, DeltaStatus, MetricDelta};
pub use evaluate::{evaluate, Verdict};
pub use metric::{parse_metrics, MetricMap, MetricValue};
pub use report::{DeltaReport, RunReport};
pub use runner::{BenchCommand, BenchmarkRunner, CommandRunner, Invocation, RunnerError};

use chrono::Utc;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Exit status for a passing gate.
pub const EXIT_OK: i32 = 0;
/// Exit status for a failed verdict or an aborted run.
pub const EXIT_FAILED: i32 = 1;
/// Exit status for configuration errors.
pub const EXIT_CONFIG: i32 = 2;

/// Errors that abort the gate before a verdict is produced.
#[derive(Debug, Error)]
pub enum GateError {
    /// Baseline missing, malformed, or profile unknown
    #[error(transparent)]
    Baseline(#[from] BaselineError),

    /// Benchmark could not be run
    #[error(transparent)]
    Runner(#[from] RunnerError),

    /// Report could not be written
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        /// Destination that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl GateError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Baseline(_) => EXIT_CONFIG,
            Self::Runner(_) | Self::Write { .. } => EXIT_FAILED,
        }
    }
}

/// Everything the gate needs for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    /// Workload path passed to the benchmark.
    pub workload: String,
    /// Query string passed to the benchmark.
    pub query: String,
    /// Iterations inside one benchmark run.
    pub iterations: u32,
    /// Baseline document.
    pub baseline: PathBuf,
    /// Where to write the run report.
    pub report_out: PathBuf,
    /// Baseline profile to check against.
    pub baseline_profile: String,
    /// Number of benchmark runs to aggregate; values below 1 mean 1.
    pub retries: u32,
    /// Earlier run report to compute deltas against.
    pub previous_report: Option<PathBuf>,
    /// Where to write the delta report.
    pub delta_report_out: PathBuf,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            workload: "Knowledge.vault".to_string(),
            query: "note".to_string(),
            iterations: 20,
            baseline: PathBuf::from(io::DEFAULT_BASELINE_PATH),
            report_out: PathBuf::from(io::DEFAULT_REPORT_PATH),
            baseline_profile: "default".to_string(),
            retries: 1,
            previous_report: None,
            delta_report_out: PathBuf::from(io::DEFAULT_DELTA_REPORT_PATH),
        }
    }
}

impl GateConfig {
    /// Number of runs actually performed.
    pub fn run_count(&self) -> u32 {
        self.retries.max(1)
    }

    fn invocation(&self) -> Invocation {
        Invocation {
            workload: self.workload.clone(),
            query: self.query.clone(),
            iterations: self.iterations,
        }
    }
}

/// Reports produced by a completed gate invocation.
#[derive(Debug, Clone)]
pub struct GateOutcome {
    /// The run report, as written.
    pub report: RunReport,
    /// The delta report, as written.
    pub delta_report: DeltaReport,
}

impl GateOutcome {
    /// [`EXIT_OK`] when the verdict passed, [`EXIT_FAILED`] otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.report.is_ok() {
            EXIT_OK
        } else {
            EXIT_FAILED
        }
    }
}

/// Run the full gate: resolve the baseline, run the benchmark, aggregate,
/// evaluate, and write both reports.
///
/// Configuration problems fail before the benchmark is started. A failing
/// benchmark run aborts without writing any report. A failed verdict is not
/// an error; check [`GateOutcome::exit_code`].
pub fn run_gate(
    config: &GateConfig,
    runner: &dyn BenchmarkRunner,
) -> Result<GateOutcome, GateError> {
    let baseline = Baseline::load(&config.baseline)?;
    let ceilings = baseline.resolve(&config.baseline_profile)?.clone();

    let invocation = config.invocation();
    let run_count = config.run_count();
    let mut runs = Vec::with_capacity(run_count as usize);
    for run in 1..=run_count {
        info!(run, of = run_count, workload = %invocation.workload, "running benchmark");
        let output = runner.run(&invocation)?;
        runs.push(parse_metrics(&output));
    }

    let metrics = aggregate_runs(&runs);
    let verdict = evaluate(&ceilings, &metrics);
    if !verdict.ok {
        warn!(failures = verdict.failures.len(), "perf baseline exceeded");
    }

    // Read before writing: `previous_report` may name `report_out`.
    let previous = config
        .previous_report
        .as_ref()
        .and_then(|path| io::load_previous_report(path));

    let report = RunReport {
        generated_at_utc: Utc::now(),
        workload: config.workload.clone(),
        query: config.query.clone(),
        iterations: config.iterations,
        baseline_profile: config.baseline_profile.clone(),
        retries: run_count,
        baseline: ceilings,
        metrics,
        raw_runs: runs,
        verdict,
    };
    let metric_delta = compute_delta(&report.metrics, previous.as_ref());
    info!(status = ?metric_delta.status, "computed metric delta");

    write_report(&report, &config.report_out)?;

    let delta_report = DeltaReport::new(
        config.baseline_profile.clone(),
        config.previous_report.clone(),
        metric_delta,
    );
    write_report(&delta_report, &config.delta_report_out)?;

    Ok(GateOutcome {
        report,
        delta_report,
    })
}

fn write_report<T: serde::Serialize>(value: &T, path: &Path) -> Result<(), GateError> {
    io::write_json(value, path).map_err(|source| GateError::Write {
        path: path.to_path_buf(),
        source,
    })
}
