//! Markdown job summaries for gate results.
//!
//! Produces a compact report suitable for a CI step summary: overall
//! status, one table row per metric and the list of violations.

use crate::delta::DeltaStatus;
use crate::report::{DeltaReport, RunReport};
use std::collections::BTreeSet;
use std::fmt::{self, Write};

/// Generate a markdown summary for a run and its delta report.
pub fn generate_summary(report: &RunReport, delta: &DeltaReport) -> String {
    let mut output = String::new();
    // Writing into a String cannot fail.
    let _ = write_summary(&mut output, report, delta);
    output
}

fn write_summary(out: &mut String, report: &RunReport, delta: &DeltaReport) -> fmt::Result {
    let status = if report.is_ok() { "OK" } else { "FAILED" };

    writeln!(out, "# Perf Baseline Check: {status}")?;
    writeln!(out)?;
    writeln!(
        out,
        "Generated: {}",
        report.generated_at_utc.format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    writeln!(out)?;
    writeln!(out, "- Profile: `{}`", report.baseline_profile)?;
    writeln!(out, "- Workload: `{}`", report.workload)?;
    writeln!(out, "- Query: `{}`", report.query)?;
    writeln!(
        out,
        "- Runs: {} x {} iterations",
        report.retries, report.iterations
    )?;
    writeln!(out)?;

    writeln!(out, "## Metrics")?;
    writeln!(out)?;
    writeln!(out, "| Metric | Value | Ceiling | Delta |")?;
    writeln!(out, "|--------|-------|---------|-------|")?;

    let keys: BTreeSet<&String> = report.metrics.keys().chain(report.baseline.keys()).collect();
    for key in keys {
        let value = report
            .metrics
            .get(key)
            .map(|v| escape_cell(&v.to_string()))
            .unwrap_or_else(|| "-".to_string());
        let ceiling = report
            .baseline
            .get(key)
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".to_string());
        let change = delta
            .metric_delta
            .get(key)
            .map(|d| format!("{:+}", d.delta))
            .unwrap_or_else(|| "-".to_string());
        writeln!(out, "| {key} | {value} | {ceiling} | {change} |")?;
    }
    writeln!(out)?;

    match delta.metric_delta.status {
        DeltaStatus::Ok => {}
        DeltaStatus::NoPreviousReport => writeln!(out, "_No previous report to compare against._\n")?,
        DeltaStatus::InvalidPreviousReport => {
            writeln!(out, "_Previous report has no usable metrics; deltas skipped._\n")?
        }
    }

    if !report.verdict.failures.is_empty() {
        writeln!(out, "## Failures")?;
        writeln!(out)?;
        for failure in &report.verdict.failures {
            writeln!(out, "- {failure}")?;
        }
        writeln!(out)?;
    }

    writeln!(out, "---")?;
    writeln!(out, "Total metrics: {}", report.metrics.len())?;

    Ok(())
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}
