// Copyright 2025 Perf Gate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Persisted report documents.
//!
//! A [`RunReport`] is written after every successful sequence of benchmark
//! runs, whether or not the verdict passed. A later invocation may read it
//! back as its "previous" report. A [`DeltaReport`] is written alongside it.

use crate::baseline::Ceilings;
use crate::delta::MetricDelta;
use crate::evaluate::Verdict;
use crate::metric::MetricMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Full record of one gate invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// When the report was generated.
    pub generated_at_utc: DateTime<Utc>,
    /// Workload the benchmark ran against.
    #[serde(alias = "vault")]
    pub workload: String,
    /// Query string passed to the benchmark.
    pub query: String,
    /// Iterations per benchmark run.
    pub iterations: u32,
    /// Baseline profile requested for this run.
    pub baseline_profile: String,
    /// Number of benchmark runs aggregated.
    pub retries: u32,
    /// Resolved ceilings the metrics were checked against.
    pub baseline: Ceilings,
    /// Aggregated metrics.
    pub metrics: MetricMap,
    /// Parsed metrics of each individual run, in run order.
    pub raw_runs: Vec<MetricMap>,
    /// Outcome of the ceiling check.
    #[serde(flatten)]
    pub verdict: Verdict,
}

impl RunReport {
    /// Whether the ceiling check passed.
    pub fn is_ok(&self) -> bool {
        self.verdict.ok
    }
}

/// Delta of this run against an earlier [`RunReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaReport {
    /// When the report was generated.
    pub generated_at_utc: DateTime<Utc>,
    /// Baseline profile requested for this run.
    pub baseline_profile: String,
    /// Location of the previous report, if one was given.
    pub previous_report: Option<PathBuf>,
    /// Status and per-metric deltas.
    pub metric_delta: MetricDelta,
}

impl DeltaReport {
    /// Create a delta report stamped with the current time.
    pub fn new(
        baseline_profile: impl Into<String>,
        previous_report: Option<PathBuf>,
        metric_delta: MetricDelta,
    ) -> Self {
        Self {
            generated_at_utc: Utc::now(),
            baseline_profile: baseline_profile.into(),
            previous_report,
            metric_delta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::{compute_delta, DeltaStatus};
    use crate::metric::MetricValue;
    use serde_json::json;

    fn sample_report() -> RunReport {
        let mut metrics = MetricMap::new();
        metrics.insert("open_ms".into(), MetricValue::Integer(12));
        metrics.insert("path".into(), MetricValue::from("Knowledge.vault"));

        RunReport {
            generated_at_utc: Utc::now(),
            workload: "Knowledge.vault".into(),
            query: "note".into(),
            iterations: 20,
            baseline_profile: "default".into(),
            retries: 1,
            baseline: [("open_ms".to_string(), 10)].into_iter().collect(),
            metrics: metrics.clone(),
            raw_runs: vec![metrics],
            verdict: Verdict {
                ok: false,
                failures: vec!["open_ms: 12 > 10".into()],
            },
        }
    }

    #[test]
    fn test_run_report_json_shape() {
        let value = serde_json::to_value(sample_report()).unwrap();
        let doc = value.as_object().unwrap();

        for key in [
            "generated_at_utc",
            "workload",
            "query",
            "iterations",
            "baseline_profile",
            "retries",
            "baseline",
            "metrics",
            "raw_runs",
            "failed",
            "ok",
        ] {
            assert!(doc.contains_key(key), "missing {key}");
        }
        assert_eq!(value["ok"], json!(false));
        assert_eq!(value["failed"], json!(["open_ms: 12 > 10"]));
        assert_eq!(value["metrics"]["path"], json!("Knowledge.vault"));
    }

    #[test]
    fn test_run_report_feeds_delta_engine() {
        let report = sample_report();
        let reloaded: serde_json::Value =
            serde_json::from_str(&serde_json::to_string_pretty(&report).unwrap()).unwrap();

        let delta = compute_delta(&report.metrics, Some(&reloaded));
        assert_eq!(delta.status, DeltaStatus::Ok);
        assert_eq!(delta.get("open_ms").unwrap().delta, 0);
        assert!(delta.get("path").is_none());
    }

    #[test]
    fn test_reads_reports_keyed_by_vault() {
        let mut value = serde_json::to_value(sample_report()).unwrap();
        let doc = value.as_object_mut().unwrap();
        let workload = doc.remove("workload").unwrap();
        doc.insert("vault".into(), workload);

        let report: RunReport = serde_json::from_value(value).unwrap();
        assert_eq!(report.workload, "Knowledge.vault");
    }

    #[test]
    fn test_delta_report_previous_is_null_when_absent() {
        let report = DeltaReport::new(
            "default",
            None,
            compute_delta(&MetricMap::new(), None),
        );
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["previous_report"], json!(null));
        assert_eq!(value["metric_delta"], json!({"status": "no_previous_report"}));
    }
}
