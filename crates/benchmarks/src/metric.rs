// Copyright 2025 Perf Gate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Metric values and the line-oriented metric grammar.
//!
//! Benchmark tools print free-form text. Only lines shaped like
//! `<identifier>: <value>` are metrics; everything else (banners,
//! progress output, blank lines) is skipped without complaint.
//!
//! ```
//! use perf_gate_benchmarks::metric::{parse_metrics, MetricValue};
//!
//! let metrics = parse_metrics("perf:\n  open_ms: 12\n  path: Knowledge.vault\n");
//! assert_eq!(metrics["open_ms"], MetricValue::Integer(12));
//! assert_eq!(metrics["path"], MetricValue::from("Knowledge.vault"));
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// `<identifier>:<whitespace><rest-of-line>`, applied to a trimmed line.
static METRIC_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z0-9_]+):\s*(.*)$").expect("metric line pattern is valid")
});

/// A single metric value reported by a benchmark run.
///
/// Only integers take part in aggregation, ceiling checks and deltas.
/// Text values are informational and are carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    /// A non-negative decimal integer as printed by the benchmark.
    Integer(i64),
    /// Anything else, verbatim.
    Text(String),
}

impl MetricValue {
    /// Classify a captured value.
    ///
    /// A value is an integer only when it is made of ASCII digits and fits
    /// in an `i64`; oversized digit strings stay text.
    pub fn classify(raw: &str) -> Self {
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = raw.parse::<i64>() {
                return Self::Integer(n);
            }
        }
        Self::Text(raw.to_string())
    }

    /// The integer payload, if any.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            Self::Text(_) => None,
        }
    }
}

impl From<i64> for MetricValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<&str> for MetricValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for MetricValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Metric name to value. Sorted so serialized reports are deterministic.
pub type MetricMap = BTreeMap<String, MetricValue>;

/// Parse one block of benchmark output into a [`MetricMap`].
///
/// Each line is trimmed and matched against the metric grammar. The value
/// is everything after the first colon and its following whitespace, so
/// `time: 12:34` yields the text `12:34`. Repeated keys keep the last value.
pub fn parse_metrics(output: &str) -> MetricMap {
    let mut metrics = MetricMap::new();

    for line in output.lines() {
        let Some(caps) = METRIC_LINE.captures(line.trim()) else {
            continue;
        };
        let key = caps[1].to_string();
        let value = MetricValue::classify(&caps[2]);
        metrics.insert(key, value);
    }

    metrics
}
