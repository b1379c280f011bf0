// Copyright 2025 Perf Gate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Metric deltas between the current run and a previously written report.
//!
//! The previous report is taken as untyped JSON: it may come from an older
//! version of the tool or be hand-edited, and a broken previous report must
//! never fail the gate. Structural problems become a status tag instead.

use crate::metric::MetricMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// How the delta computation went.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaStatus {
    /// A previous report was loaded and compared.
    Ok,
    /// No previous report was supplied, or it could not be read.
    NoPreviousReport,
    /// A previous report was loaded but has no `metrics` object.
    InvalidPreviousReport,
}

/// Change of one integer metric between two reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaRecord {
    /// Value in the previous report.
    pub previous: i64,
    /// Aggregated value of this run.
    pub current: i64,
    /// `current - previous`
    pub delta: i64,
}

/// Result of comparing current metrics with a previous report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricDelta {
    /// Outcome tag.
    pub status: DeltaStatus,
    /// Present only when `status` is [`DeltaStatus::Ok`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<BTreeMap<String, DeltaRecord>>,
}

impl MetricDelta {
    fn with_status(status: DeltaStatus) -> Self {
        Self {
            status,
            metrics: None,
        }
    }

    /// Delta for `key`, if one was computed.
    pub fn get(&self, key: &str) -> Option<&DeltaRecord> {
        self.metrics.as_ref().and_then(|m| m.get(key))
    }
}

/// Compare `current` with the `metrics` object of a previous report.
///
/// Only keys that are integers on both sides produce a record; everything
/// else is left out silently.
pub fn compute_delta(current: &MetricMap, previous: Option<&Value>) -> MetricDelta {
    let previous = match previous {
        None | Some(Value::Null) => return MetricDelta::with_status(DeltaStatus::NoPreviousReport),
        Some(Value::Object(doc)) if doc.is_empty() => {
            return MetricDelta::with_status(DeltaStatus::NoPreviousReport)
        }
        Some(Value::Object(doc)) => doc,
        Some(_) => return MetricDelta::with_status(DeltaStatus::InvalidPreviousReport),
    };

    let Some(Value::Object(previous_metrics)) = previous.get("metrics") else {
        return MetricDelta::with_status(DeltaStatus::InvalidPreviousReport);
    };

    let deltas = current
        .iter()
        .filter_map(|(key, value)| {
            let current = value.as_integer()?;
            let previous = previous_metrics.get(key)?.as_i64()?;
            let record = DeltaRecord {
                previous,
                current,
                delta: current.saturating_sub(previous),
            };
            Some((key.clone(), record))
        })
        .collect();

    MetricDelta {
        status: DeltaStatus::Ok,
        metrics: Some(deltas),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::MetricValue;
    use serde_json::json;

    fn current(pairs: &[(&str, MetricValue)]) -> MetricMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_delta_against_previous_report() {
        let previous = json!({"ok": true, "metrics": {"a": 15}});
        let delta = compute_delta(&current(&[("a", MetricValue::Integer(20))]), Some(&previous));

        assert_eq!(delta.status, DeltaStatus::Ok);
        assert_eq!(
            serde_json::to_value(&delta).unwrap(),
            json!({
                "status": "ok",
                "metrics": {"a": {"previous": 15, "current": 20, "delta": 5}}
            })
        );
    }

    #[test]
    fn test_no_previous_report() {
        let delta = compute_delta(&current(&[("a", MetricValue::Integer(1))]), None);
        assert_eq!(delta.status, DeltaStatus::NoPreviousReport);
        assert!(delta.metrics.is_none());
        assert_eq!(
            serde_json::to_value(&delta).unwrap(),
            json!({"status": "no_previous_report"})
        );

        let empty = json!({});
        assert_eq!(
            compute_delta(&MetricMap::new(), Some(&empty)).status,
            DeltaStatus::NoPreviousReport
        );
    }

    #[test]
    fn test_invalid_previous_report() {
        for previous in [
            json!({"metrics": [1, 2, 3]}),
            json!({"metrics": "fast"}),
            json!({"generated_at_utc": "2025-01-01T00:00:00Z"}),
            json!([{"metrics": {}}]),
        ] {
            let delta = compute_delta(&MetricMap::new(), Some(&previous));
            assert_eq!(delta.status, DeltaStatus::InvalidPreviousReport, "{previous}");
            assert!(delta.metrics.is_none());
        }
    }

    #[test]
    fn test_only_keys_numeric_on_both_sides() {
        let previous = json!({
            "metrics": {
                "open_ms": 10,
                "scan_ms": "n/a",
                "read_ms": 1.5,
                "stale_ms": 4,
                "version": "0.1.0"
            }
        });
        let current = current(&[
            ("open_ms", MetricValue::Integer(8)),
            ("scan_ms", MetricValue::Integer(30)),
            ("read_ms", MetricValue::Integer(2)),
            ("version", MetricValue::from("0.2.0")),
            ("new_ms", MetricValue::Integer(1)),
        ]);

        let delta = compute_delta(&current, Some(&previous));
        assert_eq!(delta.status, DeltaStatus::Ok);

        let metrics = delta.metrics.as_ref().unwrap();
        assert_eq!(metrics.len(), 1);
        assert_eq!(
            delta.get("open_ms"),
            Some(&DeltaRecord {
                previous: 10,
                current: 8,
                delta: -2
            })
        );
    }

    #[test]
    fn test_ok_with_no_overlap_is_empty() {
        let previous = json!({"metrics": {"other": 1}});
        let delta = compute_delta(&current(&[("a", MetricValue::Integer(1))]), Some(&previous));
        assert_eq!(delta.status, DeltaStatus::Ok);
        assert_eq!(delta.metrics, Some(BTreeMap::new()));
    }

    #[test]
    fn test_delta_is_idempotent() {
        let previous = json!({"metrics": {"a": 3, "b": 9, "c": 100}});
        let current = current(&[
            ("c", MetricValue::Integer(90)),
            ("a", MetricValue::Integer(4)),
            ("b", MetricValue::Integer(9)),
        ]);

        let first = serde_json::to_string(&compute_delta(&current, Some(&previous))).unwrap();
        let second = serde_json::to_string(&compute_delta(&current, Some(&previous))).unwrap();
        assert_eq!(first, second);
    }
}
