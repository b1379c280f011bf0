// Copyright 2025 Perf Gate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Folding repeated benchmark runs into one representative metric map.
//!
//! The policy per key is:
//!
//! - every run reports the key as an integer: take the median;
//! - otherwise: keep the value from the first run that reported it.
//!
//! The second branch lets informational text metrics (tool versions,
//! paths) pass through while timings get noise-resistant aggregation.

use crate::metric::{MetricMap, MetricValue};
use std::collections::BTreeSet;

/// Aggregate parsed runs into a single [`MetricMap`].
///
/// An empty slice yields an empty map. A key missing from any run is never
/// aggregated numerically, even when all of its occurrences are integers.
pub fn aggregate_runs(runs: &[MetricMap]) -> MetricMap {
    let keys: BTreeSet<&String> = runs.iter().flat_map(|run| run.keys()).collect();
    let mut aggregated = MetricMap::new();

    for key in keys {
        let integers: Vec<i64> = runs
            .iter()
            .filter_map(|run| run.get(key).and_then(MetricValue::as_integer))
            .collect();

        let value = if integers.len() == runs.len() {
            MetricValue::Integer(median(integers))
        } else {
            match runs.iter().find_map(|run| run.get(key)) {
                Some(first) => first.clone(),
                None => continue,
            }
        };

        aggregated.insert(key.clone(), value);
    }

    aggregated
}

/// Median of a non-empty sample.
///
/// For an even count the two middle values are averaged and truncated
/// toward zero, so `[10, 21]` gives `15`.
pub fn median(mut values: Vec<i64>) -> i64 {
    debug_assert!(!values.is_empty());
    values.sort_unstable();

    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        let sum = i128::from(values[mid - 1]) + i128::from(values[mid]);
        // The mean of two i64 values always fits back into an i64.
        (sum / 2) as i64
    }
}
