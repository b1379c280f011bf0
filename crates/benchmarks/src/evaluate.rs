// Copyright 2025 Perf Gate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Ceiling checks against aggregated metrics.

use crate::baseline::Ceilings;
use crate::metric::MetricMap;
use serde::{Deserialize, Serialize};

/// Outcome of checking metrics against baseline ceilings.
///
/// A regression is a normal outcome, not an error: callers map
/// `ok == false` onto a failing exit status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// True iff `failures` is empty.
    pub ok: bool,
    /// Human-readable violations, in ceiling key order.
    #[serde(rename = "failed")]
    pub failures: Vec<String>,
}

impl Verdict {
    fn from_failures(failures: Vec<String>) -> Self {
        Self {
            ok: failures.is_empty(),
            failures,
        }
    }
}

/// Compare `metrics` against every ceiling in `ceilings`.
///
/// A ceiling whose metric is absent or not an integer is reported as
/// `missing metric: K`; a value strictly above its ceiling as
/// `K: value > ceiling`. Metrics without a ceiling never fail.
pub fn evaluate(ceilings: &Ceilings, metrics: &MetricMap) -> Verdict {
    let failures = ceilings
        .iter()
        .filter_map(|(key, &max_allowed)| {
            match metrics.get(key).and_then(|v| v.as_integer()) {
                None => Some(format!("missing metric: {key}")),
                Some(value) if value > max_allowed => {
                    Some(format!("{key}: {value} > {max_allowed}"))
                }
                Some(_) => None,
            }
        })
        .collect();

    Verdict::from_failures(failures)
}
