// Copyright 2025 Perf Gate Contributors
// SPDX-License-Identifier: Apache-2.0

//! I/O operations for gate reports.
//!
//! Reports are written as indented UTF-8 JSON, overwriting whatever is at
//! the target path. Parent directories are created on demand. There is no
//! locking; two gates writing the same path race.

use crate::report::RunReport;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

/// Default run report path.
pub const DEFAULT_REPORT_PATH: &str = "perf/latest-report.json";

/// Default delta report path.
pub const DEFAULT_DELTA_REPORT_PATH: &str = "perf/latest-delta-report.json";

/// Default baseline path.
pub const DEFAULT_BASELINE_PATH: &str = "perf/baseline.json";

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: impl AsRef<Path>) -> io::Result<()> {
    match path.as_ref().parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Write any serializable document as pretty JSON.
pub fn write_json<T: Serialize + ?Sized>(value: &T, path: impl AsRef<Path>) -> io::Result<()> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    fs::write(path, json)?;
    debug!(path = %path.display(), "wrote report");
    Ok(())
}

/// Read a run report written by [`write_json`].
pub fn read_run_report(path: impl AsRef<Path>) -> io::Result<RunReport> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| io::Error::new(io::ErrorKind::Other, e))
}

/// Load a previous report as untyped JSON, best-effort.
///
/// Any read or parse failure is logged and treated as "no previous report";
/// the delta engine decides whether the document is structurally usable.
pub fn load_previous_report(path: impl AsRef<Path>) -> Option<Value> {
    let path = path.as_ref();
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "previous report unavailable");
            return None;
        }
    };

    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "previous report is not valid JSON");
            None
        }
    }
}
