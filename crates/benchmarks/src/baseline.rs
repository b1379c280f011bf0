// Copyright 2025 Perf Gate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Baseline documents and profile resolution.
//!
//! A baseline file holds the maximum allowed value per metric. It comes in
//! two shapes:
//!
//! ```text
//! { "open_ms": 50, "scan_ms": 400 }
//!
//! { "profiles": {
//!     "default":  { "open_ms": 50, "scan_ms": 400 },
//!     "windows":  { "open_ms": 80, "scan_ms": 650 } } }
//! ```
//!
//! The shape is decided once when the document is loaded; the presence of
//! the top-level `profiles` key selects the profile-keyed form.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Reserved top-level key marking a profile-keyed baseline.
pub const PROFILES_KEY: &str = "profiles";

/// Metric name to maximum allowed value.
pub type Ceilings = BTreeMap<String, i64>;

/// Errors raised while loading a baseline or resolving a profile.
#[derive(Debug, Error)]
pub enum BaselineError {
    /// Baseline file does not exist
    #[error("baseline file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Baseline file exists but could not be read
    #[error("failed to read baseline {}: {source}", .path.display())]
    Io {
        /// Baseline file that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Baseline file is not valid JSON
    #[error("baseline is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Document is JSON but not a baseline
    #[error("invalid baseline document: {0}")]
    Invalid(String),

    /// Requested profile is absent from a profile-keyed baseline
    #[error("baseline profile not found: {profile} (available profiles: {})", .available.join(", "))]
    ProfileNotFound {
        /// Profile that was requested.
        profile: String,
        /// Profiles the baseline defines, sorted.
        available: Vec<String>,
    },
}

/// Result type for baseline operations.
pub type Result<T> = std::result::Result<T, BaselineError>;

/// A loaded baseline document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Baseline {
    /// One set of ceilings used for every profile.
    Flat(Ceilings),
    /// Ceilings selected by profile name.
    Profiles(BTreeMap<String, Ceilings>),
}

impl Baseline {
    /// Load a baseline document from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                BaselineError::NotFound(path.to_path_buf())
            } else {
                BaselineError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        let value: Value = serde_json::from_str(&content)?;
        let baseline = Self::from_json(value)?;
        debug!(path = %path.display(), profiles = ?baseline.profile_names(), "loaded baseline");
        Ok(baseline)
    }

    /// Classify an already-parsed JSON document.
    pub fn from_json(value: Value) -> Result<Self> {
        let Value::Object(mut doc) = value else {
            return Err(BaselineError::Invalid(
                "top-level value must be an object".to_string(),
            ));
        };

        match doc.remove(PROFILES_KEY) {
            Some(Value::Object(profiles)) => {
                let profiles = profiles
                    .into_iter()
                    .map(|(name, ceilings)| {
                        let ceilings = ceilings_from_json(ceilings, Some(&name))?;
                        Ok((name, ceilings))
                    })
                    .collect::<Result<BTreeMap<_, _>>>()?;
                Ok(Self::Profiles(profiles))
            }
            Some(_) => Err(BaselineError::Invalid(format!(
                "`{PROFILES_KEY}` must map profile names to ceiling objects"
            ))),
            None => Ok(Self::Flat(ceilings_from_json(Value::Object(doc), None)?)),
        }
    }

    /// Resolve the ceilings that apply to `profile`.
    ///
    /// A flat baseline ignores the profile name entirely.
    pub fn resolve(&self, profile: &str) -> Result<&Ceilings> {
        match self {
            Self::Flat(ceilings) => Ok(ceilings),
            Self::Profiles(profiles) => {
                profiles
                    .get(profile)
                    .ok_or_else(|| BaselineError::ProfileNotFound {
                        profile: profile.to_string(),
                        available: profiles.keys().cloned().collect(),
                    })
            }
        }
    }

    /// Profile names in sorted order; empty for a flat baseline.
    pub fn profile_names(&self) -> Vec<&str> {
        match self {
            Self::Flat(_) => Vec::new(),
            Self::Profiles(profiles) => profiles.keys().map(String::as_str).collect(),
        }
    }
}

fn ceilings_from_json(value: Value, profile: Option<&str>) -> Result<Ceilings> {
    let context = match profile {
        Some(name) => format!("profile `{name}`"),
        None => "baseline".to_string(),
    };
    let Value::Object(map) = value else {
        return Err(BaselineError::Invalid(format!("{context} must be an object")));
    };

    map.into_iter()
        .map(|(key, ceiling)| match ceiling.as_i64() {
            Some(max) => Ok((key, max)),
            None => Err(BaselineError::Invalid(format!(
                "{context}: ceiling for `{key}` must be an integer, got {ceiling}"
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_flat_baseline_ignores_profile() {
        let baseline = Baseline::from_json(json!({"open_ms": 50, "scan_ms": 400})).unwrap();
        assert!(matches!(baseline, Baseline::Flat(_)));

        let default = baseline.resolve("default").unwrap().clone();
        let other = baseline.resolve("anything-else").unwrap();
        assert_eq!(&default, other);
        assert_eq!(default["scan_ms"], 400);
    }

    #[test]
    fn test_profile_lookup() {
        let baseline = Baseline::from_json(json!({
            "profiles": {
                "default": {"open_ms": 50},
                "windows": {"open_ms": 80}
            }
        }))
        .unwrap();

        assert_eq!(baseline.resolve("windows").unwrap()["open_ms"], 80);
        assert!(!baseline.resolve("default").unwrap().contains_key(PROFILES_KEY));
        assert_eq!(baseline.profile_names(), vec!["default", "windows"]);
    }

    #[test]
    fn test_missing_profile_lists_sorted_names() {
        let baseline = Baseline::from_json(json!({
            "profiles": {"zeta": {}, "alpha": {}, "mid": {}}
        }))
        .unwrap();

        let err = baseline.resolve("linux").unwrap_err();
        match &err {
            BaselineError::ProfileNotFound { profile, available } => {
                assert_eq!(profile, "linux");
                assert_eq!(available, &vec!["alpha", "mid", "zeta"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(
            err.to_string(),
            "baseline profile not found: linux (available profiles: alpha, mid, zeta)"
        );
    }

    #[test]
    fn test_profiles_key_wins_over_siblings() {
        let baseline = Baseline::from_json(json!({
            "profiles": {"default": {"a": 1}},
            "a": 99
        }))
        .unwrap();
        assert_eq!(baseline.resolve("default").unwrap()["a"], 1);
    }

    #[test]
    fn test_rejects_malformed_documents() {
        for doc in [
            json!([1, 2]),
            json!({"profiles": [1]}),
            json!({"profiles": {"default": 5}}),
            json!({"open_ms": "fast"}),
            json!({"open_ms": 1.5}),
        ] {
            let err = Baseline::from_json(doc.clone()).unwrap_err();
            assert!(matches!(err, BaselineError::Invalid(_)), "{doc} -> {err}");
        }
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let err = Baseline::load(dir.path().join("baseline.json")).unwrap_err();
        assert!(matches!(err, BaselineError::NotFound(_)));
        assert!(err.to_string().starts_with("baseline file not found: "));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("baseline.json");
        fs::write(&path, r#"{"profiles": {"ci": {"scan_ms": 900}}}"#).unwrap();

        let baseline = Baseline::load(&path).unwrap();
        assert_eq!(baseline.resolve("ci").unwrap()["scan_ms"], 900);
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("baseline.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(Baseline::load(&path), Err(BaselineError::Json(_))));
    }
}
