//! Configuration module

use std::env;
use std::path::{Path, PathBuf};

use crate::constants::*;

/// What the process exit status says when an error document was written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorExit {
    /// Non-zero exit status (default)
    Failure,
    /// Always exit 0; callers must inspect the `error` field
    Success,
}

impl ErrorExit {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "failure" | "fail" | "1" => Some(ErrorExit::Failure),
            "success" | "ok" | "0" => Some(ErrorExit::Success),
            _ => None,
        }
    }
}

/// Per-pipeline artifact location overrides
#[derive(Debug, Clone, Default)]
pub struct ArtifactOverrides {
    /// Explicit artifact path
    pub path: Option<PathBuf>,

    /// Expected SHA-256 of the artifact bytes (hex)
    pub sha256: Option<String>,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the artifacts (None = next to the executable)
    pub model_dir: Option<PathBuf>,

    pub assignment: ArtifactOverrides,

    pub risk: ArtifactOverrides,

    /// Exit convention on error
    pub error_exit: ErrorExit,

    /// Binary decision threshold
    pub positive_threshold: f64,

    /// Confidence used when the multi-class model has no probabilities
    pub fallback_confidence: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_dir: None,
            assignment: ArtifactOverrides::default(),
            risk: ArtifactOverrides::default(),
            error_exit: ErrorExit::Failure,
            positive_threshold: DEFAULT_POSITIVE_THRESHOLD,
            fallback_confidence: DEFAULT_FALLBACK_CONFIDENCE,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let error_exit = match non_empty(ENV_ERROR_EXIT) {
            Some(raw) => ErrorExit::parse(&raw).unwrap_or_else(|| {
                log::warn!("{}={:?} not recognised, using 'failure'", ENV_ERROR_EXIT, raw);
                ErrorExit::Failure
            }),
            None => ErrorExit::Failure,
        };

        let positive_threshold = parse_ranged(
            ENV_ASSIGNMENT_THRESHOLD,
            non_empty(ENV_ASSIGNMENT_THRESHOLD),
            DEFAULT_POSITIVE_THRESHOLD,
            |t| t > 0.0 && t < 1.0,
        );

        let fallback_confidence = parse_ranged(
            ENV_RISK_FALLBACK_CONFIDENCE,
            non_empty(ENV_RISK_FALLBACK_CONFIDENCE),
            DEFAULT_FALLBACK_CONFIDENCE,
            |c| (0.0..=1.0).contains(&c),
        );

        Self {
            model_dir: non_empty(ENV_MODEL_DIR).map(PathBuf::from),
            assignment: ArtifactOverrides {
                path: non_empty(ENV_ASSIGNMENT_MODEL_PATH).map(PathBuf::from),
                sha256: non_empty(ENV_ASSIGNMENT_MODEL_SHA256),
            },
            risk: ArtifactOverrides {
                path: non_empty(ENV_RISK_MODEL_PATH).map(PathBuf::from),
                sha256: non_empty(ENV_RISK_MODEL_SHA256),
            },
            error_exit,
            positive_threshold,
            fallback_confidence,
        }
    }

    /// Resolve where an artifact file lives.
    ///
    /// Explicit path wins, then `model_dir`, then the executable's directory.
    pub fn artifact_path(&self, overrides: &ArtifactOverrides, file_name: &str) -> PathBuf {
        if let Some(path) = &overrides.path {
            return path.clone();
        }

        let base = match &self.model_dir {
            Some(dir) => dir.clone(),
            None => executable_dir(),
        };
        base.join(file_name)
    }
}

fn parse_ranged(key: &str, raw: Option<String>, default: f64, valid: impl Fn(f64) -> bool) -> f64 {
    let Some(raw) = raw else {
        return default;
    };

    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && valid(value) => value,
        _ => {
            log::warn!("{}={:?} is out of range, using {}", key, raw, default);
            default
        }
    }
}

fn executable_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.error_exit, ErrorExit::Failure);
        assert_eq!(config.positive_threshold, 0.5);
        assert_eq!(config.fallback_confidence, 0.8);
        assert!(config.model_dir.is_none());
        assert!(config.assignment.path.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            (ENV_MODEL_DIR, "/opt/models"),
            (ENV_RISK_MODEL_PATH, "/tmp/risk.json"),
            (ENV_ERROR_EXIT, "success"),
            (ENV_ASSIGNMENT_THRESHOLD, "0.6"),
            (ENV_RISK_FALLBACK_CONFIDENCE, "0.5"),
        ]));

        assert_eq!(config.error_exit, ErrorExit::Success);
        assert_eq!(config.positive_threshold, 0.6);
        assert_eq!(config.fallback_confidence, 0.5);
        assert_eq!(
            config.artifact_path(&config.assignment, "assignment_model.json"),
            PathBuf::from("/opt/models/assignment_model.json")
        );
        assert_eq!(
            config.artifact_path(&config.risk, "risk_model.json"),
            PathBuf::from("/tmp/risk.json")
        );
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = Config::from_lookup(lookup_from(&[
            (ENV_ERROR_EXIT, "sometimes"),
            (ENV_ASSIGNMENT_THRESHOLD, "1.5"),
            (ENV_RISK_FALLBACK_CONFIDENCE, "abc"),
        ]));

        assert_eq!(config.error_exit, ErrorExit::Failure);
        assert_eq!(config.positive_threshold, DEFAULT_POSITIVE_THRESHOLD);
        assert_eq!(config.fallback_confidence, DEFAULT_FALLBACK_CONFIDENCE);
    }

    #[test]
    fn test_default_dir_is_executable_dir() {
        let config = Config::default();
        let path = config.artifact_path(&config.risk, "risk_model.json");
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("risk_model.json"));
    }
}
