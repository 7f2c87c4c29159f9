//! Decision Threshold Configuration
//!
//! Cutoffs used when turning classifier output into a verdict.

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::constants::{DEFAULT_FALLBACK_CONFIDENCE, DEFAULT_POSITIVE_THRESHOLD};

/// Threshold Configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Binary: label = 1 iff P(positive) >= this
    pub positive_threshold: f64,

    /// Multi-class: confidence when the model has no probabilities
    pub fallback_confidence: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            positive_threshold: DEFAULT_POSITIVE_THRESHOLD,
            fallback_confidence: DEFAULT_FALLBACK_CONFIDENCE,
        }
    }
}

impl ThresholdConfig {
    pub fn new(positive_threshold: f64) -> Self {
        Self {
            positive_threshold,
            ..Default::default()
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            positive_threshold: config.positive_threshold,
            fallback_confidence: config.fallback_confidence,
        }
    }

    /// Inclusive at the cutoff
    pub fn is_positive(&self, probability: f64) -> bool {
        probability >= self.positive_threshold
    }
}

/// Clamp a score into [0, 1]
pub fn clamp_unit(score: f64) -> f64 {
    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_config() {
        let config = ThresholdConfig::default();
        assert_eq!(config.positive_threshold, 0.5);
        assert_eq!(config.fallback_confidence, 0.8);
    }

    #[test]
    fn test_cutoff_is_inclusive() {
        let config = ThresholdConfig::default();
        assert!(config.is_positive(0.5));
        assert!(!config.is_positive(0.4999));
        assert!(ThresholdConfig::new(0.7).is_positive(0.7));
    }

    #[test]
    fn test_from_config() {
        let cfg = Config {
            positive_threshold: 0.65,
            fallback_confidence: 0.6,
            ..Config::default()
        };
        let t = ThresholdConfig::from_config(&cfg);
        assert_eq!(t.positive_threshold, 0.65);
        assert_eq!(t.fallback_confidence, 0.6);
    }

    #[test]
    fn test_clamp_unit() {
        assert_eq!(clamp_unit(1.0000001), 1.0);
        assert_eq!(clamp_unit(-0.0), 0.0);
        assert_eq!(clamp_unit(0.25), 0.25);
    }
}
