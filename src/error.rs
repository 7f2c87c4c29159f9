//! Error handling
//!
//! Two families: `PredictError` for everything between reading stdin and
//! writing the verdict (always rendered as `{"error": ...}`), and
//! `ArtifactLoadError` for startup, which never reaches the response path.

use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

use crate::logic::features::layout::LayoutMismatchError;
use crate::logic::model::classifier::InferenceError;

pub type PredictResult<T> = Result<T, PredictError>;

// ============================================================================
// REQUEST PATH
// ============================================================================

#[derive(Debug, Error)]
pub enum PredictError {
    /// Input channel was empty or whitespace-only
    #[error("Empty stdin")]
    EmptyInput,

    /// Reading the input channel failed
    #[error("Failed to read input: {0}")]
    Input(#[from] std::io::Error),

    /// Not JSON, wrong top-level shape, or a property of the wrong JSON type
    #[error("{0}")]
    MalformedRequest(String),

    /// Strict schema: required key absent
    #[error("Missing required feature: '{0}'")]
    MissingFeature(String),

    /// Strict schema: value is not a number
    #[error("Feature '{key}' must be numeric, got: {value}")]
    InvalidFeatureType { key: String, value: Value },

    /// Lenient schema: value could not be cast to float
    #[error("Cannot convert feature '{key}' to float: {value}")]
    NumericConversion { key: String, value: Value },

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl PredictError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        PredictError::MalformedRequest(msg.into())
    }

    /// Short machine-friendly name, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            PredictError::EmptyInput => "empty_input",
            PredictError::Input(_) => "input",
            PredictError::MalformedRequest(_) => "malformed_request",
            PredictError::MissingFeature(_) => "missing_feature",
            PredictError::InvalidFeatureType { .. } => "invalid_feature_type",
            PredictError::NumericConversion { .. } => "numeric_conversion",
            PredictError::Inference(_) => "inference",
        }
    }
}

// ============================================================================
// STARTUP PATH
// ============================================================================

#[derive(Debug, Error)]
pub enum ArtifactLoadError {
    #[error("Model not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read model {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt model artifact: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Unsupported artifact format v{found} (expected v{expected})")]
    UnsupportedFormat { expected: u32, found: u32 },

    #[error("Model checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error(transparent)]
    LayoutMismatch(#[from] LayoutMismatchError),

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Model backend unavailable: {0}")]
    Backend(String),
}

impl ArtifactLoadError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        ArtifactLoadError::InvalidModel(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_messages() {
        assert_eq!(PredictError::EmptyInput.to_string(), "Empty stdin");
        assert_eq!(
            PredictError::MissingFeature("bugsOpen".into()).to_string(),
            "Missing required feature: 'bugsOpen'"
        );
        assert_eq!(
            PredictError::InvalidFeatureType { key: "teamChanges".into(), value: json!("two") }.to_string(),
            "Feature 'teamChanges' must be numeric, got: \"two\""
        );
        assert_eq!(
            PredictError::NumericConversion { key: "taskEffort".into(), value: json!(null) }.to_string(),
            "Cannot convert feature 'taskEffort' to float: null"
        );
    }

    #[test]
    fn test_inference_is_transparent() {
        let err: PredictError = InferenceError("shape mismatch".into()).into();
        assert_eq!(err.to_string(), "Inference failed: shape mismatch");
        assert_eq!(err.kind(), "inference");
    }
}
