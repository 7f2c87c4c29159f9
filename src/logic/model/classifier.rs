//! Classifier capability
//!
//! The model is opaque to the rest of the crate: it owns its class label
//! space and answers `predict` (and optionally `predict_proba`) over a batch.

use std::fmt;

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

// ============================================================================
// CLASS LABELS
// ============================================================================

/// A class identifier, integer (`0`, `1`) or text (`"HIGH"`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassLabel {
    Int(i64),
    Text(String),
}

impl ClassLabel {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ClassLabel::Int(v) => Some(*v),
            ClassLabel::Text(_) => None,
        }
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassLabel::Int(v) => write!(f, "{}", v),
            ClassLabel::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ClassLabel {
    fn from(v: i64) -> Self {
        ClassLabel::Int(v)
    }
}

impl From<&str> for ClassLabel {
    fn from(s: &str) -> Self {
        ClassLabel::Text(s.to_string())
    }
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

/// Failure inside a classifier call
#[derive(Debug, thiserror::Error)]
#[error("Inference failed: {0}")]
pub struct InferenceError(pub String);

impl InferenceError {
    pub fn new(msg: impl Into<String>) -> Self {
        InferenceError(msg.into())
    }
}

// ============================================================================
// CLASSIFIER TRAIT
// ============================================================================

/// Trait for classifier backends (linear, tree ensemble, ONNX, test fakes)
///
/// Rows of `batch` are feature vectors in schema order.
pub trait Classifier {
    /// Backend name for logs
    fn kind(&self) -> &'static str;

    /// Ordered class label space; probability columns follow this order
    fn classes(&self) -> &[ClassLabel];

    /// Hard labels, one per row
    fn predict(&self, batch: ArrayView2<'_, f64>) -> Result<Vec<ClassLabel>, InferenceError>;

    /// Class probabilities, shape `(rows, classes)`.
    /// `Ok(None)` when the backend has no probability capability.
    fn predict_proba(&self, batch: ArrayView2<'_, f64>) -> Result<Option<Array2<f64>>, InferenceError>;
}

/// Index of the largest value; first wins on ties
pub fn argmax(values: impl IntoIterator<Item = f64>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, v) in values.into_iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Check that a batch has the expected column count
pub fn check_width(batch: &ArrayView2<'_, f64>, expected: usize) -> Result<(), InferenceError> {
    if batch.ncols() != expected {
        return Err(InferenceError(format!(
            "expected {} features per row, got {}",
            expected,
            batch.ncols()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_json_shapes() {
        assert_eq!(serde_json::to_string(&ClassLabel::Int(1)).unwrap(), "1");
        assert_eq!(serde_json::to_string(&ClassLabel::from("HIGH")).unwrap(), "\"HIGH\"");

        let parsed: Vec<ClassLabel> = serde_json::from_str(r#"[0, "LOW"]"#).unwrap();
        assert_eq!(parsed, vec![ClassLabel::Int(0), ClassLabel::from("LOW")]);
    }

    #[test]
    fn test_label_display() {
        assert_eq!(ClassLabel::Int(0).to_string(), "0");
        assert_eq!(ClassLabel::from("MEDIUM").to_string(), "MEDIUM");
    }

    #[test]
    fn test_argmax() {
        assert_eq!(argmax([0.1, 0.7, 0.2]), Some(1));
        assert_eq!(argmax([0.5, 0.5]), Some(0));
        assert_eq!(argmax(Vec::<f64>::new()), None);
    }
}
