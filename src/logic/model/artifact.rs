//! Model artifact manifest
//!
//! One JSON document per pipeline: embedded feature layout, class space and
//! the model body. Built by the training side, read-only here.

use serde::{Deserialize, Serialize};

use super::classifier::ClassLabel;
use crate::logic::features::layout::LayoutInfo;

// ============================================================================
// MANIFEST
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub format_version: u32,

    /// Layout the model was trained with
    pub schema: LayoutInfo,

    /// Ordered class space (probability column order)
    pub classes: Vec<ClassLabel>,

    pub model: ModelSpec,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trained_at: Option<String>,
}

/// Model body, tagged by `type`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelSpec {
    LogisticRegression(LogisticParams),
    LinearSvc(LinearParams),
    RandomForest(ForestParams),
    Onnx(OnnxParams),
}

impl ModelSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            ModelSpec::LogisticRegression(_) => "logistic_regression",
            ModelSpec::LinearSvc(_) => "linear_svc",
            ModelSpec::RandomForest(_) => "random_forest",
            ModelSpec::Onnx(_) => "onnx",
        }
    }
}

// ============================================================================
// LINEAR MODELS
// ============================================================================

/// Standardization applied before the linear map: `(x - mean) / scale`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalerParams {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

/// Decision-function-only linear model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearParams {
    /// One row for binary, one row per class otherwise
    pub coef: Vec<Vec<f64>>,
    pub intercept: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaler: Option<ScalerParams>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiClass {
    /// Softmax over class scores
    #[default]
    Multinomial,
    /// Per-class sigmoid, normalized
    Ovr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticParams {
    pub coef: Vec<Vec<f64>>,
    pub intercept: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaler: Option<ScalerParams>,
    #[serde(default)]
    pub multi_class: MultiClass,
}

// ============================================================================
// TREE ENSEMBLE
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestParams {
    pub trees: Vec<TreeParams>,
}

/// Pre-order node list, root first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeParams {
    pub nodes: Vec<TreeNode>,
}

/// Split node (`feature`, `threshold`, `left`, `right`) or leaf (`value`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TreeNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<usize>,
    #[serde(default)]
    pub threshold: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<usize>,
    /// Per-class counts or weights at a leaf
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub value: Vec<f64>,
}

// ============================================================================
// ONNX
// ============================================================================

/// External ONNX graph exported without the ZipMap post-processor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnnxParams {
    /// Relative to the manifest's directory
    pub path: String,
    #[serde(default = "default_label_output")]
    pub label_output: String,
    /// `null` disables the probability capability
    #[serde(default = "default_probability_output")]
    pub probability_output: Option<String>,
    /// Optional SHA-256 pin for the graph file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

fn default_label_output() -> String {
    "output_label".to_string()
}

fn default_probability_output() -> Option<String> {
    Some("output_probability".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_logistic_manifest() {
        let raw = r#"{
            "format_version": 1,
            "schema": {"name": "toy", "version": 1, "features": ["a", "b"]},
            "classes": [0, 1],
            "model": {"type": "logistic_regression", "coef": [[1.0, -1.0]], "intercept": [0.5]}
        }"#;

        let manifest: ArtifactManifest = serde_json::from_str(raw).unwrap();
        assert_eq!(manifest.classes, vec![ClassLabel::Int(0), ClassLabel::Int(1)]);
        assert_eq!(manifest.model.kind(), "logistic_regression");

        match manifest.model {
            ModelSpec::LogisticRegression(p) => {
                assert_eq!(p.multi_class, MultiClass::Multinomial);
                assert!(p.scaler.is_none());
            }
            other => panic!("unexpected model {:?}", other),
        }
    }

    #[test]
    fn test_parse_onnx_defaults() {
        let raw = r#"{"type": "onnx", "path": "risk.onnx"}"#;
        let spec: ModelSpec = serde_json::from_str(raw).unwrap();

        match spec {
            ModelSpec::Onnx(p) => {
                assert_eq!(p.label_output, "output_label");
                assert_eq!(p.probability_output.as_deref(), Some("output_probability"));
            }
            other => panic!("unexpected model {:?}", other),
        }
    }

    #[test]
    fn test_parse_leaf_node() {
        let node: TreeNode = serde_json::from_str(r#"{"value": [3, 1]}"#).unwrap();
        assert!(node.feature.is_none());
        assert_eq!(node.value, vec![3.0, 1.0]);
    }

    #[test]
    fn test_unknown_model_type_rejected() {
        let raw = r#"{"type": "svm_rbf", "coef": []}"#;
        assert!(serde_json::from_str::<ModelSpec>(raw).is_err());
    }
}
