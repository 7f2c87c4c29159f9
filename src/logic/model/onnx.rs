//! ONNX Runtime backend
//!
//! Runs a classifier graph exported without the ZipMap post-processor:
//! float32 input `[N, F]`, label output `[N]` (int64 or string) and an
//! optional probability output `[N, K]` in class order.

use std::cell::RefCell;
use std::path::Path;

use ndarray::{Array2, ArrayView2};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;

use super::artifact::OnnxParams;
use super::classifier::{check_width, ClassLabel, Classifier, InferenceError};
use crate::error::ArtifactLoadError;

pub struct OnnxClassifier {
    // `run` needs `&mut Session`; single consumer per process
    session: RefCell<Session>,
    classes: Vec<ClassLabel>,
    n_features: usize,
    label_output: String,
    probability_output: Option<String>,
    text_labels: bool,
}

impl OnnxClassifier {
    pub fn load(
        path: &Path,
        params: &OnnxParams,
        classes: Vec<ClassLabel>,
        n_features: usize,
    ) -> Result<Self, ArtifactLoadError> {
        log::info!("Loading ONNX graph from: {}", path.display());

        if !path.exists() {
            return Err(ArtifactLoadError::NotFound(path.to_path_buf()));
        }

        let session = Session::builder()
            .map_err(|e| ArtifactLoadError::Backend(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| ArtifactLoadError::Backend(format!("Failed to set optimization: {}", e)))?
            .commit_from_file(path)
            .map_err(|e| ArtifactLoadError::Backend(format!("Failed to load model: {}", e)))?;

        let declared: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();
        let wanted = std::iter::once(&params.label_output).chain(params.probability_output.as_ref());
        for name in wanted {
            if !declared.contains(name) {
                return Err(ArtifactLoadError::invalid(format!(
                    "graph has no output '{}' (outputs: {})",
                    name,
                    declared.join(", ")
                )));
            }
        }

        let text_labels = classes.iter().any(|c| matches!(c, ClassLabel::Text(_)));

        Ok(Self {
            session: RefCell::new(session),
            classes,
            n_features,
            label_output: params.label_output.clone(),
            probability_output: params.probability_output.clone(),
            text_labels,
        })
    }

    /// One graph run yields both outputs
    fn run(&self, batch: ArrayView2<'_, f64>, want_proba: bool) -> Result<(Vec<ClassLabel>, Option<Array2<f64>>), InferenceError> {
        check_width(&batch, self.n_features)?;
        let rows = batch.nrows();

        let input: Array2<f32> = batch.mapv(|v| v as f32);
        let input_tensor = Value::from_array(input).map_err(|e| InferenceError(format!("Tensor error: {}", e)))?;

        let mut session = self.session.borrow_mut();
        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| InferenceError(format!("ONNX run failed: {}", e)))?;

        let label_value = outputs
            .get(self.label_output.as_str())
            .ok_or_else(|| InferenceError(format!("No output '{}'", self.label_output)))?;

        let labels: Vec<ClassLabel> = if self.text_labels {
            let (_, data) = label_value
                .try_extract_strings()
                .map_err(|e| InferenceError(format!("Extract error: {}", e)))?;
            data.into_iter().map(ClassLabel::Text).collect()
        } else {
            let (_, data) = label_value
                .try_extract_tensor::<i64>()
                .map_err(|e| InferenceError(format!("Extract error: {}", e)))?;
            data.iter().copied().map(ClassLabel::Int).collect()
        };

        if labels.len() != rows {
            return Err(InferenceError(format!("label output has {} entries for {} rows", labels.len(), rows)));
        }

        let proba = match (&self.probability_output, want_proba) {
            (Some(name), true) => {
                let value = outputs
                    .get(name.as_str())
                    .ok_or_else(|| InferenceError(format!("No output '{}'", name)))?;
                let (_, data) = value
                    .try_extract_tensor::<f32>()
                    .map_err(|e| InferenceError(format!("Extract error: {}", e)))?;

                let flat: Vec<f64> = data.iter().map(|&p| f64::from(p)).collect();
                let proba = Array2::from_shape_vec((rows, self.classes.len()), flat)
                    .map_err(|e| InferenceError(format!("Array error: {}", e)))?;
                Some(proba)
            }
            _ => None,
        };

        Ok((labels, proba))
    }
}

impl Classifier for OnnxClassifier {
    fn kind(&self) -> &'static str {
        "onnx"
    }

    fn classes(&self) -> &[ClassLabel] {
        &self.classes
    }

    fn predict(&self, batch: ArrayView2<'_, f64>) -> Result<Vec<ClassLabel>, InferenceError> {
        self.run(batch, false).map(|(labels, _)| labels)
    }

    fn predict_proba(&self, batch: ArrayView2<'_, f64>) -> Result<Option<Array2<f64>>, InferenceError> {
        if self.probability_output.is_none() {
            return Ok(None);
        }
        self.run(batch, true).map(|(_, proba)| proba)
    }
}
