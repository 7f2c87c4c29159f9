//! Prediction Dispatcher
//!
//! Runs the classifier over a batch of vectors (one call per request, never
//! per item) and normalizes the raw output into `label + score`.

use ndarray::{Array2, ArrayView1, Axis};
use serde::Serialize;

use super::classifier::{argmax, ClassLabel, Classifier, InferenceError};
use super::threshold::{clamp_unit, ThresholdConfig};
use crate::logic::features::FeatureVector;

// ============================================================================
// POLICY
// ============================================================================

/// The positive class of a binary model
pub const POSITIVE_LABEL: ClassLabel = ClassLabel::Int(1);

/// How a verdict is derived from classifier output
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DispatchPolicy {
    /// Label = 1 iff P(class 1) >= threshold; the model's own `predict` is ignored
    Binary { threshold: f64 },
    /// Label from `predict`; score = probability of that label,
    /// or `fallback_confidence` when the model has no probabilities
    MultiClass { fallback_confidence: f64 },
}

impl DispatchPolicy {
    pub fn binary(thresholds: &ThresholdConfig) -> Self {
        DispatchPolicy::Binary { threshold: thresholds.positive_threshold }
    }

    pub fn multi_class(thresholds: &ThresholdConfig) -> Self {
        DispatchPolicy::MultiClass { fallback_confidence: thresholds.fallback_confidence }
    }

    /// Check a class space up front, at model load
    pub fn check_classes(&self, classes: &[ClassLabel]) -> Result<(), String> {
        let mut seen = std::collections::HashSet::new();
        if let Some(dup) = classes.iter().find(|c| !seen.insert(*c)) {
            return Err(format!("duplicate class '{}'", dup));
        }

        match self {
            DispatchPolicy::Binary { .. } => {
                if classes.len() != 2 || !classes.contains(&POSITIVE_LABEL) {
                    return Err(format!(
                        "binary policy needs classes {{0, 1}}, artifact has [{}]",
                        join(classes)
                    ));
                }
            }
            DispatchPolicy::MultiClass { .. } => {
                if classes.len() < 2 {
                    return Err(format!("multi-class policy needs at least two classes, artifact has [{}]", join(classes)));
                }
            }
        }
        Ok(())
    }
}

fn join(classes: &[ClassLabel]) -> String {
    classes.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

// ============================================================================
// RESULT
// ============================================================================

/// Hard label plus the probability assigned to that label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub label: ClassLabel,
    /// In [0, 1]
    pub score: f64,
}

// ============================================================================
// DISPATCHER
// ============================================================================

pub struct Dispatcher<'a> {
    classifier: &'a dyn Classifier,
    policy: DispatchPolicy,
}

impl<'a> Dispatcher<'a> {
    pub fn new(classifier: &'a dyn Classifier, policy: DispatchPolicy) -> Self {
        Self { classifier, policy }
    }

    pub fn policy(&self) -> DispatchPolicy {
        self.policy
    }

    pub fn predict_one(&self, vector: &FeatureVector) -> Result<PredictionResult, InferenceError> {
        self.predict_batch(std::slice::from_ref(vector))?
            .pop()
            .ok_or_else(|| InferenceError::new("classifier returned no result"))
    }

    pub fn predict_batch(&self, vectors: &[FeatureVector]) -> Result<Vec<PredictionResult>, InferenceError> {
        if vectors.is_empty() {
            return Ok(Vec::new());
        }

        let batch = to_matrix(vectors)?;
        log::debug!(
            "dispatching {} row(s) to {} ({:?})",
            batch.nrows(),
            self.classifier.kind(),
            self.policy
        );

        let results = match self.policy {
            DispatchPolicy::Binary { threshold } => self.binary(&batch, threshold)?,
            DispatchPolicy::MultiClass { fallback_confidence } => self.multi_class(&batch, fallback_confidence)?,
        };

        if results.len() != vectors.len() {
            return Err(InferenceError(format!(
                "expected {} results, classifier produced {}",
                vectors.len(),
                results.len()
            )));
        }
        Ok(results)
    }

    fn binary(&self, batch: &Array2<f64>, threshold: f64) -> Result<Vec<PredictionResult>, InferenceError> {
        let classes = self.classifier.classes();
        let positive = classes
            .iter()
            .position(|c| *c == POSITIVE_LABEL)
            .ok_or_else(|| InferenceError::new("classifier has no positive class"))?;

        let proba = self
            .classifier
            .predict_proba(batch.view())?
            .ok_or_else(|| InferenceError::new("classifier exposes no probability estimates"))?;
        check_proba_shape(&proba, batch.nrows(), classes.len())?;

        let cutoff = ThresholdConfig::new(threshold);
        proba
            .column(positive)
            .iter()
            .map(|&p| {
                let p = finite(p)?;
                let label = i64::from(cutoff.is_positive(p));
                Ok(PredictionResult { label: ClassLabel::Int(label), score: clamp_unit(p) })
            })
            .collect()
    }

    fn multi_class(&self, batch: &Array2<f64>, fallback_confidence: f64) -> Result<Vec<PredictionResult>, InferenceError> {
        let labels = self.classifier.predict(batch.view())?;
        if labels.len() != batch.nrows() {
            return Err(InferenceError(format!(
                "predict returned {} labels for {} rows",
                labels.len(),
                batch.nrows()
            )));
        }

        let Some(proba) = self.classifier.predict_proba(batch.view())? else {
            return Ok(labels
                .into_iter()
                .map(|label| PredictionResult { label, score: clamp_unit(fallback_confidence) })
                .collect());
        };

        let classes = self.classifier.classes();
        check_proba_shape(&proba, batch.nrows(), classes.len())?;

        labels
            .into_iter()
            .zip(proba.axis_iter(Axis(0)))
            .map(|(label, row)| {
                let score = label_probability(classes, &label, row)?;
                Ok(PredictionResult { label, score: clamp_unit(score) })
            })
            .collect()
    }
}

/// Probability of `label` via the class order; falls back to the row max
/// when the label is not in the class list.
fn label_probability(classes: &[ClassLabel], label: &ClassLabel, row: ArrayView1<'_, f64>) -> Result<f64, InferenceError> {
    let idx = match classes.iter().position(|c| c == label) {
        Some(idx) => idx,
        None => {
            log::warn!("predicted label '{}' not in class list, using max probability", label);
            argmax(row.iter().copied()).ok_or_else(|| InferenceError::new("empty probability row"))?
        }
    };
    finite(row[idx])
}

fn finite(p: f64) -> Result<f64, InferenceError> {
    if p.is_finite() {
        Ok(p)
    } else {
        Err(InferenceError(format!("non-finite probability {}", p)))
    }
}

fn check_proba_shape(proba: &Array2<f64>, rows: usize, classes: usize) -> Result<(), InferenceError> {
    if proba.dim() != (rows, classes) {
        return Err(InferenceError(format!(
            "probability output has shape {:?}, expected ({}, {})",
            proba.dim(),
            rows,
            classes
        )));
    }
    Ok(())
}

/// Stack vectors into one `(rows, features)` matrix
fn to_matrix(vectors: &[FeatureVector]) -> Result<Array2<f64>, InferenceError> {
    let width = vectors[0].len();
    if let Some((i, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != width || v.layout_hash != vectors[0].layout_hash) {
        return Err(InferenceError(format!(
            "vector {} has {} features under layout {:08x}, expected {} under {:08x}",
            i,
            v.len(),
            v.layout_hash,
            width,
            vectors[0].layout_hash
        )));
    }

    let flat: Vec<f64> = vectors.iter().flat_map(|v| v.values.iter().copied()).collect();
    Array2::from_shape_vec((vectors.len(), width), flat).map_err(|e| InferenceError(format!("Array error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::ArrayView2;
    use std::cell::Cell;

    /// Scripted classifier: proba rows = first feature as P(class 1)
    struct FakeBinary {
        classes: Vec<ClassLabel>,
        calls: Cell<usize>,
    }

    impl FakeBinary {
        fn new() -> Self {
            Self { classes: vec![ClassLabel::Int(0), ClassLabel::Int(1)], calls: Cell::new(0) }
        }
    }

    impl Classifier for FakeBinary {
        fn kind(&self) -> &'static str {
            "fake_binary"
        }

        fn classes(&self) -> &[ClassLabel] {
            &self.classes
        }

        fn predict(&self, batch: ArrayView2<'_, f64>) -> Result<Vec<ClassLabel>, InferenceError> {
            // Always 0: the binary policy must not consult it
            Ok(vec![ClassLabel::Int(0); batch.nrows()])
        }

        fn predict_proba(&self, batch: ArrayView2<'_, f64>) -> Result<Option<Array2<f64>>, InferenceError> {
            self.calls.set(self.calls.get() + 1);
            let mut proba = Array2::zeros((batch.nrows(), 2));
            for (i, row) in batch.axis_iter(Axis(0)).enumerate() {
                proba[[i, 0]] = 1.0 - row[0];
                proba[[i, 1]] = row[0];
            }
            Ok(Some(proba))
        }
    }

    /// Multi-class fake with configurable probability behavior
    struct FakeRisk {
        classes: Vec<ClassLabel>,
        label: ClassLabel,
        proba: Option<Vec<f64>>,
    }

    impl Classifier for FakeRisk {
        fn kind(&self) -> &'static str {
            "fake_risk"
        }

        fn classes(&self) -> &[ClassLabel] {
            &self.classes
        }

        fn predict(&self, batch: ArrayView2<'_, f64>) -> Result<Vec<ClassLabel>, InferenceError> {
            Ok(vec![self.label.clone(); batch.nrows()])
        }

        fn predict_proba(&self, batch: ArrayView2<'_, f64>) -> Result<Option<Array2<f64>>, InferenceError> {
            Ok(self.proba.as_ref().map(|row| {
                let mut proba = Array2::zeros((batch.nrows(), row.len()));
                for mut r in proba.axis_iter_mut(Axis(0)) {
                    r.assign(&ndarray::ArrayView1::from(row.as_slice()));
                }
                proba
            }))
        }
    }

    fn risk_classes() -> Vec<ClassLabel> {
        vec![ClassLabel::from("HIGH"), ClassLabel::from("LOW"), ClassLabel::from("MEDIUM")]
    }

    fn vector(values: Vec<f64>) -> FeatureVector {
        FeatureVector { version: 1, layout_hash: 7, values }
    }

    const BINARY: DispatchPolicy = DispatchPolicy::Binary { threshold: 0.5 };
    const MULTI: DispatchPolicy = DispatchPolicy::MultiClass { fallback_confidence: 0.8 };

    #[test]
    fn test_binary_label_follows_threshold() {
        let fake = FakeBinary::new();
        let dispatcher = Dispatcher::new(&fake, BINARY);

        let results = dispatcher
            .predict_batch(&[vector(vec![0.2]), vector(vec![0.5]), vector(vec![0.93])])
            .unwrap();

        assert_eq!(results[0], PredictionResult { label: ClassLabel::Int(0), score: 0.2 });
        assert_eq!(results[1], PredictionResult { label: ClassLabel::Int(1), score: 0.5 });
        assert_eq!(results[2], PredictionResult { label: ClassLabel::Int(1), score: 0.93 });
    }

    #[test]
    fn test_binary_batch_is_one_call() {
        let fake = FakeBinary::new();
        let dispatcher = Dispatcher::new(&fake, BINARY);
        let vectors: Vec<_> = (0..10).map(|i| vector(vec![i as f64 / 10.0])).collect();

        let results = dispatcher.predict_batch(&vectors).unwrap();
        assert_eq!(results.len(), 10);
        assert_eq!(fake.calls.get(), 1);

        for (i, r) in results.iter().enumerate() {
            assert_eq!(r.score, i as f64 / 10.0);
            assert_eq!(r.label == ClassLabel::Int(1), r.score >= 0.5);
        }
    }

    #[test]
    fn test_empty_batch_skips_classifier() {
        let fake = FakeBinary::new();
        let results = Dispatcher::new(&fake, BINARY).predict_batch(&[]).unwrap();
        assert!(results.is_empty());
        assert_eq!(fake.calls.get(), 0);
    }

    #[test]
    fn test_binary_custom_threshold() {
        let fake = FakeBinary::new();
        let dispatcher = Dispatcher::new(&fake, DispatchPolicy::Binary { threshold: 0.7 });
        let r = dispatcher.predict_one(&vector(vec![0.6])).unwrap();
        assert_eq!(r.label, ClassLabel::Int(0));
    }

    #[test]
    fn test_binary_requires_proba() {
        let fake = FakeRisk {
            classes: vec![ClassLabel::Int(0), ClassLabel::Int(1)],
            label: ClassLabel::Int(1),
            proba: None,
        };
        let err = Dispatcher::new(&fake, BINARY).predict_one(&vector(vec![1.0])).unwrap_err();
        assert!(err.to_string().contains("no probability"));
    }

    #[test]
    fn test_binary_non_finite_probability() {
        let fake = FakeBinary::new();
        let err = Dispatcher::new(&fake, BINARY).predict_one(&vector(vec![f64::NAN])).unwrap_err();
        assert!(err.to_string().contains("non-finite"));
    }

    #[test]
    fn test_multi_class_uses_predicted_label_probability() {
        let fake = FakeRisk {
            classes: risk_classes(),
            label: ClassLabel::from("MEDIUM"),
            // MEDIUM is not the max: confidence is still its own mass
            proba: Some(vec![0.5, 0.1, 0.4]),
        };
        let r = Dispatcher::new(&fake, MULTI).predict_one(&vector(vec![0.0])).unwrap();
        assert_eq!(r.label, ClassLabel::from("MEDIUM"));
        assert_eq!(r.score, 0.4);
    }

    #[test]
    fn test_multi_class_unknown_label_falls_back_to_max() {
        let fake = FakeRisk {
            classes: risk_classes(),
            label: ClassLabel::from("CRITICAL"),
            proba: Some(vec![0.2, 0.7, 0.1]),
        };
        let r = Dispatcher::new(&fake, MULTI).predict_one(&vector(vec![0.0])).unwrap();
        assert_eq!(r.label, ClassLabel::from("CRITICAL"));
        assert_eq!(r.score, 0.7);
    }

    #[test]
    fn test_multi_class_without_proba_uses_placeholder() {
        let fake = FakeRisk { classes: risk_classes(), label: ClassLabel::from("LOW"), proba: None };
        let r = Dispatcher::new(&fake, MULTI).predict_one(&vector(vec![0.0])).unwrap();
        assert_eq!(r.score, 0.8);
    }

    #[test]
    fn test_multi_class_bad_proba_shape() {
        let fake = FakeRisk {
            classes: risk_classes(),
            label: ClassLabel::from("LOW"),
            proba: Some(vec![0.5, 0.5]),
        };
        let err = Dispatcher::new(&fake, MULTI).predict_one(&vector(vec![0.0])).unwrap_err();
        assert!(err.to_string().contains("shape"));
    }

    #[test]
    fn test_mixed_vector_widths_rejected() {
        let fake = FakeBinary::new();
        let err = Dispatcher::new(&fake, BINARY)
            .predict_batch(&[vector(vec![0.1]), vector(vec![0.1, 0.2])])
            .unwrap_err();
        assert!(err.to_string().contains("vector 1"));
    }

    #[test]
    fn test_check_classes() {
        assert!(BINARY.check_classes(&[ClassLabel::Int(0), ClassLabel::Int(1)]).is_ok());
        assert!(BINARY.check_classes(&risk_classes()).is_err());
        assert!(BINARY.check_classes(&[ClassLabel::Int(0), ClassLabel::Int(2)]).is_err());
        assert!(MULTI.check_classes(&risk_classes()).is_ok());
        assert!(MULTI.check_classes(&[ClassLabel::from("LOW")]).is_err());
        assert!(MULTI
            .check_classes(&[ClassLabel::from("LOW"), ClassLabel::from("LOW")])
            .is_err());
    }
}
