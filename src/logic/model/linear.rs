//! Linear classifiers
//!
//! Logistic regression (binary sigmoid, multinomial softmax or one-vs-rest)
//! and decision-function-only linear SVC.

use ndarray::{Array1, Array2, ArrayView2, Axis};

use super::artifact::{LinearParams, LogisticParams, MultiClass, ScalerParams};
use super::classifier::{argmax, check_width, ClassLabel, Classifier, InferenceError};
use crate::error::ArtifactLoadError;

// ============================================================================
// SHARED LINEAR MAP
// ============================================================================

#[derive(Debug, Clone)]
struct Scaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

/// `z = ((x - mean) / scale) · coefᵀ + intercept`
#[derive(Debug, Clone)]
struct LinearMap {
    coef: Array2<f64>,
    intercept: Array1<f64>,
    scaler: Option<Scaler>,
}

impl LinearMap {
    fn build(
        coef: &[Vec<f64>],
        intercept: &[f64],
        scaler: Option<&ScalerParams>,
        n_features: usize,
    ) -> Result<Self, ArtifactLoadError> {
        if coef.is_empty() {
            return Err(ArtifactLoadError::invalid("coef has no rows"));
        }
        if intercept.len() != coef.len() {
            return Err(ArtifactLoadError::invalid(format!(
                "intercept has {} entries for {} coef rows",
                intercept.len(),
                coef.len()
            )));
        }
        if let Some(row) = coef.iter().position(|r| r.len() != n_features) {
            return Err(ArtifactLoadError::invalid(format!(
                "coef row {} has {} weights, schema has {} features",
                row,
                coef[row].len(),
                n_features
            )));
        }

        let flat: Vec<f64> = coef.iter().flatten().copied().collect();
        if flat.iter().chain(intercept).any(|v| !v.is_finite()) {
            return Err(ArtifactLoadError::invalid("non-finite weight"));
        }

        let coef = Array2::from_shape_vec((coef.len(), n_features), flat)
            .map_err(|e| ArtifactLoadError::invalid(format!("coef shape: {}", e)))?;

        let scaler = match scaler {
            Some(s) => {
                if s.mean.len() != n_features || s.scale.len() != n_features {
                    return Err(ArtifactLoadError::invalid("scaler length differs from feature count"));
                }
                // Zero-variance columns pass through unscaled
                let scale = s.scale.iter().map(|&v| if v == 0.0 { 1.0 } else { v }).collect();
                Some(Scaler {
                    mean: Array1::from(s.mean.clone()),
                    scale: Array1::from_vec(scale),
                })
            }
            None => None,
        };

        Ok(Self {
            coef,
            intercept: Array1::from(intercept.to_vec()),
            scaler,
        })
    }

    fn rows(&self) -> usize {
        self.coef.nrows()
    }

    fn decision(&self, batch: ArrayView2<'_, f64>) -> Result<Array2<f64>, InferenceError> {
        check_width(&batch, self.coef.ncols())?;

        let mut x = batch.to_owned();
        if let Some(s) = &self.scaler {
            x -= &s.mean;
            x /= &s.scale;
        }

        Ok(x.dot(&self.coef.t()) + &self.intercept)
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

fn check_rows(rows: usize, classes: &[ClassLabel]) -> Result<(), ArtifactLoadError> {
    let binary = rows == 1 && classes.len() == 2;
    let per_class = rows == classes.len() && classes.len() >= 2;
    if binary || per_class {
        Ok(())
    } else {
        Err(ArtifactLoadError::invalid(format!(
            "{} coef rows cannot score {} classes",
            rows,
            classes.len()
        )))
    }
}

// ============================================================================
// LOGISTIC REGRESSION
// ============================================================================

#[derive(Debug, Clone)]
pub struct LogisticRegression {
    map: LinearMap,
    classes: Vec<ClassLabel>,
    multi_class: MultiClass,
}

impl LogisticRegression {
    pub fn from_params(
        params: &LogisticParams,
        classes: Vec<ClassLabel>,
        n_features: usize,
    ) -> Result<Self, ArtifactLoadError> {
        let map = LinearMap::build(&params.coef, &params.intercept, params.scaler.as_ref(), n_features)?;
        check_rows(map.rows(), &classes)?;

        Ok(Self {
            map,
            classes,
            multi_class: params.multi_class,
        })
    }

    fn probabilities(&self, batch: ArrayView2<'_, f64>) -> Result<Array2<f64>, InferenceError> {
        let z = self.map.decision(batch)?;

        if self.map.rows() == 1 {
            let mut proba = Array2::zeros((z.nrows(), 2));
            for (i, &score) in z.column(0).iter().enumerate() {
                let p = sigmoid(score);
                proba[[i, 0]] = 1.0 - p;
                proba[[i, 1]] = p;
            }
            return Ok(proba);
        }

        let mut proba = z;
        for mut row in proba.axis_iter_mut(Axis(0)) {
            match self.multi_class {
                MultiClass::Multinomial => {
                    let max = row.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
                    row.mapv_inplace(|v| (v - max).exp());
                    let sum = row.sum();
                    row /= sum;
                }
                MultiClass::Ovr => {
                    row.mapv_inplace(sigmoid);
                    let sum = row.sum();
                    if sum > 0.0 {
                        row /= sum;
                    }
                }
            }
        }
        Ok(proba)
    }
}

impl Classifier for LogisticRegression {
    fn kind(&self) -> &'static str {
        "logistic_regression"
    }

    fn classes(&self) -> &[ClassLabel] {
        &self.classes
    }

    fn predict(&self, batch: ArrayView2<'_, f64>) -> Result<Vec<ClassLabel>, InferenceError> {
        let proba = self.probabilities(batch)?;
        proba
            .axis_iter(Axis(0))
            .map(|row| {
                argmax(row.iter().copied())
                    .map(|idx| self.classes[idx].clone())
                    .ok_or_else(|| InferenceError::new("empty probability row"))
            })
            .collect()
    }

    fn predict_proba(&self, batch: ArrayView2<'_, f64>) -> Result<Option<Array2<f64>>, InferenceError> {
        self.probabilities(batch).map(Some)
    }
}

// ============================================================================
// LINEAR SVC (no probabilities)
// ============================================================================

#[derive(Debug, Clone)]
pub struct LinearSvc {
    map: LinearMap,
    classes: Vec<ClassLabel>,
}

impl LinearSvc {
    pub fn from_params(
        params: &LinearParams,
        classes: Vec<ClassLabel>,
        n_features: usize,
    ) -> Result<Self, ArtifactLoadError> {
        let map = LinearMap::build(&params.coef, &params.intercept, params.scaler.as_ref(), n_features)?;
        check_rows(map.rows(), &classes)?;
        Ok(Self { map, classes })
    }
}

impl Classifier for LinearSvc {
    fn kind(&self) -> &'static str {
        "linear_svc"
    }

    fn classes(&self) -> &[ClassLabel] {
        &self.classes
    }

    fn predict(&self, batch: ArrayView2<'_, f64>) -> Result<Vec<ClassLabel>, InferenceError> {
        let z = self.map.decision(batch)?;

        if self.map.rows() == 1 {
            return Ok(z
                .column(0)
                .iter()
                .map(|&score| self.classes[usize::from(score > 0.0)].clone())
                .collect());
        }

        z.axis_iter(Axis(0))
            .map(|row| {
                argmax(row.iter().copied())
                    .map(|idx| self.classes[idx].clone())
                    .ok_or_else(|| InferenceError::new("empty decision row"))
            })
            .collect()
    }

    fn predict_proba(&self, _batch: ArrayView2<'_, f64>) -> Result<Option<Array2<f64>>, InferenceError> {
        Ok(None)
    }
}
