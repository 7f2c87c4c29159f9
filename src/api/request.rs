//! Prediction request parsing
//!
//! The request shape is decided once here: `Single` or `Batch`.
//! Nothing downstream re-inspects the raw JSON.

use serde_json::Value;

use crate::error::{PredictError, PredictResult};
use crate::logic::features::FeatureMap;

pub const FEATURES_KEY: &str = "features";
pub const FEATURES_LIST_KEY: &str = "featuresList";

#[derive(Debug, Clone, PartialEq)]
pub enum PredictionRequest {
    Single(FeatureMap),
    Batch(Vec<FeatureMap>),
}

impl PredictionRequest {
    /// Parse the raw input document. `featuresList` is only honoured when
    /// `allow_batch` is set, and wins over `features` if both are present.
    pub fn parse(raw: &str, allow_batch: bool) -> PredictResult<Self> {
        if raw.trim().is_empty() {
            return Err(PredictError::EmptyInput);
        }

        let payload: Value =
            serde_json::from_str(raw).map_err(|e| PredictError::malformed(format!("Invalid JSON: {}", e)))?;

        let Value::Object(mut payload) = payload else {
            return Err(PredictError::malformed("Request must be a JSON object"));
        };

        if allow_batch {
            if let Some(list) = payload.remove(FEATURES_LIST_KEY) {
                return parse_list(list).map(PredictionRequest::Batch);
            }
        }

        match payload.remove(FEATURES_KEY) {
            Some(Value::Object(map)) => Ok(PredictionRequest::Single(map)),
            Some(_) => Err(PredictError::malformed(format!("'{}' must be a JSON object", FEATURES_KEY))),
            None if allow_batch => Err(PredictError::malformed(format!(
                "JSON must have a '{}' or '{}' property",
                FEATURES_KEY, FEATURES_LIST_KEY
            ))),
            None => Err(PredictError::malformed(format!("JSON must have a '{}' property", FEATURES_KEY))),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PredictionRequest::Single(_) => 1,
            PredictionRequest::Batch(maps) => maps.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_batch(&self) -> bool {
        matches!(self, PredictionRequest::Batch(_))
    }
}

fn parse_list(list: Value) -> PredictResult<Vec<FeatureMap>> {
    let Value::Array(items) = list else {
        return Err(PredictError::malformed(format!("'{}' must be a JSON array", FEATURES_LIST_KEY)));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(map) => Ok(map),
            _ => Err(PredictError::malformed(format!("'{}[{}]' must be a JSON object", FEATURES_LIST_KEY, i))),
        })
        .collect()
}
