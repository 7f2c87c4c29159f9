//! Feature Vector - Core data structure for ML input
//!
//! Turns a loosely-typed JSON feature map into a fixed-order float vector
//! under a [`FeatureSchema`]. Pure transform, no side effects.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::layout::{Coercion, FeatureSchema, MissingPolicy};
use crate::error::{PredictError, PredictResult};

/// Raw feature map as received on the wire
pub type FeatureMap = Map<String, Value>;

// ============================================================================
// VERSIONED FEATURE VECTOR
// ============================================================================

/// Feature vector tagged with the layout it was built under
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Schema version
    pub version: u8,
    /// CRC32 hash of the feature layout (for mismatch detection)
    pub layout_hash: u32,
    /// Feature values in schema order
    pub values: Vec<f64>,
}

impl FeatureVector {
    /// Create a zeroed vector for a schema
    pub fn zeroed(schema: &FeatureSchema) -> Self {
        Self {
            version: schema.version,
            layout_hash: schema.layout_hash(),
            values: vec![0.0; schema.len()],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    /// Get feature by name
    pub fn get_by_name(&self, schema: &FeatureSchema, name: &str) -> Option<f64> {
        schema.index_of(name).and_then(|i| self.get(i))
    }

    /// Convert to JSON-serializable format for logging
    pub fn to_log_entry(&self, schema: &FeatureSchema) -> Value {
        let named: Map<String, Value> = schema
            .names()
            .zip(self.values.iter())
            .map(|(name, value)| (name.to_string(), Value::from(*value)))
            .collect();

        serde_json::json!({
            "schema": schema.name,
            "feature_version": self.version,
            "layout_hash": self.layout_hash,
            "named_values": named,
        })
    }
}

// ============================================================================
// VECTORIZATION
// ============================================================================

/// Map a feature map to a vector, in schema order
pub fn vectorize(map: &FeatureMap, schema: &FeatureSchema) -> PredictResult<FeatureVector> {
    let mut vector = FeatureVector::zeroed(schema);

    for (slot, spec) in vector.values.iter_mut().zip(schema.features) {
        let Some(value) = map.get(spec.name) else {
            match schema.missing {
                MissingPolicy::Lenient => continue,
                MissingPolicy::Strict => {
                    return Err(PredictError::MissingFeature(spec.name.to_string()))
                }
            }
        };

        *slot = match spec.coercion {
            Coercion::Flag => flag_value(value),
            Coercion::Numeric => numeric_value(value).ok_or_else(|| {
                let key = spec.name.to_string();
                let value = value.clone();
                match schema.missing {
                    MissingPolicy::Lenient => PredictError::NumericConversion { key, value },
                    MissingPolicy::Strict => PredictError::InvalidFeatureType { key, value },
                }
            })?,
        };
    }

    if log::log_enabled!(log::Level::Debug) {
        for key in map.keys().filter(|k| !schema.contains(k)) {
            log::debug!("[{}] ignoring unknown feature '{}'", schema.name, key);
        }
    }

    Ok(vector)
}

/// Vectorize every map in order. First failure aborts the whole batch.
pub fn vectorize_batch(maps: &[FeatureMap], schema: &FeatureSchema) -> PredictResult<Vec<FeatureVector>> {
    maps.iter().map(|m| vectorize(m, schema)).collect()
}

// ============================================================================
// COERCION
// ============================================================================

/// Float cast. Numbers, booleans and numeric strings convert; everything
/// else (including `null`) does not. Non-finite results are rejected.
pub fn numeric_value(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };

    number.is_finite().then_some(number)
}

/// Truthiness cast: `false`, `null`, `0`, `""`, `[]` and `{}` are 0.0
pub fn flag_value(value: &Value) -> f64 {
    let truthy = match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    };

    if truthy {
        1.0
    } else {
        0.0
    }
}
