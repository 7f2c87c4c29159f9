//! Model Module - Classifier loading and prediction dispatch
//!
//! Keeps the model behind the `Classifier` trait so the backend can be
//! swapped (linear, tree ensemble, ONNX) without touching the dispatcher.

pub mod artifact;
pub mod classifier;
pub mod dispatch;
pub mod forest;
pub mod linear;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod provider;
pub mod threshold;

// Re-export common types
pub use classifier::{ClassLabel, Classifier, InferenceError};
pub use dispatch::{DispatchPolicy, Dispatcher, PredictionResult};
pub use provider::{ModelInfo, ModelProvider};
pub use threshold::ThresholdConfig;
