//! Logic Module - Vectorization & Inference
//!
//! - `features/` - Schemas and map → vector transform
//! - `model/` - Artifact loading, classifier backends, dispatch

pub mod features;
pub mod model;
