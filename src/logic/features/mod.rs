//! Features Module - Feature Vectorization
//!
//! Schema definitions and the map → vector transform.
//! Adding a pipeline means adding a schema, not touching the vectorizer.

pub mod layout;
pub mod schemas;
pub mod vector;


// Re-export common types
pub use layout::{Coercion, FeatureSchema, FeatureSpec, LayoutInfo, MissingPolicy};
pub use schemas::{ASSIGNMENT_SCHEMA, RISK_SCHEMA};
pub use vector::{vectorize, vectorize_batch, FeatureMap, FeatureVector};
