//! API Module - stdin/stdout boundary
//!
//! One JSON request in, one JSON document out.

pub mod pipeline;
pub mod request;
pub mod response;


// Re-export common types
pub use pipeline::{bootstrap, run_process, Outcome, Pipeline, Predictor};
pub use request::PredictionRequest;
pub use response::{write_response, LabelKind, ResponseEnvelope, ScoreField, Verdict};
