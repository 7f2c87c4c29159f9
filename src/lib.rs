//! Sprint ML prediction boundary
//!
//! Two classifier pipelines behind one design:
//! - `assignment`: binary "will this developer complete this task", lenient
//!   schema, single and batch requests
//! - `risk`: sprint risk level LOW / MEDIUM / HIGH, strict schema
//!
//! Each binary loads its model once, reads a single JSON request from stdin
//! and writes a single JSON document to stdout. Logs go to stderr.

pub mod api;
pub mod config;
pub mod constants;
pub mod error;
pub mod logic;

pub use api::{Pipeline, Predictor};
pub use config::Config;
pub use error::{ArtifactLoadError, PredictError, PredictResult};

use env_logger::Env;

use crate::constants::{DEFAULT_LOG_FILTER, ENV_LOG};

/// Initialize stderr logging. Filter from `ML_PREDICT_LOG`, default `warn`.
/// Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(Env::default().filter_or(ENV_LOG, DEFAULT_LOG_FILTER))
        .target(env_logger::Target::Stderr)
        .format_timestamp_millis()
        .try_init();
}
