//! Central Configuration Constants
//!
//! Single source of truth for defaults and environment variable names.
//! To change a default, only edit this file.

// ============================================================================
// DECISION DEFAULTS
// ============================================================================

/// Positive-class cutoff for the binary (assignment) pipeline
pub const DEFAULT_POSITIVE_THRESHOLD: f64 = 0.5;

/// Placeholder confidence when a multi-class model has no probability output.
/// Not a measured value.
pub const DEFAULT_FALLBACK_CONFIDENCE: f64 = 0.8;

/// Artifact manifest format understood by this build
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

// ============================================================================
// PROCESS
// ============================================================================

/// Exit status when an error document was emitted
pub const EXIT_REQUEST_FAILED: u8 = 1;

/// Exit status when the model could not be loaded
pub const EXIT_ARTIFACT_FAILED: u8 = 2;

/// Default log filter (stderr only, stdout carries the response)
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// ENVIRONMENT VARIABLES
// ============================================================================

pub const ENV_LOG: &str = "ML_PREDICT_LOG";
pub const ENV_MODEL_DIR: &str = "ML_PREDICT_MODEL_DIR";
pub const ENV_ERROR_EXIT: &str = "ML_PREDICT_ERROR_EXIT";
pub const ENV_ASSIGNMENT_MODEL_PATH: &str = "ASSIGNMENT_MODEL_PATH";
pub const ENV_RISK_MODEL_PATH: &str = "RISK_MODEL_PATH";
pub const ENV_ASSIGNMENT_MODEL_SHA256: &str = "ASSIGNMENT_MODEL_SHA256";
pub const ENV_RISK_MODEL_SHA256: &str = "RISK_MODEL_SHA256";
pub const ENV_ASSIGNMENT_THRESHOLD: &str = "ASSIGNMENT_THRESHOLD";
pub const ENV_RISK_FALLBACK_CONFIDENCE: &str = "RISK_FALLBACK_CONFIDENCE";
