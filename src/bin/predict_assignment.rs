//! Task assignment predictor
//!
//! `echo '{"features": {...}}' | predict_assignment`

use std::process::ExitCode;

use sprint_ml_predict::api::{run_process, Pipeline};

fn main() -> ExitCode {
    run_process(Pipeline::Assignment)
}
