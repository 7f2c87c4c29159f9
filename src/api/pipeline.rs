//! Prediction pipeline
//!
//! `Start → Load Model → Read & Parse → Vectorize → Predict → Serialize → Exit`
//!
//! Straight line, no retries. Any failure after the model is loaded becomes
//! the single `{"error": ...}` document; a model load failure ends the
//! process before stdin is read.

use std::io::{self, Read, Write};
use std::process::ExitCode;

use anyhow::Context;

use super::request::PredictionRequest;
use super::response::{write_response, LabelKind, ResponseEnvelope, ScoreField, Verdict};
use crate::config::{ArtifactOverrides, Config, ErrorExit};
use crate::constants::{EXIT_ARTIFACT_FAILED, EXIT_REQUEST_FAILED};
use crate::error::PredictResult;
use crate::logic::features::{vectorize, vectorize_batch, FeatureSchema, ASSIGNMENT_SCHEMA, RISK_SCHEMA};
use crate::logic::model::{DispatchPolicy, Dispatcher, ModelProvider, ThresholdConfig};

// ============================================================================
// PIPELINE DEFINITIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pipeline {
    /// Will this developer complete this task? `{label: 0|1, probability}`
    Assignment,
    /// Sprint risk level. `{label: "LOW"|"MEDIUM"|"HIGH", confidence}`
    Risk,
}

impl Pipeline {
    pub fn name(self) -> &'static str {
        match self {
            Pipeline::Assignment => "assignment",
            Pipeline::Risk => "risk",
        }
    }

    pub fn schema(self) -> &'static FeatureSchema {
        match self {
            Pipeline::Assignment => &ASSIGNMENT_SCHEMA,
            Pipeline::Risk => &RISK_SCHEMA,
        }
    }

    pub fn allows_batch(self) -> bool {
        matches!(self, Pipeline::Assignment)
    }

    pub fn score_field(self) -> ScoreField {
        match self {
            Pipeline::Assignment => ScoreField::Probability,
            Pipeline::Risk => ScoreField::Confidence,
        }
    }

    pub fn label_kind(self) -> LabelKind {
        match self {
            Pipeline::Assignment => LabelKind::Native,
            Pipeline::Risk => LabelKind::Text,
        }
    }

    /// Default artifact file name, next to the executable
    pub fn artifact_file(self) -> &'static str {
        match self {
            Pipeline::Assignment => "assignment_model.json",
            Pipeline::Risk => "risk_model.json",
        }
    }

    pub fn policy(self, thresholds: &ThresholdConfig) -> DispatchPolicy {
        match self {
            Pipeline::Assignment => DispatchPolicy::binary(thresholds),
            Pipeline::Risk => DispatchPolicy::multi_class(thresholds),
        }
    }

    pub fn overrides(self, config: &Config) -> &ArtifactOverrides {
        match self {
            Pipeline::Assignment => &config.assignment,
            Pipeline::Risk => &config.risk,
        }
    }
}

// ============================================================================
// REQUEST HANDLING
// ============================================================================

/// Whether the emitted document was a verdict or an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Served,
    Failed,
}

impl Outcome {
    pub fn exit_status(self, convention: ErrorExit) -> u8 {
        match (self, convention) {
            (Outcome::Failed, ErrorExit::Failure) => EXIT_REQUEST_FAILED,
            _ => 0,
        }
    }

    pub fn exit_code(self, convention: ErrorExit) -> ExitCode {
        ExitCode::from(self.exit_status(convention))
    }
}

/// A loaded model bound to one pipeline
pub struct Predictor<'a> {
    pipeline: Pipeline,
    provider: &'a ModelProvider,
    policy: DispatchPolicy,
}

impl<'a> Predictor<'a> {
    pub fn new(pipeline: Pipeline, provider: &'a ModelProvider, policy: DispatchPolicy) -> Self {
        Self { pipeline, provider, policy }
    }

    /// Parse → vectorize → predict → envelope
    pub fn handle(&self, raw: &str) -> PredictResult<ResponseEnvelope> {
        let schema = self.pipeline.schema();
        let request = PredictionRequest::parse(raw, self.pipeline.allows_batch())?;
        let dispatcher = Dispatcher::new(self.provider.classifier(), self.policy);

        let field = self.pipeline.score_field();
        let kind = self.pipeline.label_kind();

        match request {
            PredictionRequest::Single(map) => {
                let vector = vectorize(&map, schema)?;
                log::debug!("[{}] vector: {}", schema.name, vector.to_log_entry(schema));

                let result = dispatcher.predict_one(&vector)?;
                Ok(ResponseEnvelope::Single(Verdict::new(result, field, kind)))
            }
            PredictionRequest::Batch(maps) => {
                let vectors = vectorize_batch(&maps, schema)?;
                log::debug!("[{}] batch of {} vector(s)", schema.name, vectors.len());

                let results = dispatcher
                    .predict_batch(&vectors)?
                    .into_iter()
                    .map(|r| Verdict::new(r, field, kind))
                    .collect();
                Ok(ResponseEnvelope::Batch { results })
            }
        }
    }

    /// Like `handle`, with every fault folded into the error document
    pub fn respond(&self, raw: &str) -> ResponseEnvelope {
        match self.handle(raw) {
            Ok(envelope) => envelope,
            Err(err) => {
                log::error!("[predict_{}] ERROR: {}", self.pipeline.name(), err);
                log::debug!("[predict_{}] error kind: {}", self.pipeline.name(), err.kind());
                ResponseEnvelope::error(&err)
            }
        }
    }

    /// Read the whole input, write exactly one document
    pub fn run_with_io<R: Read, W: Write>(&self, mut input: R, output: W) -> io::Result<Outcome> {
        let mut raw = String::new();
        let envelope = match input.read_to_string(&mut raw) {
            Ok(_) => self.respond(&raw),
            Err(e) => {
                let err = crate::error::PredictError::Input(e);
                log::error!("[predict_{}] ERROR: {}", self.pipeline.name(), err);
                ResponseEnvelope::error(&err)
            }
        };

        write_response(output, &envelope)?;

        Ok(if envelope.is_error() { Outcome::Failed } else { Outcome::Served })
    }
}

// ============================================================================
// PROCESS ENTRY
// ============================================================================

/// Load the pipeline's model per configuration. Startup-fatal on error.
pub fn bootstrap(pipeline: Pipeline, config: &Config) -> anyhow::Result<(ModelProvider, DispatchPolicy)> {
    let policy = pipeline.policy(&ThresholdConfig::from_config(config));
    let overrides = pipeline.overrides(config);
    let path = config.artifact_path(overrides, pipeline.artifact_file());

    let provider = ModelProvider::load(&path, pipeline.schema(), &policy, overrides.sha256.as_deref())
        .with_context(|| format!("failed to load {} model from {}", pipeline.name(), path.display()))?;

    Ok((provider, policy))
}

/// Whole-process entry shared by both binaries
pub fn run_process(pipeline: Pipeline) -> ExitCode {
    dotenvy::dotenv().ok();
    crate::init_logging();

    let config = Config::from_env();
    log::debug!("predict_{} v{} starting", pipeline.name(), crate::constants::APP_VERSION);

    let (provider, policy) = match bootstrap(pipeline, &config) {
        Ok(loaded) => loaded,
        Err(e) => {
            log::error!("[predict_{}] FATAL: {:#}", pipeline.name(), e);
            return ExitCode::from(EXIT_ARTIFACT_FAILED);
        }
    };

    let predictor = Predictor::new(pipeline, &provider, policy);
    let stdin = io::stdin();
    let stdout = io::stdout();

    match predictor.run_with_io(stdin.lock(), stdout.lock()) {
        Ok(outcome) => outcome.exit_code(config.error_exit),
        Err(e) => {
            log::error!("[predict_{}] failed to write response: {}", pipeline.name(), e);
            ExitCode::from(EXIT_REQUEST_FAILED)
        }
    }
}
