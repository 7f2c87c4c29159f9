//! Model Provider
//!
//! Loads one classifier artifact at startup and hands it out read-only.
//! Every failure here is an `ArtifactLoadError`: the process must not serve
//! a request without a model.

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use super::artifact::{ArtifactManifest, ModelSpec};
use super::classifier::{ClassLabel, Classifier};
use super::dispatch::DispatchPolicy;
use super::forest::RandomForest;
use super::linear::{LinearSvc, LogisticRegression};
use crate::constants::ARTIFACT_FORMAT_VERSION;
use crate::error::ArtifactLoadError;
use crate::logic::features::FeatureSchema;

/// What was loaded, for logs
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub path: Option<PathBuf>,
    pub kind: &'static str,
    pub classes: Vec<ClassLabel>,
    pub layout_hash: u32,
    pub sha256: Option<String>,
    pub description: Option<String>,
}

pub struct ModelProvider {
    classifier: Box<dyn Classifier>,
    info: ModelInfo,
}

impl std::fmt::Debug for ModelProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelProvider").field("info", &self.info).finish()
    }
}

impl ModelProvider {
    /// Load and validate an artifact file
    pub fn load(
        path: &Path,
        schema: &FeatureSchema,
        policy: &DispatchPolicy,
        expected_sha256: Option<&str>,
    ) -> Result<Self, ArtifactLoadError> {
        log::info!("Loading {} model from: {}", schema.name, path.display());

        if !path.exists() {
            return Err(ArtifactLoadError::NotFound(path.to_path_buf()));
        }

        let bytes = fs::read(path).map_err(|source| ArtifactLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let digest = sha256_hex(&bytes);
        if let Some(expected) = expected_sha256 {
            verify_digest(expected, &digest)?;
        }

        let manifest: ArtifactManifest = serde_json::from_slice(&bytes)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

        let mut provider = Self::from_manifest(manifest, base_dir, schema, policy)?;
        provider.info.path = Some(path.to_path_buf());
        provider.info.sha256 = Some(digest);

        log::info!(
            "{} model loaded: {} over [{}]",
            schema.name,
            provider.info.kind,
            provider
                .info
                .classes
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );
        log::debug!(
            "layout hash {:08x}, sha256 {}",
            provider.info.layout_hash,
            provider.info.sha256.as_deref().unwrap_or("-")
        );

        Ok(provider)
    }

    /// Build from an already-parsed manifest. `base_dir` resolves external files.
    pub fn from_manifest(
        manifest: ArtifactManifest,
        base_dir: &Path,
        schema: &FeatureSchema,
        policy: &DispatchPolicy,
    ) -> Result<Self, ArtifactLoadError> {
        if manifest.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(ArtifactLoadError::UnsupportedFormat {
                expected: ARTIFACT_FORMAT_VERSION,
                found: manifest.format_version,
            });
        }

        schema.validate(&manifest.schema)?;
        policy.check_classes(&manifest.classes).map_err(ArtifactLoadError::InvalidModel)?;

        let n_features = schema.len();
        let classes = manifest.classes.clone();

        let classifier: Box<dyn Classifier> = match &manifest.model {
            ModelSpec::LogisticRegression(p) => Box::new(LogisticRegression::from_params(p, classes, n_features)?),
            ModelSpec::LinearSvc(p) => Box::new(LinearSvc::from_params(p, classes, n_features)?),
            ModelSpec::RandomForest(p) => Box::new(RandomForest::from_params(p, classes, n_features)?),
            ModelSpec::Onnx(p) => load_onnx(p, base_dir, classes, n_features)?,
        };

        Ok(Self {
            info: ModelInfo {
                path: None,
                kind: classifier.kind(),
                classes: manifest.classes,
                layout_hash: schema.layout_hash(),
                sha256: None,
                description: manifest.description,
            },
            classifier,
        })
    }

    /// Wrap an in-memory classifier (tests, embedding)
    pub fn with_classifier(
        classifier: Box<dyn Classifier>,
        schema: &FeatureSchema,
        policy: &DispatchPolicy,
    ) -> Result<Self, ArtifactLoadError> {
        policy
            .check_classes(classifier.classes())
            .map_err(ArtifactLoadError::InvalidModel)?;

        Ok(Self {
            info: ModelInfo {
                path: None,
                kind: classifier.kind(),
                classes: classifier.classes().to_vec(),
                layout_hash: schema.layout_hash(),
                sha256: None,
                description: None,
            },
            classifier,
        })
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    pub fn info(&self) -> &ModelInfo {
        &self.info
    }
}

#[cfg(feature = "onnx")]
fn load_onnx(
    params: &super::artifact::OnnxParams,
    base_dir: &Path,
    classes: Vec<ClassLabel>,
    n_features: usize,
) -> Result<Box<dyn Classifier>, ArtifactLoadError> {
    let path = base_dir.join(&params.path);
    if let Some(expected) = params.sha256.as_deref() {
        let bytes = fs::read(&path).map_err(|source| ArtifactLoadError::Io { path: path.clone(), source })?;
        verify_digest(expected, &sha256_hex(&bytes))?;
    }
    Ok(Box::new(super::onnx::OnnxClassifier::load(&path, params, classes, n_features)?))
}

#[cfg(not(feature = "onnx"))]
fn load_onnx(
    params: &super::artifact::OnnxParams,
    _base_dir: &Path,
    _classes: Vec<ClassLabel>,
    _n_features: usize,
) -> Result<Box<dyn Classifier>, ArtifactLoadError> {
    Err(ArtifactLoadError::Backend(format!(
        "'{}' needs the `onnx` feature, this build has none",
        params.path
    )))
}

// ============================================================================
// CHECKSUM
// ============================================================================

/// Lower-case hex SHA-256
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn verify_digest(expected: &str, actual: &str) -> Result<(), ArtifactLoadError> {
    let expected = expected.trim().to_ascii_lowercase();
    if expected != actual {
        return Err(ArtifactLoadError::ChecksumMismatch {
            expected,
            actual: actual.to_string(),
        });
    }
    Ok(())
}
