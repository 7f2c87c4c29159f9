//! Feature Layout - Schema Definition
//!
//! **A schema controls the column order the model was trained on**
//!
//! ## Rules (NEVER break these):
//! 1. Add feature → increment the schema version
//! 2. Change order → increment the schema version
//! 3. Remove feature → increment the schema version
//!
//! Every artifact embeds the layout it was trained with. The provider checks
//! it against the compiled-in schema at load time, so a reordered schema fails
//! loudly instead of silently mis-vectorizing.

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

// ============================================================================
// SCHEMA TYPES
// ============================================================================

/// How a raw JSON value becomes a float
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coercion {
    /// Cast to float; failure is an error
    Numeric,
    /// Truthiness → 1.0 / 0.0
    Flag,
}

/// What happens when a schema key is absent from the map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingPolicy {
    /// Absent ⇒ 0.0
    Lenient,
    /// Absent ⇒ `MissingFeature`
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureSpec {
    pub name: &'static str,
    pub coercion: Coercion,
}

impl FeatureSpec {
    pub const fn numeric(name: &'static str) -> Self {
        Self { name, coercion: Coercion::Numeric }
    }

    pub const fn flag(name: &'static str) -> Self {
        Self { name, coercion: Coercion::Flag }
    }
}

/// Ordered feature schema. Vector index `i` is always `features[i]`.
#[derive(Debug, Clone, Copy)]
pub struct FeatureSchema {
    pub name: &'static str,
    pub version: u8,
    pub missing: MissingPolicy,
    pub features: &'static [FeatureSpec],
}

impl FeatureSchema {
    /// Total number of features
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.features.iter().map(|f| f.name)
    }

    /// Get feature index by name (O(n) but features are few)
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.features.iter().position(|f| f.name == name)
    }

    /// Get feature name by index
    pub fn name_at(&self, index: usize) -> Option<&'static str> {
        self.features.get(index).map(|f| f.name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// CRC32 of the layout
    pub fn layout_hash(&self) -> u32 {
        compute_layout_hash(self.version, self.names())
    }

    pub fn info(&self) -> LayoutInfo {
        LayoutInfo {
            name: self.name.to_string(),
            version: self.version,
            features: self.names().map(str::to_string).collect(),
            layout_hash: Some(self.layout_hash()),
        }
    }

    /// Validate that an embedded layout matches this schema
    pub fn validate(&self, incoming: &LayoutInfo) -> Result<(), LayoutMismatchError> {
        let expected_hash = self.layout_hash();
        let actual_hash = incoming.computed_hash();

        let mismatch = |detail: String| LayoutMismatchError {
            schema: self.name.to_string(),
            expected_version: self.version,
            expected_hash,
            actual_version: incoming.version,
            actual_hash,
            detail,
        };

        if incoming.version != self.version {
            return Err(mismatch("version differs".to_string()));
        }

        if incoming.features.len() != self.len() {
            return Err(mismatch(format!(
                "expected {} features, artifact has {}",
                self.len(),
                incoming.features.len()
            )));
        }

        if let Some((i, (want, got))) = self
            .names()
            .zip(incoming.features.iter())
            .enumerate()
            .find(|(_, (want, got))| *want != got.as_str())
        {
            return Err(mismatch(format!("column {} is '{}', artifact has '{}'", i, want, got)));
        }

        // Declared hash must agree with the declared names
        if let Some(declared) = incoming.layout_hash {
            if declared != expected_hash {
                return Err(mismatch(format!("declared layout hash {:08x}", declared)));
            }
        }

        Ok(())
    }
}

// ============================================================================
// LAYOUT HASH
// ============================================================================

/// Compute CRC32 hash of a feature layout
pub fn compute_layout_hash<'a>(version: u8, names: impl IntoIterator<Item = &'a str>) -> u32 {
    let mut hasher = Hasher::new();

    // Include version in hash
    hasher.update(&[version]);

    for name in names {
        hasher.update(name.as_bytes());
        hasher.update(&[0]); // Separator
    }

    hasher.finalize()
}

// ============================================================================
// LAYOUT INFO
// ============================================================================

/// Layout as stored inside an artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutInfo {
    pub name: String,
    pub version: u8,
    pub features: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_hash: Option<u32>,
}

impl LayoutInfo {
    /// Hash of the names actually listed
    pub fn computed_hash(&self) -> u32 {
        compute_layout_hash(self.version, self.features.iter().map(String::as_str))
    }
}

// ============================================================================
// LAYOUT VALIDATION
// ============================================================================

/// Error when an artifact's layout doesn't match the compiled-in schema
#[derive(Debug, Clone)]
pub struct LayoutMismatchError {
    pub schema: String,
    pub expected_version: u8,
    pub expected_hash: u32,
    pub actual_version: u8,
    pub actual_hash: u32,
    pub detail: String,
}

impl std::fmt::Display for LayoutMismatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Feature layout mismatch for '{}': expected v{} (hash: {:08x}), got v{} (hash: {:08x}): {}",
            self.schema,
            self.expected_version,
            self.expected_hash,
            self.actual_version,
            self.actual_hash,
            self.detail
        )
    }
}

impl std::error::Error for LayoutMismatchError {}

// ============================================================================
// TESTS
// ============================================================================
