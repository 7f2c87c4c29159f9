//! Response serialization
//!
//! Exactly one JSON document per invocation: a verdict, a list of verdicts,
//! or `{"error": ...}` with no prediction fields.

use std::io::{self, Write};

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::PredictError;
use crate::logic::model::{ClassLabel, PredictionResult};

/// Name of the score field in a verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreField {
    Probability,
    Confidence,
}

impl ScoreField {
    pub fn name(self) -> &'static str {
        match self {
            ScoreField::Probability => "probability",
            ScoreField::Confidence => "confidence",
        }
    }
}

/// JSON type of the emitted label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    /// As the classifier produced it (`0` / `1`)
    Native,
    /// Always a string (`"HIGH"`)
    Text,
}

// ============================================================================
// VERDICT
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub label: ClassLabel,
    pub score: f64,
    pub field: ScoreField,
}

impl Verdict {
    pub fn new(result: PredictionResult, field: ScoreField, kind: LabelKind) -> Self {
        let label = match (kind, result.label) {
            (LabelKind::Text, ClassLabel::Int(v)) => ClassLabel::Text(v.to_string()),
            (_, label) => label,
        };

        Self {
            label,
            score: result.score,
            field,
        }
    }
}

impl Serialize for Verdict {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("label", &self.label)?;
        map.serialize_entry(self.field.name(), &self.score)?;
        map.end()
    }
}

// ============================================================================
// ENVELOPE
// ============================================================================

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum ResponseEnvelope {
    Single(Verdict),
    Batch { results: Vec<Verdict> },
    Error { error: String },
}

impl ResponseEnvelope {
    pub fn error(err: &PredictError) -> Self {
        ResponseEnvelope::Error { error: err.to_string() }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ResponseEnvelope::Error { .. })
    }
}

/// Write the document followed by a single newline
pub fn write_response<W: Write>(mut out: W, envelope: &ResponseEnvelope) -> io::Result<()> {
    serde_json::to_writer(&mut out, envelope)?;
    out.write_all(b"\n")?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(envelope: &ResponseEnvelope) -> String {
        let mut buf = Vec::new();
        write_response(&mut buf, envelope).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn result(label: ClassLabel, score: f64) -> PredictionResult {
        PredictionResult { label, score }
    }

    #[test]
    fn test_binary_single() {
        let verdict = Verdict::new(result(ClassLabel::Int(1), 0.75), ScoreField::Probability, LabelKind::Native);
        assert_eq!(render(&ResponseEnvelope::Single(verdict)), "{\"label\":1,\"probability\":0.75}\n");
    }

    #[test]
    fn test_risk_single() {
        let verdict = Verdict::new(result("HIGH".into(), 0.6), ScoreField::Confidence, LabelKind::Text);
        assert_eq!(render(&ResponseEnvelope::Single(verdict)), "{\"label\":\"HIGH\",\"confidence\":0.6}\n");
    }

    #[test]
    fn test_text_kind_stringifies_integers() {
        let verdict = Verdict::new(result(ClassLabel::Int(2), 0.5), ScoreField::Confidence, LabelKind::Text);
        assert_eq!(verdict.label, ClassLabel::from("2"));
    }

    #[test]
    fn test_batch() {
        let results = vec![
            Verdict::new(result(ClassLabel::Int(0), 0.1), ScoreField::Probability, LabelKind::Native),
            Verdict::new(result(ClassLabel::Int(1), 0.9), ScoreField::Probability, LabelKind::Native),
        ];
        assert_eq!(
            render(&ResponseEnvelope::Batch { results }),
            "{\"results\":[{\"label\":0,\"probability\":0.1},{\"label\":1,\"probability\":0.9}]}\n"
        );
    }

    #[test]
    fn test_error_has_only_error_field() {
        let envelope = ResponseEnvelope::error(&PredictError::EmptyInput);
        assert!(envelope.is_error());
        assert_eq!(render(&envelope), "{\"error\":\"Empty stdin\"}\n");
    }
}
