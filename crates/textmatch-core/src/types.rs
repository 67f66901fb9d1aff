//! Domain types shared by the index backends, the service layer and the HTTP adapter.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type UnitId = String;

/// Paragraph query result: term to matched units. Terms without matches are absent.
pub type MatchesByTerm = BTreeMap<String, Vec<Unit>>;

/// Position markers assigned at ingestion time. Both are 1-based.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paragraph_number: Option<u64>,
}

impl Sequence {
    pub fn line(line_number: u64) -> Self {
        Self { line_number: Some(line_number), paragraph_number: None }
    }

    pub fn is_empty(&self) -> bool {
        self.line_number.is_none() && self.paragraph_number.is_none()
    }

    /// `None` when neither marker is set, so empty sequences never reach the index.
    pub fn non_empty(self) -> Option<Self> {
        if self.is_empty() { None } else { Some(self) }
    }
}

/// The stored payload of a unit, as handed to and returned by the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<Sequence>,
    pub text: String,
}

/// The atomic stored element. Immutable once indexed.
///
/// - `id`: unique within its index; caller-supplied or generated by the backend
/// - `sequence`: line and/or paragraph position, absent for whole documents
/// - `text`: the stored content, possibly empty for blank lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<Sequence>,
    pub text: String,
}

/// A single match returned by the index, in backend order.
///
/// `score` is engine-specific and only carried through for logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: UnitId,
    pub score: f32,
    pub source: UnitSource,
}

impl From<SearchHit> for Unit {
    fn from(hit: SearchHit) -> Self {
        Self { id: hit.id, sequence: hit.source.sequence, text: hit.source.text }
    }
}

/// Acknowledgement of a single `index` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexReceipt {
    pub id: UnitId,
    pub result: String,
}

impl IndexReceipt {
    pub fn created(id: impl Into<UnitId>) -> Self {
        Self { id: id.into(), result: "created".to_string() }
    }
}

/// Outcome of an idempotent `ensure_index` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provisioned {
    Created,
    AlreadyPresent,
}

/// Field layout of a unit index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSchema {
    pub id_field: String,
    pub text_field: String,
    pub line_number_field: String,
    pub paragraph_number_field: String,
}

impl Default for UnitSchema {
    fn default() -> Self {
        Self {
            id_field: "id".to_string(),
            text_field: "text".to_string(),
            line_number_field: "line_number".to_string(),
            paragraph_number_field: "paragraph_number".to_string(),
        }
    }
}

/// How raw text is turned into units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestMode {
    /// One unit per line, numbered from 1.
    #[default]
    Lines,
    /// The whole (trimmed) submission as a single unit.
    Document,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestRequest {
    pub text: String,
    #[serde(default)]
    pub mode: IngestMode,
    /// Assigned by the caller per submission, never derived from the text.
    #[serde(default)]
    pub paragraph_number: Option<u64>,
    /// Caller-supplied id. In lines mode each unit gets `<id>:<line_number>`.
    #[serde(default)]
    pub id: Option<UnitId>,
}

impl IngestRequest {
    pub fn lines(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Self::default() }
    }

    pub fn document(text: impl Into<String>) -> Self {
        Self { text: text.into(), mode: IngestMode::Document, ..Self::default() }
    }

    pub fn with_paragraph(mut self, paragraph_number: u64) -> Self {
        self.paragraph_number = Some(paragraph_number);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestStatus {
    Complete,
    Partial,
}

/// Per-submission ingestion summary. `ids` follow sequence order and only
/// contain units that were indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub status: IngestStatus,
    pub total: usize,
    pub indexed: usize,
    pub failed: usize,
    pub ids: Vec<UnitId>,
    /// The engine's write result, echoed for single-unit submissions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_without_sequence_serializes_flat() {
        let unit = Unit { id: "1".into(), sequence: None, text: "alpha".into() };
        let json = serde_json::to_value(&unit).expect("serialize");
        assert_eq!(json, serde_json::json!({"id": "1", "text": "alpha"}));
    }

    #[test]
    fn sequence_omits_missing_markers() {
        let unit = Unit { id: "a".into(), sequence: Some(Sequence::line(2)), text: "gamma alpha".into() };
        let json = serde_json::to_value(&unit).expect("serialize");
        assert_eq!(json["sequence"], serde_json::json!({"line_number": 2}));
    }

    #[test]
    fn empty_sequence_collapses_to_none() {
        assert_eq!(Sequence::default().non_empty(), None);
        assert_eq!(Sequence::line(1).non_empty(), Some(Sequence::line(1)));
    }

    #[test]
    fn ingest_request_defaults_to_lines() {
        let req: IngestRequest = serde_json::from_str(r#"{"text":"a\nb"}"#).expect("parse");
        assert_eq!(req.mode, IngestMode::Lines);
        assert_eq!(req.paragraph_number, None);
        let req: IngestRequest = serde_json::from_str(r#"{"text":"a","mode":"document","paragraph_number":3}"#).expect("parse");
        assert_eq!(req.mode, IngestMode::Document);
        assert_eq!(req.paragraph_number, Some(3));
    }
}
