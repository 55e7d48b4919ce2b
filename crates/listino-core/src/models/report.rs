//! Reconciliation reports produced per document and per run.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::document::{ExtractedField, Identifiers};

/// Outcome of comparing one extracted field with the reference sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// A reference item matched and the prices are identical strings.
    Ok,
    /// A reference item matched but the prices differ.
    Different,
    /// No reference item scored at or above the threshold.
    NotFound,
}

impl MatchStatus {
    /// Label used in the rendered comparison table.
    pub fn label(&self) -> &'static str {
        match self {
            MatchStatus::Ok => "OK",
            MatchStatus::Different => "Diverso",
            MatchStatus::NotFound => "Non trovato",
        }
    }
}

/// One row of the comparison table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonRow {
    /// Field label as extracted from the document.
    pub field: String,

    /// Value found in the document.
    pub extracted_value: Option<String>,

    /// Unit price of the matched reference item.
    pub expected_value: Option<String>,

    /// Item code of the matched reference item.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_item: Option<String>,

    /// Similarity score of the matched item (0-100).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,

    pub status: MatchStatus,
}

/// Processing state of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// The document was rendered and reconciled.
    Processed,
    /// Rendering failed; the report carries the error.
    Failed,
}

/// Reconciliation report for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReport {
    /// File name of the source document.
    pub document_name: String,

    pub status: DocumentStatus,

    /// Why the document could not be processed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub identifiers: Identifiers,

    /// Extracted fields keyed by label, in document order.
    pub extracted_fields: IndexMap<String, ExtractedField>,

    pub comparison_rows: Vec<ComparisonRow>,

    /// Markdown rendering of `comparison_rows`.
    pub comparison_table: String,
}

impl DocumentReport {
    pub fn is_failed(&self) -> bool {
        self.status == DocumentStatus::Failed
    }

    /// Count rows with the given status.
    pub fn count(&self, status: MatchStatus) -> usize {
        self.comparison_rows
            .iter()
            .filter(|r| r.status == status)
            .count()
    }
}

/// Narrative report of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Narrative {
    /// Text produced by the generation collaborator.
    Generated { text: String },

    /// The collaborator could not be used; `fallback` is a plain rendering
    /// of the comparison tables.
    Unavailable { reason: String, fallback: String },
}

impl Narrative {
    /// Markdown to show the user, generated or not.
    pub fn text(&self) -> &str {
        match self {
            Narrative::Generated { text } => text,
            Narrative::Unavailable { fallback, .. } => fallback,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Narrative::Unavailable { .. })
    }
}

/// Everything a run hands back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutput {
    pub narrative: Narrative,

    /// Structured reports in input document order.
    pub reports: Vec<DocumentReport>,
}
