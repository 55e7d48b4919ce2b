//! Data models for documents, reference items, reports and configuration.

pub mod config;
pub mod document;
pub mod report;

pub use document::{ExtractedField, Identifiers, RawDocument};
pub use report::{ComparisonRow, DocumentReport, DocumentStatus, MatchStatus, Narrative, RunOutput};
