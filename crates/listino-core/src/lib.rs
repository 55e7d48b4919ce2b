//! Core library for price-offer reconciliation.
//!
//! This crate provides:
//! - Document rendering (embedded PDF text, OCR fallback for scans)
//! - Pricing-term field extraction and listing/product identification
//! - Reference price-list loading and per-listing index
//! - Fuzzy reconciliation of extracted fields against reference items
//! - Per-document reports and a narrative summary of a run

pub mod error;
pub mod extraction;
pub mod matching;
pub mod models;
pub mod narrative;
pub mod ocr;
pub mod pdf;
pub mod pipeline;
pub mod reference;
pub mod render;
pub mod report;
pub mod storage;

pub use error::{ExtractionError, GenerationError, ListinoError, Result, ValidationError};
pub use extraction::{FieldParser, IdentifierExtractor};
pub use matching::{Reconciler, ScorerKind, SimilarityScorer};
pub use models::config::ListinoConfig;
pub use models::{
    ComparisonRow, DocumentReport, DocumentStatus, ExtractedField, Identifiers, MatchStatus,
    Narrative, RawDocument, RunOutput,
};
pub use narrative::{HttpSummarizer, Summarizer};
pub use ocr::OcrEngine;
#[cfg(feature = "native")]
pub use ocr::OnnxOcrEngine;
pub use pipeline::{DocumentProcessor, Pipeline};
pub use reference::{ReferenceIndex, ReferenceItem, ReferenceSheet};
pub use render::{DocumentRenderer, FileRenderer};
