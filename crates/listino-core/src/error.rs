//! Error types for the listino-core library.

use thiserror::Error;

/// Main error type for the listino library.
#[derive(Error, Debug)]
pub enum ListinoError {
    /// Reference sheet validation error. Aborts the whole run.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Document extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Narrative generation error.
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),

    /// Run workspace error.
    #[error("storage error: {0}")]
    Storage(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while loading and validating the reference sheet.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required column is absent from the header row.
    #[error("missing column '{0}' in the reference sheet")]
    MissingColumn(String),

    /// The sheet could not be opened or parsed.
    #[error("cannot read reference sheet: {0}")]
    Unreadable(String),

    /// The sheet has no header row.
    #[error("reference sheet is empty")]
    Empty,

    /// The file extension is not a supported spreadsheet format.
    #[error("unsupported reference sheet format: {0}")]
    UnsupportedFormat(String),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// The crate was built without an OCR backend.
    #[error("OCR support not compiled in")]
    Unavailable,
}

/// Errors that isolate a single document from the rest of the run.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// PDF processing failed.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// OCR failed.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// The document could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The document type is not supported.
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    /// Rendering did not complete in time.
    #[error("rendering timed out after {0}s")]
    Timeout(u64),

    /// Rendering produced no text.
    #[error("no text could be extracted")]
    NoText,

    /// The rendering task panicked or was cancelled.
    #[error("rendering task failed: {0}")]
    Task(String),
}

/// Errors from the narrative-generation collaborator.
#[derive(Error, Debug)]
pub enum GenerationError {
    /// No generation endpoint is configured.
    #[error("no narrative generator configured")]
    NotConfigured,

    /// The request failed or the endpoint was unreachable.
    #[error("request failed: {0}")]
    Request(String),

    /// The endpoint answered with an unexpected payload.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Generation did not complete in time.
    #[error("generation timed out after {0}s")]
    Timeout(u64),
}

/// Result type for the listino library.
pub type Result<T> = std::result::Result<T, ListinoError>;
