//! Document-side data: rendered text and what is extracted from it.

use serde::{Deserialize, Serialize};

/// Rendered text of one source document, split into non-empty lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDocument {
    /// File name of the source document.
    pub name: String,

    /// Non-blank lines in reading order.
    pub lines: Vec<String>,
}

impl RawDocument {
    /// Build a document from a rendered text blob, dropping blank lines.
    pub fn from_text(name: impl Into<String>, text: &str) -> Self {
        let lines = text
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .collect();

        Self {
            name: name.into(),
            lines,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// A pricing field found on one line of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedField {
    /// Label part of the line (left of the split point).
    pub label: String,

    /// Value part of the line, absent when the line has no split point.
    pub value: Option<String>,

    /// The full line the field was taken from.
    pub source_line: String,
}

/// Listing and product codes of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifiers {
    /// Code grouping the reference items of this offer.
    pub listing_code: Option<String>,

    /// First non-blank line of the document.
    pub product_code: Option<String>,
}
