//! Listing and product code extraction.

use regex::Regex;
use tracing::debug;

use crate::models::document::Identifiers;

use super::patterns::LISTING_CODE;

/// Finds the listing code and product code of a document.
#[derive(Debug, Clone)]
pub struct IdentifierExtractor {
    listing_code: Regex,
}

impl IdentifierExtractor {
    /// Create an extractor with the standard listing-code pattern.
    pub fn new() -> Self {
        Self {
            listing_code: LISTING_CODE.clone(),
        }
    }

    /// Use a custom listing-code pattern. It is matched against whole
    /// trimmed lines, so it should be anchored.
    pub fn with_pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            listing_code: Regex::new(pattern)?,
        })
    }

    /// Extract identifiers. Missing codes are reported as `None`.
    pub fn extract<S: AsRef<str>>(&self, lines: &[S]) -> Identifiers {
        let listing_code = lines
            .iter()
            .map(|l| l.as_ref().trim())
            .find(|l| self.listing_code.is_match(l))
            .map(str::to_string);

        let product_code = lines
            .iter()
            .map(|l| l.as_ref().trim())
            .find(|l| !l.is_empty())
            .map(str::to_string);

        if listing_code.is_none() {
            debug!("No listing code found in {} lines", lines.len());
        }

        Identifiers {
            listing_code,
            product_code,
        }
    }
}

impl Default for IdentifierExtractor {
    fn default() -> Self {
        Self::new()
    }
}
