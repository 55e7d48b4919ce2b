//! Field and identifier extraction from rendered document text.

mod fields;
mod identifiers;
pub mod patterns;

pub use fields::{split_field, FieldParser, FieldPatternSet, LabelCollision};
pub use identifiers::IdentifierExtractor;

use crate::error::ListinoError;
use crate::models::config::ExtractionConfig;

/// Build the field parser and identifier extractor described by a config.
pub fn from_config(
    config: &ExtractionConfig,
) -> Result<(FieldParser, IdentifierExtractor), ListinoError> {
    let patterns = FieldPatternSet::new(&config.field_patterns)
        .map_err(|e| ListinoError::Config(format!("invalid field pattern: {}", e)))?;
    let identifiers = IdentifierExtractor::with_pattern(&config.listing_code_pattern)
        .map_err(|e| ListinoError::Config(format!("invalid listing code pattern: {}", e)))?;

    let parser = FieldParser::new()
        .with_patterns(patterns)
        .with_collision(config.label_collision);

    Ok((parser, identifiers))
}
