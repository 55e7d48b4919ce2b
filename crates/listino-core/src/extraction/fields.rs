//! Pricing field parser.

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::models::document::ExtractedField;

use super::patterns::{CTE_FIELD_PATTERNS, VALUE_SEPARATOR};

lazy_static! {
    static ref CTE_PATTERN_SET: FieldPatternSet = FieldPatternSet::new(CTE_FIELD_PATTERNS).unwrap();
}

/// Which line is kept when several lines produce the same label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelCollision {
    /// The later line replaces the earlier one. The label keeps the
    /// position of its first appearance.
    #[default]
    LastWins,
    /// The first line is kept, later ones are ignored.
    FirstWins,
}

/// Ordered list of field label patterns.
///
/// Patterns are matched case-insensitively. For each line only the first
/// matching pattern counts, so the order of the list is the priority order.
#[derive(Debug, Clone)]
pub struct FieldPatternSet {
    patterns: Vec<Regex>,
}

impl FieldPatternSet {
    /// Compile patterns in priority order.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, regex::Error> {
        let patterns = patterns
            .iter()
            .map(|p| RegexBuilder::new(p.as_ref()).case_insensitive(true).build())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns })
    }

    /// The standard CTE pricing terms.
    pub fn cte() -> Self {
        CTE_PATTERN_SET.clone()
    }

    /// Index of the first pattern matching the line.
    pub fn first_match(&self, line: &str) -> Option<usize> {
        self.patterns.iter().position(|p| p.is_match(line))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Default for FieldPatternSet {
    fn default() -> Self {
        Self::cte()
    }
}

/// Extracts labeled pricing fields from document lines.
#[derive(Debug, Clone, Default)]
pub struct FieldParser {
    patterns: FieldPatternSet,
    collision: LabelCollision,
}

impl FieldParser {
    /// Create a parser with the standard CTE patterns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom pattern set.
    pub fn with_patterns(mut self, patterns: FieldPatternSet) -> Self {
        self.patterns = patterns;
        self
    }

    /// Set the label collision policy.
    pub fn with_collision(mut self, collision: LabelCollision) -> Self {
        self.collision = collision;
        self
    }

    /// Parse fields from lines, keyed by label in document order.
    pub fn parse<S: AsRef<str>>(&self, lines: &[S]) -> IndexMap<String, ExtractedField> {
        let mut fields: IndexMap<String, ExtractedField> = IndexMap::new();

        for line in lines {
            let line = line.as_ref();
            let Some(pattern_idx) = self.patterns.first_match(line) else {
                continue;
            };

            let field = split_field(line);
            trace!("Pattern {} matched line {:?}", pattern_idx, line);

            match self.collision {
                LabelCollision::LastWins => {
                    if let Some(previous) = fields.insert(field.label.clone(), field) {
                        debug!("Label {:?} seen again, replacing earlier value", previous.label);
                    }
                }
                LabelCollision::FirstWins => {
                    fields.entry(field.label.clone()).or_insert(field);
                }
            }
        }

        debug!("Extracted {} fields from {} lines", fields.len(), lines.len());
        fields
    }
}

/// Split a line into label and value at the first separator.
///
/// A line without a separator becomes a field whose label is the whole
/// line and whose value is absent.
pub fn split_field(line: &str) -> ExtractedField {
    let trimmed = line.trim();

    let (label, value) = match VALUE_SEPARATOR.find(trimmed) {
        Some(sep) => {
            let value = trimmed[sep.end()..].trim();
            (
                trimmed[..sep.start()].trim(),
                (!value.is_empty()).then(|| value.to_string()),
            )
        }
        None => (trimmed, None),
    };

    ExtractedField {
        label: label.to_string(),
        value,
        source_line: line.to_string(),
    }
}
