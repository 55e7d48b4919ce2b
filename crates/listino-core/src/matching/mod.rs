//! Fuzzy matching of extracted fields against reference items.

mod reconciler;
mod scorers;

pub use reconciler::{classify, Reconciler, DEFAULT_THRESHOLD};
pub use scorers::{ratio, tokenize, TokenSetRatio, TokenSortRatio};

use serde::{Deserialize, Serialize};

/// Trait for string similarity algorithms.
///
/// Scores are on a 0-100 scale; 100 means identical after the scorer's
/// normalization. Implementations must be deterministic.
pub trait SimilarityScorer: Send + Sync {
    /// Score the similarity of two strings.
    fn score(&self, a: &str, b: &str) -> u8;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

/// Available similarity algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorerKind {
    /// Sorted-token edit similarity.
    #[default]
    TokenSort,
    /// Shared-token similarity, tolerant of extra words.
    TokenSet,
}

impl ScorerKind {
    /// Create the scorer for this kind.
    pub fn build(self) -> Box<dyn SimilarityScorer> {
        match self {
            ScorerKind::TokenSort => Box::new(TokenSortRatio),
            ScorerKind::TokenSet => Box::new(TokenSetRatio),
        }
    }
}
