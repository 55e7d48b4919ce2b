//! Reconciliation of extracted fields with reference items.

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::models::config::MatchingConfig;
use crate::models::document::ExtractedField;
use crate::models::report::{ComparisonRow, MatchStatus};
use crate::reference::ReferenceItem;

use super::{SimilarityScorer, TokenSortRatio};

/// Minimum score for accepting a reference item.
pub const DEFAULT_THRESHOLD: u8 = 80;

/// Status of a comparison row.
///
/// `accepted` is whether a candidate scored at or above the threshold.
pub fn classify(extracted: Option<&str>, expected: Option<&str>, accepted: bool) -> MatchStatus {
    if !accepted {
        return MatchStatus::NotFound;
    }
    match (extracted, expected) {
        (Some(a), Some(b)) if a == b => MatchStatus::Ok,
        _ => MatchStatus::Different,
    }
}

/// Matches field labels against reference item codes.
///
/// Holds no per-document state; the same reconciler can be shared by
/// every document of a run.
pub struct Reconciler {
    scorer: Box<dyn SimilarityScorer>,
    threshold: u8,
}

impl Reconciler {
    /// Create a reconciler with the token-sort scorer and a threshold of 80.
    pub fn new() -> Self {
        Self {
            scorer: Box::new(TokenSortRatio),
            threshold: DEFAULT_THRESHOLD,
        }
    }

    /// Build a reconciler from configuration.
    pub fn from_config(config: &MatchingConfig) -> Self {
        Self {
            scorer: config.scorer.build(),
            threshold: config.threshold,
        }
    }

    /// Set the similarity scorer.
    pub fn with_scorer(mut self, scorer: Box<dyn SimilarityScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    /// Set the acceptance threshold (0-100).
    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Best-scoring candidate at or above the threshold.
    ///
    /// On equal scores the candidate listed first wins.
    pub fn best_match<'a>(
        &self,
        label: &str,
        candidates: &'a [ReferenceItem],
    ) -> Option<(&'a ReferenceItem, u8)> {
        let mut best: Option<(&ReferenceItem, u8)> = None;

        for candidate in candidates {
            let score = self.scorer.score(label, &candidate.item_code);
            trace!("{:?} vs {:?}: {}", label, candidate.item_code, score);

            if best.is_none_or(|(_, top)| score > top) {
                best = Some((candidate, score));
            }
        }

        best.filter(|(_, score)| *score >= self.threshold)
    }

    /// Compare one field with the candidates of its document.
    pub fn reconcile_field(&self, field: &ExtractedField, candidates: &[ReferenceItem]) -> ComparisonRow {
        let matched = self.best_match(&field.label, candidates);

        let expected_value = matched.map(|(item, _)| item.unit_price.clone());
        let status = classify(
            field.value.as_deref(),
            expected_value.as_deref(),
            matched.is_some(),
        );

        ComparisonRow {
            field: field.label.clone(),
            extracted_value: field.value.clone(),
            expected_value,
            matched_item: matched.map(|(item, _)| item.item_code.clone()),
            score: matched.map(|(_, score)| score),
            status,
        }
    }

    /// Compare every field of a document, keeping field order.
    pub fn reconcile(
        &self,
        fields: &IndexMap<String, ExtractedField>,
        candidates: &[ReferenceItem],
    ) -> Vec<ComparisonRow> {
        let rows: Vec<ComparisonRow> = fields
            .values()
            .map(|field| self.reconcile_field(field, candidates))
            .collect();

        debug!(
            "Reconciled {} fields against {} candidates with {} (threshold {})",
            rows.len(),
            candidates.len(),
            self.scorer.name(),
            self.threshold
        );
        rows
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}
