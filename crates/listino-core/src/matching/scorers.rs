//! Token-based similarity scorers on a 0-100 scale.

use super::SimilarityScorer;

/// Lowercase, replace non-alphanumerics with spaces and split into tokens.
pub fn tokenize(s: &str) -> Vec<String> {
    s.chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Plain edit-distance similarity of two strings, 0-100.
pub fn ratio(a: &str, b: &str) -> u8 {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    (strsim::normalized_levenshtein(a, b) * 100.0).round() as u8
}

/// Compares the sorted tokens of both strings, so word order and case do
/// not matter.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenSortRatio;

impl SimilarityScorer for TokenSortRatio {
    fn score(&self, a: &str, b: &str) -> u8 {
        ratio(&sorted_tokens(a), &sorted_tokens(b))
    }

    fn name(&self) -> &'static str {
        "token_sort"
    }
}

fn sorted_tokens(s: &str) -> String {
    let mut tokens = tokenize(s);
    tokens.sort();
    tokens.join(" ")
}

/// Compares the shared tokens against each side's full token set, so extra
/// words on one side are tolerated.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenSetRatio;

impl SimilarityScorer for TokenSetRatio {
    fn score(&self, a: &str, b: &str) -> u8 {
        let mut left = tokenize(a);
        let mut right = tokenize(b);
        left.sort();
        left.dedup();
        right.sort();
        right.dedup();

        if left.is_empty() || right.is_empty() {
            return 0;
        }

        let shared: Vec<&str> = left
            .iter()
            .filter(|t| right.contains(t))
            .map(String::as_str)
            .collect();
        let only_left: Vec<&str> = left
            .iter()
            .filter(|t| !right.contains(t))
            .map(String::as_str)
            .collect();
        let only_right: Vec<&str> = right
            .iter()
            .filter(|t| !left.contains(t))
            .map(String::as_str)
            .collect();

        let shared = shared.join(" ");
        let combined_left = join_nonempty(&shared, &only_left.join(" "));
        let combined_right = join_nonempty(&shared, &only_right.join(" "));

        ratio(&shared, &combined_left)
            .max(ratio(&shared, &combined_right))
            .max(ratio(&combined_left, &combined_right))
    }

    fn name(&self) -> &'static str {
        "token_set"
    }
}

fn join_nonempty(a: &str, b: &str) -> String {
    match (a.is_empty(), b.is_empty()) {
        (true, _) => b.to_string(),
        (_, true) => a.to_string(),
        _ => format!("{} {}", a, b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("Prezzo  Luce (F1)"), vec!["prezzo", "luce", "f1"]);
        assert_eq!(tokenize("Sconto Fedeltà"), vec!["sconto", "fedeltà"]);
        assert!(tokenize(" -- ").is_empty());
    }

    #[test]
    fn test_token_sort_ignores_case_and_order() {
        let scorer = TokenSortRatio;
        assert_eq!(scorer.score("Prezzo Luce", "prezzo luce"), 100);
        assert_eq!(scorer.score("Luce Prezzo", "PREZZO LUCE"), 100);
        assert_eq!(scorer.score("Prezzo: Luce", "Prezzo Luce"), 100);
    }

    #[test]
    fn test_token_sort_partial_similarity() {
        let scorer = TokenSortRatio;
        let close = scorer.score("Prezzo Luse", "Prezzo Luce");
        let far = scorer.score("Prezzo gas", "Fee Primo Anno");

        assert!(close >= 80, "close score {close}");
        assert!(far < 50, "far score {far}");
    }

    #[test]
    fn test_empty_inputs_score_zero() {
        assert_eq!(TokenSortRatio.score("", "Prezzo"), 0);
        assert_eq!(TokenSortRatio.score("", ""), 0);
        assert_eq!(TokenSetRatio.score("...", "Prezzo"), 0);
    }

    #[test]
    fn test_token_set_tolerates_extra_words() {
        let scorer = TokenSetRatio;
        assert_eq!(scorer.score("Prezzo Luce F0 monoraria", "Prezzo Luce"), 100);
        assert!(TokenSortRatio.score("Prezzo Luce F0 monoraria", "Prezzo Luce") < 80);
    }
}
