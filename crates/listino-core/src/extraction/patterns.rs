//! Common regex patterns for price-offer extraction.

use lazy_static::lazy_static;
use regex::Regex;

/// Labels of the standard CTE pricing terms, highest priority first.
pub const CTE_FIELD_PATTERNS: &[&str] = &[
    r"Prezzo Luce",
    r"Prezzo.*perdite",
    r"Prezzo gas",
    r"Fee.*Listino.*PrimoAnno",
    r"PCV Fissa Listino",
    r"QVD Fissa Listino",
    r"Fee Gas Listino",
    r"Fee Primo Anno",
    r"Sconto Fedeltà",
    r"Perdite di rete",
    r"Indice GO",
    r"PrezzoMisuratore",
];

/// A listing code is a whole line of uppercase letters, digits and underscores.
pub const LISTING_CODE_PATTERN: &str = r"^[A-Z0-9_]{5,}$";

lazy_static! {
    // Label/value separator: a run of two or more spaces, or ": "
    pub static ref VALUE_SEPARATOR: Regex = Regex::new(r"\s{2,}|: ").unwrap();

    pub static ref LISTING_CODE: Regex = Regex::new(LISTING_CODE_PATTERN).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_patterns_compile() {
        for pattern in CTE_FIELD_PATTERNS {
            assert!(Regex::new(pattern).is_ok(), "bad pattern {pattern}");
        }
    }

    #[test]
    fn test_listing_code_pattern() {
        assert!(LISTING_CODE.is_match("LST00123"));
        assert!(LISTING_CODE.is_match("A_B_C"));
        assert!(!LISTING_CODE.is_match("LST1"));
        assert!(!LISTING_CODE.is_match("lst00123"));
        assert!(!LISTING_CODE.is_match("LST 00123"));
    }

    #[test]
    fn test_value_separator() {
        assert!(VALUE_SEPARATOR.is_match("Prezzo Luce   0.12"));
        assert!(VALUE_SEPARATOR.is_match("Prezzo Luce: 0.12"));
        assert!(!VALUE_SEPARATOR.is_match("Prezzo Luce 0.12"));
    }
}
