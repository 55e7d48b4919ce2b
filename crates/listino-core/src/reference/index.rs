//! Lookup of expected price items grouped by listing code.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ValidationError;

use super::sheet::ReferenceSheet;

/// Column holding the item code.
pub const ITEM_CODE_COLUMN: &str = "codice item";
/// Column holding the listing code.
pub const LISTING_CODE_COLUMN: &str = "codice listino";
/// Column holding the unit price.
pub const UNIT_PRICE_COLUMN: &str = "prezzo unitario";

/// Required columns, in the order they are checked.
pub const REQUIRED_COLUMNS: [&str; 3] = [ITEM_CODE_COLUMN, LISTING_CODE_COLUMN, UNIT_PRICE_COLUMN];

/// One row of the reference sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceItem {
    pub item_code: String,
    pub listing_code: String,
    /// Kept as text; prices are compared as strings.
    pub unit_price: String,
}

/// Immutable mapping from listing code to its reference items.
///
/// Items keep the sheet's row order inside each group; the reconciler
/// relies on it to break ties.
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    groups: BTreeMap<String, Vec<ReferenceItem>>,
    item_count: usize,
}

/// Normalize a header cell for column lookup.
pub fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase()
}

impl ReferenceIndex {
    /// Build the index from a header row and data rows.
    ///
    /// Fails with [`ValidationError::MissingColumn`] before reading any row
    /// when a required column is absent.
    pub fn from_rows<H, R, C>(headers: &[H], rows: R) -> Result<Self, ValidationError>
    where
        H: AsRef<str>,
        R: IntoIterator<Item = Vec<C>>,
        C: AsRef<str>,
    {
        let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h.as_ref())).collect();

        let mut positions = [0usize; 3];
        for (slot, column) in positions.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = normalized
                .iter()
                .position(|h| h == column)
                .ok_or_else(|| ValidationError::MissingColumn(column.to_string()))?;
        }
        let [item_col, listing_col, price_col] = positions;

        let mut index = Self::default();
        let mut skipped = 0usize;

        for row in rows {
            let cell = |i: usize| row.get(i).map(|c| c.as_ref().to_string()).unwrap_or_default();
            let item = ReferenceItem {
                item_code: cell(item_col),
                listing_code: cell(listing_col),
                unit_price: cell(price_col),
            };

            if item.item_code.trim().is_empty() || item.listing_code.trim().is_empty() {
                skipped += 1;
                continue;
            }

            index.push(item);
        }

        if skipped > 0 {
            debug!("Skipped {} reference rows without item or listing code", skipped);
        }
        info!(
            "Built reference index: {} items across {} listing codes",
            index.item_count,
            index.groups.len()
        );

        Ok(index)
    }

    /// Build the index from a loaded sheet.
    pub fn from_sheet(sheet: &ReferenceSheet) -> Result<Self, ValidationError> {
        Self::from_rows(sheet.headers.as_slice(), sheet.rows.iter().cloned())
    }

    fn push(&mut self, item: ReferenceItem) {
        self.item_count += 1;
        self.groups
            .entry(item.listing_code.clone())
            .or_default()
            .push(item);
    }

    /// Items for a listing code, in sheet order. Unknown or absent codes
    /// give an empty slice.
    pub fn candidates(&self, listing_code: Option<&str>) -> &[ReferenceItem] {
        listing_code
            .and_then(|code| self.groups.get(code))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains(&self, listing_code: &str) -> bool {
        self.groups.contains_key(listing_code)
    }

    /// Listing codes in sorted order.
    pub fn listing_codes(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Total number of items.
    pub fn len(&self) -> usize {
        self.item_count
    }

    pub fn is_empty(&self) -> bool {
        self.item_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_headers_are_case_and_whitespace_insensitive() {
        let headers = ["  Codice ITEM ", "CODICE LISTINO", "Prezzo Unitario\t"];
        let index =
            ReferenceIndex::from_rows(&headers, vec![row(&["Prezzo Luce", "LST00123", "0.12"])])
                .unwrap();

        assert_eq!(index.len(), 1);
        assert_eq!(index.candidates(Some("LST00123"))[0].unit_price, "0.12");
    }

    #[test]
    fn test_missing_column_is_reported() {
        let headers = ["codice item", "codice listino", "prezzo"];
        let err = ReferenceIndex::from_rows(&headers, Vec::<Vec<String>>::new()).unwrap_err();

        assert_eq!(err, ValidationError::MissingColumn("prezzo unitario".to_string()));
        assert_eq!(err.to_string(), "missing column 'prezzo unitario' in the reference sheet");
    }

    #[test]
    fn test_first_missing_column_in_check_order() {
        let headers = ["descrizione"];
        let err = ReferenceIndex::from_rows(&headers, Vec::<Vec<String>>::new()).unwrap_err();
        assert_eq!(err, ValidationError::MissingColumn("codice item".to_string()));
    }

    #[test]
    fn test_groups_preserve_row_order() {
        let headers = ["prezzo unitario", "codice listino", "codice item", "note"];
        let rows = vec![
            row(&["0.12", "LST00123", "Prezzo Luce", ""]),
            row(&["0.45", "LST00999", "Prezzo gas", ""]),
            row(&["8.00", "LST00123", "PCV Fissa Listino", "x"]),
        ];
        let index = ReferenceIndex::from_rows(&headers, rows).unwrap();

        let items: Vec<&str> = index
            .candidates(Some("LST00123"))
            .iter()
            .map(|i| i.item_code.as_str())
            .collect();
        assert_eq!(items, vec!["Prezzo Luce", "PCV Fissa Listino"]);
        assert_eq!(index.listing_codes().collect::<Vec<_>>(), vec!["LST00123", "LST00999"]);
    }

    #[test]
    fn test_values_are_kept_as_text() {
        let headers = ["codice item", "codice listino", "prezzo unitario"];
        let index =
            ReferenceIndex::from_rows(&headers, vec![row(&["Fee", "LST00123", "0.120"])]).unwrap();

        assert_eq!(index.candidates(Some("LST00123"))[0].unit_price, "0.120");
    }

    #[test]
    fn test_unknown_and_absent_codes_have_no_candidates() {
        let headers = ["codice item", "codice listino", "prezzo unitario"];
        let index =
            ReferenceIndex::from_rows(&headers, vec![row(&["Fee", "LST00123", "1"])]).unwrap();

        assert!(index.candidates(Some("LST00999")).is_empty());
        assert!(index.candidates(None).is_empty());
    }

    #[test]
    fn test_short_and_blank_rows() {
        let headers = ["codice item", "codice listino", "prezzo unitario"];
        let rows = vec![row(&["Fee", "LST00123"]), row(&["", "", ""]), row(&["  ", "LST1", "2"])];
        let index = ReferenceIndex::from_rows(&headers, rows).unwrap();

        assert_eq!(index.len(), 1);
        assert_eq!(index.candidates(Some("LST00123"))[0].unit_price, "");
    }
}
