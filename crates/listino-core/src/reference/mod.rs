//! Reference price list: sheet loading and the per-listing index.

mod index;
mod sheet;

pub use index::{
    normalize_header, ReferenceIndex, ReferenceItem, ITEM_CODE_COLUMN, LISTING_CODE_COLUMN,
    REQUIRED_COLUMNS, UNIT_PRICE_COLUMN,
};
pub use sheet::ReferenceSheet;

use std::path::Path;

use crate::error::ValidationError;

/// Load a reference sheet and build its index in one step.
pub fn load_index(path: &Path) -> Result<ReferenceIndex, ValidationError> {
    let sheet = ReferenceSheet::load(path)?;
    ReferenceIndex::from_sheet(&sheet)
}
