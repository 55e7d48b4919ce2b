//! Reference sheet loading from Excel/ODS workbooks and CSV files.

use std::path::Path;

use calamine::{open_workbook_auto, Data, DataType, Reader};
use tracing::{debug, info};

use crate::error::ValidationError;

/// Tabular content of a reference sheet, every cell as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceSheet {
    /// Header row as written in the file.
    pub headers: Vec<String>,
    /// Data rows below the header.
    pub rows: Vec<Vec<String>>,
}

impl ReferenceSheet {
    /// Load a sheet, choosing the reader from the file extension.
    pub fn load(path: &Path) -> Result<Self, ValidationError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        info!("Loading reference sheet: {}", path.display());

        let sheet = match extension.as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Self::load_workbook(path)?,
            "csv" => Self::load_csv(path)?,
            _ => return Err(ValidationError::UnsupportedFormat(extension)),
        };

        debug!(
            "Reference sheet has {} columns and {} rows",
            sheet.headers.len(),
            sheet.rows.len()
        );
        Ok(sheet)
    }

    /// Read the first worksheet of a workbook.
    fn load_workbook(path: &Path) -> Result<Self, ValidationError> {
        let mut workbook =
            open_workbook_auto(path).map_err(|e| ValidationError::Unreadable(e.to_string()))?;

        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or(ValidationError::Empty)?;

        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| ValidationError::Unreadable(format!("sheet '{}': {}", sheet_name, e)))?;

        let mut rows = range.rows();
        let headers = rows
            .next()
            .ok_or(ValidationError::Empty)?
            .iter()
            .map(cell_to_string)
            .collect();
        let rows = rows.map(|row| row.iter().map(cell_to_string).collect()).collect();

        Ok(Self { headers, rows })
    }

    /// Read a comma-separated file with a header row.
    fn load_csv(path: &Path) -> Result<Self, ValidationError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|e| ValidationError::Unreadable(e.to_string()))?;

        Self::read_csv(&mut reader)
    }

    /// Parse CSV content held in memory.
    pub fn from_csv_str(content: &str) -> Result<Self, ValidationError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(content.as_bytes());

        Self::read_csv(&mut reader)
    }

    fn read_csv<R: std::io::Read>(reader: &mut csv::Reader<R>) -> Result<Self, ValidationError> {
        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| ValidationError::Unreadable(e.to_string()))?
            .iter()
            .map(str::to_string)
            .collect();

        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(ValidationError::Empty);
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| ValidationError::Unreadable(e.to_string()))?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, rows })
    }
}

/// Render a workbook cell as text without numeric reformatting.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        _ => cell.as_string().unwrap_or_else(|| cell.to_string()),
    }
}
