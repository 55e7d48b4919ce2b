//! Per-document report builder.

use indexmap::IndexMap;
use tracing::debug;

use crate::models::document::{ExtractedField, Identifiers};
use crate::models::report::{ComparisonRow, DocumentReport, DocumentStatus, MatchStatus};

/// Header and separator of the comparison table.
pub const TABLE_HEADER: &str = "|Campo PDF|PDF estratto|Excel atteso|Stato|\n|---|---|---|---|\n";

/// Builds immutable document reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportBuilder;

impl ReportBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Report for a document that went through reconciliation.
    pub fn build(
        &self,
        document_name: impl Into<String>,
        identifiers: Identifiers,
        extracted_fields: IndexMap<String, ExtractedField>,
        comparison_rows: Vec<ComparisonRow>,
    ) -> DocumentReport {
        let document_name = document_name.into();
        let comparison_table = render_table(&comparison_rows);

        debug!(
            "Report for {}: {} ok, {} different, {} not found",
            document_name,
            count(&comparison_rows, MatchStatus::Ok),
            count(&comparison_rows, MatchStatus::Different),
            count(&comparison_rows, MatchStatus::NotFound),
        );

        DocumentReport {
            document_name,
            status: DocumentStatus::Processed,
            error: None,
            identifiers,
            extracted_fields,
            comparison_rows,
            comparison_table,
        }
    }

    /// Report for a document whose rendering failed.
    pub fn failed(&self, document_name: impl Into<String>, error: impl ToString) -> DocumentReport {
        DocumentReport {
            document_name: document_name.into(),
            status: DocumentStatus::Failed,
            error: Some(error.to_string()),
            identifiers: Identifiers::default(),
            extracted_fields: IndexMap::new(),
            comparison_rows: Vec::new(),
            comparison_table: render_table(&[]),
        }
    }
}

fn count(rows: &[ComparisonRow], status: MatchStatus) -> usize {
    rows.iter().filter(|r| r.status == status).count()
}

/// Render rows as a four-column Markdown table.
pub fn render_table(rows: &[ComparisonRow]) -> String {
    let mut table = String::from(TABLE_HEADER);

    for row in rows {
        let extracted = row.extracted_value.as_deref().unwrap_or("");
        let expected = row.expected_value.as_deref().unwrap_or("—");
        table.push_str(&format!(
            "|{}|{}|{}|{}|\n",
            escape_cell(&row.field),
            escape_cell(extracted),
            escape_cell(expected),
            row.status.label()
        ));
    }

    table
}

fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(field: &str, extracted: Option<&str>, expected: Option<&str>, status: MatchStatus) -> ComparisonRow {
        ComparisonRow {
            field: field.to_string(),
            extracted_value: extracted.map(str::to_string),
            expected_value: expected.map(str::to_string),
            matched_item: None,
            score: None,
            status,
        }
    }

    #[test]
    fn test_render_table() {
        let rows = vec![
            row("Prezzo Luce", Some("0.12 €/kWh"), Some("0.12"), MatchStatus::Different),
            row("Prezzo gas", Some("0.45"), Some("0.45"), MatchStatus::Ok),
            row("Indice GO", None, None, MatchStatus::NotFound),
        ];

        assert_eq!(
            render_table(&rows),
            "|Campo PDF|PDF estratto|Excel atteso|Stato|\n\
             |---|---|---|---|\n\
             |Prezzo Luce|0.12 €/kWh|0.12|Diverso|\n\
             |Prezzo gas|0.45|0.45|OK|\n\
             |Indice GO||—|Non trovato|\n"
        );
    }

    #[test]
    fn test_pipes_are_escaped() {
        let rows = vec![row("Fee | Listino", Some("1|2"), None, MatchStatus::NotFound)];
        assert!(render_table(&rows).contains("|Fee \\| Listino|1\\|2|—|Non trovato|"));
    }

    #[test]
    fn test_failed_report() {
        let report = ReportBuilder::new().failed("offerta.pdf", "OCR error: timeout");

        assert!(report.is_failed());
        assert_eq!(report.error.as_deref(), Some("OCR error: timeout"));
        assert!(report.comparison_rows.is_empty());
        assert_eq!(report.comparison_table, TABLE_HEADER);
    }

    #[test]
    fn test_build_counts() {
        let rows = vec![
            row("A", Some("1"), Some("1"), MatchStatus::Ok),
            row("B", Some("1"), Some("2"), MatchStatus::Different),
            row("C", Some("1"), None, MatchStatus::NotFound),
        ];
        let report = ReportBuilder::new().build("x.pdf", Identifiers::default(), IndexMap::new(), rows);

        assert_eq!(report.count(MatchStatus::Ok), 1);
        assert_eq!(report.count(MatchStatus::Different), 1);
        assert_eq!(report.count(MatchStatus::NotFound), 1);
        assert!(!report.is_failed());
    }
}
