//! Report assembly and rendering.

mod builder;

pub use builder::{render_table, ReportBuilder, TABLE_HEADER};

use crate::models::report::DocumentReport;

/// Serialize a report collection as pretty JSON.
///
/// Output depends only on the reports, so identical runs produce identical
/// bytes.
pub fn to_json(reports: &[DocumentReport]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(reports)
}

/// Markdown view of a whole run: one section per document with its
/// identifiers and comparison table.
pub fn render_markdown(reports: &[DocumentReport]) -> String {
    let mut output = String::from("# Report listini\n");

    for report in reports {
        output.push_str(&format!("\n## {}\n\n", report.document_name));

        if let Some(error) = &report.error {
            output.push_str(&format!("Elaborazione fallita: {}\n", error));
            continue;
        }

        output.push_str(&format!(
            "- Codice listino: {}\n- Codice prodotto: {}\n\n",
            report.identifiers.listing_code.as_deref().unwrap_or("—"),
            report.identifiers.product_code.as_deref().unwrap_or("—"),
        ));
        output.push_str(&report.comparison_table);
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::document::Identifiers;
    use crate::models::report::{ComparisonRow, MatchStatus};
    use indexmap::IndexMap;

    #[test]
    fn test_render_markdown_sections() {
        let builder = ReportBuilder::new();
        let ok = builder.build(
            "offerta.pdf",
            Identifiers {
                listing_code: Some("LST00123".to_string()),
                product_code: Some("Offerta Casa".to_string()),
            },
            IndexMap::new(),
            vec![ComparisonRow {
                field: "Prezzo Luce".to_string(),
                extracted_value: Some("0.12".to_string()),
                expected_value: Some("0.12".to_string()),
                matched_item: Some("Prezzo Luce".to_string()),
                score: Some(100),
                status: MatchStatus::Ok,
            }],
        );
        let failed = builder.failed("rotto.pdf", "PDF has no pages");

        let md = render_markdown(&[ok, failed]);
        assert!(md.contains("## offerta.pdf"));
        assert!(md.contains("- Codice listino: LST00123"));
        assert!(md.contains("|Prezzo Luce|0.12|0.12|OK|"));
        assert!(md.contains("## rotto.pdf\n\nElaborazione fallita: PDF has no pages"));
    }
}
