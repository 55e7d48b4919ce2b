//! OCR of page images.

#[cfg(feature = "native")]
mod onnx;

#[cfg(feature = "native")]
pub use onnx::OnnxOcrEngine;

use std::cmp::Ordering;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::OcrError;
use crate::models::config::OcrConfig;

/// Trait for OCR backends turning an image into text lines.
pub trait OcrEngine: Send + Sync {
    /// Recognize the text of an image, one line per visual row in reading order.
    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError>;
}

/// A recognized text box.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBox {
    /// Quadrilateral corners (x1, y1, x2, y2, x3, y3, x4, y4).
    pub bbox: [f32; 8],

    /// Recognized text content.
    pub text: String,

    /// Recognition confidence score (0.0 - 1.0).
    pub confidence: f32,
}

impl TextBox {
    /// Axis-aligned bounding rectangle (min_x, min_y, max_x, max_y).
    pub fn rect(&self) -> (f32, f32, f32, f32) {
        let xs = [self.bbox[0], self.bbox[2], self.bbox[4], self.bbox[6]];
        let ys = [self.bbox[1], self.bbox[3], self.bbox[5], self.bbox[7]];

        let min_x = xs.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_x = xs.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let min_y = ys.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_y = ys.iter().cloned().fold(f32::NEG_INFINITY, f32::max);

        (min_x, min_y, max_x, max_y)
    }
}

/// Separator between boxes on the same visual row.
pub const CELL_SEPARATOR: &str = "  ";

/// Group boxes into visual rows.
///
/// Boxes are taken top-to-bottom by vertical center. A box joins the
/// current row when its vertical overlap with the row covers at least half
/// of the shorter of the two. Each row is ordered left-to-right.
pub fn group_into_rows(boxes: &[TextBox]) -> Vec<Vec<&TextBox>> {
    let mut sorted: Vec<(&TextBox, (f32, f32, f32, f32))> = boxes.iter().map(|b| (b, b.rect())).collect();
    sorted.sort_by(|(_, a), (_, b)| {
        let center_a = (a.1 + a.3) / 2.0;
        let center_b = (b.1 + b.3) / 2.0;
        center_a.partial_cmp(&center_b).unwrap_or(Ordering::Equal)
    });

    let mut rows: Vec<(f32, f32, Vec<(&TextBox, f32)>)> = Vec::new();
    for (text_box, (min_x, min_y, _, max_y)) in sorted {
        let joins = rows.last().is_some_and(|(top, bottom, _)| {
            let overlap = bottom.min(max_y) - top.max(min_y);
            let shorter = (bottom - top).min(max_y - min_y).max(1.0);
            overlap >= shorter / 2.0
        });

        match rows.last_mut() {
            Some((top, bottom, members)) if joins => {
                *top = top.min(min_y);
                *bottom = bottom.max(max_y);
                members.push((text_box, min_x));
            }
            _ => rows.push((min_y, max_y, vec![(text_box, min_x)])),
        }
    }

    rows.into_iter()
        .map(|(_, _, mut members)| {
            members.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
            members.into_iter().map(|(b, _)| b).collect()
        })
        .collect()
}

/// Join boxes into text: one line per visual row, boxes on a row separated
/// by [`CELL_SEPARATOR`].
pub fn boxes_to_text(boxes: &[TextBox]) -> String {
    group_into_rows(boxes)
        .iter()
        .map(|row| {
            row.iter()
                .map(|b| b.text.trim())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(CELL_SEPARATOR)
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Load the OCR engine described by the config, if the build has one.
pub fn engine_from_config(config: &OcrConfig) -> Result<Box<dyn OcrEngine>, OcrError> {
    #[cfg(feature = "native")]
    {
        Ok(Box::new(OnnxOcrEngine::from_config(config)?))
    }

    #[cfg(not(feature = "native"))]
    {
        let _ = config;
        Err(OcrError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::FieldParser;

    fn text_box(text: &str, x: f32, y: f32) -> TextBox {
        TextBox {
            bbox: [x, y, x + 50.0, y, x + 50.0, y + 10.0, x, y + 10.0],
            text: text.to_string(),
            confidence: 0.9,
        }
    }

    #[test]
    fn test_reading_order() {
        let boxes = vec![
            text_box("0.12 €/kWh", 300.0, 102.0),
            text_box("LST00123", 10.0, 200.0),
            text_box("Prezzo Luce", 10.0, 100.0),
            text_box("Offerta Casa", 10.0, 10.0),
        ];

        assert_eq!(
            boxes_to_text(&boxes),
            "Offerta Casa\nPrezzo Luce  0.12 €/kWh\nLST00123"
        );
    }

    #[test]
    fn test_row_straddling_band_boundary() {
        let boxes = vec![text_box("0.45", 200.0, 21.0), text_box("Prezzo gas", 10.0, 18.0)];
        assert_eq!(group_into_rows(&boxes).len(), 1);
        assert_eq!(boxes_to_text(&boxes), "Prezzo gas  0.45");
    }

    #[test]
    fn test_separate_rows_stay_apart() {
        let boxes = vec![text_box("Fee Primo Anno", 10.0, 120.0), text_box("Prezzo Luce", 10.0, 100.0)];
        assert_eq!(boxes_to_text(&boxes), "Prezzo Luce\nFee Primo Anno");
    }

    #[test]
    fn test_ocr_row_parses_to_label_and_value() {
        let boxes = vec![text_box("Prezzo Luce", 10.0, 100.0), text_box("0.12 €/kWh", 300.0, 101.0)];
        let text = boxes_to_text(&boxes);
        let lines: Vec<&str> = text.lines().collect();

        let fields = FieldParser::new().parse(&lines);
        let field = &fields["Prezzo Luce"];
        assert_eq!(field.value.as_deref(), Some("0.12 €/kWh"));
    }
}
