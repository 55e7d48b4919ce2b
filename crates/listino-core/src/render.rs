//! Turning source documents into plain text.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{ExtractionError, OcrError};
use crate::models::config::PdfConfig;
use crate::ocr::OcrEngine;
use crate::pdf::PdfExtractor;

/// Trait for document renderers.
///
/// `page` is 1-indexed. Implementations are blocking and may be slow; the
/// pipeline calls them from a blocking thread with a timeout.
pub trait DocumentRenderer: Send + Sync {
    /// Render one page of a document as text.
    fn render(&self, path: &Path, page: u32) -> Result<String, ExtractionError>;
}

/// Renderer choosing a strategy from the file extension.
///
/// - `.txt` files are already rendered text.
/// - PDFs use the page's embedded text, falling back to OCR of the page
///   images when the text is shorter than `min_text_length`.
/// - Images go through OCR.
pub struct FileRenderer {
    pdf: PdfConfig,
    ocr: Option<Arc<dyn OcrEngine>>,
}

impl FileRenderer {
    /// Create a renderer without OCR.
    pub fn new(pdf: PdfConfig) -> Self {
        Self { pdf, ocr: None }
    }

    /// Attach an OCR engine for images and scanned PDFs.
    pub fn with_ocr(mut self, ocr: Arc<dyn OcrEngine>) -> Self {
        self.ocr = Some(ocr);
        self
    }

    fn ocr(&self) -> Result<&dyn OcrEngine, ExtractionError> {
        self.ocr
            .as_deref()
            .ok_or_else(|| OcrError::ModelLoad("no OCR engine configured".to_string()).into())
    }

    fn render_pdf(&self, path: &Path, page: u32) -> Result<String, ExtractionError> {
        let data = std::fs::read(path)?;
        let extractor = PdfExtractor::from_bytes(&data)?;

        let text = extractor.page_text(page)?;
        if text.trim().len() >= self.pdf.min_text_length {
            debug!("Using embedded text of page {} ({} chars)", page, text.len());
            return Ok(text);
        }

        let Some(ocr) = self.ocr.as_deref() else {
            warn!(
                "Page {} of {} has little embedded text and no OCR engine is configured",
                page,
                path.display()
            );
            return Ok(text);
        };

        let images = extractor.page_images(page)?;
        if images.is_empty() {
            return Ok(text);
        }

        let mut parts = Vec::with_capacity(images.len());
        for (i, image) in images.iter().enumerate() {
            match ocr.recognize(image) {
                Ok(t) if !t.trim().is_empty() => parts.push(t),
                Ok(_) => debug!("No text detected in image {}", i + 1),
                Err(e) => warn!("OCR failed for image {} of page {}: {}", i + 1, page, e),
            }
        }

        if parts.is_empty() {
            return Ok(text);
        }
        Ok(parts.join("\n"))
    }

    fn render_image(&self, path: &Path) -> Result<String, ExtractionError> {
        let ocr = self.ocr()?;
        let image = image::open(path).map_err(|e| OcrError::InvalidImage(e.to_string()))?;
        Ok(ocr.recognize(&image)?)
    }
}

impl DocumentRenderer for FileRenderer {
    fn render(&self, path: &Path, page: u32) -> Result<String, ExtractionError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        info!("Rendering {} (page {})", path.display(), page);

        let text = match extension.as_str() {
            "txt" => std::fs::read_to_string(path)?,
            "pdf" => self.render_pdf(path, page)?,
            "png" | "jpg" | "jpeg" | "tif" | "tiff" | "bmp" | "webp" => self.render_image(path)?,
            _ => return Err(ExtractionError::UnsupportedFormat(extension)),
        };

        if text.trim().is_empty() {
            return Err(ExtractionError::NoText);
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("offerta.txt");
        std::fs::write(&path, "Offerta Casa\nLST00123\n").unwrap();

        let text = FileRenderer::new(PdfConfig::default()).render(&path, 2).unwrap();
        assert_eq!(text, "Offerta Casa\nLST00123\n");
    }

    #[test]
    fn test_blank_document_has_no_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vuoto.txt");
        std::fs::write(&path, "  \n\n").unwrap();

        let err = FileRenderer::new(PdfConfig::default()).render(&path, 1).unwrap_err();
        assert!(matches!(err, ExtractionError::NoText));
    }

    #[test]
    fn test_unsupported_format() {
        let err = FileRenderer::new(PdfConfig::default())
            .render(Path::new("offerta.docx"), 1)
            .unwrap_err();
        assert!(matches!(err, ExtractionError::UnsupportedFormat(ext) if ext == "docx"));
    }

    #[test]
    fn test_image_without_ocr_engine() {
        let err = FileRenderer::new(PdfConfig::default())
            .render(Path::new("scan.png"), 1)
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Ocr(OcrError::ModelLoad(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = FileRenderer::new(PdfConfig::default())
            .render(Path::new("/nonexistent/offerta.pdf"), 1)
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Io(_)));
    }
}
