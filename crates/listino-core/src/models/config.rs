//! Configuration structures for the reconciliation pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ListinoError;
use crate::extraction::LabelCollision;
use crate::matching::ScorerKind;

/// Highest similarity score.
pub const MAX_SCORE: u8 = 100;

/// Main configuration for the listino pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListinoConfig {
    /// Field extraction configuration.
    pub extraction: ExtractionConfig,

    /// Fuzzy matching configuration.
    pub matching: MatchingConfig,

    /// PDF processing configuration.
    pub pdf: PdfConfig,

    /// OCR engine configuration.
    pub ocr: OcrConfig,

    /// Narrative generation configuration.
    pub narrative: NarrativeConfig,

    /// Worker pool configuration.
    pub pipeline: PipelineConfig,
}

/// Field extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Field label patterns, highest priority first.
    pub field_patterns: Vec<String>,

    /// Which line wins when several produce the same label.
    pub label_collision: LabelCollision,

    /// Pattern a whole trimmed line must match to be the listing code.
    pub listing_code_pattern: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            field_patterns: crate::extraction::patterns::CTE_FIELD_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            label_collision: LabelCollision::LastWins,
            listing_code_pattern: crate::extraction::patterns::LISTING_CODE_PATTERN.to_string(),
        }
    }
}

/// Fuzzy matching configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Similarity algorithm.
    pub scorer: ScorerKind,

    /// Minimum score (0-100) to accept a reference item.
    pub threshold: u8,
}

impl MatchingConfig {
    /// Reject thresholds outside the 0-100 score scale.
    pub fn validate(&self) -> Result<(), ListinoError> {
        if self.threshold > MAX_SCORE {
            return Err(ListinoError::Config(format!(
                "matching.threshold must be between 0 and {}, got {}",
                MAX_SCORE, self.threshold
            )));
        }
        Ok(())
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            scorer: ScorerKind::TokenSort,
            threshold: 80,
        }
    }
}

/// PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Page of interest (1-indexed).
    pub page: u32,

    /// Below this many characters of embedded text the page images are OCRed.
    pub min_text_length: usize,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            page: 2,
            min_text_length: 50,
        }
    }
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,

    /// Keep `[UNK]` markers in recognized text.
    pub keep_unk: bool,

    /// Per-document rendering timeout in seconds.
    pub timeout_secs: u64,

    /// Maximum number of documents rendered at the same time.
    pub max_concurrent: usize,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "latin_rec.onnx".to_string(),
            dictionary: "latin_dict.txt".to_string(),
            keep_unk: false,
            timeout_secs: 120,
            max_concurrent: 2,
        }
    }
}

/// Narrative generation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrativeConfig {
    /// Generation endpoint. No endpoint means no narrative.
    pub endpoint: Option<String>,

    /// Model name sent with each request.
    pub model: String,

    /// Instruction placed before the serialized reports.
    pub instruction: String,

    /// Upper bound on the prompt length in characters.
    pub max_prompt_chars: usize,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Maximum number of concurrent generation calls.
    pub max_concurrent: usize,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            model: "flan-t5-small".to_string(),
            instruction: "Genera un report utente-friendly in Markdown \
                          basato sui seguenti report JSON raw:"
                .to_string(),
            max_prompt_chars: 16_000,
            timeout_secs: 60,
            max_concurrent: 1,
        }
    }
}

/// Worker pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of documents processed concurrently.
    pub workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { workers: 4 }
    }
}

impl ListinoConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Check the values serde cannot: the threshold range and that every
    /// pattern compiles.
    pub fn validate(&self) -> Result<(), ListinoError> {
        self.matching.validate()?;
        crate::extraction::from_config(&self.extraction)?;
        Ok(())
    }
}
