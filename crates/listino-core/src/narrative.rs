//! Narrative report generation.
//!
//! The narrative is produced by an external text-generation service. The
//! service handle is created once per process and injected into the
//! pipeline; it holds no per-run state and may be called concurrently.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::GenerationError;
use crate::models::config::NarrativeConfig;
use crate::models::report::DocumentReport;

/// Marker appended when the serialized reports do not fit in the prompt.
pub const TRUNCATION_MARKER: &str = "\n... [troncato]";

/// Trait for narrative-generation services.
pub trait Summarizer: Send + Sync {
    /// Turn a prompt into Markdown text. Blocking.
    fn summarize(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Build the generation prompt: instruction followed by the reports as
/// JSON, cut to `max_chars` characters.
pub fn build_prompt(
    instruction: &str,
    reports: &[DocumentReport],
    max_chars: usize,
) -> Result<String, GenerationError> {
    let payload = serde_json::to_string_pretty(reports)
        .map_err(|e| GenerationError::InvalidResponse(format!("cannot serialize reports: {}", e)))?;

    let prompt = format!("{}\n\n{}", instruction, payload);
    if prompt.chars().count() <= max_chars {
        return Ok(prompt);
    }

    let keep = max_chars.saturating_sub(TRUNCATION_MARKER.chars().count());
    let mut truncated: String = prompt.chars().take(keep).collect();
    truncated.push_str(TRUNCATION_MARKER);

    debug!("Prompt truncated from {} bytes to {} chars", prompt.len(), max_chars);
    Ok(truncated)
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Client for a JSON text-generation endpoint.
///
/// Sends `{"model", "prompt", "stream": false}` and reads the `response`
/// field of the reply.
pub struct HttpSummarizer {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
}

impl HttpSummarizer {
    /// Create a client for the endpoint in the config.
    pub fn from_config(config: &NarrativeConfig) -> Result<Self, GenerationError> {
        let endpoint = config.endpoint.clone().ok_or(GenerationError::NotConfigured)?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        info!("Narrative generation via {} ({})", endpoint, config.model);

        Ok(Self {
            client,
            endpoint,
            model: config.model.clone(),
        })
    }
}

impl Summarizer for HttpSummarizer {
    fn summarize(&self, prompt: &str) -> Result<String, GenerationError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&GenerateRequest {
                model: &self.model,
                prompt,
                stream: false,
            })
            .send()
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GenerationError::Request(format!("{}: {}", status, body)));
        }

        let body: GenerateResponse = response
            .json()
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        if body.response.trim().is_empty() {
            return Err(GenerationError::InvalidResponse("empty response".to_string()));
        }
        Ok(body.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportBuilder;

    #[test]
    fn test_prompt_contains_instruction_and_reports() {
        let reports = vec![ReportBuilder::new().failed("offerta.pdf", "boom")];
        let prompt = build_prompt("Riassumi:", &reports, 10_000).unwrap();

        assert!(prompt.starts_with("Riassumi:\n\n["));
        assert!(prompt.contains("\"document_name\": \"offerta.pdf\""));
        assert!(!prompt.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn test_prompt_truncation_respects_char_limit() {
        let reports: Vec<_> = (0..50)
            .map(|i| ReportBuilder::new().failed(format!("offerta-{i}.pdf"), "errore è grave"))
            .collect();
        let prompt = build_prompt("Riassumi:", &reports, 500).unwrap();

        assert_eq!(prompt.chars().count(), 500);
        assert!(prompt.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn test_http_summarizer_requires_endpoint() {
        let err = HttpSummarizer::from_config(&NarrativeConfig::default()).err().unwrap();
        assert!(matches!(err, GenerationError::NotConfigured));
    }
}
