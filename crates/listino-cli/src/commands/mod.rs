//! Subcommand implementations.

pub mod check;
pub mod config;
pub mod extract;

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use listino_core::models::config::ListinoConfig;
use listino_core::ocr::engine_from_config;
use listino_core::FileRenderer;

/// Load and validate the configuration: the `--config` file if given,
/// otherwise the default config file when it exists, otherwise defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<ListinoConfig> {
    let config = match config_path {
        Some(path) => ListinoConfig::from_file(Path::new(path))
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {}", path, e))?,
        None => {
            let default_path = config::default_config_path();
            if default_path.exists() {
                debug!("Using config file {}", default_path.display());
                ListinoConfig::from_file(&default_path)?
            } else {
                ListinoConfig::default()
            }
        }
    };

    config.validate()?;
    Ok(config)
}

/// File renderer with OCR attached when the models can be loaded.
pub fn build_renderer(config: &ListinoConfig) -> FileRenderer {
    let renderer = FileRenderer::new(config.pdf.clone());

    match engine_from_config(&config.ocr) {
        Ok(engine) => renderer.with_ocr(Arc::from(engine)),
        Err(e) => {
            info!("OCR disabled: {}", e);
            renderer
        }
    }
}
