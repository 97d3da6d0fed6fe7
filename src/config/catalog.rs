//! Model sources: the compiled-in salon catalog or a JSON model file on disk.

use crate::config::ModelConfig;
use crate::error::ConfigError;
use std::path::Path;

const SALON_MODEL: &str = include_str!("../../models/salon.json");

/// Built-in catalog of the salon/spa business domain.
pub fn salon_model() -> Result<ModelConfig, ConfigError> {
    parse_model(SALON_MODEL)
}

pub fn parse_model(json: &str) -> Result<ModelConfig, ConfigError> {
    serde_json::from_str(json).map_err(|e| ConfigError::Load(e.to_string()))
}

/// Load a model file (same format as `models/salon.json`).
pub async fn load_from_path(path: &Path) -> Result<ModelConfig, ConfigError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    parse_model(&content)
}
