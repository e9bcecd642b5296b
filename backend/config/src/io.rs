//! Config file discovery and loading.

use crate::schema::PipelineConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

const CONFIG_FILE_NAME: &str = "config.yaml";

/// Resolve the config file path.
/// Priority: `DOCEXTRACT_CONFIG` env > `<config dir>/docextract/config.yaml` > `./docextract.yaml`
pub fn config_file_path() -> PathBuf {
    if let Ok(path) = std::env::var("DOCEXTRACT_CONFIG") {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    match dirs::config_dir() {
        Some(dir) => dir.join("docextract").join(CONFIG_FILE_NAME),
        None => PathBuf::from("docextract.yaml"),
    }
}

/// Read and parse a YAML config into a JSON value tree.
///
/// A missing file yields an empty object so every field falls back to its
/// default. Substitution and typing happen in [`crate::load_and_prepare`].
pub async fn load_raw(path: &Path) -> Result<serde_json::Value> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(serde_json::Value::Object(Default::default()));
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    if raw.trim().is_empty() {
        return Ok(serde_json::Value::Object(Default::default()));
    }

    let value: serde_json::Value = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?;

    info!(path = %path.display(), "Loaded config");
    Ok(value)
}

/// Parse a config file without env substitution.
pub async fn load_config(path: &Path) -> Result<PipelineConfig> {
    let value = load_raw(path).await?;
    serde_json::from_value(value)
        .with_context(|| format!("Config at {} does not match the schema", path.display()))
}
