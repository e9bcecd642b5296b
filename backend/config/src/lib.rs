//! Runtime configuration for the extraction pipeline.
//!
//! Provides:
//! - Typed config schema (OCR service, vision, AI, cache, logging)
//! - YAML loading with `${ENV_VAR}` substitution
//! - Env-only configuration for containers
//! - Service-account bundle parsing that tolerates mangled env vars
//! - Validation and redaction for safe display

pub mod credentials;
pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

pub use credentials::{CredentialsError, ServiceAccountCredentials};
pub use env::{resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_file_path, load_config, load_raw};
pub use redact::{redact, redact_value};
pub use schema::{
    AiConfig, CacheConfig, LoggingConfig, OcrServiceConfig, PipelineConfig, ResponseShape,
    VisionConfig,
};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;

/// Load a config file, substitute env references, overlay env vars, and validate.
///
/// Main entry point at startup. Validation findings are logged, not returned;
/// callers that need them can run [`validate`] again.
pub async fn load_and_prepare(path: &Path) -> Result<PipelineConfig> {
    let env: HashMap<String, String> = std::env::vars().collect();
    load_and_prepare_with(path, &env).await
}

/// [`load_and_prepare`] against an explicit environment.
pub async fn load_and_prepare_with(
    path: &Path,
    env: &HashMap<String, String>,
) -> Result<PipelineConfig> {
    let raw = load_raw(path).await?;
    let value = resolve_env_vars_with(&raw, env).context("Failed to resolve env vars in config")?;

    let mut config: PipelineConfig = serde_json::from_value(value)
        .with_context(|| format!("Config at {} does not match the schema", path.display()))?;

    config.apply_env_overrides(env);
    if let Err(e) = config.resolve_credentials() {
        tracing::warn!(error = %e, "Vision credentials unusable; vision OCR disabled");
    }

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_references_and_env_overlay_combine() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "ocr:\n  endpoint: ${OCR_BASE}/upload\n  retryDelayMs: 50\nai:\n  model: gpt-4o-mini\n",
        )
        .unwrap();

        let env: HashMap<String, String> = [
            ("OCR_BASE".to_string(), "http://ocr.local".to_string()),
            ("OCR_MAX_RETRIES".to_string(), "1".to_string()),
        ]
        .into_iter()
        .collect();

        let config = load_and_prepare_with(&path, &env).await.unwrap();
        assert_eq!(config.ocr.endpoint.as_deref(), Some("http://ocr.local/upload"));
        assert_eq!(config.ocr.retry_delay_ms, 50);
        assert_eq!(config.ocr.max_retries, 1);
        assert_eq!(config.ai.model, "gpt-4o-mini");
    }

    #[tokio::test]
    async fn missing_reference_fails_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "ai:\n  apiKey: ${NOT_SET_ANYWHERE}\n").unwrap();
        assert!(load_and_prepare_with(&path, &HashMap::new()).await.is_err());
    }
}
