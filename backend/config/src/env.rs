//! Environment handling: `${VAR}` substitution inside config files and the
//! env-only configuration path used by containers.
//!
//! Only uppercase `[A-Z_][A-Z0-9_]*` names are substituted. `$${VAR}` is an
//! escape and yields a literal `${VAR}`.

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

use crate::credentials::ServiceAccountCredentials;
use crate::schema::PipelineConfig;

static ENV_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$?\$\{([A-Z_][A-Z0-9_]*)\}").expect("env reference pattern is valid")
});

pub const OCR_SERVICE_URL: &str = "OCR_SERVICE_URL";
pub const OCR_TOKEN: &str = "OCR_TOKEN";
pub const OCR_TIMEOUT_MS: &str = "OCR_TIMEOUT_MS";
pub const OCR_MAX_RETRIES: &str = "OCR_MAX_RETRIES";
pub const OCR_RETRY_DELAY_MS: &str = "OCR_RETRY_DELAY_MS";
pub const OCR_RESPONSE_SHAPE: &str = "OCR_RESPONSE_SHAPE";
pub const GOOGLE_APPLICATION_CREDENTIALS_JSON: &str = "GOOGLE_APPLICATION_CREDENTIALS_JSON";
pub const GOOGLE_PROJECT_ID: &str = "GOOGLE_PROJECT_ID";
pub const GOOGLE_PRIVATE_KEY: &str = "GOOGLE_PRIVATE_KEY";
pub const GOOGLE_CLIENT_EMAIL: &str = "GOOGLE_CLIENT_EMAIL";
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const EXTRACTION_CACHE_MAX_ENTRIES: &str = "EXTRACTION_CACHE_MAX_ENTRIES";
pub const EXTRACTION_CACHE_TTL_SECS: &str = "EXTRACTION_CACHE_TTL_SECS";
pub const EXTRACTION_CACHE_FAILURES: &str = "EXTRACTION_CACHE_FAILURES";
pub const RUST_LOG: &str = "RUST_LOG";
pub const DOCEXTRACT_LOG_DIR: &str = "DOCEXTRACT_LOG_DIR";

#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute `${VAR}` references in every string leaf of `value`.
pub fn resolve_env_vars(value: &Value) -> Result<Value> {
    resolve_env_vars_with(value, &std::env::vars().collect())
}

/// Same as [`resolve_env_vars`] against an explicit map.
pub fn resolve_env_vars_with(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    Ok(substitute(value, env, "")?)
}

fn substitute(
    value: &Value,
    env: &HashMap<String, String>,
    path: &str,
) -> Result<Value, MissingEnvVarError> {
    match value {
        Value::String(s) => substitute_str(s, env, path).map(Value::String),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| substitute(v, env, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, child) in map {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                out.insert(key.clone(), substitute(child, env, &child_path)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_str(
    s: &str,
    env: &HashMap<String, String>,
    path: &str,
) -> Result<String, MissingEnvVarError> {
    if !s.contains("${") {
        return Ok(s.to_string());
    }

    let mut missing = None;
    let replaced = ENV_REFERENCE.replace_all(s, |caps: &Captures| {
        let whole = &caps[0];
        let name = &caps[1];
        if whole.starts_with("$$") {
            return format!("${{{name}}}");
        }
        match env.get(name).filter(|v| !v.is_empty()) {
            Some(v) => v.clone(),
            None => {
                missing.get_or_insert_with(|| MissingEnvVarError {
                    var_name: name.to_string(),
                    config_path: path.to_string(),
                });
                String::new()
            }
        }
    });

    match missing {
        Some(err) => Err(err),
        None => Ok(replaced.into_owned()),
    }
}

impl PipelineConfig {
    /// Build a config from process environment variables alone.
    pub fn from_env() -> Self {
        Self::from_env_map(&std::env::vars().collect())
    }

    /// Build a config from defaults overlaid with `env`.
    pub fn from_env_map(env: &HashMap<String, String>) -> Self {
        let mut config = Self::default();
        config.apply_env_overrides(env);
        config
    }

    /// Overlay recognised environment variables onto this config.
    ///
    /// Unparseable numeric values and broken credential bundles are logged
    /// and ignored; the field keeps its previous value.
    pub fn apply_env_overrides(&mut self, env: &HashMap<String, String>) {
        let get = |name: &str| env.get(name).map(|v| v.trim()).filter(|v| !v.is_empty());

        if let Some(url) = get(OCR_SERVICE_URL) {
            self.ocr.endpoint = Some(url.to_string());
        }
        if let Some(token) = get(OCR_TOKEN) {
            self.ocr.token = Some(token.to_string());
        }
        if let Some(ms) = parse_var(env, OCR_TIMEOUT_MS) {
            self.ocr.timeout_ms = ms;
        }
        if let Some(n) = parse_var(env, OCR_MAX_RETRIES) {
            self.ocr.max_retries = n;
        }
        if let Some(ms) = parse_var(env, OCR_RETRY_DELAY_MS) {
            self.ocr.retry_delay_ms = ms;
        }
        if let Some(shape) = parse_var(env, OCR_RESPONSE_SHAPE) {
            self.ocr.response_shape = shape;
        }

        if let Some(raw) = get(GOOGLE_APPLICATION_CREDENTIALS_JSON) {
            match ServiceAccountCredentials::parse(raw) {
                Ok(creds) => self.vision.credentials = Some(creds),
                Err(e) => warn!(var = GOOGLE_APPLICATION_CREDENTIALS_JSON, error = %e, "Ignoring credential bundle"),
            }
        } else if let (Some(project), Some(key), Some(email)) = (
            get(GOOGLE_PROJECT_ID),
            get(GOOGLE_PRIVATE_KEY),
            get(GOOGLE_CLIENT_EMAIL),
        ) {
            match ServiceAccountCredentials::from_parts(project, key, email) {
                Ok(creds) => self.vision.credentials = Some(creds),
                Err(e) => warn!(error = %e, "Ignoring separate vision credentials"),
            }
        }

        if let Some(key) = get(OPENAI_API_KEY) {
            self.ai.api_key = Some(key.to_string());
        }

        if let Some(n) = parse_var(env, EXTRACTION_CACHE_MAX_ENTRIES) {
            self.cache.max_entries = n;
        }
        if let Some(secs) = parse_var(env, EXTRACTION_CACHE_TTL_SECS) {
            self.cache.ttl_secs = Some(secs);
        }
        if let Some(flag) = get(EXTRACTION_CACHE_FAILURES) {
            match parse_bool(flag) {
                Some(b) => self.cache.cache_failures = b,
                None => warn!(var = EXTRACTION_CACHE_FAILURES, value = flag, "Ignoring non-boolean value"),
            }
        }

        if let Some(level) = get(RUST_LOG) {
            self.logging.level = level.to_string();
        }
        if let Some(dir) = get(DOCEXTRACT_LOG_DIR) {
            self.logging.dir = dir.to_string();
        }
    }
}

fn parse_var<T>(env: &HashMap<String, String>, name: &str) -> Option<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env.get(name)?.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse() {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(var = name, value = raw, error = %e, "Ignoring unparseable env var");
            None
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
