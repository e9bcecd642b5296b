//! Typed configuration for the extraction pipeline.
//!
//! Deserializes from YAML/JSON (camelCase keys); every field has a default so
//! a partial file, or no file at all, yields a usable config.

use serde::{Deserialize, Serialize};

use crate::credentials::ServiceAccountCredentials;
use crate::defaults;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    pub ocr: OcrServiceConfig,
    pub vision: VisionConfig,
    pub ai: AiConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

/// External OCR HTTP service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrServiceConfig {
    /// Upload URL. The service is disabled when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Bearer token sent with every request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default = "defaults::ocr_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "defaults::ocr_max_retries")]
    pub max_retries: u32,

    #[serde(default = "defaults::ocr_retry_delay_ms")]
    pub retry_delay_ms: u64,

    #[serde(default)]
    pub response_shape: ResponseShape,
}

impl Default for OcrServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            token: None,
            timeout_ms: defaults::DEFAULT_OCR_TIMEOUT_MS,
            max_retries: defaults::DEFAULT_OCR_MAX_RETRIES,
            retry_delay_ms: defaults::DEFAULT_OCR_RETRY_DELAY_MS,
            response_shape: ResponseShape::default(),
        }
    }
}

/// Where the OCR vendor puts the transcription in its JSON body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseShape {
    /// Try `text`, `result.text`, `data.text` in that order.
    #[default]
    Auto,
    /// `{"text": "..."}`
    Flat,
    /// `{"result": {"text": "..."}}`
    Result,
    /// `{"data": {"text": "..."}}`
    Data,
}

impl std::str::FromStr for ResponseShape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" | "" => Ok(Self::Auto),
            "flat" | "text" => Ok(Self::Flat),
            "result" => Ok(Self::Result),
            "data" => Ok(Self::Data),
            other => Err(format!("unknown OCR response shape: {other}")),
        }
    }
}

/// Cloud vision text detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionConfig {
    /// Parsed service-account bundle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<ServiceAccountCredentials>,

    /// Raw bundle as found in the environment; parsed into `credentials` on load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_json: Option<String>,

    #[serde(default = "defaults::vision_endpoint")]
    pub endpoint: String,

    /// Overrides the bundle's own token URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            credentials: None,
            credentials_json: None,
            endpoint: defaults::vision_endpoint(),
            token_uri: None,
        }
    }
}

impl VisionConfig {
    /// Token endpoint: explicit override, then the bundle's, then the default.
    pub fn effective_token_uri(&self) -> String {
        self.token_uri
            .clone()
            .or_else(|| self.credentials.as_ref().and_then(|c| c.token_uri.clone()))
            .unwrap_or_else(|| defaults::DEFAULT_TOKEN_URI.to_string())
    }
}

/// Generative-model document reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "defaults::ai_model")]
    pub model: String,

    #[serde(default = "defaults::ai_base_url")]
    pub base_url: String,

    #[serde(default = "defaults::ai_max_tokens")]
    pub max_tokens: u32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: defaults::ai_model(),
            base_url: defaults::ai_base_url(),
            max_tokens: defaults::DEFAULT_AI_MAX_TOKENS,
        }
    }
}

/// Content-addressed result cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    #[serde(default = "defaults::cache_max_entries")]
    pub max_entries: u64,

    /// Entry lifetime; entries live until evicted when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_secs: Option<u64>,

    /// Store `success: false` results too.
    #[serde(default = "defaults::yes")]
    pub cache_failures: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: defaults::DEFAULT_CACHE_MAX_ENTRIES,
            ttl_secs: None,
            cache_failures: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,

    #[serde(default = "defaults::log_dir")]
    pub dir: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
            dir: defaults::log_dir(),
        }
    }
}

impl PipelineConfig {
    pub fn ocr_enabled(&self) -> bool {
        self.ocr.endpoint.as_deref().is_some_and(|e| !e.trim().is_empty())
    }

    pub fn vision_enabled(&self) -> bool {
        self.vision.credentials.is_some()
    }

    pub fn ai_enabled(&self) -> bool {
        self.ai.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    /// Parse `vision.credentialsJson` into `vision.credentials` when the latter is unset.
    pub fn resolve_credentials(&mut self) -> Result<(), crate::CredentialsError> {
        if self.vision.credentials.is_some() {
            return Ok(());
        }
        if let Some(raw) = self.vision.credentials_json.as_deref() {
            if !raw.trim().is_empty() {
                self.vision.credentials = Some(ServiceAccountCredentials::parse(raw)?);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_yields_defaults() {
        let config: PipelineConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.ocr.timeout_ms, 30_000);
        assert_eq!(config.ocr.max_retries, 2);
        assert_eq!(config.ocr.retry_delay_ms, 1_000);
        assert_eq!(config.cache.max_entries, 1_000);
        assert!(config.cache.cache_failures);
        assert!(!config.ocr_enabled());
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let yaml = "ocr:\n  endpoint: http://ocr.local/upload\n  maxRetries: 5\n  responseShape: data\n";
        let config: PipelineConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.ocr_enabled());
        assert_eq!(config.ocr.max_retries, 5);
        assert_eq!(config.ocr.timeout_ms, 30_000);
        assert_eq!(config.ocr.response_shape, ResponseShape::Data);
    }

    #[test]
    fn response_shape_from_str() {
        assert_eq!("RESULT".parse::<ResponseShape>().unwrap(), ResponseShape::Result);
        assert!("xml".parse::<ResponseShape>().is_err());
    }
}
