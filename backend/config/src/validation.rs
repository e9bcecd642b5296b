//! Config validation with path-qualified messages.

use crate::schema::PipelineConfig;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

pub fn validate(config: &PipelineConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_ocr(config, &mut report);
    validate_vision(config, &mut report);
    validate_ai(config, &mut report);
    validate_cache(config, &mut report);

    if !config.ocr_enabled() && !config.vision_enabled() && !config.ai_enabled() {
        report.warn(
            "",
            "No extraction backend configured; only plain text and PDF text layers can be read",
        );
    }
    report
}

fn validate_url(report: &mut ValidationReport, path: &str, raw: &str) {
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => report.error(path, format!("Unsupported URL scheme '{}'", url.scheme())),
        Err(e) => report.error(path, format!("Invalid URL '{raw}': {e}")),
    }
}

fn validate_ocr(config: &PipelineConfig, report: &mut ValidationReport) {
    let ocr = &config.ocr;
    if let Some(endpoint) = ocr.endpoint.as_deref().filter(|e| !e.trim().is_empty()) {
        validate_url(report, "ocr.endpoint", endpoint);
        if ocr.token.as_deref().map(str::is_empty).unwrap_or(true) {
            report.warn("ocr.token", "OCR endpoint set without a bearer token");
        }
    }
    if ocr.timeout_ms == 0 {
        report.error("ocr.timeoutMs", "timeoutMs must be > 0");
    }
    if ocr.max_retries > 10 {
        report.warn(
            "ocr.maxRetries",
            format!("{} retries can hold a request for a long time", ocr.max_retries),
        );
    }
}

fn validate_vision(config: &PipelineConfig, report: &mut ValidationReport) {
    validate_url(report, "vision.endpoint", &config.vision.endpoint);
    if let Some(uri) = &config.vision.token_uri {
        validate_url(report, "vision.tokenUri", uri);
    }
    if config.vision.credentials.is_none()
        && config.vision.credentials_json.as_deref().is_some_and(|j| !j.trim().is_empty())
    {
        report.error("vision.credentialsJson", "Credential bundle could not be parsed");
    }
}

fn validate_ai(config: &PipelineConfig, report: &mut ValidationReport) {
    validate_url(report, "ai.baseUrl", &config.ai.base_url);
    if config.ai.model.trim().is_empty() {
        report.error("ai.model", "Model name cannot be empty");
    }
    if config.ai.max_tokens == 0 {
        report.error("ai.maxTokens", "maxTokens must be > 0");
    }
}

fn validate_cache(config: &PipelineConfig, report: &mut ValidationReport) {
    if config.cache.max_entries == 0 {
        report.warn("cache.maxEntries", "maxEntries is 0; results will not be cached");
    }
    if config.cache.ttl_secs == Some(0) {
        report.error("cache.ttlSecs", "ttlSecs must be > 0 when set");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid_with_warning() {
        let report = validate(&PipelineConfig::default());
        assert!(report.is_valid(), "errors: {:?}", report.errors);
        assert!(report.warnings.iter().any(|w| w.message.contains("No extraction backend")));
    }

    #[test]
    fn zero_timeout_is_error() {
        let mut cfg = PipelineConfig::default();
        cfg.ocr.timeout_ms = 0;
        let report = validate(&cfg);
        assert!(!report.is_valid());
        assert_eq!(report.errors[0].path, "ocr.timeoutMs");
    }

    #[test]
    fn unparsable_endpoint_is_error() {
        let mut cfg = PipelineConfig::default();
        cfg.ocr.endpoint = Some("not a url".into());
        cfg.ocr.token = Some("t".into());
        let report = validate(&cfg);
        assert!(report.errors.iter().any(|e| e.path == "ocr.endpoint"));
    }
}
