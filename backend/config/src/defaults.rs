//! Default values for pipeline configuration.

/// Per-request deadline for the external OCR service.
pub const DEFAULT_OCR_TIMEOUT_MS: u64 = 30_000;

/// Retries after the first attempt against the external OCR service.
pub const DEFAULT_OCR_MAX_RETRIES: u32 = 2;

/// Fixed delay between OCR retries.
pub const DEFAULT_OCR_RETRY_DELAY_MS: u64 = 1_000;

pub const DEFAULT_VISION_ENDPOINT: &str = "https://vision.googleapis.com/v1";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

pub const DEFAULT_AI_MODEL: &str = "gpt-4o";
pub const DEFAULT_AI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_AI_MAX_TOKENS: u32 = 4_000;

/// Distinct file contents kept in the result cache.
pub const DEFAULT_CACHE_MAX_ENTRIES: u64 = 1_000;

pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_LOG_DIR: &str = "logs";

pub(crate) fn ocr_timeout_ms() -> u64 {
    DEFAULT_OCR_TIMEOUT_MS
}

pub(crate) fn ocr_max_retries() -> u32 {
    DEFAULT_OCR_MAX_RETRIES
}

pub(crate) fn ocr_retry_delay_ms() -> u64 {
    DEFAULT_OCR_RETRY_DELAY_MS
}

pub(crate) fn vision_endpoint() -> String {
    DEFAULT_VISION_ENDPOINT.to_string()
}

pub(crate) fn ai_model() -> String {
    DEFAULT_AI_MODEL.to_string()
}

pub(crate) fn ai_base_url() -> String {
    DEFAULT_AI_BASE_URL.to_string()
}

pub(crate) fn ai_max_tokens() -> u32 {
    DEFAULT_AI_MAX_TOKENS
}

pub(crate) fn cache_max_entries() -> u64 {
    DEFAULT_CACHE_MAX_ENTRIES
}

pub(crate) fn yes() -> bool {
    true
}

pub(crate) fn log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

pub(crate) fn log_dir() -> String {
    DEFAULT_LOG_DIR.to_string()
}
