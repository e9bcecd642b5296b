use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ExtractError, FailureKind};
use crate::mime;

/// An uploaded file awaiting extraction. Immutable once created.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    id: Uuid,
    bytes: Bytes,
    mime_type: String,
    file_name: String,
    received_at: DateTime<Utc>,
}

impl ExtractionRequest {
    /// Build a request from raw bytes.
    ///
    /// An empty or `application/octet-stream` declared type is replaced by the
    /// type sniffed from the content and file name.
    pub fn new(
        bytes: impl Into<Bytes>,
        mime_type: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        let bytes = bytes.into();
        let file_name = file_name.into();
        // "text/plain; charset=utf-8" -> "text/plain"
        let declared = mime_type.into();
        let declared = declared
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        let mime_type = if declared.is_empty() || declared == mime::OCTET_STREAM {
            mime::sniff_mime(&bytes, &file_name).to_string()
        } else {
            declared
        };

        Self {
            id: Uuid::new_v4(),
            bytes,
            mime_type,
            file_name,
            received_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Cheap handle on the payload for handing to blocking tasks or HTTP bodies.
    pub fn shared_bytes(&self) -> Bytes {
        self.bytes.clone()
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn is_plain_text(&self) -> bool {
        mime::is_plain_text(&self.mime_type)
    }

    pub fn is_pdf(&self) -> bool {
        self.mime_type == mime::PDF
    }

    pub fn is_image(&self) -> bool {
        mime::is_image(&self.mime_type)
    }
}

/// One technique for turning a file into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionMethod {
    /// Plain-text files read as-is; no backend involved.
    PlainText,
    /// Embedded text layer of a PDF.
    TextLayer,
    /// Generative-model document reading.
    AiExtraction,
    /// Cloud vision text detection.
    VisionOcr,
    /// Generic external OCR HTTP service.
    ExternalOcr,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlainText => "plain-text",
            Self::TextLayer => "text-layer",
            Self::AiExtraction => "ai-extraction",
            Self::VisionOcr => "vision-ocr",
            Self::ExternalOcr => "external-ocr",
        }
    }
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text produced by a backend, before the adequacy check.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedText {
    pub text: String,
    pub confidence: Option<f32>,
}

impl ExtractedText {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), confidence: None }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Length in characters after trimming.
    pub fn trimmed_len(&self) -> usize {
        self.text.trim().chars().count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl From<&ExtractError> for AttemptFailure {
    fn from(err: &ExtractError) -> Self {
        Self { kind: err.kind(), message: err.to_string() }
    }
}

/// Record of one backend invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionAttempt {
    pub method: ExtractionMethod,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub outcome: AttemptOutcome,
    pub text: Option<String>,
    pub failure: Option<AttemptFailure>,
}

impl ExtractionAttempt {
    pub fn succeeded(
        method: ExtractionMethod,
        started_at: DateTime<Utc>,
        duration: Duration,
        text: impl Into<String>,
    ) -> Self {
        Self {
            method,
            started_at,
            duration_ms: duration.as_millis() as u64,
            outcome: AttemptOutcome::Success,
            text: Some(text.into()),
            failure: None,
        }
    }

    /// A failed invocation. `text` carries whatever the backend did return,
    /// e.g. a sub-threshold transcription.
    pub fn failed(
        method: ExtractionMethod,
        started_at: DateTime<Utc>,
        duration: Duration,
        error: &ExtractError,
        text: Option<String>,
    ) -> Self {
        Self {
            method,
            started_at,
            duration_ms: duration.as_millis() as u64,
            outcome: AttemptOutcome::Failure,
            text,
            failure: Some(AttemptFailure::from(error)),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == AttemptOutcome::Success
    }
}

/// Terminal outcome of one extraction request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub success: bool,
    pub text: String,
    pub method: Option<ExtractionMethod>,
    pub attempts: Vec<ExtractionAttempt>,
    pub processing_time_ms: u64,
    /// Heuristic 0..=1.
    pub quality_score: f32,
    pub confidence: Option<f32>,
    /// User-facing message when `success` is false.
    pub error: Option<String>,
    pub error_kind: Option<FailureKind>,
    pub file_size: usize,
}

impl ExtractionResult {
    pub fn attempt_count(&self) -> usize {
        self.attempts.len()
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Which backends to try, in what order, and what output is acceptable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionConfig {
    pub methods: Vec<ExtractionMethod>,
    /// Minimum trimmed character count for a result to be accepted.
    pub min_text_length: usize,
    /// Deadline for each individual method.
    pub timeout_ms: u64,
}

pub const DEFAULT_MIN_TEXT_LENGTH: usize = 50;
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            methods: vec![
                ExtractionMethod::TextLayer,
                ExtractionMethod::AiExtraction,
                ExtractionMethod::VisionOcr,
                ExtractionMethod::ExternalOcr,
            ],
            min_text_length: DEFAULT_MIN_TEXT_LENGTH,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl ExtractionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn with_min_text_length(mut self, min: usize) -> Self {
        self.min_text_length = min;
        self
    }

    /// Whether `text` clears the adequacy threshold.
    pub fn is_adequate(&self, text: &str) -> bool {
        let trimmed = text.trim();
        !trimmed.is_empty() && trimmed.chars().count() >= self.min_text_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn octet_stream_is_replaced_by_sniffed_type() {
        let req = ExtractionRequest::new(b"%PDF-1.7\n...".to_vec(), "application/octet-stream", "x.bin");
        assert!(req.is_pdf());
    }

    #[test]
    fn declared_type_is_kept() {
        let req = ExtractionRequest::new(b"hello".to_vec(), "Text/Plain", "notes");
        assert_eq!(req.mime_type(), "text/plain");
        assert!(req.is_plain_text());
        assert_eq!(req.len(), 5);
    }

    #[test]
    fn mime_parameters_are_dropped() {
        let req = ExtractionRequest::new(b"minutes".to_vec(), "text/plain; charset=utf-8", "agm");
        assert_eq!(req.mime_type(), "text/plain");
        assert!(req.is_plain_text());

        let req = ExtractionRequest::new(b"%PDF-1.4".to_vec(), " ; name=x", "a.bin");
        assert!(req.is_pdf());
    }

    #[test]
    fn adequacy_uses_trimmed_length() {
        let config = ExtractionConfig::default().with_min_text_length(5);
        assert!(!config.is_adequate("  abc   "));
        assert!(config.is_adequate("  abcde "));
        assert!(!ExtractionConfig::default().with_min_text_length(0).is_adequate("   "));
    }

    #[test]
    fn method_serializes_kebab_case() {
        let json = serde_json::to_string(&ExtractionMethod::VisionOcr).unwrap();
        assert_eq!(json, "\"vision-ocr\"");
    }
}
