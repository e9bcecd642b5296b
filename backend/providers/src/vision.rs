//! Cloud vision text detection.
//!
//! Images go through `images:annotate` with `TEXT_DETECTION`; PDF and TIFF go
//! through `files:annotate` for the first page. The first text annotation is
//! the full-page transcription; the rest are individual words and are ignored.
//! No retries here; that is left to the caller.

use std::time::{Duration, Instant};

use base64::{Engine, engine::general_purpose::STANDARD};
use docextract_config::VisionConfig;
use docextract_core::{ExtractError, ExtractedText, ExtractionRequest, mime};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::auth::TokenProvider;
use crate::transport::{classify_send_error, service_error, with_deadline};

/// Largest file sent to the vision backend.
pub const VISION_MAX_BYTES: usize = 20 * 1024 * 1024;

/// The backend reports no per-call confidence; this fixed value stands in.
pub const VISION_CONFIDENCE: f32 = 0.9;

pub const VISION_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/bmp",
    "image/webp",
    "image/tiff",
    mime::PDF,
];

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionResult {
    pub success: bool,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    pub processing_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    #[serde(default)]
    text_annotations: Vec<EntityAnnotation>,
    #[serde(default)]
    full_text_annotation: Option<FullText>,
    #[serde(default)]
    error: Option<Status>,
}

#[derive(Debug, Deserialize)]
struct EntityAnnotation {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct FullText {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct BatchImagesResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Deserialize)]
struct AnnotateFileResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
    #[serde(default)]
    error: Option<Status>,
}

#[derive(Debug, Deserialize)]
struct BatchFilesResponse {
    #[serde(default)]
    responses: Vec<AnnotateFileResponse>,
}

impl Status {
    fn into_error(self) -> ExtractError {
        // INVALID_ARGUMENT means the input itself was rejected.
        let status = if self.code == 3 { 400 } else { 500 };
        ExtractError::ServiceError {
            status,
            message: self.message,
        }
    }
}

impl AnnotateImageResponse {
    fn into_text(self) -> Result<String, ExtractError> {
        if let Some(status) = self.error {
            return Err(status.into_error());
        }
        if let Some(first) = self.text_annotations.into_iter().next() {
            return Ok(first.description);
        }
        Ok(self.full_text_annotation.map(|f| f.text).unwrap_or_default())
    }
}

pub struct VisionClient {
    http: reqwest::Client,
    endpoint: String,
    auth: Option<TokenProvider>,
    timeout: Duration,
}

impl VisionClient {
    pub fn new(config: &VisionConfig) -> Self {
        let http = reqwest::Client::new();
        let auth = config.credentials.clone().map(|creds| {
            TokenProvider::new(http.clone(), creds, config.effective_token_uri(), DEFAULT_TIMEOUT)
        });
        Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            auth,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.auth.is_some()
    }

    pub fn supports_mime(mime_type: &str) -> bool {
        VISION_MIME_TYPES.contains(&mime_type)
    }

    /// Type and size checks done before any network call.
    pub fn validate(request: &ExtractionRequest) -> Result<(), ExtractError> {
        if !Self::supports_mime(request.mime_type()) {
            return Err(ExtractError::Validation(format!(
                "{} is not supported by vision OCR",
                request.mime_type()
            )));
        }
        if request.len() > VISION_MAX_BYTES {
            return Err(ExtractError::Validation(format!(
                "file is {} bytes, vision OCR accepts at most {} bytes",
                request.len(),
                VISION_MAX_BYTES
            )));
        }
        if request.is_empty() {
            return Err(ExtractError::Validation("file is empty".into()));
        }
        Ok(())
    }

    /// Verify credentials by obtaining an access token.
    pub async fn check_access(&self) -> Result<(), ExtractError> {
        self.token_provider()?.access_token().await.map(|_| ())
    }

    pub async fn extract(&self, request: &ExtractionRequest) -> VisionResult {
        let start = Instant::now();
        let outcome = self.extract_text(request).await;
        let processing_time_ms = start.elapsed().as_millis() as u64;
        match outcome {
            Ok(extracted) => VisionResult {
                success: true,
                text: extracted.text,
                confidence: extracted.confidence,
                processing_time_ms,
                error: None,
            },
            Err(e) => VisionResult {
                success: false,
                text: String::new(),
                confidence: None,
                processing_time_ms,
                error: Some(e.user_message()),
            },
        }
    }

    pub async fn extract_text(&self, request: &ExtractionRequest) -> Result<ExtractedText, ExtractError> {
        self.extract_text_within(request, self.timeout).await
    }

    /// Like [`extract_text`](Self::extract_text) with `timeout` bounding the
    /// annotate call.
    pub async fn extract_text_within(
        &self,
        request: &ExtractionRequest,
        timeout: Duration,
    ) -> Result<ExtractedText, ExtractError> {
        let auth = self.token_provider()?;
        Self::validate(request)?;

        let token = auth.access_token().await?;
        let content = STANDARD.encode(request.bytes());
        let paged = request.is_pdf() || request.mime_type() == "image/tiff";

        let text = if paged {
            self.annotate_file(&token, &content, request.mime_type(), timeout).await?
        } else {
            self.annotate_image(&token, &content, timeout).await?
        };

        info!(
            file = request.file_name(),
            project = auth.project_id(),
            chars = text.trim().chars().count(),
            "Vision OCR finished"
        );
        Ok(ExtractedText::new(text.trim()).with_confidence(VISION_CONFIDENCE))
    }

    fn token_provider(&self) -> Result<&TokenProvider, ExtractError> {
        self.auth
            .as_ref()
            .ok_or_else(|| ExtractError::Configuration("vision credentials are not configured".into()))
    }

    async fn annotate_image(&self, token: &str, content: &str, timeout: Duration) -> Result<String, ExtractError> {
        let body = json!({
            "requests": [{
                "image": { "content": content },
                "features": [{ "type": "TEXT_DETECTION" }]
            }]
        });
        let batch: BatchImagesResponse = self.post(token, "images:annotate", &body, timeout).await?;
        batch
            .responses
            .into_iter()
            .next()
            .unwrap_or_default()
            .into_text()
    }

    async fn annotate_file(
        &self,
        token: &str,
        content: &str,
        mime_type: &str,
        timeout: Duration,
    ) -> Result<String, ExtractError> {
        let body = json!({
            "requests": [{
                "inputConfig": { "content": content, "mimeType": mime_type },
                "features": [{ "type": "DOCUMENT_TEXT_DETECTION" }],
                "pages": [1]
            }]
        });
        let batch: BatchFilesResponse = self.post(token, "files:annotate", &body, timeout).await?;
        let Some(file) = batch.responses.into_iter().next() else {
            return Ok(String::new());
        };
        if let Some(status) = file.error {
            return Err(status.into_error());
        }
        file.responses.into_iter().next().unwrap_or_default().into_text()
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        token: &str,
        action: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<T, ExtractError> {
        let url = format!("{}/{action}", self.endpoint);
        debug!(%url, "Calling vision backend");
        with_deadline(timeout, async {
            let resp = self
                .http
                .post(&url)
                .bearer_auth(token)
                .json(body)
                .send()
                .await
                .map_err(|e| classify_send_error(e, timeout))?;
            if !resp.status().is_success() {
                return Err(service_error(resp).await);
            }
            resp.json::<T>()
                .await
                .map_err(|e| ExtractError::InvalidResponse(format!("vision response: {e}")))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::Uri};
    use docextract_config::ServiceAccountCredentials;
    use docextract_core::FailureKind;
    use serde_json::Value;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TEST_KEY: &str = include_str!("../tests/fixtures/service_account_key.pem");

    #[derive(Default)]
    struct Hits {
        token: AtomicUsize,
        images: AtomicUsize,
        files: AtomicUsize,
    }

    async fn fake_google() -> (String, Arc<Hits>) {
        let hits = Arc::new(Hits::default());
        let seen = hits.clone();
        let app = Router::new().fallback(move |uri: Uri| {
            let seen = seen.clone();
            async move {
                let path = uri.path().to_string();
                let body: Value = if path.ends_with("/token") {
                    seen.token.fetch_add(1, Ordering::SeqCst);
                    json!({ "access_token": "ya29.test", "expires_in": 3600, "token_type": "Bearer" })
                } else if path.ends_with("images:annotate") {
                    seen.images.fetch_add(1, Ordering::SeqCst);
                    json!({ "responses": [{ "textAnnotations": [
                        { "description": "INVOICE 42\nTotal due: 100" },
                        { "description": "INVOICE" }
                    ]}]})
                } else if path.ends_with("files:annotate") {
                    seen.files.fetch_add(1, Ordering::SeqCst);
                    json!({ "responses": [{ "responses": [{
                        "fullTextAnnotation": { "text": "Scanned lease page one" }
                    }]}]})
                } else {
                    json!({})
                };
                Json(body)
            }
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), hits)
    }

    fn client(base: &str) -> VisionClient {
        let creds =
            ServiceAccountCredentials::from_parts("proj", TEST_KEY, "svc@proj.iam.gserviceaccount.com").unwrap();
        VisionClient::new(&VisionConfig {
            credentials: Some(creds),
            credentials_json: None,
            endpoint: format!("{base}/v1"),
            token_uri: Some(format!("{base}/token")),
        })
    }

    #[tokio::test]
    async fn first_annotation_wins_and_token_is_cached() {
        let (base, hits) = fake_google().await;
        let client = client(&base);
        let png = ExtractionRequest::new(b"\x89PNG\r\n\x1a\nrest".to_vec(), "image/png", "a.png");

        let first = client.extract(&png).await;
        let second = client.extract(&png).await;

        assert!(first.success);
        assert_eq!(first.text, "INVOICE 42\nTotal due: 100");
        assert_eq!(first.confidence, Some(VISION_CONFIDENCE));
        assert!(second.success);
        assert_eq!(hits.token.load(Ordering::SeqCst), 1);
        assert_eq!(hits.images.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn pdf_goes_through_file_annotation() {
        let (base, hits) = fake_google().await;
        let pdf = ExtractionRequest::new(b"%PDF-1.4 scanned".to_vec(), "application/pdf", "lease.pdf");
        let text = client(&base).extract_text(&pdf).await.unwrap();
        assert_eq!(text.text, "Scanned lease page one");
        assert_eq!(hits.files.load(Ordering::SeqCst), 1);
        assert_eq!(hits.images.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn oversized_file_rejected_before_network() {
        let (base, hits) = fake_google().await;
        let big = ExtractionRequest::new(vec![0u8; VISION_MAX_BYTES + 1], "image/png", "huge.png");
        let err = client(&base).extract_text(&big).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::ValidationError);
        assert_eq!(hits.token.load(Ordering::SeqCst), 0);
        assert_eq!(hits.images.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unsupported_type_rejected_before_network() {
        let (base, hits) = fake_google().await;
        let doc = ExtractionRequest::new(b"<html></html>".to_vec(), "text/html", "page.html");
        let result = client(&base).extract(&doc).await;
        assert!(!result.success);
        assert!(result.error.is_some());
        assert_eq!(hits.token.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_credentials_is_configuration_error() {
        let client = VisionClient::new(&VisionConfig::default());
        assert!(!client.is_configured());
        let png = ExtractionRequest::new(b"\x89PNG\r\n\x1a\n".to_vec(), "image/png", "a.png");
        let err = client.extract_text(&png).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Configuration);
        assert!(!err.is_retryable());
    }

    #[test]
    fn error_status_maps_to_service_error() {
        let resp: AnnotateImageResponse =
            serde_json::from_value(json!({ "error": { "code": 3, "message": "Bad image data." } })).unwrap();
        assert_eq!(
            resp.into_text().unwrap_err(),
            ExtractError::ServiceError { status: 400, message: "Bad image data.".into() }
        );
    }
}
