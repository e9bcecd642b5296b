//! External OCR transport client.
//!
//! Uploads the file as a single multipart part, bounds each attempt with a
//! deadline, and retries retryable failures with a fixed delay. The
//! transcription is read through a named response-shape adapter.

use std::time::{Duration, Instant};

use docextract_config::{OcrServiceConfig, ResponseShape};
use docextract_core::{ExtractError, ExtractedText, ExtractionRequest, FailureKind};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::retry::RetryPolicy;
use crate::transport::{classify_send_error, service_error, with_deadline};

/// Outcome of one `extract` call, after all retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<FailureKind>,
    pub metadata: OcrMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrMetadata {
    pub processing_time_ms: u64,
    pub file_size: usize,
    pub file_name: String,
    pub attempts: u32,
}

#[derive(Debug, Deserialize)]
struct TextPayload {
    text: String,
    #[serde(default)]
    confidence: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ResultEnvelope {
    result: TextPayload,
}

#[derive(Debug, Deserialize)]
struct DataEnvelope {
    data: TextPayload,
}

fn shape_name(shape: ResponseShape) -> &'static str {
    match shape {
        ResponseShape::Auto => "auto",
        ResponseShape::Flat => "text",
        ResponseShape::Result => "result.text",
        ResponseShape::Data => "data.text",
    }
}

/// Read the transcription out of `body` according to `shape`.
///
/// Empty text counts as absent. `Auto` tries the concrete shapes in order.
fn read_shape(shape: ResponseShape, body: &Value) -> Option<TextPayload> {
    let payload = match shape {
        ResponseShape::Auto => {
            return [ResponseShape::Flat, ResponseShape::Result, ResponseShape::Data]
                .into_iter()
                .find_map(|s| read_shape(s, body));
        }
        ResponseShape::Flat => TextPayload::deserialize(body).ok(),
        ResponseShape::Result => ResultEnvelope::deserialize(body).ok().map(|e| e.result),
        ResponseShape::Data => DataEnvelope::deserialize(body).ok().map(|e| e.data),
    };
    payload.filter(|p| !p.text.trim().is_empty())
}

fn parse_body(shape: ResponseShape, raw: &[u8]) -> Result<ExtractedText, ExtractError> {
    let body: Value = serde_json::from_slice(raw)
        .map_err(|e| ExtractError::InvalidResponse(format!("body is not JSON: {e}")))?;

    let payload = read_shape(shape, &body).ok_or_else(|| {
        let tried = match shape {
            ResponseShape::Auto => "text, result.text, data.text",
            other => shape_name(other),
        };
        ExtractError::InvalidResponse(format!("no non-empty text field (tried {tried})"))
    })?;

    let text = ExtractedText::new(payload.text);
    Ok(match payload.confidence {
        Some(c) => text.with_confidence(c),
        None => text,
    })
}

pub struct OcrClient {
    http: reqwest::Client,
    endpoint: String,
    token: Option<String>,
    timeout: Duration,
    retry: RetryPolicy,
    shape: ResponseShape,
}

impl OcrClient {
    /// Build a client from config. Fails when no endpoint is configured.
    pub fn new(config: &OcrServiceConfig) -> Result<Self, ExtractError> {
        let endpoint = config
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| ExtractError::Configuration("OCR service endpoint is not set".into()))?;

        Ok(Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
            token: config.token.clone().filter(|t| !t.is_empty()),
            timeout: Duration::from_millis(config.timeout_ms),
            retry: RetryPolicy::from(config),
            shape: config.response_shape,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Health URL: a trailing `/upload` is replaced by `/health`.
    pub fn health_url(&self) -> String {
        let base = self.endpoint.trim_end_matches('/');
        match base.strip_suffix("/upload") {
            Some(root) => format!("{root}/health"),
            None => format!("{base}/health"),
        }
    }

    /// GET the health URL; any 2xx is healthy.
    pub async fn check_health(&self) -> Result<(), ExtractError> {
        let mut req = self.http.get(self.health_url());
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let resp = with_deadline(self.timeout, async move {
            req.send()
                .await
                .map_err(|e| classify_send_error(e, self.timeout))
        })
        .await?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(service_error(resp).await)
        }
    }

    /// Send the file, retrying per policy, and report the outcome with metadata.
    pub async fn extract(&self, request: &ExtractionRequest) -> OcrResponse {
        let start = Instant::now();
        let (outcome, attempts) = self.run(request, self.timeout).await;

        let metadata = OcrMetadata {
            processing_time_ms: start.elapsed().as_millis() as u64,
            file_size: request.len(),
            file_name: request.file_name().to_string(),
            attempts,
        };

        match outcome {
            Ok(extracted) => OcrResponse {
                success: true,
                text: Some(extracted.text),
                confidence: extracted.confidence,
                error: None,
                error_kind: None,
                metadata,
            },
            Err(e) => OcrResponse {
                success: false,
                text: None,
                confidence: None,
                error: Some(e.user_message()),
                error_kind: Some(e.kind()),
                metadata,
            },
        }
    }

    /// Same as [`extract`](Self::extract) but keeps the typed error.
    pub async fn extract_text(
        &self,
        request: &ExtractionRequest,
    ) -> Result<ExtractedText, ExtractError> {
        self.run(request, self.timeout).await.0
    }

    /// Like [`extract_text`](Self::extract_text) with `timeout` bounding each
    /// individual upload. Retries and the delays between them are not counted
    /// against it.
    pub async fn extract_text_within(
        &self,
        request: &ExtractionRequest,
        timeout: Duration,
    ) -> Result<ExtractedText, ExtractError> {
        self.run(request, timeout).await.0
    }

    async fn run(
        &self,
        request: &ExtractionRequest,
        timeout: Duration,
    ) -> (Result<ExtractedText, ExtractError>, u32) {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.attempt_once(request, timeout).await {
                Ok(text) => {
                    info!(
                        file = request.file_name(),
                        attempts,
                        chars = text.trimmed_len(),
                        "OCR service returned text"
                    );
                    return (Ok(text), attempts);
                }
                Err(e) if e.is_retryable() && self.retry.should_retry(attempts) => {
                    let delay = self.retry.delay_for(attempts);
                    warn!(
                        file = request.file_name(),
                        attempt = attempts,
                        max = self.retry.max_attempts(),
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "OCR attempt failed, will retry"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    warn!(file = request.file_name(), attempts, error = %e, "OCR service gave up");
                    return (Err(e), attempts);
                }
            }
        }
    }

    async fn attempt_once(
        &self,
        request: &ExtractionRequest,
        timeout: Duration,
    ) -> Result<ExtractedText, ExtractError> {
        let part = Part::bytes(request.bytes().to_vec())
            .file_name(request.file_name().to_string())
            .mime_str(request.mime_type())
            .map_err(|e| ExtractError::Validation(format!("unusable MIME type: {e}")))?;
        let form = Form::new().part("file", part);

        let mut req = self.http.post(&self.endpoint).multipart(form);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        debug!(endpoint = %self.endpoint, bytes = request.len(), "Uploading to OCR service");

        with_deadline(timeout, async move {
            let resp = req
                .send()
                .await
                .map_err(|e| classify_send_error(e, timeout))?;
            if !resp.status().is_success() {
                return Err(service_error(resp).await);
            }
            let raw = resp
                .bytes()
                .await
                .map_err(|e| classify_send_error(e, timeout))?;
            parse_body(self.shape, &raw)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, http::StatusCode, routing::{get, post}};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    /// Server answering every upload with `status` and `body`, counting hits.
    async fn counting_server(status: StatusCode, body: &'static str) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = Router::new().route(
            "/upload",
            post(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    (status, body)
                }
            }),
        );
        (serve(app).await, hits)
    }

    fn client(base: &str, max_retries: u32, retry_delay_ms: u64) -> OcrClient {
        OcrClient::new(&OcrServiceConfig {
            endpoint: Some(format!("{base}/upload")),
            token: Some("test-token".into()),
            timeout_ms: 2_000,
            max_retries,
            retry_delay_ms,
            response_shape: ResponseShape::Auto,
        })
        .unwrap()
    }

    fn scan() -> ExtractionRequest {
        ExtractionRequest::new(vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3], "image/jpeg", "scan.jpg")
    }

    #[tokio::test]
    async fn client_error_is_not_retried() {
        let (base, hits) = counting_server(StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported").await;
        let response = client(&base, 2, 10).extract(&scan()).await;
        assert!(!response.success);
        assert_eq!(response.error_kind, Some(FailureKind::ServiceError));
        assert_eq!(response.metadata.attempts, 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn server_error_is_retried_with_delay() {
        let (base, hits) = counting_server(StatusCode::BAD_GATEWAY, "upstream down").await;
        let start = Instant::now();
        let response = client(&base, 2, 100).extract(&scan()).await;
        assert!(!response.success);
        assert_eq!(response.metadata.attempts, 3);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn empty_text_is_invalid_and_retried() {
        let (base, hits) = counting_server(StatusCode::OK, r#"{"text":"   "}"#).await;
        let err = client(&base, 1, 10).extract_text(&scan()).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::InvalidResponse);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn nested_result_shape_is_read() {
        let (base, _) =
            counting_server(StatusCode::OK, r#"{"result":{"text":"Invoice 42","confidence":0.8}}"#).await;
        let response = client(&base, 0, 10).extract(&scan()).await;
        assert!(response.success);
        assert_eq!(response.text.as_deref(), Some("Invoice 42"));
        assert_eq!(response.confidence, Some(0.8));
        assert_eq!(response.metadata.file_name, "scan.jpg");
    }

    #[tokio::test]
    async fn slow_service_times_out() {
        let app = Router::new().route(
            "/upload",
            post(|| async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                r#"{"text":"late"}"#
            }),
        );
        let base = serve(app).await;
        let client = client(&base, 0, 10).with_timeout(Duration::from_millis(50));
        let err = client.extract_text(&scan()).await.unwrap_err();
        assert_eq!(err, ExtractError::Timeout(50));
    }

    #[tokio::test]
    async fn each_upload_gets_its_own_deadline() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = Router::new().route(
            "/upload",
            post(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(400)).await;
                    r#"{"text":"late"}"#
                }
            }),
        );
        let base = serve(app).await;
        let err = client(&base, 2, 10)
            .extract_text_within(&scan(), Duration::from_millis(100))
            .await
            .unwrap_err();
        assert_eq!(err, ExtractError::Timeout(100));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn health_replaces_upload_suffix() {
        let app = Router::new().route("/health", get(|| async { "ok" }));
        let base = serve(app).await;
        let client = client(&base, 0, 10);
        assert_eq!(client.health_url(), format!("{base}/health"));
        client.check_health().await.unwrap();
    }

    #[test]
    fn explicit_shape_reads_only_its_own_path() {
        let body = serde_json::json!({"text": "flat"});
        assert!(read_shape(ResponseShape::Data, &body).is_none());
        assert_eq!(read_shape(ResponseShape::Auto, &body).unwrap().text, "flat");
        let err = parse_body(ResponseShape::Data, br#"{"text":"flat"}"#).unwrap_err();
        assert!(err.to_string().contains("data.text"));
    }

    #[test]
    fn missing_endpoint_is_configuration_error() {
        let err = OcrClient::new(&OcrServiceConfig::default()).err().unwrap();
        assert_eq!(err.kind(), FailureKind::Configuration);
    }
}
