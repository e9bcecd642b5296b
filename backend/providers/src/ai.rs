//! Generative-model document reading over an OpenAI-compatible chat API.
//!
//! Images are sent as `image_url` data URLs, PDFs as inline `file` parts.

use std::time::Duration;

use base64::{Engine, engine::general_purpose::STANDARD};
use docextract_config::AiConfig;
use docextract_core::{ExtractError, ExtractedText, ExtractionRequest};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::transport::{classify_send_error, service_error, with_deadline};

const EXTRACTION_PROMPT: &str = "Extract all text from this document exactly as it appears. \
Preserve line breaks and reading order. Do not summarise, translate, or add commentary. \
If the document contains no readable text, reply with nothing.";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct AiExtractor {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    max_tokens: u32,
    timeout: Duration,
}

impl AiExtractor {
    pub fn new(config: &AiConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_tokens: config.max_tokens,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// The model reads PDFs and images only.
    pub fn supports(request: &ExtractionRequest) -> bool {
        request.is_pdf() || request.is_image()
    }

    fn document_part(request: &ExtractionRequest) -> Result<Value, ExtractError> {
        let data_url = format!("data:{};base64,{}", request.mime_type(), STANDARD.encode(request.bytes()));
        if request.is_image() {
            Ok(json!({ "type": "image_url", "image_url": { "url": data_url } }))
        } else if request.is_pdf() {
            Ok(json!({
                "type": "file",
                "file": { "filename": request.file_name(), "file_data": data_url }
            }))
        } else {
            Err(ExtractError::Validation(format!(
                "{} cannot be read by the AI extractor",
                request.mime_type()
            )))
        }
    }

    pub async fn extract_text(&self, request: &ExtractionRequest) -> Result<ExtractedText, ExtractError> {
        self.extract_text_within(request, self.timeout).await
    }

    pub async fn extract_text_within(
        &self,
        request: &ExtractionRequest,
        timeout: Duration,
    ) -> Result<ExtractedText, ExtractError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ExtractError::Configuration("AI API key is not configured".into()))?;
        if request.is_empty() {
            return Err(ExtractError::Validation("file is empty".into()));
        }

        let body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": 0,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": EXTRACTION_PROMPT },
                    Self::document_part(request)?
                ]
            }]
        });

        let url = format!("{}/chat/completions", self.base_url);
        let chat: ChatResponse = with_deadline(timeout, async {
            let resp = self
                .http
                .post(&url)
                .bearer_auth(api_key)
                .json(&body)
                .send()
                .await
                .map_err(|e| classify_send_error(e, timeout))?;
            if !resp.status().is_success() {
                return Err(service_error(resp).await);
            }
            resp.json::<ChatResponse>()
                .await
                .map_err(|e| ExtractError::InvalidResponse(format!("chat response: {e}")))
        })
        .await?;

        let text = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        info!(
            file = request.file_name(),
            model = %self.model,
            chars = text.trim().chars().count(),
            "AI extraction finished"
        );
        Ok(ExtractedText::new(text.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, routing::post};
    use docextract_core::FailureKind;
    use std::sync::{Arc, Mutex};

    async fn fake_openai(reply: &'static str) -> (String, Arc<Mutex<Vec<Value>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        let app = Router::new().route(
            "/v1/chat/completions",
            post(move |Json(body): Json<Value>| {
                let log = log.clone();
                async move {
                    log.lock().unwrap().push(body);
                    Json(json!({ "choices": [{ "message": { "role": "assistant", "content": reply } }] }))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/v1"), seen)
    }

    fn extractor(base_url: String) -> AiExtractor {
        AiExtractor::new(&AiConfig {
            api_key: Some("sk-test".into()),
            base_url,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn pdf_is_sent_as_file_part() {
        let (base, seen) = fake_openai("  Lease agreement\nClause 1  ").await;
        let pdf = ExtractionRequest::new(b"%PDF-1.7 body".to_vec(), "application/pdf", "lease.pdf");
        let text = extractor(base).extract_text(&pdf).await.unwrap();
        assert_eq!(text.text, "Lease agreement\nClause 1");

        let bodies = seen.lock().unwrap();
        let part = &bodies[0]["messages"][0]["content"][1];
        assert_eq!(part["type"], "file");
        assert_eq!(part["file"]["filename"], "lease.pdf");
        assert!(part["file"]["file_data"].as_str().unwrap().starts_with("data:application/pdf;base64,"));
        assert_eq!(bodies[0]["model"], "gpt-4o");
    }

    #[tokio::test]
    async fn image_is_sent_as_data_url() {
        let (base, seen) = fake_openai("Receipt").await;
        let jpg = ExtractionRequest::new(vec![0xFF, 0xD8, 0xFF, 0xE0], "image/jpeg", "r.jpg");
        extractor(base).extract_text(&jpg).await.unwrap();
        let bodies = seen.lock().unwrap();
        let url = bodies[0]["messages"][0]["content"][1]["image_url"]["url"].as_str().unwrap().to_string();
        assert!(url.starts_with("data:image/jpeg;base64,"));
    }

    #[tokio::test]
    async fn missing_key_is_configuration_error() {
        let extractor = AiExtractor::new(&AiConfig::default());
        let pdf = ExtractionRequest::new(b"%PDF-1.7".to_vec(), "application/pdf", "a.pdf");
        let err = extractor.extract_text(&pdf).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Configuration);
    }

    #[test]
    fn only_documents_and_images_are_supported() {
        let csv = ExtractionRequest::new(b"a,b".to_vec(), "text/csv", "a.csv");
        assert!(!AiExtractor::supports(&csv));
        assert!(AiExtractor::document_part(&csv).is_err());
    }
}
