//! Adapters exposing each backend as an [`ExtractionStrategy`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use docextract_config::PipelineConfig;
use docextract_core::{
    ExtractError, ExtractedText, ExtractionMethod, ExtractionRequest, ExtractionStrategy,
};
use docextract_providers::{AiExtractor, OcrClient, TextLayerParser, VisionClient};
use tracing::debug;

/// Bound local work that has no request deadline of its own.
async fn within<F>(timeout: Duration, fut: F) -> Result<ExtractedText, ExtractError>
where
    F: Future<Output = Result<ExtractedText, ExtractError>>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .unwrap_or(Err(ExtractError::Timeout(timeout.as_millis() as u64)))
}

pub struct TextLayerStrategy {
    parser: TextLayerParser,
}

impl TextLayerStrategy {
    pub fn new(parser: TextLayerParser) -> Self {
        Self { parser }
    }
}

#[async_trait]
impl ExtractionStrategy for TextLayerStrategy {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::TextLayer
    }

    fn supports(&self, request: &ExtractionRequest) -> bool {
        request.is_pdf()
    }

    async fn attempt_extraction(
        &self,
        request: &ExtractionRequest,
        timeout: Duration,
    ) -> Result<ExtractedText, ExtractError> {
        within(timeout, self.parser.extract_text(request.shared_bytes())).await
    }
}

pub struct AiStrategy {
    extractor: AiExtractor,
}

impl AiStrategy {
    pub fn new(extractor: AiExtractor) -> Self {
        Self { extractor }
    }
}

#[async_trait]
impl ExtractionStrategy for AiStrategy {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::AiExtraction
    }

    fn supports(&self, request: &ExtractionRequest) -> bool {
        AiExtractor::supports(request)
    }

    async fn attempt_extraction(
        &self,
        request: &ExtractionRequest,
        timeout: Duration,
    ) -> Result<ExtractedText, ExtractError> {
        self.extractor.extract_text_within(request, timeout).await
    }
}

pub struct VisionStrategy {
    client: VisionClient,
}

impl VisionStrategy {
    pub fn new(client: VisionClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ExtractionStrategy for VisionStrategy {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::VisionOcr
    }

    fn supports(&self, request: &ExtractionRequest) -> bool {
        VisionClient::supports_mime(request.mime_type())
    }

    async fn attempt_extraction(
        &self,
        request: &ExtractionRequest,
        timeout: Duration,
    ) -> Result<ExtractedText, ExtractError> {
        self.client.extract_text_within(request, timeout).await
    }
}

pub struct ExternalOcrStrategy {
    client: OcrClient,
}

impl ExternalOcrStrategy {
    pub fn new(client: OcrClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ExtractionStrategy for ExternalOcrStrategy {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::ExternalOcr
    }

    fn supports(&self, request: &ExtractionRequest) -> bool {
        !request.is_plain_text()
    }

    async fn attempt_extraction(
        &self,
        request: &ExtractionRequest,
        timeout: Duration,
    ) -> Result<ExtractedText, ExtractError> {
        self.client.extract_text_within(request, timeout).await
    }
}

/// Strategies for every backend `config` enables. The text layer needs no
/// configuration and is always present.
pub fn build_strategies(config: &PipelineConfig) -> Vec<Arc<dyn ExtractionStrategy>> {
    let mut strategies: Vec<Arc<dyn ExtractionStrategy>> =
        vec![Arc::new(TextLayerStrategy::new(TextLayerParser::default()))];

    if config.ai_enabled() {
        strategies.push(Arc::new(AiStrategy::new(AiExtractor::new(&config.ai))));
    } else {
        debug!("AI extraction disabled: no API key");
    }

    let vision = VisionClient::new(&config.vision);
    if vision.is_configured() {
        strategies.push(Arc::new(VisionStrategy::new(vision)));
    } else {
        debug!("Vision OCR disabled: no credentials");
    }

    match OcrClient::new(&config.ocr) {
        Ok(client) => strategies.push(Arc::new(ExternalOcrStrategy::new(client))),
        Err(e) => debug!(error = %e, "External OCR disabled"),
    }

    strategies
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_backends_are_left_out() {
        let methods: Vec<_> = build_strategies(&PipelineConfig::default())
            .iter()
            .map(|s| s.method())
            .collect();
        assert_eq!(methods, vec![ExtractionMethod::TextLayer]);
    }

    #[test]
    fn configured_backends_are_included() {
        let mut config = PipelineConfig::default();
        config.ai.api_key = Some("sk-test".into());
        config.ocr.endpoint = Some("http://ocr.local/upload".into());
        let methods: Vec<_> = build_strategies(&config).iter().map(|s| s.method()).collect();
        assert_eq!(
            methods,
            vec![
                ExtractionMethod::TextLayer,
                ExtractionMethod::AiExtraction,
                ExtractionMethod::ExternalOcr
            ]
        );
    }

    #[test]
    fn applicability_follows_file_type() {
        let text_layer = TextLayerStrategy::new(TextLayerParser::default());
        let pdf = ExtractionRequest::new(b"%PDF-1.4".to_vec(), "application/pdf", "a.pdf");
        let png = ExtractionRequest::new(b"\x89PNG\r\n\x1a\n".to_vec(), "image/png", "a.png");
        let txt = ExtractionRequest::new(b"hello".to_vec(), "text/plain", "a.txt");
        assert!(text_layer.supports(&pdf));
        assert!(!text_layer.supports(&png));

        let ocr = ExternalOcrStrategy::new(
            OcrClient::new(&docextract_config::OcrServiceConfig {
                endpoint: Some("http://ocr.local/upload".into()),
                ..Default::default()
            })
            .unwrap(),
        );
        assert!(ocr.supports(&png));
        assert!(!ocr.supports(&txt));
    }
}
