use std::time::Duration;

use async_trait::async_trait;

use crate::error::ExtractError;
use crate::types::{ExtractedText, ExtractionMethod, ExtractionRequest};

/// One extraction tier in the fallback chain.
///
/// Implementations report their own failures through [`ExtractError`]; the
/// orchestrator decides whether the returned text is good enough.
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    /// Which method this strategy implements.
    fn method(&self) -> ExtractionMethod;

    /// Whether this strategy can handle the request at all (file type, size).
    /// Unsupported strategies are skipped without counting as an attempt.
    fn supports(&self, _request: &ExtractionRequest) -> bool {
        true
    }

    /// Run the backend once and return whatever text it produced.
    ///
    /// `timeout` bounds each request the backend makes. A backend that
    /// retries internally applies it per request, not to the whole method.
    async fn attempt_extraction(
        &self,
        request: &ExtractionRequest,
        timeout: Duration,
    ) -> Result<ExtractedText, ExtractError>;
}
