//! Mapping of HTTP-level failures onto the extraction error taxonomy.

use docextract_core::ExtractError;
use std::time::Duration;

const MAX_ERROR_BODY: usize = 300;

pub(crate) fn classify_send_error(err: reqwest::Error, timeout: Duration) -> ExtractError {
    if err.is_timeout() {
        ExtractError::Timeout(timeout.as_millis() as u64)
    } else if err.is_decode() {
        ExtractError::InvalidResponse(err.to_string())
    } else {
        ExtractError::NetworkError(err.to_string())
    }
}

/// Turn a non-2xx response into a `ServiceError`, keeping a bounded slice of the body.
pub(crate) async fn service_error(resp: reqwest::Response) -> ExtractError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    let mut message: String = body.trim().chars().take(MAX_ERROR_BODY).collect();
    if message.is_empty() {
        message = status.canonical_reason().unwrap_or("request failed").to_string();
    }
    ExtractError::ServiceError {
        status: status.as_u16(),
        message,
    }
}

/// Run `fut` under a deadline, mapping expiry to `Timeout`.
pub(crate) async fn with_deadline<T, F>(timeout: Duration, fut: F) -> Result<T, ExtractError>
where
    F: std::future::Future<Output = Result<T, ExtractError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(ExtractError::Timeout(timeout.as_millis() as u64)),
    }
}
