use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure taxonomy for a single extraction attempt or a whole request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("timed out after {0} ms")]
    Timeout(u64),

    #[error("service returned HTTP {status}: {message}")]
    ServiceError { status: u16, message: String },

    #[error("network error: {0}")]
    NetworkError(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("insufficient text: {chars} characters, at least {min} required")]
    InsufficientText { chars: usize, min: usize },

    #[error("not configured: {0}")]
    Configuration(String),

    #[error("all extraction methods failed after {attempted} attempt(s)")]
    Exhausted { attempted: usize },
}

/// Serializable discriminant of [`ExtractError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    ServiceError,
    NetworkError,
    InvalidResponse,
    ValidationError,
    InsufficientText,
    Configuration,
    Exhausted,
}

impl ExtractError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Timeout(_) => FailureKind::Timeout,
            Self::ServiceError { .. } => FailureKind::ServiceError,
            Self::NetworkError(_) => FailureKind::NetworkError,
            Self::InvalidResponse(_) => FailureKind::InvalidResponse,
            Self::Validation(_) => FailureKind::ValidationError,
            Self::InsufficientText { .. } => FailureKind::InsufficientText,
            Self::Configuration(_) => FailureKind::Configuration,
            Self::Exhausted { .. } => FailureKind::Exhausted,
        }
    }

    /// Whether retrying the same call can plausibly succeed.
    ///
    /// Client errors (4xx), rejected input, and missing configuration are terminal.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::NetworkError(_) | Self::InvalidResponse(_) => true,
            Self::ServiceError { status, .. } => *status >= 500,
            Self::Validation(_)
            | Self::InsufficientText { .. }
            | Self::Configuration(_)
            | Self::Exhausted { .. } => false,
        }
    }

    /// The one message shown to end users for this failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::Timeout(_) => {
                "Processing timed out - the file may be too large. Please try again or upload a smaller file.".into()
            }
            Self::ServiceError { status, .. } if *status < 500 => {
                "The document could not be processed - the file type may not be supported.".into()
            }
            Self::ServiceError { .. } => {
                "The text extraction service is temporarily unavailable. Please try again later.".into()
            }
            Self::NetworkError(_) => {
                "Could not reach the text extraction service. Please check the connection and try again.".into()
            }
            Self::InvalidResponse(_) => {
                "The text extraction service returned an unexpected response.".into()
            }
            Self::Validation(reason) => format!("The file was rejected: {reason}."),
            Self::InsufficientText { .. } => {
                "Not enough readable text was found in the document.".into()
            }
            Self::Configuration(detail) => {
                format!("Text extraction is not configured for this kind of document ({detail}).")
            }
            Self::Exhausted { attempted } => format!(
                "Could not extract text after trying {attempted} method(s) - the document may be scanned, corrupted, or image-only."
            ),
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Timeout => "timeout",
            Self::ServiceError => "service_error",
            Self::NetworkError => "network_error",
            Self::InvalidResponse => "invalid_response",
            Self::ValidationError => "validation_error",
            Self::InsufficientText => "insufficient_text",
            Self::Configuration => "configuration",
            Self::Exhausted => "exhausted",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_terminal() {
        let err = ExtractError::ServiceError { status: 415, message: "unsupported".into() };
        assert!(!err.is_retryable());
        assert_eq!(err.kind(), FailureKind::ServiceError);
    }

    #[test]
    fn server_errors_and_transport_failures_retry() {
        assert!(ExtractError::ServiceError { status: 503, message: String::new() }.is_retryable());
        assert!(ExtractError::Timeout(30_000).is_retryable());
        assert!(ExtractError::NetworkError("reset".into()).is_retryable());
        assert!(ExtractError::InvalidResponse("no text".into()).is_retryable());
        assert!(!ExtractError::Validation("too large".into()).is_retryable());
    }

    #[test]
    fn exhausted_message_names_attempt_count() {
        let msg = ExtractError::Exhausted { attempted: 3 }.user_message();
        assert!(msg.contains("3 method(s)"));
        assert!(msg.contains("scanned"));
    }

    #[test]
    fn configuration_message_keeps_detail() {
        let msg = ExtractError::Configuration("4 method(s) skipped".into()).user_message();
        assert!(msg.contains("not configured"));
        assert!(msg.contains("4 method(s) skipped"));
    }

    #[test]
    fn timeout_message_mentions_size() {
        assert!(ExtractError::Timeout(1).user_message().contains("too large"));
    }
}
