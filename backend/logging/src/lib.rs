//! Structured logging for the extraction pipeline.
//!
//! Handles logger setup with file rotation, log redaction, and one structured
//! event per extraction attempt and result.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{AttemptLogger, ExtractionEvent, EventLogEntry};
pub use logger::init_logger;
pub use redact::redact_sensitive_data;
