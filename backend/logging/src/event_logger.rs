//! Extraction Event Logger
//!
//! One structured event per attempt and per final result, under the
//! `extraction_events` target so they can be routed separately.

use chrono::{DateTime, Utc};
use docextract_core::{ExtractionAttempt, ExtractionResult};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::redact::redact_sensitive_data;

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExtractionEvent {
    Attempt {
        method: String,
        duration_ms: u64,
        success: bool,
        chars: usize,
        failure_kind: Option<String>,
        reason: Option<String>,
    },
    Result {
        success: bool,
        method: Option<String>,
        attempts: usize,
        processing_time_ms: u64,
        chars: usize,
        quality_score: f32,
        error_kind: Option<String>,
    },
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    pub request_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event: ExtractionEvent,
}

pub struct AttemptLogger;

impl AttemptLogger {
    pub fn log_attempt(request_id: Uuid, attempt: &ExtractionAttempt) {
        let event = ExtractionEvent::Attempt {
            method: attempt.method.to_string(),
            duration_ms: attempt.duration_ms,
            success: attempt.is_success(),
            chars: attempt.text.as_deref().map(|t| t.trim().chars().count()).unwrap_or(0),
            failure_kind: attempt.failure.as_ref().map(|f| f.kind.to_string()),
            reason: attempt
                .failure
                .as_ref()
                .map(|f| redact_sensitive_data(&f.message)),
        };
        Self::emit(request_id, event);
    }

    pub fn log_result(request_id: Uuid, result: &ExtractionResult) {
        let event = ExtractionEvent::Result {
            success: result.success,
            method: result.method.map(|m| m.to_string()),
            attempts: result.attempt_count(),
            processing_time_ms: result.processing_time_ms,
            chars: result.char_count(),
            quality_score: result.quality_score,
            error_kind: result.error_kind.map(|k| k.to_string()),
        };
        Self::emit(request_id, event);
    }

    fn emit(request_id: Uuid, event: ExtractionEvent) {
        let failed = matches!(
            event,
            ExtractionEvent::Attempt { success: false, .. } | ExtractionEvent::Result { success: false, .. }
        );
        let entry = EventLogEntry {
            request_id,
            timestamp: Utc::now(),
            event,
        };
        let json = serde_json::to_string(&entry).unwrap_or_default();

        if failed {
            warn!(target: "extraction_events", %request_id, event = %json, "Extraction event");
        } else {
            info!(target: "extraction_events", %request_id, event = %json, "Extraction event");
        }
    }
}
