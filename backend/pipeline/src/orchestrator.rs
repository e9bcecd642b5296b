//! Cost-ascending fallback chain.
//!
//! Methods run strictly in order; the first whose trimmed output clears the
//! adequacy threshold wins. Failures and sub-threshold output are recorded
//! and the next method is tried. Only exhaustion reaches the caller.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use docextract_config::PipelineConfig;
use docextract_core::{
    ExtractError, ExtractedText, ExtractionAttempt, ExtractionConfig, ExtractionMethod,
    ExtractionRequest, ExtractionResult, ExtractionStrategy,
};
use docextract_logging::AttemptLogger;
use tracing::{debug, info, warn};

use crate::quality;
use crate::selector::recommend_config;
use crate::strategies::build_strategies;

pub struct Orchestrator {
    strategies: HashMap<ExtractionMethod, Arc<dyn ExtractionStrategy>>,
}

impl Orchestrator {
    /// Later strategies for the same method replace earlier ones.
    pub fn new(strategies: Vec<Arc<dyn ExtractionStrategy>>) -> Self {
        Self {
            strategies: strategies.into_iter().map(|s| (s.method(), s)).collect(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(build_strategies(config))
    }

    /// Extract with the configuration recommended for this file.
    pub async fn extract_text(&self, request: &ExtractionRequest) -> ExtractionResult {
        let config = recommend_config(request);
        self.extract_text_with(request, &config).await
    }

    pub async fn extract_text_with(
        &self,
        request: &ExtractionRequest,
        config: &ExtractionConfig,
    ) -> ExtractionResult {
        let start = Instant::now();
        info!(
            request_id = %request.id(),
            file = request.file_name(),
            mime = request.mime_type(),
            bytes = request.len(),
            "Starting extraction"
        );

        let result = if request.is_plain_text() {
            read_plain_text(request, start)
        } else {
            self.run_chain(request, config, start).await
        };

        AttemptLogger::log_result(request.id(), &result);
        result
    }

    async fn run_chain(
        &self,
        request: &ExtractionRequest,
        config: &ExtractionConfig,
        start: Instant,
    ) -> ExtractionResult {
        let mut attempts = Vec::new();
        let mut tried = Vec::new();
        let mut skipped = 0;

        for &method in &config.methods {
            if tried.contains(&method) {
                continue;
            }
            tried.push(method);

            let Some(strategy) = self.strategies.get(&method) else {
                debug!(%method, "Skipping method: not configured");
                skipped += 1;
                continue;
            };
            if !strategy.supports(request) {
                debug!(%method, mime = request.mime_type(), "Skipping method: unsupported file type");
                skipped += 1;
                continue;
            }

            let started_at = Utc::now();
            let attempt_start = Instant::now();
            let outcome = strategy.attempt_extraction(request, config.timeout()).await;
            let elapsed = attempt_start.elapsed();

            match judge(outcome, config) {
                Ok(extracted) => {
                    let text = extracted.text.trim().to_string();
                    let attempt = ExtractionAttempt::succeeded(method, started_at, elapsed, text.clone());
                    AttemptLogger::log_attempt(request.id(), &attempt);
                    attempts.push(attempt);

                    info!(%method, chars = text.chars().count(), "Extraction succeeded");
                    return ExtractionResult {
                        success: true,
                        quality_score: quality::score(&text),
                        text,
                        method: Some(method),
                        attempts,
                        processing_time_ms: elapsed_ms(start),
                        confidence: extracted.confidence,
                        error: None,
                        error_kind: None,
                        file_size: request.len(),
                    };
                }
                Err((err, partial)) => {
                    warn!(%method, error = %err, "Extraction method failed, moving on");
                    let attempt = ExtractionAttempt::failed(method, started_at, elapsed, &err, partial);
                    AttemptLogger::log_attempt(request.id(), &attempt);
                    attempts.push(attempt);
                }
            }
        }

        let err = if attempts.is_empty() {
            ExtractError::Configuration(format!(
                "{skipped} method(s) skipped, none can read {}",
                request.mime_type()
            ))
        } else {
            ExtractError::Exhausted {
                attempted: attempts.len(),
            }
        };
        warn!(file = request.file_name(), attempts = attempts.len(), "All extraction methods failed");
        failure(request, attempts, &err, start)
    }
}

/// Apply the adequacy check. Sub-threshold text is a failure that keeps the text.
fn judge(
    outcome: Result<ExtractedText, ExtractError>,
    config: &ExtractionConfig,
) -> Result<ExtractedText, (ExtractError, Option<String>)> {
    match outcome {
        Ok(extracted) if config.is_adequate(&extracted.text) => Ok(extracted),
        Ok(extracted) => {
            let chars = extracted.trimmed_len();
            let err = ExtractError::InsufficientText {
                chars,
                min: config.min_text_length,
            };
            let partial = Some(extracted.text.trim().to_string()).filter(|t| !t.is_empty());
            Err((err, partial))
        }
        Err(err) => Err((err, None)),
    }
}

fn read_plain_text(request: &ExtractionRequest, start: Instant) -> ExtractionResult {
    let started_at = Utc::now();
    let text = String::from_utf8_lossy(request.bytes()).trim().to_string();
    let elapsed = start.elapsed();

    if text.is_empty() {
        let err = ExtractError::InsufficientText { chars: 0, min: 1 };
        let attempt = ExtractionAttempt::failed(ExtractionMethod::PlainText, started_at, elapsed, &err, None);
        AttemptLogger::log_attempt(request.id(), &attempt);
        return failure(request, vec![attempt], &ExtractError::Exhausted { attempted: 1 }, start);
    }

    let attempt = ExtractionAttempt::succeeded(ExtractionMethod::PlainText, started_at, elapsed, text.clone());
    AttemptLogger::log_attempt(request.id(), &attempt);
    ExtractionResult {
        success: true,
        text,
        method: Some(ExtractionMethod::PlainText),
        attempts: vec![attempt],
        processing_time_ms: elapsed_ms(start),
        quality_score: 1.0,
        confidence: Some(1.0),
        error: None,
        error_kind: None,
        file_size: request.len(),
    }
}

fn failure(
    request: &ExtractionRequest,
    attempts: Vec<ExtractionAttempt>,
    err: &ExtractError,
    start: Instant,
) -> ExtractionResult {
    ExtractionResult {
        success: false,
        text: String::new(),
        method: None,
        attempts,
        processing_time_ms: elapsed_ms(start),
        quality_score: 0.0,
        confidence: None,
        error: Some(err.user_message()),
        error_kind: Some(err.kind()),
        file_size: request.len(),
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
