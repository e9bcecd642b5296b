//! Per-file choice of methods, adequacy threshold, and deadline.

use docextract_core::types::{DEFAULT_MIN_TEXT_LENGTH, DEFAULT_TIMEOUT_MS};
use docextract_core::{ExtractionConfig, ExtractionMethod, ExtractionRequest, mime};

/// Images carry less text than documents.
pub const IMAGE_MIN_TEXT_LENGTH: usize = 20;
pub const PDF_MIN_TEXT_LENGTH: usize = 100;

/// Files above this size get the extended deadline.
pub const LARGE_FILE_BYTES: usize = 5 * 1024 * 1024;
pub const LARGE_FILE_TIMEOUT_MS: u64 = 60_000;

pub fn recommend_config(request: &ExtractionRequest) -> ExtractionConfig {
    recommend_for(request.mime_type(), request.len())
}

/// Pure function of MIME type and size.
pub fn recommend_for(mime_type: &str, size: usize) -> ExtractionConfig {
    use ExtractionMethod::*;

    let (methods, min_text_length) = if mime::is_image(mime_type) {
        (vec![VisionOcr, AiExtraction, ExternalOcr], IMAGE_MIN_TEXT_LENGTH)
    } else if mime_type == mime::PDF {
        (vec![TextLayer, AiExtraction, VisionOcr, ExternalOcr], PDF_MIN_TEXT_LENGTH)
    } else {
        (ExtractionConfig::default().methods, DEFAULT_MIN_TEXT_LENGTH)
    };

    let timeout_ms = if size > LARGE_FILE_BYTES {
        LARGE_FILE_TIMEOUT_MS
    } else {
        DEFAULT_TIMEOUT_MS
    };

    ExtractionConfig {
        methods,
        min_text_length,
        timeout_ms,
    }
}
