//! Embedded PDF text layer, read locally with lopdf.
//!
//! Scanned PDFs have no text layer and come back empty; that is an ordinary
//! outcome, left to the adequacy check upstream.

use bytes::Bytes;
use docextract_core::{ExtractError, ExtractedText};
use lopdf::Document;
use tracing::debug;

/// Page count above which the parser refuses the document.
pub const MAX_TEXT_LAYER_PAGES: usize = 4_000;

#[derive(Debug, Clone)]
pub struct TextLayerParser {
    max_pages: usize,
}

impl Default for TextLayerParser {
    fn default() -> Self {
        Self {
            max_pages: MAX_TEXT_LAYER_PAGES,
        }
    }
}

impl TextLayerParser {
    pub fn new(max_pages: usize) -> Self {
        Self { max_pages }
    }

    /// Parse off the async runtime; PDF parsing is CPU-bound.
    pub async fn extract_text(&self, bytes: Bytes) -> Result<ExtractedText, ExtractError> {
        let max_pages = self.max_pages;
        tokio::task::spawn_blocking(move || read_text_layer(&bytes, max_pages))
            .await
            .map_err(|e| ExtractError::InvalidResponse(format!("text-layer parser aborted: {e}")))?
    }
}

pub fn read_text_layer(bytes: &[u8], max_pages: usize) -> Result<ExtractedText, ExtractError> {
    if !bytes.starts_with(b"%PDF") {
        return Err(ExtractError::Validation("not a PDF document".into()));
    }

    let mut document = Document::load_mem(bytes)
        .map_err(|e| ExtractError::Validation(format!("PDF could not be parsed: {e}")))?;

    if document.is_encrypted() && document.decrypt("").is_err() {
        return Err(ExtractError::Validation("PDF is password-protected".into()));
    }

    document.decompress();

    let mut pages: Vec<u32> = document.get_pages().keys().copied().collect();
    if pages.is_empty() {
        return Ok(ExtractedText::new(""));
    }
    pages.sort_unstable();

    if pages.len() > max_pages {
        return Err(ExtractError::Validation(format!(
            "PDF has {} pages, at most {max_pages} are read",
            pages.len()
        )));
    }

    let text = document
        .extract_text(&pages)
        .map_err(|e| ExtractError::InvalidResponse(format!("text layer unreadable: {e}")))?;

    debug!(pages = pages.len(), chars = text.trim().chars().count(), "Read PDF text layer");
    Ok(ExtractedText::new(text.trim()).with_confidence(1.0))
}
