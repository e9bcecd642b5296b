//! Extraction backends.
//!
//! Each backend takes an [`ExtractionRequest`](docextract_core::ExtractionRequest)
//! and yields text or a typed [`ExtractError`](docextract_core::ExtractError).
//! Only the OCR transport client retries; everything else leaves that to the caller.

pub mod ai;
pub mod auth;
pub mod ocr;
pub mod retry;
pub mod text_layer;
mod transport;
pub mod vision;

pub use ai::AiExtractor;
pub use auth::TokenProvider;
pub use ocr::{OcrClient, OcrMetadata, OcrResponse};
pub use retry::RetryPolicy;
pub use text_layer::TextLayerParser;
pub use vision::{VISION_CONFIDENCE, VISION_MAX_BYTES, VisionClient, VisionResult};
