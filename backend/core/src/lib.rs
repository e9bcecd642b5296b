pub mod error;
pub mod mime;
pub mod traits;
pub mod types;

pub use error::{ExtractError, FailureKind};
pub use traits::ExtractionStrategy;
pub use types::{
    AttemptFailure, AttemptOutcome, ExtractedText, ExtractionAttempt, ExtractionConfig,
    ExtractionMethod, ExtractionRequest, ExtractionResult,
};
