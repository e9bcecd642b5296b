//! Turns uploaded files into text.
//!
//! Provides:
//! - Strategy adapters over each backend
//! - The fallback orchestrator with adequacy checks
//! - A content-addressed result cache with in-flight coalescing
//! - Per-file method selection
//! - Quality scoring and backend health checks

pub mod cache;
pub mod health;
pub mod orchestrator;
pub mod pipeline;
pub mod quality;
pub mod selector;
pub mod strategies;

pub use cache::{CacheStats, ExtractionCache, content_hash};
pub use health::{ServiceHealth, ServiceStatus, check_services};
pub use orchestrator::Orchestrator;
pub use pipeline::ExtractionPipeline;
pub use quality::QualityLevel;
pub use selector::{recommend_config, recommend_for};
pub use strategies::build_strategies;
