//! Cached entry point combining the orchestrator and the result cache.

use std::sync::Arc;

use docextract_config::PipelineConfig;
use docextract_core::{ExtractionConfig, ExtractionRequest, ExtractionResult};

use crate::cache::{CacheStats, ExtractionCache};
use crate::orchestrator::Orchestrator;

#[derive(Clone)]
pub struct ExtractionPipeline {
    orchestrator: Arc<Orchestrator>,
    cache: Arc<ExtractionCache>,
}

impl ExtractionPipeline {
    pub fn new(orchestrator: Arc<Orchestrator>, cache: Arc<ExtractionCache>) -> Self {
        Self { orchestrator, cache }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            Arc::new(Orchestrator::from_config(config)),
            Arc::new(ExtractionCache::new(&config.cache)),
        )
    }

    /// Extract with the recommended config, served from cache for repeated bytes.
    pub async fn extract(&self, request: &ExtractionRequest) -> Arc<ExtractionResult> {
        self.cache
            .get_or_extract(request.bytes(), || self.orchestrator.extract_text(request))
            .await
    }

    /// Extract with an explicit config. Bypasses the cache, whose entries
    /// reflect the recommended config only.
    pub async fn extract_with(&self, request: &ExtractionRequest, config: &ExtractionConfig) -> ExtractionResult {
        self.orchestrator.extract_text_with(request, config).await
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
