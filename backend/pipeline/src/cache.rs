//! Content-addressed result cache.
//!
//! Keyed by the SHA-256 of the file bytes, so name and declared type do not
//! matter. Concurrent requests for the same bytes share one computation.
//! Bounded by entry count, optionally by age.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use docextract_config::CacheConfig;
use docextract_core::ExtractionResult;
use moka::future::Cache;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entries: u64,
    pub max_entries: u64,
    pub hits: u64,
    pub misses: u64,
    pub computations: u64,
}

pub struct ExtractionCache {
    entries: Cache<String, Arc<ExtractionResult>>,
    max_entries: u64,
    cache_failures: bool,
    hits: AtomicU64,
    misses: AtomicU64,
    computations: AtomicU64,
}

impl ExtractionCache {
    pub fn new(config: &CacheConfig) -> Self {
        let mut builder = Cache::builder().max_capacity(config.max_entries);
        if let Some(ttl) = config.ttl_secs {
            builder = builder.time_to_live(Duration::from_secs(ttl));
        }
        Self {
            entries: builder.build(),
            max_entries: config.max_entries,
            cache_failures: config.cache_failures,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            computations: AtomicU64::new(0),
        }
    }

    /// Return the stored result for `bytes`, or run `compute` once and store it.
    ///
    /// Callers arriving while a computation for the same bytes is in flight
    /// wait for it. Failed results are handed to those waiters but not stored
    /// when `cache_failures` is off.
    pub async fn get_or_extract<F, Fut>(&self, bytes: &[u8], compute: F) -> Arc<ExtractionResult>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ExtractionResult>,
    {
        let key = content_hash(bytes);

        if let Some(hit) = self.entries.get(&key).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(key = %&key[..12], "Extraction cache hit");
            return hit;
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let cache_failures = self.cache_failures;
        let computations = &self.computations;
        let outcome = self
            .entries
            .try_get_with(key, async move {
                computations.fetch_add(1, Ordering::Relaxed);
                let result = Arc::new(compute().await);
                if result.success || cache_failures {
                    Ok(result)
                } else {
                    Err(result)
                }
            })
            .await;

        match outcome {
            Ok(result) => result,
            // Uncached failure shared by everyone who waited on it.
            Err(shared) => (*shared).clone(),
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.entry_count(),
            max_entries: self.max_entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            computations: self.computations.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn result(success: bool, text: &str) -> ExtractionResult {
        ExtractionResult {
            success,
            text: text.to_string(),
            method: None,
            attempts: Vec::new(),
            processing_time_ms: 0,
            quality_score: 0.0,
            confidence: None,
            error: None,
            error_kind: None,
            file_size: text.len(),
        }
    }

    #[test]
    fn hash_depends_only_on_bytes() {
        assert_eq!(content_hash(b"abc"), content_hash(b"abc"));
        assert_ne!(content_hash(b"abc"), content_hash(b"abd"));
        assert_eq!(content_hash(b"abc").len(), 64);
    }

    #[tokio::test]
    async fn second_call_is_served_from_cache() {
        let cache = ExtractionCache::new(&CacheConfig::default());
        let calls = AtomicUsize::new(0);

        let first = cache
            .get_or_extract(b"same bytes", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                result(true, "hello")
            })
            .await;
        let second = cache
            .get_or_extract(b"same bytes", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                result(true, "different")
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.text, "hello");
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.computations, 1);
    }

    #[tokio::test]
    async fn concurrent_identical_requests_compute_once() {
        let cache = Arc::new(ExtractionCache::new(&CacheConfig::default()));
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let calls = calls.clone();
                tokio::spawn(async move {
                    cache
                        .get_or_extract(b"uploaded twice", || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            result(true, "shared")
                        })
                        .await
                })
            })
            .collect();

        let mut results = Vec::new();
        for task in tasks {
            results.push(task.await.unwrap());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| r.text == "shared"));
    }

    #[tokio::test]
    async fn failures_can_be_left_uncached() {
        let cache = ExtractionCache::new(&CacheConfig {
            cache_failures: false,
            ..Default::default()
        });
        let calls = AtomicUsize::new(0);
        for _ in 0..2 {
            let r = cache
                .get_or_extract(b"flaky", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    result(false, "")
                })
                .await;
            assert!(!r.success);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failures_are_cached_by_default() {
        let cache = ExtractionCache::new(&CacheConfig::default());
        let calls = AtomicUsize::new(0);
        for _ in 0..2 {
            cache
                .get_or_extract(b"broken", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    result(false, "")
                })
                .await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
