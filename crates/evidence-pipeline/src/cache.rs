/// Evidence caching layer over the shared Redis wrapper.
///
/// Key schema (persisted layout, must match existing deployments exactly):
/// - `evidence:{sha256(query)}:{source}` — JSON `{data, metadata}` (TTL 86400s)
///
/// Entry metadata is camelCase on the wire:
/// `{timestamp (ISO-8601), source, queryHash, ttl}`.
///
/// Every operation is best-effort: cache unavailability never changes
/// correctness, only latency and cost. Hit/miss/error counters are owned by
/// an injected `CacheMetrics` instance, never module-level state.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use evidence_common::error::CommonError;
use evidence_common::redis::RedisCache;

use crate::hash::query_hash;
use crate::model::Source;

const KEY_PREFIX: &str = "evidence:";

/// Fixed TTL for every evidence entry: 24 hours.
pub const CACHE_TTL_SECS: u64 = 86_400;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheMetadata {
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub query_hash: String,
    pub ttl: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedEvidence {
    pub data: serde_json::Value,
    pub metadata: CacheMetadata,
}

/// Internal lookup outcome. The public `get` collapses `Miss` and
/// `Unavailable` into `None` (uniform fallback for callers); keeping them
/// distinct here keeps the degradation path testable.
#[derive(Debug)]
pub enum CacheLookup {
    Hit(CachedEvidence),
    Miss,
    Unavailable,
}

/// Process-local counters, reset on restart. Increments are relaxed;
/// approximate counts under concurrency are acceptable.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
}

impl CacheMetrics {
    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let errors = self.errors.load(Ordering::Relaxed);
        let lookups = hits + misses;
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            hits as f64 / lookups as f64
        };
        CacheStats {
            hits,
            misses,
            errors,
            hit_rate,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub errors: u64,
    pub hit_rate: f64,
}

pub struct EvidenceCache {
    redis: RedisCache,
    metrics: Arc<CacheMetrics>,
}

impl EvidenceCache {
    pub fn new(redis: RedisCache, metrics: Arc<CacheMetrics>) -> Self {
        Self { redis, metrics }
    }

    /// Cached backend reachability; never fails, never probes live.
    pub fn is_available(&self) -> bool {
        self.redis.is_available()
    }

    /// PING the backend once and refresh the availability flag.
    pub async fn probe(&self) -> bool {
        self.redis.probe().await
    }

    pub fn stats(&self) -> CacheStats {
        self.metrics.snapshot()
    }

    /// String-keyed read. Unknown sources are logged and treated as uncached;
    /// miss, expiry, and backend failure are indistinguishable to the caller.
    pub async fn get(&self, query: &str, source: &str) -> Option<CachedEvidence> {
        let source: Source = match source.parse() {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "rejecting cache read for unknown source");
                return None;
            }
        };
        match self.lookup(query, source).await {
            CacheLookup::Hit(entry) => Some(entry),
            CacheLookup::Miss | CacheLookup::Unavailable => None,
        }
    }

    /// String-keyed write. Unknown sources are logged and dropped.
    pub async fn put(&self, query: &str, source: &str, data: serde_json::Value) {
        let source: Source = match source.parse() {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "rejecting cache write for unknown source");
                return;
            }
        };
        self.store(query, source, data).await;
    }

    /// Typed lookup keeping the hit/miss/unavailable distinction.
    pub async fn lookup(&self, query: &str, source: Source) -> CacheLookup {
        let key = cache_key(query, source);
        match self.redis.get(&key).await {
            Ok(Some(json)) => match serde_json::from_str::<CachedEvidence>(&json) {
                Ok(entry) if is_expired(&entry.metadata, Utc::now()) => {
                    self.metrics.record_miss();
                    CacheLookup::Miss
                }
                Ok(entry) => {
                    self.metrics.record_hit();
                    CacheLookup::Hit(entry)
                }
                Err(e) => {
                    warn!(error = %e, key, "cache deserialization failed");
                    self.metrics.record_error();
                    CacheLookup::Miss
                }
            },
            Ok(None) => {
                self.metrics.record_miss();
                CacheLookup::Miss
            }
            Err(CommonError::RedisUnavailable) => {
                self.metrics.record_error();
                CacheLookup::Unavailable
            }
            Err(e) => {
                warn!(error = %e, key, "cache lookup failed, treating as miss");
                self.metrics.record_error();
                CacheLookup::Unavailable
            }
        }
    }

    /// Typed write with the fixed TTL. Fire-and-forget: a failed write is a
    /// silent no-op (the wrapper already logged it).
    pub async fn store(&self, query: &str, source: Source, data: serde_json::Value) {
        let entry = make_entry(query, source, data);
        let Ok(json) = serde_json::to_string(&entry) else {
            return;
        };
        self.redis
            .set_with_ttl(&cache_key(query, source), &json, CACHE_TTL_SECS)
            .await;
    }
}

/// Build the persisted key: `evidence:{queryHashHex}:{source}`.
pub fn cache_key(query: &str, source: Source) -> String {
    format!("{KEY_PREFIX}{}:{}", query_hash(query), source.as_str())
}

fn make_entry(query: &str, source: Source, data: serde_json::Value) -> CachedEvidence {
    CachedEvidence {
        data,
        metadata: CacheMetadata {
            timestamp: Utc::now(),
            source: source.as_str().to_string(),
            query_hash: query_hash(query),
            ttl: CACHE_TTL_SECS,
        },
    }
}

/// Defensive staleness check on top of the store's own TTL enforcement.
fn is_expired(metadata: &CacheMetadata, now: DateTime<Utc>) -> bool {
    now - metadata.timestamp > Duration::seconds(metadata.ttl as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn offline_cache() -> (EvidenceCache, Arc<CacheMetrics>) {
        let metrics = Arc::new(CacheMetrics::default());
        (
            EvidenceCache::new(RedisCache::new(None), Arc::clone(&metrics)),
            metrics,
        )
    }

    #[test]
    fn key_matches_persisted_layout() {
        let key = cache_key("hypertension treatment", Source::Pubmed);
        let expected = format!("evidence:{}:pubmed", query_hash("hypertension treatment"));
        assert_eq!(key, expected);
        let hash_part = &key["evidence:".len()..key.len() - ":pubmed".len()];
        assert_eq!(hash_part.len(), 64);
    }

    #[test]
    fn entry_metadata_matches_wire_format() {
        let entry = make_entry(
            "hypertension treatment",
            Source::Pubmed,
            json!({"articles": []}),
        );
        assert_eq!(entry.metadata.source, "pubmed");
        assert_eq!(entry.metadata.query_hash, query_hash("hypertension treatment"));
        assert_eq!(entry.metadata.ttl, CACHE_TTL_SECS);

        let wire = serde_json::to_value(&entry).unwrap();
        assert!(wire.get("data").is_some());
        let metadata = wire.get("metadata").unwrap();
        assert!(metadata.get("queryHash").is_some(), "camelCase key required");
        assert!(metadata.get("timestamp").unwrap().is_string(), "ISO-8601 string");
        assert_eq!(metadata.get("ttl").unwrap().as_u64(), Some(86_400));
    }

    #[test]
    fn wire_format_round_trips() {
        let entry = make_entry("q", Source::Cochrane, json!({"articles": [1, 2]}));
        let json = serde_json::to_string(&entry).unwrap();
        let back: CachedEvidence = serde_json::from_str(&json).unwrap();
        assert_eq!(back.data, entry.data);
        assert_eq!(back.metadata.source, "cochrane");
        assert_eq!(back.metadata.query_hash, entry.metadata.query_hash);
    }

    #[test]
    fn fresh_entry_is_not_expired_and_stale_entry_is() {
        let entry = make_entry("q", Source::Pubmed, json!(null));
        let now = Utc::now();
        assert!(!is_expired(&entry.metadata, now));
        assert!(is_expired(
            &entry.metadata,
            now + Duration::seconds(CACHE_TTL_SECS as i64 + 1)
        ));
    }

    #[tokio::test]
    async fn unavailable_backend_reads_as_absence() {
        let (cache, metrics) = offline_cache();
        assert!(cache.get("hypertension treatment", "pubmed").await.is_none());
        assert!(matches!(
            cache.lookup("hypertension treatment", Source::Pubmed).await,
            CacheLookup::Unavailable
        ));
        assert_eq!(metrics.snapshot().errors, 2);
        assert_eq!(metrics.snapshot().hits, 0);
    }

    #[tokio::test]
    async fn unavailable_backend_write_is_a_silent_noop() {
        let (cache, _) = offline_cache();
        cache
            .put("hypertension treatment", "pubmed", json!({"articles": []}))
            .await;
    }

    #[tokio::test]
    async fn unknown_source_is_rejected_not_errored() {
        let (cache, metrics) = offline_cache();
        assert!(cache.get("q", "myspace").await.is_none());
        cache.put("q", "myspace", json!({})).await;
        // Rejected at the boundary: no backend op ran, so no error counted.
        let stats = metrics.snapshot();
        assert_eq!(stats.errors, 0);
        assert_eq!(stats.hits + stats.misses, 0);
    }

    #[test]
    fn hit_rate_is_zero_without_lookups() {
        let metrics = CacheMetrics::default();
        assert_eq!(metrics.snapshot().hit_rate, 0.0);
    }

    #[test]
    fn hit_rate_counts_only_hits_and_misses() {
        let metrics = CacheMetrics::default();
        metrics.record_hit();
        metrics.record_hit();
        metrics.record_miss();
        metrics.record_error();
        let stats = metrics.snapshot();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.errors, 1);
        assert!((stats.hit_rate - 2.0 / 3.0).abs() < 1e-9);
    }
}
