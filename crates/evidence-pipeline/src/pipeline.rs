/// Orchestration: cache check, concurrent fetch for misses, cache store,
/// packaging, conflict scan, sufficiency scoring, formatting.
///
/// Per request the flow is linear with no back-edges:
/// `INIT → CACHE_CHECK → {FETCH → CACHE_STORE} → PACKAGE → CONFLICT_SCAN →
/// SUFFICIENCY_SCORE → FORMAT → DONE`. Every failure downgrades (source
/// skipped, empty conflicts, fallback score, cache treated as absent); the
/// pipeline always reaches FORMAT and never returns an error.
use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Utc};
use futures::future::join_all;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::cache::{CacheLookup, EvidenceCache};
use crate::conflict;
use crate::fetch::EvidenceFetcher;
use crate::format;
use crate::model::{
    AnnotatedEvidence, EvidenceCounts, EvidencePackage, GuidelineRecord, Source, SourceEvidence,
    SourceSlice,
};
use crate::sufficiency;

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

pub struct EvidencePipeline {
    cache: Arc<EvidenceCache>,
    fetcher: Arc<dyn EvidenceFetcher>,
    fetch_timeout: Duration,
}

impl EvidencePipeline {
    pub fn new(cache: Arc<EvidenceCache>, fetcher: Arc<dyn EvidenceFetcher>) -> Self {
        Self {
            cache,
            fetcher,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// Run one query through the full pipeline. Infallible by contract: the
    /// worst case is an empty package with an insufficient score.
    pub async fn run(&self, query: &str, sources: &[Source]) -> AnnotatedEvidence {
        // CACHE_CHECK
        let mut slices: Vec<SourceSlice> = Vec::new();
        let mut misses: Vec<Source> = Vec::new();
        for &source in sources {
            match self.cache.lookup(query, source).await {
                CacheLookup::Hit(entry) => match serde_json::from_value::<SourceEvidence>(entry.data)
                {
                    Ok(evidence) => slices.push(SourceSlice {
                        source,
                        from_cache: true,
                        evidence,
                    }),
                    Err(e) => {
                        warn!(error = %e, %source, "cached payload unreadable, refetching");
                        misses.push(source);
                    }
                },
                CacheLookup::Miss | CacheLookup::Unavailable => misses.push(source),
            }
        }

        // FETCH: fan out over misses, join before packaging.
        let fetch_timeout = self.fetch_timeout;
        let fetches = misses.into_iter().map(|source| {
            let fetcher = Arc::clone(&self.fetcher);
            let query = query.to_string();
            async move { (source, timeout(fetch_timeout, fetcher.fetch(&query, source)).await) }
        });
        for (source, outcome) in join_all(fetches).await {
            match outcome {
                Ok(Ok(evidence)) => {
                    // CACHE_STORE: fire-and-forget; a dropped write only
                    // costs the next request a fetch.
                    if let Ok(data) = serde_json::to_value(&evidence) {
                        self.cache.store(query, source, data).await;
                    }
                    slices.push(SourceSlice {
                        source,
                        from_cache: false,
                        evidence,
                    });
                }
                Ok(Err(e)) => warn!(error = %e, %source, "fetch failed, source skipped"),
                Err(_) => warn!(
                    %source,
                    timeout_ms = fetch_timeout.as_millis() as u64,
                    "fetch timed out, source skipped"
                ),
            }
        }

        // PACKAGE
        let guidelines: Vec<GuidelineRecord> = slices
            .iter()
            .flat_map(|s| s.evidence.guidelines.iter().cloned())
            .collect();
        let counts = EvidenceCounts::tally(slices.iter().map(|s| &s.evidence), Utc::now().year());

        // CONFLICT_SCAN, panic-contained: one bad record must not take down
        // the request.
        let conflicts = {
            let guidelines = guidelines.clone();
            match tokio::spawn(async move { conflict::detect(&guidelines) }).await {
                Ok(conflicts) => conflicts,
                Err(e) => {
                    warn!(error = %e, "conflict detection failed, reporting none");
                    Vec::new()
                }
            }
        };

        // SUFFICIENCY_SCORE, same containment with the fixed fallback.
        let sufficiency = {
            let counts = counts.clone();
            match tokio::spawn(async move { sufficiency::score(&counts) }).await {
                Ok(score) => score,
                Err(e) => {
                    warn!(error = %e, "sufficiency scoring failed, using fallback");
                    sufficiency::fallback_score()
                }
            }
        };

        // FORMAT
        let annotation = format::render_annotation(&conflicts, &sufficiency);

        let cached = slices.iter().filter(|s| s.from_cache).count();
        info!(
            query,
            sources = sources.len(),
            cached,
            fetched = slices.len() - cached,
            conflicts = conflicts.len(),
            score = sufficiency.score,
            level = sufficiency.level.as_str(),
            "evidence pipeline complete"
        );

        AnnotatedEvidence {
            package: EvidencePackage {
                query: query.to_string(),
                slices,
                guidelines,
                counts,
            },
            conflicts,
            sufficiency,
            annotation,
        }
    }
}
