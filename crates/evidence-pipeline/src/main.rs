use std::path::Path;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use evidence_common::redis::RedisCache;
use evidence_pipeline::cache::{CacheMetrics, EvidenceCache};
use evidence_pipeline::config::Config;
use evidence_pipeline::fetch::FileFetcher;
use evidence_pipeline::pipeline::EvidencePipeline;

/// Offline replay tool: runs one query through the full evidence pipeline,
/// fetching from a recorded evidence file instead of live literature APIs,
/// and prints the annotated result as JSON.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(query), Some(evidence_path)) = (args.next(), args.next()) else {
        eprintln!("usage: evidence-pipeline <query> <evidence.json>");
        std::process::exit(2);
    };

    info!("starting evidence pipeline");

    let config = Config::from_env()?;
    info!(
        redis = config.redis_url.is_some(),
        fetch_timeout_ms = config.fetch_timeout.as_millis() as u64,
        "configuration loaded"
    );

    let redis = RedisCache::with_timeout(config.redis_url.as_deref(), config.cache_op_timeout);
    if redis.probe().await {
        info!("redis connected");
    } else {
        info!("redis unavailable, running without cache");
    }

    let metrics = Arc::new(CacheMetrics::default());
    let cache = Arc::new(EvidenceCache::new(redis, Arc::clone(&metrics)));

    let fetcher = Arc::new(FileFetcher::from_path(Path::new(&evidence_path))?);
    let sources = fetcher.sources();
    info!(sources = sources.len(), "evidence file loaded");

    let pipeline =
        EvidencePipeline::new(Arc::clone(&cache), fetcher).with_fetch_timeout(config.fetch_timeout);

    let result = pipeline.run(&query, &sources).await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    let stats = cache.stats();
    info!(
        hits = stats.hits,
        misses = stats.misses,
        errors = stats.errors,
        hit_rate = stats.hit_rate,
        "cache stats"
    );
    Ok(())
}
