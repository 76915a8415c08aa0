use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use tokenscope::aggregator::Aggregator;
use tokenscope::apis::client::{HttpClient, RateLimiter};
use tokenscope::apis::dexscreener::DexScreenerClient;
use tokenscope::apis::geckoterminal::GeckoTerminalClient;
use tokenscope::apis::jupiter::JupiterClient;
use tokenscope::apis::TokenSource;
use tokenscope::arguments::Arguments;
use tokenscope::cache::store::{CacheStore, MemoryStore};
use tokenscope::cache::CacheService;
use tokenscope::config::Config;
use tokenscope::events::{EventSink, LogSink};
use tokenscope::logger::{self, LogTag};
use tokenscope::refresh::RefreshJob;

/// Composition root: every component is constructed here and handed its
/// dependencies explicitly, so tests (and future transports) can swap in
/// their own stores, sources and sinks.
#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let arguments = Arguments::parse();
    logger::init(arguments.log_level());
    logger::info(LogTag::System, "tokenscope starting up");

    let config = Config::from_env();

    let store: Arc<dyn CacheStore> = Arc::new(MemoryStore::new());
    if store.ping().await.is_err() {
        logger::warning(
            LogTag::Cache,
            "cache store unreachable, running in degraded mode",
        );
    }
    let cache = Arc::new(CacheService::new(Arc::clone(&store), &config.cache));

    if arguments.flush_cache {
        cache.flush_tokens().await;
        logger::info(LogTag::Cache, "token cache flushed");
        return Ok(());
    }
    let limiter = Arc::new(RateLimiter::new(
        Arc::clone(&store),
        config.rate_limits.clone(),
        config.backoff,
    ));
    let http = Arc::new(
        HttpClient::new(Duration::from_secs(config.request_timeout_secs))
            .context("building HTTP client")?,
    );

    let sources: Vec<Arc<dyn TokenSource>> = vec![
        Arc::new(DexScreenerClient::new(
            Arc::clone(&http),
            Arc::clone(&limiter),
            config.endpoints.dexscreener_base_url.clone(),
        )),
        Arc::new(JupiterClient::new(
            Arc::clone(&http),
            Arc::clone(&limiter),
            config.endpoints.jupiter_base_url.clone(),
            config.endpoints.jupiter_api_key.clone(),
        )),
        Arc::new(GeckoTerminalClient::new(
            Arc::clone(&http),
            Arc::clone(&limiter),
            config.endpoints.geckoterminal_base_url.clone(),
        )),
    ];

    let aggregator = Arc::new(Aggregator::new(
        sources.clone(),
        Arc::clone(&cache),
        config.pagination,
    ));
    let sink: Arc<dyn EventSink> = Arc::new(LogSink);
    let mut job = RefreshJob::new(Arc::clone(&aggregator), sink, config.refresh);

    if arguments.once {
        job.run_cycle().await;
        report_shutdown(&sources, &cache).await;
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.send(true);
    })
    .context("installing shutdown handler")?;

    job.run(shutdown_rx).await;
    report_shutdown(&sources, &cache).await;
    logger::info(LogTag::System, "tokenscope stopped");
    Ok(())
}

async fn report_shutdown(sources: &[Arc<dyn TokenSource>], cache: &CacheService) {
    for source in sources {
        let stats = source.stats();
        logger::info(
            LogTag::Api,
            &format!(
                "{}: {} requests ({} failed, avg {:.0}ms)",
                source.name(),
                stats.requests,
                stats.failures,
                stats.average_response_ms
            ),
        );
    }

    let stats = cache.stats().await;
    logger::info(
        LogTag::Cache,
        &format!("cache counters: {} hits / {} misses", stats.hits, stats.misses),
    );
}
