/// GeckoTerminal client and normalizer.
///
/// Pulls `/networks/solana/trending_pools?include=base_token`; the network
/// is pinned in the path so no chain filter is applied afterwards.
pub mod types;

pub use self::types::{GeckoPool, TrendingPoolsResponse};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

use crate::apis::client::{HttpClient, RateLimiter};
use crate::apis::stats::{ApiStats, ApiStatsTracker};
use crate::apis::{passes_domain_filters, TokenSource};
use crate::errors::SourceError;
use crate::logger::{self, LogTag};
use crate::tokens::types::Token;

pub const PROVIDER: &str = "geckoterminal";

pub struct GeckoTerminalClient {
    http: Arc<HttpClient>,
    limiter: Arc<RateLimiter>,
    stats: ApiStatsTracker,
    base_url: String,
}

impl GeckoTerminalClient {
    pub fn new(http: Arc<HttpClient>, limiter: Arc<RateLimiter>, base_url: String) -> Self {
        Self {
            http,
            limiter,
            stats: ApiStatsTracker::new(),
            base_url,
        }
    }

    async fn fetch_payload(&self) -> Result<serde_json::Value, SourceError> {
        let url = format!(
            "{}/networks/solana/trending_pools?include=base_token",
            self.base_url
        );
        logger::debug(LogTag::Api, "[GECKOTERMINAL] fetching trending pools");

        let started = Instant::now();
        let result = self
            .http
            .get_json(&url, &[("accept", "application/json")])
            .await;
        let elapsed = started.elapsed().as_millis() as f64;

        match &result {
            Ok(_) => self.stats.record_request(true, elapsed),
            Err(err) => {
                self.stats.record_request(false, elapsed);
                self.stats.record_error(err.to_string());
            }
        }
        result
    }
}

/// Map a raw trending-pools payload into canonical tokens. Malformed
/// payloads yield an empty list.
pub fn normalize(payload: &serde_json::Value) -> Vec<Token> {
    let response: TrendingPoolsResponse = match serde_json::from_value(payload.clone()) {
        Ok(parsed) => parsed,
        Err(err) => {
            logger::debug(
                LogTag::Api,
                &format!("[GECKOTERMINAL] unparseable payload: {}", err),
            );
            return Vec::new();
        }
    };

    response
        .data
        .iter()
        .filter_map(GeckoPool::to_token)
        .filter(passes_domain_filters)
        .collect()
}

#[async_trait]
impl TokenSource for GeckoTerminalClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn fetch_tokens(&self) -> Result<Vec<Token>, SourceError> {
        let payload = self
            .limiter
            .execute_with_backoff(PROVIDER, || self.fetch_payload())
            .await?;

        Ok(normalize(&payload))
    }

    fn stats(&self) -> ApiStats {
        self.stats.stats()
    }
}
