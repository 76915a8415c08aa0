/// DexScreener client and normalizer.
///
/// Uses `/search?q={query}` with a rotating discovery query; only pairs on
/// the Solana chain are kept. DexScreener is the noisiest provider, so on
/// top of the shared domain filters it applies its own liquidity floor and
/// caps the contribution per fetch.
pub mod types;

pub use self::types::{DexScreenerPair, SearchResponse};

use async_trait::async_trait;
use rand::seq::SliceRandom;
use std::sync::Arc;
use std::time::Instant;

use crate::apis::client::{HttpClient, RateLimiter};
use crate::apis::stats::{ApiStats, ApiStatsTracker};
use crate::apis::{passes_domain_filters, TokenSource};
use crate::errors::SourceError;
use crate::logger::{self, LogTag};
use crate::tokens::types::Token;

pub const PROVIDER: &str = "dexscreener";

/// Target chain; pairs on anything else are discarded.
const CHAIN_ID: &str = "solana";

/// Discovery queries rotated across fetches to vary the visible slice of
/// the market.
const SEARCH_QUERIES: &[&str] = &["pump", "WIF", "BONK", "SOL", "JUP", "RAY"];

/// Extra noise floor applied on top of the shared domain filters.
const NOISE_FLOOR: f64 = 1_000.0;

/// Maximum records contributed per fetch.
const MAX_RESULTS: usize = 50;

pub struct DexScreenerClient {
    http: Arc<HttpClient>,
    limiter: Arc<RateLimiter>,
    stats: ApiStatsTracker,
    base_url: String,
}

impl DexScreenerClient {
    pub fn new(http: Arc<HttpClient>, limiter: Arc<RateLimiter>, base_url: String) -> Self {
        Self {
            http,
            limiter,
            stats: ApiStatsTracker::new(),
            base_url,
        }
    }

    async fn fetch_payload(&self) -> Result<serde_json::Value, SourceError> {
        let query = SEARCH_QUERIES
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or("SOL");
        let url = format!("{}/search?q={}", self.base_url, query);
        logger::debug(LogTag::Api, &format!("[DEXSCREENER] searching q={}", query));

        let started = Instant::now();
        let result = self.http.get_json(&url, &[]).await;
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

/// Map a raw search payload into canonical tokens. Malformed payloads
/// yield an empty list.
pub fn normalize(payload: &serde_json::Value) -> Vec<Token> {
    let response: SearchResponse = match serde_json::from_value(payload.clone()) {
        Ok(parsed) => parsed,
        Err(err) => {
            logger::debug(
                LogTag::Api,
                &format!("[DEXSCREENER] unparseable payload: {}", err),
            );
            return Vec::new();
        }
    };

    response
        .pairs
        .iter()
        .filter(|pair| pair.chain_id == CHAIN_ID)
        .map(DexScreenerPair::to_token)
        .filter(passes_domain_filters)
        .collect()
}

#[async_trait]
impl TokenSource for DexScreenerClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn fetch_tokens(&self) -> Result<Vec<Token>, SourceError> {
        let payload = self
            .limiter
            .execute_with_backoff(PROVIDER, || self.fetch_payload())
            .await?;

        let mut tokens = normalize(&payload);
        tokens.retain(|token| {
            token.liquidity_sol >= NOISE_FLOOR && token.volume_sol >= NOISE_FLOOR
        });
        tokens.truncate(MAX_RESULTS);
        Ok(tokens)
    }

    fn stats(&self) -> ApiStats {
        self.stats.stats()
    }
}
