/// Jupiter client and normalizer.
///
/// Pulls the verified token universe from `/tokens/v2/tag?query=verified`.
/// The endpoint is Solana-only, so no chain filter is needed. An API key
/// is attached when configured.
pub mod types;

pub use self::types::JupiterToken;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

use crate::apis::client::{HttpClient, RateLimiter};
use crate::apis::stats::{ApiStats, ApiStatsTracker};
use crate::apis::{passes_domain_filters, TokenSource};
use crate::errors::SourceError;
use crate::logger::{self, LogTag};
use crate::tokens::types::Token;

pub const PROVIDER: &str = "jupiter";

pub struct JupiterClient {
    http: Arc<HttpClient>,
    limiter: Arc<RateLimiter>,
    stats: ApiStatsTracker,
    base_url: String,
    api_key: Option<String>,
}

impl JupiterClient {
    pub fn new(
        http: Arc<HttpClient>,
        limiter: Arc<RateLimiter>,
        base_url: String,
        api_key: Option<String>,
    ) -> Self {
        Self {
            http,
            limiter,
            stats: ApiStatsTracker::new(),
            base_url,
            api_key,
        }
    }

    async fn fetch_payload(&self) -> Result<serde_json::Value, SourceError> {
        let url = format!("{}/tokens/v2/tag?query=verified", self.base_url);
        logger::debug(LogTag::Api, "[JUPITER] fetching verified tokens");

        let mut headers: Vec<(&str, &str)> = vec![("accept", "application/json")];
        if let Some(key) = self.api_key.as_deref() {
            headers.push(("x-api-key", key));
        }

        let started = Instant::now();
        let result = self.http.get_json(&url, &headers).await;
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

/// Map a raw verified-token payload into canonical tokens. Anything that
/// is not the expected top-level array yields an empty list.
pub fn normalize(payload: &serde_json::Value) -> Vec<Token> {
    let entries: Vec<JupiterToken> = match serde_json::from_value(payload.clone()) {
        Ok(parsed) => parsed,
        Err(err) => {
            logger::debug(
                LogTag::Api,
                &format!("[JUPITER] unparseable payload: {}", err),
            );
            return Vec::new();
        }
    };

    entries
        .iter()
        .map(JupiterToken::to_token)
        .filter(passes_domain_filters)
        .collect()
}

#[async_trait]
impl TokenSource for JupiterClient {
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(id: &str, liquidity: f64) -> serde_json::Value {
        json!({
            "id": id,
            "name": "Jupiter",
            "symbol": "JUP",
            "usdPrice": 0.85,
            "mcap": 1_200_000.0,
            "liquidity": liquidity,
            "stats1h": {"priceChange": 0.4},
            "stats24h": {
                "priceChange": -1.2,
                "buyVolume": 30_000.0,
                "sellVolume": 25_000.0,
                "numBuys": 410,
                "numSells": 390
            },
            "stats7d": {"priceChange": 9.9},
            "updatedAt": "2024-06-01T12:00:00Z"
        })
    }

    #[test]
    fn maps_verified_tokens() {
        let tokens = normalize(&json!([entry("jupMint", 80_000.0)]));
        assert_eq!(tokens.len(), 1);

        let token = &tokens[0];
        assert_eq!(token.token_address, "jupMint");
        assert_eq!(token.token_name, "Jupiter");
        assert_eq!(token.token_ticker, "JUP");
        assert_eq!(token.price_sol, 0.85);
        assert_eq!(token.volume_sol, 55_000.0);
        assert_eq!(token.volume_1h, 0.0);
        assert_eq!(token.volume_7d, 0.0);
        assert_eq!(token.transaction_count, 800);
        assert_eq!(token.price_1hr_change, 0.4);
        assert_eq!(token.price_24h_change, -1.2);
        assert_eq!(token.price_7d_change, 9.9);
        assert_eq!(token.protocol, vec![PROVIDER]);
        assert_eq!(
            token.last_updated.to_rfc3339(),
            "2024-06-01T12:00:00+00:00"
        );
    }

    #[test]
    fn thin_records_are_filtered() {
        let tokens = normalize(&json!([entry("thin", 10.0), entry("keeper", 80_000.0)]));
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].token_address, "keeper");
    }

    #[test]
    fn placeholders_cover_missing_identity() {
        let tokens = normalize(&json!([{
            "id": "bare",
            "liquidity": 80_000.0,
            "stats24h": {"buyVolume": 30_000.0, "sellVolume": 25_000.0}
        }]));

        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].token_name, "Unknown");
        assert_eq!(tokens[0].token_ticker, "UNKNOWN");
    }

    #[test]
    fn malformed_payloads_yield_empty_lists() {
        assert!(normalize(&json!({"tokens": []})).is_empty());
        assert!(normalize(&json!("garbage")).is_empty());
        assert!(normalize(&json!(null)).is_empty());
    }
}
