/// Upstream provider clients and the plumbing they share.
pub mod client;
pub mod dexscreener;
pub mod geckoterminal;
pub mod jupiter;
pub mod stats;

use async_trait::async_trait;
use serde::Deserialize;

use crate::errors::SourceError;
use crate::tokens::types::Token;
use stats::ApiStats;

/// Minimum liquidity a normalized record must exceed to survive the
/// domain filter.
pub const MIN_LIQUIDITY_SOL: f64 = 100.0;
/// Minimum volume a normalized record must exceed to survive the domain
/// filter.
pub const MIN_VOLUME_SOL: f64 = 1_000.0;

/// Placeholder used when a provider omits the token name.
pub const UNKNOWN_NAME: &str = "Unknown";
/// Placeholder used when a provider omits the ticker.
pub const UNKNOWN_TICKER: &str = "UNKNOWN";

/// A single upstream market-data provider.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Stable provider name: rate-limit bucket key, log prefix and the
    /// `sources` entry on contributed tokens.
    fn name(&self) -> &'static str;

    /// Fetch the provider's current view and normalize it into canonical
    /// tokens. Malformed payloads come back as an empty list; transport
    /// and quota failures as errors.
    async fn fetch_tokens(&self) -> Result<Vec<Token>, SourceError>;

    /// Request accounting snapshot for this client.
    fn stats(&self) -> ApiStats;
}

/// Shared domain filter applied by every normalizer: an addressable
/// record with enough liquidity and volume to matter.
pub fn passes_domain_filters(token: &Token) -> bool {
    !token.token_address.is_empty()
        && token.liquidity_sol > MIN_LIQUIDITY_SOL
        && token.volume_sol > MIN_VOLUME_SOL
}

/// A JSON field that may arrive as a number, a numeric string, null or
/// not at all. Providers are inconsistent about this.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(untagged)]
pub enum NumberLike {
    Number(f64),
    Text(String),
    #[default]
    Missing,
}

impl NumberLike {
    /// Numeric value, defaulting to zero for anything unparseable.
    pub fn as_f64(&self) -> f64 {
        match self {
            NumberLike::Number(value) => *value,
            NumberLike::Text(raw) => raw.parse().unwrap_or(0.0),
            NumberLike::Missing => 0.0,
        }
    }
}
