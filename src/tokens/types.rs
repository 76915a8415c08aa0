/// Core types for the token aggregation pipeline.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// CANONICAL TOKEN
// ============================================================================

/// One token's market view.
///
/// Normalizers emit this shape with singleton `sources`/`protocol`; the
/// merger folds same-address records from several providers into the
/// canonical consensus form. Identity is the address, compared
/// case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub token_address: String,
    pub token_name: String,
    pub token_ticker: String,

    /// Consensus unit price in SOL.
    pub price_sol: f64,
    pub market_cap_sol: f64,
    pub liquidity_sol: f64,
    pub transaction_count: u64,

    pub volume_sol: f64,
    pub volume_1h: f64,
    pub volume_24h: f64,
    /// Best-effort: providers rarely report a real 7-day window.
    pub volume_7d: f64,

    pub price_1hr_change: f64,
    pub price_24h_change: f64,
    /// Best-effort: approximated from shorter windows by some providers.
    pub price_7d_change: f64,

    /// Contributing venue identifiers. A single entry when one source
    /// reported the token, the sorted deduplicated union otherwise.
    pub protocol: Vec<String>,
    /// Provider names that contributed to this record. Never empty.
    pub sources: Vec<String>,
    pub last_updated: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TokenMetadata>,
}

impl Token {
    /// Address in its canonical (lower-cased) comparison form.
    pub fn normalized_address(&self) -> String {
        self.token_address.to_lowercase()
    }
}

/// Optional display metadata carried along from the richest source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

// ============================================================================
// QUERY / RESPONSE ENVELOPE
// ============================================================================

/// Display window selector. Accepted on queries but does not change the
/// merge computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "24h")]
    H24,
    #[serde(rename = "7d")]
    D7,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    Volume,
    PriceChange,
    MarketCap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Listing query options. Everything optional; defaults are volume/desc
/// with the configured page size.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterOptions {
    pub period: Option<Period>,
    pub sort_by: Option<SortBy>,
    pub order: Option<SortOrder>,
    pub limit: Option<usize>,
    /// Opaque offset cursor from a previous page's `next_cursor`.
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaginationInfo {
    pub next_cursor: Option<String>,
    pub has_more: bool,
    pub total: usize,
    pub limit: usize,
}

/// Envelope returned by the aggregator's listing call.
#[derive(Debug, Clone, Serialize)]
pub struct TokenListResponse {
    pub tokens: Vec<Token>,
    pub pagination: PaginationInfo,
    pub cached: bool,
    pub sources: Vec<String>,
}
