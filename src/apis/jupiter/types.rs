/// Raw Jupiter verified-token payload, reduced to the fields we consume.
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::apis::{UNKNOWN_NAME, UNKNOWN_TICKER};
use crate::tokens::types::Token;

use super::PROVIDER;

/// One entry of the top-level token array.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JupiterToken {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub usd_price: Option<f64>,
    pub mcap: Option<f64>,
    pub liquidity: Option<f64>,
    pub stats_1h: WindowStats,
    pub stats_24h: WindowStats,
    pub stats_7d: WindowStats,
    pub updated_at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WindowStats {
    pub price_change: Option<f64>,
    pub buy_volume: Option<f64>,
    pub sell_volume: Option<f64>,
    pub num_buys: Option<u64>,
    pub num_sells: Option<u64>,
}

impl JupiterToken {
    /// Map one verified token into the canonical shape.
    ///
    /// Jupiter only exposes 24h trade aggregates, so the 1h and 7d volume
    /// sub-windows stay at zero.
    pub fn to_token(&self) -> Token {
        let volume_24h = self.stats_24h.buy_volume.unwrap_or(0.0)
            + self.stats_24h.sell_volume.unwrap_or(0.0);
        let transaction_count =
            self.stats_24h.num_buys.unwrap_or(0) + self.stats_24h.num_sells.unwrap_or(0);

        let last_updated = self
            .updated_at
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|parsed| parsed.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        Token {
            token_address: self.id.clone(),
            token_name: if self.name.is_empty() {
                UNKNOWN_NAME.to_string()
            } else {
                self.name.clone()
            },
            token_ticker: if self.symbol.is_empty() {
                UNKNOWN_TICKER.to_string()
            } else {
                self.symbol.clone()
            },

            price_sol: self.usd_price.unwrap_or(0.0),
            market_cap_sol: self.mcap.unwrap_or(0.0),
            liquidity_sol: self.liquidity.unwrap_or(0.0),
            transaction_count,

            volume_sol: volume_24h,
            volume_1h: 0.0,
            volume_24h,
            volume_7d: 0.0,

            price_1hr_change: self.stats_1h.price_change.unwrap_or(0.0),
            price_24h_change: self.stats_24h.price_change.unwrap_or(0.0),
            price_7d_change: self.stats_7d.price_change.unwrap_or(0.0),

            protocol: vec![PROVIDER.to_string()],
            sources: vec![PROVIDER.to_string()],
            last_updated,
            metadata: None,
        }
    }
}
