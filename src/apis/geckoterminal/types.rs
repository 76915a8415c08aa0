/// Raw GeckoTerminal trending-pools payload (JSON:API shape), reduced to
/// the fields we consume.
use chrono::Utc;
use serde::Deserialize;

use crate::apis::{NumberLike, UNKNOWN_NAME};
use crate::tokens::types::Token;

use super::PROVIDER;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TrendingPoolsResponse {
    pub data: Vec<GeckoPool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GeckoPool {
    pub attributes: PoolAttributes,
    pub relationships: PoolRelationships,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PoolAttributes {
    /// Pool display name, usually "BASE / QUOTE".
    pub name: String,
    pub base_token_price_native_currency: NumberLike,
    pub market_cap_usd: NumberLike,
    pub volume_usd: WindowValues,
    pub reserve_in_usd: NumberLike,
    pub transactions: PoolTransactions,
    pub price_change_percentage: WindowValues,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WindowValues {
    pub h1: NumberLike,
    pub h24: NumberLike,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PoolTransactions {
    pub h24: TxnCounts,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TxnCounts {
    pub buys: Option<u64>,
    pub sells: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PoolRelationships {
    pub base_token: Relationship,
    pub dex: Relationship,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Relationship {
    pub data: Option<RelationshipData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RelationshipData {
    pub id: String,
}

impl GeckoPool {
    /// Map one trending pool into the canonical shape. Pools without a
    /// base-token relationship carry no identity and are skipped.
    ///
    /// GeckoTerminal has no 7-day window: the 7d price change reuses the
    /// 24h figure and 7d volume stays at zero.
    pub fn to_token(&self) -> Option<Token> {
        let base_token_id = self
            .relationships
            .base_token
            .data
            .as_ref()
            .map(|data| data.id.as_str())
            .filter(|id| !id.is_empty())?;
        let token_address = base_token_id
            .strip_prefix("solana_")
            .unwrap_or(base_token_id)
            .to_string();

        let name = self
            .attributes
            .name
            .split('/')
            .next()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .unwrap_or(UNKNOWN_NAME)
            .to_string();

        let attrs = &self.attributes;
        let volume_24h = attrs.volume_usd.h24.as_f64();
        let transaction_count = attrs.transactions.h24.buys.unwrap_or(0)
            + attrs.transactions.h24.sells.unwrap_or(0);
        let price_24h_change = attrs.price_change_percentage.h24.as_f64();

        let protocol = self
            .relationships
            .dex
            .data
            .as_ref()
            .map(|data| data.id.clone())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| PROVIDER.to_string());

        Some(Token {
            token_address,
            token_ticker: name.clone(),
            token_name: name,

            price_sol: attrs.base_token_price_native_currency.as_f64(),
            market_cap_sol: attrs.market_cap_usd.as_f64(),
            liquidity_sol: attrs.reserve_in_usd.as_f64(),
            transaction_count,

            volume_sol: volume_24h,
            volume_1h: attrs.volume_usd.h1.as_f64(),
            volume_24h,
            volume_7d: 0.0,

            price_1hr_change: attrs.price_change_percentage.h1.as_f64(),
            price_24h_change,
            price_7d_change: price_24h_change,

            protocol: vec![protocol],
            sources: vec![PROVIDER.to_string()],
            last_updated: Utc::now(),
            metadata: None,
        })
    }
}
