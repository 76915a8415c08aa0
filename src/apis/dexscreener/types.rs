/// Raw DexScreener search payload, reduced to the fields we consume.
///
/// Everything is optional or defaulted; the API omits fields freely and a
/// record that does not survive the domain filters is simply dropped.
use chrono::Utc;
use serde::Deserialize;

use crate::apis::{NumberLike, UNKNOWN_NAME, UNKNOWN_TICKER};
use crate::tokens::types::{Token, TokenMetadata};

use super::PROVIDER;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchResponse {
    pub pairs: Vec<DexScreenerPair>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DexScreenerPair {
    pub chain_id: String,
    pub dex_id: String,
    pub base_token: PairToken,
    pub price_native: NumberLike,
    pub fdv: NumberLike,
    pub volume: WindowValues,
    pub liquidity: PairLiquidity,
    pub txns: PairTxns,
    pub price_change: WindowValues,
    pub info: Option<PairInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PairToken {
    pub address: String,
    pub name: String,
    pub symbol: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WindowValues {
    pub h1: NumberLike,
    pub h6: NumberLike,
    pub h24: NumberLike,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PairLiquidity {
    pub usd: NumberLike,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PairTxns {
    pub h24: TxnCounts,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TxnCounts {
    pub buys: Option<u64>,
    pub sells: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PairInfo {
    pub image_url: Option<String>,
    pub websites: Vec<PairWebsite>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PairWebsite {
    pub url: String,
}

impl DexScreenerPair {
    /// Map one pair into the canonical shape with singleton provenance.
    ///
    /// DexScreener has no real 7-day windows: volume falls back to the
    /// 24h figure and the 7d price change to the 6h one.
    pub fn to_token(&self) -> Token {
        let volume_24h = self.volume.h24.as_f64();
        let transaction_count =
            self.txns.h24.buys.unwrap_or(0) + self.txns.h24.sells.unwrap_or(0);

        let metadata = self.info.as_ref().map(|info| TokenMetadata {
            image_url: info.image_url.clone(),
            description: None,
            website: info.websites.first().map(|site| site.url.clone()),
        });

        Token {
            token_address: self.base_token.address.clone(),
            token_name: non_empty_or(&self.base_token.name, UNKNOWN_NAME),
            token_ticker: non_empty_or(&self.base_token.symbol, UNKNOWN_TICKER),

            price_sol: self.price_native.as_f64(),
            market_cap_sol: self.fdv.as_f64(),
            liquidity_sol: self.liquidity.usd.as_f64(),
            transaction_count,

            volume_sol: volume_24h,
            volume_1h: self.volume.h1.as_f64(),
            volume_24h,
            volume_7d: volume_24h,

            price_1hr_change: self.price_change.h1.as_f64(),
            price_24h_change: self.price_change.h24.as_f64(),
            price_7d_change: self.price_change.h6.as_f64(),

            protocol: vec![non_empty_or(&self.dex_id, PROVIDER)],
            sources: vec![PROVIDER.to_string()],
            last_updated: Utc::now(),
            metadata,
        }
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}
