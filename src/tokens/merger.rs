/// Deterministic consensus merge of same-address tokens reported by
/// multiple providers.
///
/// Rules per group of records sharing a (lower-cased) address:
/// - the most liquid record is the anchor; its name, ticker, price-change
///   percentages and metadata are adopted
/// - price is the liquidity-weighted average, falling back to the anchor
///   when the group's total liquidity is zero
/// - market cap takes the max (providers disagree on FDV vs circulating)
/// - volume, liquidity and transaction counts are summed (providers report
///   non-overlapping venues)
/// - protocol and sources become sorted deduplicated unions
/// - last_updated is the freshest contributing timestamp
use std::collections::{BTreeSet, HashMap};

use crate::tokens::types::Token;

/// Merge the concatenated normalizer output of one fetch cycle into one
/// canonical record per address. Records with an empty address are
/// dropped. Output order is not significant.
pub fn merge(tokens: Vec<Token>) -> Vec<Token> {
    let mut groups: HashMap<String, Vec<Token>> = HashMap::new();
    for token in tokens {
        if token.token_address.is_empty() {
            continue;
        }
        groups
            .entry(token.normalized_address())
            .or_default()
            .push(token);
    }

    groups.into_values().map(merge_group).collect()
}

fn merge_group(mut group: Vec<Token>) -> Token {
    if group.len() == 1 {
        return group.remove(0);
    }

    group.sort_by(|a, b| b.liquidity_sol.total_cmp(&a.liquidity_sol));

    let price_sol = weighted_price(&group);
    let market_cap_sol = group
        .iter()
        .map(|t| t.market_cap_sol)
        .fold(f64::NEG_INFINITY, f64::max);
    let protocol = union_sorted(group.iter().flat_map(|t| t.protocol.iter()));
    let sources = union_sorted(group.iter().flat_map(|t| t.sources.iter()));
    let last_updated = group
        .iter()
        .map(|t| t.last_updated)
        .max()
        .unwrap_or(group[0].last_updated);

    let anchor = &group[0];
    Token {
        token_address: anchor.token_address.clone(),
        token_name: anchor.token_name.clone(),
        token_ticker: anchor.token_ticker.clone(),

        price_sol,
        market_cap_sol,
        liquidity_sol: group.iter().map(|t| t.liquidity_sol).sum(),
        transaction_count: group.iter().map(|t| t.transaction_count).sum(),

        volume_sol: group.iter().map(|t| t.volume_sol).sum(),
        volume_1h: group.iter().map(|t| t.volume_1h).sum(),
        volume_24h: group.iter().map(|t| t.volume_24h).sum(),
        volume_7d: group.iter().map(|t| t.volume_7d).sum(),

        price_1hr_change: anchor.price_1hr_change,
        price_24h_change: anchor.price_24h_change,
        price_7d_change: anchor.price_7d_change,

        protocol,
        sources,
        last_updated,
        metadata: anchor.metadata.clone(),
    }
}

/// Liquidity-weighted average price. Falls back to the first (most
/// liquid) record when no liquidity was reported at all.
fn weighted_price(group: &[Token]) -> f64 {
    let total_liquidity: f64 = group.iter().map(|t| t.liquidity_sol).sum();
    if total_liquidity == 0.0 {
        return group[0].price_sol;
    }

    group
        .iter()
        .map(|t| t.price_sol * t.liquidity_sol)
        .sum::<f64>()
        / total_liquidity
}

fn union_sorted<'a>(values: impl Iterator<Item = &'a String>) -> Vec<String> {
    values
        .cloned()
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect()
}
