/// Fan-out, merge, cache and query layer over the upstream providers.
///
/// The single entry point consumers use. Provider failures are isolated:
/// a failing source contributes zero tokens and the call still returns a
/// best-effort result. With every provider down and nothing cached the
/// degraded answer is an empty, uncached page, never an error.
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;

use crate::apis::TokenSource;
use crate::cache::{CacheService, BASE_TOKENS_KEY};
use crate::config::PaginationSettings;
use crate::logger::{self, LogTag};
use crate::tokens::merger;
use crate::tokens::types::{
    FilterOptions, PaginationInfo, SortBy, SortOrder, Token, TokenListResponse,
};

/// TTL for per-address detail entries.
const DETAIL_TTL: Duration = Duration::from_secs(30);

pub struct Aggregator {
    sources: Vec<Arc<dyn TokenSource>>,
    cache: Arc<CacheService>,
    pagination: PaginationSettings,
}

impl Aggregator {
    pub fn new(
        sources: Vec<Arc<dyn TokenSource>>,
        cache: Arc<CacheService>,
        pagination: PaginationSettings,
    ) -> Self {
        Self {
            sources,
            cache,
            pagination,
        }
    }

    /// Current canonical token page. Serves from the cached base list
    /// when fresh, otherwise fans out to every provider, merges and
    /// re-caches.
    pub async fn get_tokens(&self, filters: Option<&FilterOptions>) -> TokenListResponse {
        let (mut tokens, cached) = self.base_tokens().await;

        let sort_by = filters
            .and_then(|f| f.sort_by)
            .unwrap_or(SortBy::Volume);
        let order = filters.and_then(|f| f.order).unwrap_or(SortOrder::Desc);
        sort_tokens(&mut tokens, sort_by, order);

        let (page, pagination) = self.paginate(tokens, filters);

        TokenListResponse {
            tokens: page,
            pagination,
            cached,
            sources: self
                .sources
                .iter()
                .map(|source| source.name().to_string())
                .collect(),
        }
    }

    /// Case-insensitive single-token lookup. `None` when the address is
    /// not part of the current merged view.
    pub async fn get_token_by_address(&self, address: &str) -> Option<Token> {
        let key = CacheService::detail_key(address);
        if let Some(token) = self.cache.get::<Token>(&key).await {
            return Some(token);
        }

        let (tokens, _) = self.base_tokens().await;
        let token = tokens
            .into_iter()
            .find(|token| token.token_address.eq_ignore_ascii_case(address));

        if let Some(ref token) = token {
            self.cache.set(&key, token, DETAIL_TTL).await;
        }
        token
    }

    /// The full merged list plus whether it came from cache.
    async fn base_tokens(&self) -> (Vec<Token>, bool) {
        if let Some(tokens) = self.cache.get::<Vec<Token>>(BASE_TOKENS_KEY).await {
            self.cache.increment_hits().await;
            return (tokens, true);
        }
        self.cache.increment_misses().await;

        let (merged, successes) = self.fetch_and_merge().await;
        if successes > 0 {
            self.cache
                .set(BASE_TOKENS_KEY, &merged, self.cache.ttl())
                .await;
        }
        (merged, false)
    }

    /// Concurrent settle-all fetch across every source; failures are
    /// logged and contribute nothing. Returns the merged result and how
    /// many sources succeeded.
    async fn fetch_and_merge(&self) -> (Vec<Token>, usize) {
        let fetches = self.sources.iter().map(|source| async move {
            (source.name(), source.fetch_tokens().await)
        });

        let mut raw = Vec::new();
        let mut successes = 0;
        for (name, outcome) in join_all(fetches).await {
            match outcome {
                Ok(tokens) => {
                    logger::debug(
                        LogTag::Aggregator,
                        &format!("{} contributed {} tokens", name, tokens.len()),
                    );
                    successes += 1;
                    raw.extend(tokens);
                }
                Err(err) => {
                    logger::warning(
                        LogTag::Aggregator,
                        &format!("{} failed, continuing without it: {}", name, err),
                    );
                }
            }
        }

        (merger::merge(raw), successes)
    }

    fn paginate(
        &self,
        tokens: Vec<Token>,
        filters: Option<&FilterOptions>,
    ) -> (Vec<Token>, PaginationInfo) {
        let limit = filters
            .and_then(|f| f.limit)
            .unwrap_or(self.pagination.default_limit)
            .min(self.pagination.max_limit);
        let offset = filters
            .and_then(|f| f.cursor.as_deref())
            .and_then(|cursor| cursor.parse::<usize>().ok())
            .unwrap_or(0);

        let total = tokens.len();
        let page: Vec<Token> = tokens.into_iter().skip(offset).take(limit).collect();
        let has_more = offset + limit < total;

        (
            page,
            PaginationInfo {
                next_cursor: has_more.then(|| (offset + limit).to_string()),
                has_more,
                total,
                limit,
            },
        )
    }
}

fn sort_value(token: &Token, sort_by: SortBy) -> f64 {
    match sort_by {
        SortBy::Volume => token.volume_sol,
        SortBy::PriceChange => token.price_1hr_change,
        SortBy::MarketCap => token.market_cap_sol,
    }
}

fn sort_tokens(tokens: &mut [Token], sort_by: SortBy, order: SortOrder) {
    tokens.sort_by(|a, b| {
        let (a_value, b_value) = (sort_value(a, sort_by), sort_value(b, sort_by));
        match order {
            SortOrder::Asc => a_value.total_cmp(&b_value),
            SortOrder::Desc => b_value.total_cmp(&a_value),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apis::stats::ApiStats;
    use crate::cache::store::MemoryStore;
    use crate::config::CacheSettings;
    use crate::errors::SourceError;
    use async_trait::async_trait;
    use chrono::Utc;

    struct StaticSource {
        name: &'static str,
        tokens: Vec<Token>,
    }

    #[async_trait]
    impl TokenSource for StaticSource {
        fn name(&self) -> &'static str {
            self.name
        }
        async fn fetch_tokens(&self) -> Result<Vec<Token>, SourceError> {
            Ok(self.tokens.clone())
        }
        fn stats(&self) -> ApiStats {
            ApiStats::default()
        }
    }

    struct FailingSource;

    #[async_trait]
    impl TokenSource for FailingSource {
        fn name(&self) -> &'static str {
            "failing"
        }
        async fn fetch_tokens(&self) -> Result<Vec<Token>, SourceError> {
            Err(SourceError::MaxRetriesExceeded {
                provider: "failing".to_string(),
            })
        }
        fn stats(&self) -> ApiStats {
            ApiStats::default()
        }
    }

    fn token(address: &str, volume: f64, price_change: f64, market_cap: f64) -> Token {
        Token {
            token_address: address.to_string(),
            token_name: format!("{} token", address),
            token_ticker: address.to_uppercase(),
            price_sol: 1.0,
            market_cap_sol: market_cap,
            liquidity_sol: 10_000.0,
            transaction_count: 5,
            volume_sol: volume,
            volume_1h: 0.0,
            volume_24h: volume,
            volume_7d: 0.0,
            price_1hr_change: price_change,
            price_24h_change: 0.0,
            price_7d_change: 0.0,
            protocol: vec!["raydium".to_string()],
            sources: vec!["test".to_string()],
            last_updated: Utc::now(),
            metadata: None,
        }
    }

    fn aggregator(sources: Vec<Arc<dyn TokenSource>>, enabled: bool) -> Aggregator {
        let cache = Arc::new(CacheService::new(
            Arc::new(MemoryStore::new()),
            &CacheSettings {
                ttl_secs: 30,
                enabled,
            },
        ));
        Aggregator::new(
            sources,
            cache,
            PaginationSettings {
                default_limit: 20,
                max_limit: 50,
            },
        )
    }

    fn filters(limit: Option<usize>, cursor: Option<&str>) -> FilterOptions {
        FilterOptions {
            limit,
            cursor: cursor.map(str::to_string),
            ..FilterOptions::default()
        }
    }

    #[tokio::test]
    async fn serves_from_cache_on_second_call() {
        let source = Arc::new(StaticSource {
            name: "static",
            tokens: vec![token("a", 100.0, 0.0, 0.0)],
        });
        let aggregator = aggregator(vec![source], true);

        let first = aggregator.get_tokens(None).await;
        let second = aggregator.get_tokens(None).await;

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(second.tokens.len(), 1);
    }

    #[tokio::test]
    async fn failing_provider_is_isolated() {
        let healthy = Arc::new(StaticSource {
            name: "healthy",
            tokens: vec![token("a", 100.0, 0.0, 0.0), token("b", 50.0, 0.0, 0.0)],
        });
        let aggregator = aggregator(vec![healthy, Arc::new(FailingSource)], true);

        let listing = aggregator.get_tokens(None).await;

        assert_eq!(listing.tokens.len(), 2);
        assert!(!listing.cached);
        assert_eq!(listing.sources, vec!["healthy", "failing"]);
    }

    #[tokio::test]
    async fn all_providers_failing_degrades_to_empty_uncached() {
        let aggregator = aggregator(vec![Arc::new(FailingSource)], true);

        let first = aggregator.get_tokens(None).await;
        let second = aggregator.get_tokens(None).await;

        assert!(first.tokens.is_empty());
        assert!(!first.cached);
        // The degraded empty result must not be cached as a fresh list.
        assert!(!second.cached);
    }

    #[tokio::test]
    async fn sorts_by_volume_descending_by_default() {
        let source = Arc::new(StaticSource {
            name: "static",
            tokens: vec![
                token("low", 10.0, 0.0, 0.0),
                token("high", 500.0, 0.0, 0.0),
                token("mid", 100.0, 0.0, 0.0),
            ],
        });
        let aggregator = aggregator(vec![source], true);

        let listing = aggregator.get_tokens(None).await;
        let order: Vec<&str> = listing
            .tokens
            .iter()
            .map(|t| t.token_address.as_str())
            .collect();

        assert_eq!(order, vec!["high", "mid", "low"]);
    }

    #[tokio::test]
    async fn sorts_by_requested_key_and_order() {
        let source = Arc::new(StaticSource {
            name: "static",
            tokens: vec![
                token("a", 10.0, 5.0, 300.0),
                token("b", 500.0, -2.0, 100.0),
                token("c", 100.0, 1.0, 200.0),
            ],
        });
        let aggregator = aggregator(vec![source], true);

        let listing = aggregator
            .get_tokens(Some(&FilterOptions {
                sort_by: Some(SortBy::MarketCap),
                order: Some(SortOrder::Asc),
                ..FilterOptions::default()
            }))
            .await;
        let order: Vec<&str> = listing
            .tokens
            .iter()
            .map(|t| t.token_address.as_str())
            .collect();

        assert_eq!(order, vec!["b", "c", "a"]);
    }

    #[tokio::test]
    async fn cursor_walk_reconstructs_the_full_list_exactly_once() {
        let tokens: Vec<Token> = (0..45)
            .map(|i| token(&format!("mint{:02}", i), (1000 - i) as f64, 0.0, 0.0))
            .collect();
        let source = Arc::new(StaticSource {
            name: "static",
            tokens,
        });
        let aggregator = aggregator(vec![source], true);

        let mut collected = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0;
        loop {
            let listing = aggregator
                .get_tokens(Some(&filters(Some(10), cursor.as_deref())))
                .await;
            pages += 1;
            collected.extend(
                listing
                    .tokens
                    .iter()
                    .map(|t| t.token_address.clone()),
            );

            assert_eq!(listing.pagination.total, 45);
            if listing.pagination.has_more {
                assert!(listing.pagination.next_cursor.is_some());
                cursor = listing.pagination.next_cursor;
            } else {
                assert!(listing.pagination.next_cursor.is_none());
                break;
            }
        }

        assert_eq!(pages, 5);
        assert_eq!(collected.len(), 45);
        let expected: Vec<String> = (0..45).map(|i| format!("mint{:02}", i)).collect();
        assert_eq!(collected, expected);
    }

    #[tokio::test]
    async fn limit_is_clamped_to_the_configured_maximum() {
        let tokens: Vec<Token> = (0..60)
            .map(|i| token(&format!("mint{:02}", i), i as f64, 0.0, 0.0))
            .collect();
        let source = Arc::new(StaticSource {
            name: "static",
            tokens,
        });
        let aggregator = aggregator(vec![source], true);

        let listing = aggregator
            .get_tokens(Some(&filters(Some(500), None)))
            .await;

        assert_eq!(listing.pagination.limit, 50);
        assert_eq!(listing.tokens.len(), 50);
        assert!(listing.pagination.has_more);
    }

    #[tokio::test]
    async fn detail_lookup_is_case_insensitive() {
        let source = Arc::new(StaticSource {
            name: "static",
            tokens: vec![token("MintAbc", 100.0, 0.0, 0.0)],
        });
        let aggregator = aggregator(vec![source], true);

        let found = aggregator.get_token_by_address("mintabc").await;
        assert_eq!(found.unwrap().token_address, "MintAbc");

        let missing = aggregator.get_token_by_address("unknown").await;
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn detail_lookup_searches_beyond_the_first_page() {
        let tokens: Vec<Token> = (0..30)
            .map(|i| token(&format!("mint{:02}", i), (1000 - i) as f64, 0.0, 0.0))
            .collect();
        let source = Arc::new(StaticSource {
            name: "static",
            tokens,
        });
        let aggregator = aggregator(vec![source], true);

        // mint29 sorts last, beyond the default page size of 20.
        let found = aggregator.get_token_by_address("MINT29").await;
        assert_eq!(found.unwrap().token_address, "mint29");
    }
}
