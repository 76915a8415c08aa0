/// Runtime configuration for tokenscope.
///
/// Every knob is environment-driven and optional; `Config::default()` is a
/// fully working setup. A `.env` file is honored when present (loaded by
/// the binary before `from_env` runs).
use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEXSCREENER: &str = "dexscreener";
pub const JUPITER: &str = "jupiter";
pub const GECKOTERMINAL: &str = "geckoterminal";

#[derive(Debug, Clone)]
pub struct Config {
    /// Per-provider request quotas. Providers absent from the map are
    /// unlimited.
    pub rate_limits: HashMap<String, RateLimitConfig>,
    pub cache: CacheSettings,
    pub refresh: RefreshSettings,
    pub backoff: BackoffSettings,
    pub pagination: PaginationSettings,
    pub request_timeout_secs: u64,
    pub endpoints: EndpointSettings,
}

/// Request quota for one provider within a fixed window.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub max: u32,
    pub window_ms: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct CacheSettings {
    pub ttl_secs: u64,
    pub enabled: bool,
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RefreshSettings {
    pub update_interval_ms: u64,
    /// Minimum absolute price move, in percent, that emits an update event.
    pub price_change_threshold: f64,
    /// Minimum volume ratio between consecutive polls that emits a spike.
    pub volume_spike_multiplier: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct BackoffSettings {
    pub initial_delay_ms: u64,
    pub max_retries: u32,
    pub multiplier: u32,
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct PaginationSettings {
    pub default_limit: usize,
    pub max_limit: usize,
}

#[derive(Debug, Clone)]
pub struct EndpointSettings {
    pub dexscreener_base_url: String,
    pub jupiter_base_url: String,
    pub geckoterminal_base_url: String,
    pub jupiter_api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let mut rate_limits = HashMap::new();
        rate_limits.insert(
            DEXSCREENER.to_string(),
            RateLimitConfig {
                max: 300,
                window_ms: 60_000,
            },
        );
        rate_limits.insert(
            JUPITER.to_string(),
            RateLimitConfig {
                max: 50,
                window_ms: 60_000,
            },
        );
        rate_limits.insert(
            GECKOTERMINAL.to_string(),
            RateLimitConfig {
                max: 25,
                window_ms: 60_000,
            },
        );

        Self {
            rate_limits,
            cache: CacheSettings {
                ttl_secs: 30,
                enabled: true,
            },
            refresh: RefreshSettings {
                update_interval_ms: 10_000,
                price_change_threshold: 5.0,
                volume_spike_multiplier: 2.0,
            },
            backoff: BackoffSettings {
                initial_delay_ms: 1_000,
                max_retries: 5,
                multiplier: 2,
                max_delay_ms: 32_000,
            },
            pagination: PaginationSettings {
                default_limit: 20,
                max_limit: 50,
            },
            request_timeout_secs: 10,
            endpoints: EndpointSettings {
                dexscreener_base_url: "https://api.dexscreener.com/latest/dex".to_string(),
                jupiter_base_url: "https://api.jup.ag".to_string(),
                geckoterminal_base_url: "https://api.geckoterminal.com/api/v2".to_string(),
                jupiter_api_key: None,
            },
        }
    }
}

impl Config {
    /// Build a configuration from environment variables, falling back to
    /// the defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        for (provider, var) in [
            (DEXSCREENER, "DEXSCREENER"),
            (JUPITER, "JUPITER"),
            (GECKOTERMINAL, "GECKOTERMINAL"),
        ] {
            if let Some(limit) = config.rate_limits.get_mut(provider) {
                limit.max = env_parse(&format!("RATE_LIMIT_{}_MAX", var), limit.max);
                limit.window_ms =
                    env_parse(&format!("RATE_LIMIT_{}_WINDOW_MS", var), limit.window_ms);
            }
        }

        config.cache.ttl_secs = env_parse("CACHE_TTL", config.cache.ttl_secs);
        config.cache.enabled = env_parse("CACHE_ENABLED", config.cache.enabled);

        config.refresh.update_interval_ms =
            env_parse("UPDATE_INTERVAL_MS", config.refresh.update_interval_ms);
        config.refresh.price_change_threshold = env_parse(
            "PRICE_CHANGE_THRESHOLD",
            config.refresh.price_change_threshold,
        );
        config.refresh.volume_spike_multiplier = env_parse(
            "VOLUME_SPIKE_MULTIPLIER",
            config.refresh.volume_spike_multiplier,
        );

        config.backoff.initial_delay_ms =
            env_parse("BACKOFF_INITIAL_DELAY_MS", config.backoff.initial_delay_ms);
        config.backoff.max_retries = env_parse("BACKOFF_MAX_RETRIES", config.backoff.max_retries);
        config.backoff.multiplier = env_parse("BACKOFF_MULTIPLIER", config.backoff.multiplier);
        config.backoff.max_delay_ms =
            env_parse("BACKOFF_MAX_DELAY_MS", config.backoff.max_delay_ms);

        config.pagination.default_limit =
            env_parse("DEFAULT_LIMIT", config.pagination.default_limit);
        config.pagination.max_limit = env_parse("MAX_LIMIT", config.pagination.max_limit);

        config.request_timeout_secs =
            env_parse("REQUEST_TIMEOUT_SECS", config.request_timeout_secs);

        if let Ok(url) = env::var("DEXSCREENER_BASE_URL") {
            config.endpoints.dexscreener_base_url = url;
        }
        if let Ok(url) = env::var("JUPITER_BASE_URL") {
            config.endpoints.jupiter_base_url = url;
        }
        if let Ok(url) = env::var("GECKOTERMINAL_BASE_URL") {
            config.endpoints.geckoterminal_base_url = url;
        }
        config.endpoints.jupiter_api_key = env::var("JUPITER_API_KEY").ok();

        config
    }
}

fn env_parse<T: FromStr + Copy>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();

        assert_eq!(config.rate_limits[DEXSCREENER].max, 300);
        assert_eq!(config.rate_limits[JUPITER].max, 50);
        assert_eq!(config.rate_limits[GECKOTERMINAL].max, 25);
        assert_eq!(config.cache.ttl_secs, 30);
        assert!(config.cache.enabled);
        assert_eq!(config.refresh.update_interval_ms, 10_000);
        assert_eq!(config.backoff.max_delay_ms, 32_000);
        assert_eq!(config.pagination.default_limit, 20);
        assert_eq!(config.pagination.max_limit, 50);
    }
}
