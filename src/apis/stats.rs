/// Request accounting shared by the provider clients.
use serde::Serialize;
use std::sync::Mutex;

/// Point-in-time snapshot of one client's request counters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApiStats {
    pub requests: u64,
    pub successes: u64,
    pub failures: u64,
    pub average_response_ms: f64,
    pub last_error: Option<String>,
}

#[derive(Default)]
struct StatsInner {
    requests: u64,
    successes: u64,
    failures: u64,
    total_response_ms: f64,
    last_error: Option<String>,
}

/// Thread-safe counter set, one per provider client.
#[derive(Default)]
pub struct ApiStatsTracker {
    inner: Mutex<StatsInner>,
}

impl ApiStatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self, success: bool, elapsed_ms: f64) {
        let mut inner = self.inner.lock().unwrap();
        inner.requests += 1;
        inner.total_response_ms += elapsed_ms;
        if success {
            inner.successes += 1;
        } else {
            inner.failures += 1;
        }
    }

    pub fn record_error(&self, message: impl Into<String>) {
        self.inner.lock().unwrap().last_error = Some(message.into());
    }

    pub fn stats(&self) -> ApiStats {
        let inner = self.inner.lock().unwrap();
        let average_response_ms = if inner.requests == 0 {
            0.0
        } else {
            inner.total_response_ms / inner.requests as f64
        };

        ApiStats {
            requests: inner.requests,
            successes: inner.successes,
            failures: inner.failures,
            average_response_ms,
            last_error: inner.last_error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_over_all_requests() {
        let tracker = ApiStatsTracker::new();
        tracker.record_request(true, 100.0);
        tracker.record_request(false, 300.0);
        tracker.record_error("HTTP 500");

        let stats = tracker.stats();
        assert_eq!(stats.requests, 2);
        assert_eq!(stats.successes, 1);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.average_response_ms, 200.0);
        assert_eq!(stats.last_error.as_deref(), Some("HTTP 500"));
    }
}
