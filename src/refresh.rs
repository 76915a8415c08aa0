/// Periodic refresh and change detection.
///
/// A single task polls the aggregator on a fixed cadence, diffs each
/// result against the retained snapshot and pushes classified events to
/// the sink. Cycles never overlap: the loop runs them inline and missed
/// ticks are skipped.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

use crate::aggregator::Aggregator;
use crate::config::RefreshSettings;
use crate::events::{DeltaEvent, DeltaKind, DeltaMetadata, Direction, EventSink};
use crate::logger::{self, LogTag};
use crate::tokens::types::Token;

pub struct RefreshJob {
    aggregator: Arc<Aggregator>,
    sink: Arc<dyn EventSink>,
    settings: RefreshSettings,
    /// Last-broadcast view per (lower-cased) address. Seeded on the first
    /// successful cycle; entries are only ever replaced, never expired.
    previous: HashMap<String, Token>,
}

impl RefreshJob {
    pub fn new(
        aggregator: Arc<Aggregator>,
        sink: Arc<dyn EventSink>,
        settings: RefreshSettings,
    ) -> Self {
        Self {
            aggregator,
            sink,
            settings,
            previous: HashMap::new(),
        }
    }

    /// Drive refresh cycles until the shutdown signal fires.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(Duration::from_millis(self.settings.update_interval_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        logger::info(
            LogTag::Refresh,
            &format!(
                "refresh job started (every {}ms)",
                self.settings.update_interval_ms
            ),
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => self.run_cycle().await,
                _ = shutdown.changed() => {
                    logger::info(LogTag::Refresh, "refresh job stopping");
                    break;
                }
            }
        }
    }

    /// One poll cycle. The aggregator call is best-effort by contract, so
    /// a cycle cannot fail the loop; an empty degraded result simply
    /// produces no events.
    pub async fn run_cycle(&mut self) {
        let listing = self.aggregator.get_tokens(None).await;
        logger::debug(
            LogTag::Refresh,
            &format!(
                "cycle fetched {} tokens (cached: {})",
                listing.tokens.len(),
                listing.cached
            ),
        );

        diff_and_broadcast(
            &mut self.previous,
            &listing.tokens,
            &self.settings,
            self.sink.as_ref(),
        )
        .await;
    }
}

/// Diff freshly fetched tokens against the retained snapshot, emitting a
/// snapshot event on the first pass and delta events afterwards. The
/// snapshot map is updated in place; tokens missing from `tokens` are
/// left untouched.
pub async fn diff_and_broadcast(
    previous: &mut HashMap<String, Token>,
    tokens: &[Token],
    settings: &RefreshSettings,
    sink: &dyn EventSink,
) {
    if previous.is_empty() {
        if tokens.is_empty() {
            return;
        }
        for token in tokens {
            previous.insert(token.normalized_address(), token.clone());
        }
        sink.broadcast_snapshot(tokens).await;
        return;
    }

    for token in tokens {
        let key = token.normalized_address();
        match previous.get(&key) {
            Some(old) => {
                if old.price_sol > 0.0 {
                    let change =
                        ((token.price_sol - old.price_sol) / old.price_sol).abs() * 100.0;
                    if change >= settings.price_change_threshold {
                        let direction = if token.price_sol > old.price_sol {
                            Direction::Up
                        } else {
                            Direction::Down
                        };
                        sink.broadcast_delta(&DeltaEvent::new(
                            DeltaKind::PriceUpdate,
                            token.clone(),
                            Some(DeltaMetadata { change, direction }),
                        ))
                        .await;
                    }
                }

                if old.volume_sol > 0.0 {
                    let multiplier = token.volume_sol / old.volume_sol;
                    if multiplier >= settings.volume_spike_multiplier {
                        sink.broadcast_delta(&DeltaEvent::new(
                            DeltaKind::VolumeSpike,
                            token.clone(),
                            Some(DeltaMetadata {
                                change: multiplier,
                                direction: Direction::Up,
                            }),
                        ))
                        .await;
                    }
                }
            }
            None => {
                sink.broadcast_delta(&DeltaEvent::new(DeltaKind::NewToken, token.clone(), None))
                    .await;
            }
        }

        previous.insert(key, token.clone());
    }
}
