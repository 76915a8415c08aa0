/// Outbound change events and the push-transport boundary.
///
/// The realtime transport itself lives outside this core; `EventSink` is
/// its seam. Delivery is fire-and-forget.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::logger::{self, LogTag};
use crate::tokens::types::Token;

/// Delta kinds emitted by the refresh job after the first poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeltaKind {
    #[serde(rename = "token:new")]
    NewToken,
    #[serde(rename = "token:update")]
    PriceUpdate,
    #[serde(rename = "token:volume_spike")]
    VolumeSpike,
}

impl DeltaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeltaKind::NewToken => "token:new",
            DeltaKind::PriceUpdate => "token:update",
            DeltaKind::VolumeSpike => "token:volume_spike",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

/// Threshold context attached to update and spike events: the price
/// change in percent, or the volume ratio.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DeltaMetadata {
    pub change: f64,
    pub direction: Direction,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeltaEvent {
    #[serde(rename = "type")]
    pub kind: DeltaKind,
    pub data: Token,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DeltaMetadata>,
}

impl DeltaEvent {
    pub fn new(kind: DeltaKind, token: Token, metadata: Option<DeltaMetadata>) -> Self {
        Self {
            kind,
            data: token,
            timestamp: Utc::now(),
            metadata,
        }
    }
}

/// Transport seam for pushed events. No delivery guarantee is required
/// from this core.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Full-state broadcast, sent once after the first successful poll.
    async fn broadcast_snapshot(&self, tokens: &[Token]);

    /// One classified change event.
    async fn broadcast_delta(&self, event: &DeltaEvent);
}

/// Sink that writes events to the log; stands in for the realtime
/// transport when none is wired up.
pub struct LogSink;

#[async_trait]
impl EventSink for LogSink {
    async fn broadcast_snapshot(&self, tokens: &[Token]) {
        logger::info(
            LogTag::Events,
            &format!("snapshot: {} tokens", tokens.len()),
        );
    }

    async fn broadcast_delta(&self, event: &DeltaEvent) {
        let detail = match event.metadata {
            Some(meta) => format!(" ({:.2} {:?})", meta.change, meta.direction),
            None => String::new(),
        };
        logger::info(
            LogTag::Events,
            &format!(
                "{} {}{}",
                event.kind.as_str(),
                event.data.token_ticker,
                detail
            ),
        );
    }
}
