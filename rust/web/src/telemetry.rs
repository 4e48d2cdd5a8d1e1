//! Fire-and-forget analytics events.
//!
//! Emitting never blocks and never fails: subscribers with full or closed
//! channels are dropped, and a poisoned subscriber list is recovered.

use fourinrow_engine::game::GameId;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;

const TELEMETRY_CHANNEL_BUFFER: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    GameStarted,
    GameFinished,
    PlayerDisconnected,
    PlayerReconnected,
    GameForfeited,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub game_id: GameId,
    pub detail: String,
}

impl TelemetryEvent {
    pub fn new(event_type: EventType, game_id: impl Into<GameId>, detail: impl Into<String>) -> Self {
        Self {
            event_type,
            game_id: game_id.into(),
            detail: detail.into(),
        }
    }
}

pub type TelemetryReceiver = mpsc::Receiver<TelemetryEvent>;

/// Receiving end of a subscription; unsubscribes when dropped.
pub struct TelemetrySubscription {
    telemetry: Telemetry,
    subscriber_id: usize,
    pub receiver: TelemetryReceiver,
}

impl Drop for TelemetrySubscription {
    fn drop(&mut self) {
        self.telemetry.remove_subscribers(&[self.subscriber_id]);
    }
}

#[derive(Debug, Clone, Default)]
pub struct Telemetry {
    inner: Arc<TelemetryInner>,
}

#[derive(Debug, Default)]
struct TelemetryInner {
    subscribers: RwLock<Vec<(usize, mpsc::Sender<TelemetryEvent>)>>,
    next_id: AtomicUsize,
}

impl Telemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> TelemetrySubscription {
        let (tx, receiver) = mpsc::channel(TELEMETRY_CHANNEL_BUFFER);
        let subscriber_id = self.inner.next_id.fetch_add(1, Ordering::AcqRel);
        self.inner
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((subscriber_id, tx));

        TelemetrySubscription {
            telemetry: self.clone(),
            subscriber_id,
            receiver,
        }
    }

    pub fn emit(&self, event: TelemetryEvent) {
        tracing::info!(
            event_type = ?event.event_type,
            game_id = %event.game_id,
            detail = %event.detail,
            "telemetry"
        );

        let subscribers = self
            .inner
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let mut failed = Vec::new();
        for (id, sender) in subscribers {
            if let Err(err) = sender.try_send(event.clone()) {
                tracing::warn!(subscriber_id = id, error = %err, "dropping telemetry subscriber");
                failed.push(id);
            }
        }
        if !failed.is_empty() {
            self.remove_subscribers(&failed);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn remove_subscribers(&self, ids: &[usize]) {
        self.inner
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(id, _)| !ids.contains(id));
    }
}
