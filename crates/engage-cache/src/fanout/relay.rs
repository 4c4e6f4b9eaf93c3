//! Cross-instance relay over Redis pub/sub.
//!
//! Every instance publishes its change events to [`CHANGES_CHANNEL`] wrapped
//! in an envelope carrying its instance id, and listens on the same channel.
//! Envelopes carrying our own id are ignored.

use std::time::Duration;

use futures_util::StreamExt;
use redis::{AsyncCommands, Client};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use uuid::Uuid;

use engage_core::events::ChangeEvent;

use super::hub::FanoutHub;
use crate::pool::{RedisPool, RedisResult};

/// Redis channel carrying change events between instances
pub const CHANGES_CHANNEL: &str = "engage:changes";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayEnvelope {
    pub origin: Uuid,
    pub event: ChangeEvent,
}

/// Publishing half of the relay
#[derive(Clone)]
pub struct RelayPublisher {
    pool: RedisPool,
    origin: Uuid,
}

impl RelayPublisher {
    pub fn new(pool: RedisPool, origin: Uuid) -> Self {
        Self { pool, origin }
    }

    pub fn origin(&self) -> Uuid {
        self.origin
    }

    pub async fn publish(&self, event: &ChangeEvent) -> RedisResult<u32> {
        let payload = serde_json::to_string(&RelayEnvelope {
            origin: self.origin,
            event: event.clone(),
        })?;
        let mut conn = self.pool.get().await?;
        let receivers: u32 = conn.publish(CHANGES_CHANNEL, &payload).await?;

        tracing::debug!(
            channel = CHANGES_CHANNEL,
            entity_id = %event.entity_id,
            receivers,
            "Relayed change event"
        );
        Ok(receivers)
    }
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub redis_url: String,
    pub reconnect_delay: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".to_string(),
            reconnect_delay: Duration::from_secs(1),
        }
    }
}

/// Listen for other instances' events and deliver them to `hub`.
///
/// Reconnects after `reconnect_delay` whenever the connection fails.
/// Events published while disconnected are lost.
pub fn spawn_relay_listener(config: RelayConfig, origin: Uuid, hub: FanoutHub) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match run_listener(&config, origin, &hub).await {
                Ok(()) => tracing::warn!("Relay stream ended, reconnecting"),
                Err(e) => tracing::error!(error = %e, "Relay listener error, reconnecting"),
            }
            tokio::time::sleep(config.reconnect_delay).await;
        }
    })
}

async fn run_listener(config: &RelayConfig, origin: Uuid, hub: &FanoutHub) -> RedisResult<()> {
    let client = Client::open(config.redis_url.as_str())?;
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.subscribe(CHANGES_CHANNEL).await?;
    tracing::info!(channel = CHANGES_CHANNEL, %origin, "Relay listener connected");

    let mut stream = pubsub.on_message();
    while let Some(msg) = stream.next().await {
        let payload: String = match msg.get_payload() {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "Unreadable relay payload");
                continue;
            }
        };
        if let Some(event) = foreign_event(&payload, origin) {
            hub.deliver(&event);
        }
    }
    Ok(())
}

/// Decode a relay payload, skipping our own envelopes and garbage
fn foreign_event(payload: &str, origin: Uuid) -> Option<ChangeEvent> {
    match serde_json::from_str::<RelayEnvelope>(payload) {
        Ok(envelope) if envelope.origin == origin => None,
        Ok(envelope) => Some(envelope.event),
        Err(e) => {
            tracing::warn!(error = %e, "Malformed relay envelope");
            None
        }
    }
}
