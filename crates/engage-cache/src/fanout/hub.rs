//! In-process subscriber registry.
//!
//! Each subscriber owns a bounded queue. Publishing never waits: a
//! subscriber whose queue is full or whose receiver is gone is removed, and
//! its stream ends once the queued events are drained. Clients re-fetch on
//! reconnect, so nothing is replayed.

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use dashmap::DashMap;
use futures_util::Stream;
use tokio::sync::mpsc::{self, error::TrySendError};

use engage_core::error::DomainError;
use engage_core::events::ChangeEvent;
use engage_core::value_objects::ScopeFilter;

use super::relay::RelayPublisher;
use crate::pool::RedisPoolError;

#[derive(Debug, thiserror::Error)]
pub enum FanoutError {
    #[error("relay publish failed: {0}")]
    Relay(#[from] RedisPoolError),
}

impl From<FanoutError> for DomainError {
    fn from(e: FanoutError) -> Self {
        DomainError::Unavailable(e.to_string())
    }
}

struct Subscriber {
    filter: ScopeFilter,
    tx: mpsc::Sender<ChangeEvent>,
}

impl Subscriber {
    fn wants(&self, event: &ChangeEvent) -> bool {
        // Personal events are routed by viewer, not by scope
        if event.audience.is_some() {
            return self.filter.admits_audience(event.audience);
        }
        self.filter.matches(&event.scope)
    }
}

type Registry = DashMap<u64, Subscriber>;

/// Cheap to clone; clones share the subscriber registry
#[derive(Clone)]
pub struct FanoutHub {
    subscribers: Arc<Registry>,
    next_id: Arc<AtomicU64>,
    buffer: usize,
    relay: Option<RelayPublisher>,
}

impl FanoutHub {
    pub fn new(buffer: usize) -> Self {
        Self {
            subscribers: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicU64::new(1)),
            buffer: buffer.max(1),
            relay: None,
        }
    }

    /// Mirror every published event to other instances
    #[must_use]
    pub fn with_relay(mut self, relay: RelayPublisher) -> Self {
        self.relay = Some(relay);
        self
    }

    pub fn subscribe(&self, filter: ScopeFilter) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.buffer);
        self.subscribers.insert(id, Subscriber { filter, tx });
        tracing::debug!(subscriber = id, "Fan-out subscriber registered");

        Subscription {
            id,
            rx,
            registry: Arc::downgrade(&self.subscribers),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Deliver to local subscribers and, when configured, to the relay.
    ///
    /// Returns the number of local subscribers that received the event. A
    /// relay failure is reported after local delivery has happened.
    pub async fn publish(&self, event: ChangeEvent) -> Result<usize, FanoutError> {
        let delivered = self.deliver(&event);
        if let Some(relay) = &self.relay {
            relay.publish(&event).await?;
        }
        Ok(delivered)
    }

    /// Local delivery only; used for events arriving from the relay
    pub fn deliver(&self, event: &ChangeEvent) -> usize {
        let mut delivered = 0;
        let mut dropped = Vec::new();

        for entry in self.subscribers.iter() {
            let subscriber = entry.value();
            if !subscriber.wants(event) {
                continue;
            }
            match subscriber.tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(subscriber = *entry.key(), "Subscriber queue full, dropping");
                    dropped.push(*entry.key());
                }
                Err(TrySendError::Closed(_)) => dropped.push(*entry.key()),
            }
        }

        // removal after iteration; DashMap shards are still read-locked inside the loop
        for id in dropped {
            self.subscribers.remove(&id);
        }

        tracing::trace!(
            entity_type = event.entity_type.as_str(),
            entity_id = %event.entity_id,
            delivered,
            "Change event delivered"
        );
        delivered
    }
}

/// Stream of change events for one subscriber; dropping it unsubscribes
pub struct Subscription {
    id: u64,
    rx: mpsc::Receiver<ChangeEvent>,
    registry: Weak<Registry>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.rx.recv().await
    }
}

impl Stream for Subscription {
    type Item = ChangeEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(&self.id);
        }
    }
}
