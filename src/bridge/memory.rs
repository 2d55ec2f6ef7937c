//! In-memory distribution bus.
//!
//! Backs each channel with a tokio broadcast channel. Suitable for a
//! single relay process; multi-process deployments swap in a bus backed by
//! external infrastructure behind the same trait.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::{broadcast, RwLock};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::warn;

use super::{Deliveries, DistributionBus};
use crate::{RelayError, Result};

/// Maximum number of payloads buffered per channel. Subscribers that fall
/// further behind skip messages.
const CHANNEL_CAPACITY: usize = 256;

/// Process-local distribution bus.
pub struct InMemoryBus {
    /// Broadcast senders indexed by channel name.
    channels: RwLock<HashMap<String, broadcast::Sender<String>>>,
    /// Set once the bus has been shut down.
    closed: AtomicBool,
}

impl InMemoryBus {
    /// Create a new bus with no channels.
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Shut the bus down. Subsequent subscribe/publish calls fail with
    /// `BridgeUnavailable`; existing subscriptions receive no further
    /// payloads beyond what is already buffered.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Number of channels that currently exist.
    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(RelayError::BridgeUnavailable("bus is closed".to_string()))
        } else {
            Ok(())
        }
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DistributionBus for InMemoryBus {
    async fn subscribe(&self, channel: &str) -> Result<Deliveries> {
        self.ensure_open()?;

        let mut channels = self.channels.write().await;
        let sender = channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        let receiver = sender.subscribe();
        drop(channels);

        let channel = channel.to_string();
        let stream = BroadcastStream::new(receiver).filter_map(move |item| {
            let payload = match item {
                Ok(payload) => Some(payload),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(
                        "Subscriber on channel {} lagged, skipped {} message(s)",
                        channel, skipped
                    );
                    None
                }
            };
            futures::future::ready(payload)
        });

        Ok(stream.boxed())
    }

    async fn publish(&self, channel: &str, payload: String) -> Result<()> {
        self.ensure_open()?;

        let sender = self.channels.read().await.get(channel).cloned();
        let Some(sender) = sender else {
            // Nobody has ever subscribed to this channel; the payload
            // goes nowhere, as on any fire-and-forget bus.
            return Ok(());
        };

        if sender.send(payload).is_err() {
            // The last subscriber is gone. Drop the channel entry unless
            // someone resubscribed in the meantime.
            let mut channels = self.channels.write().await;
            if channels
                .get(channel)
                .is_some_and(|s| s.receiver_count() == 0)
            {
                channels.remove(channel);
            }
        }

        Ok(())
    }
}
