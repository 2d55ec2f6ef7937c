//! Distribution bridge for chatrelay.
//!
//! Rooms do not fan out published messages to local members directly.
//! Every publish goes to a named channel on a distribution bus, and local
//! delivery happens through the room's subscription to that channel. With
//! an external bus implementation, relay instances in different processes
//! share rooms transparently; [`InMemoryBus`] serves a single process with
//! no external infrastructure.

mod memory;

pub use memory::InMemoryBus;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::Result;

/// Stream of raw payloads delivered on one bus channel, in delivery order.
///
/// Dropping the stream releases the subscription.
pub type Deliveries = BoxStream<'static, String>;

/// A named-channel publish/subscribe bus.
///
/// Delivery is at-least-best-effort, depending on the bus; the relay does
/// not layer retries or acknowledgments on top.
#[async_trait]
pub trait DistributionBus: Send + Sync {
    /// Begin listening on `channel`.
    ///
    /// Payloads arrive on the returned stream in delivery order for as
    /// long as the subscription is held.
    async fn subscribe(&self, channel: &str) -> Result<Deliveries>;

    /// Place `payload` on `channel`.
    ///
    /// Does not wait for subscribers to receive the payload. A failure
    /// surfaces as [`RelayError::BridgeUnavailable`](crate::RelayError).
    async fn publish(&self, channel: &str, payload: String) -> Result<()>;
}
