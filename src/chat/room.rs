//! Chat room implementation for chatrelay.
//!
//! A room is the set of local members sharing one distribution channel.
//! Publishing never fans out locally: every message goes to the bus, and
//! local delivery happens through the room's single bus subscription. The
//! sender's own copy therefore takes the same path as every other
//! member's, whether the publisher is in this process or another one.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use futures::StreamExt;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use super::history::{LogEntry, RoomLog};
use crate::bridge::{Deliveries, DistributionBus};
use crate::protocol::ChatEvent;
use crate::{RelayError, Result};

/// A room's handle to one member session.
#[derive(Debug, Clone)]
pub struct RoomMember {
    /// Session ID.
    pub session_id: Uuid,
    /// Display name.
    pub name: String,
    /// Sender side of the session's outbound delivery queue.
    pub outbound: mpsc::Sender<ChatEvent>,
    /// Join timestamp.
    pub joined_at: DateTime<Utc>,
}

impl RoomMember {
    /// Create a new member handle.
    pub fn new(
        session_id: Uuid,
        name: impl Into<String>,
        outbound: mpsc::Sender<ChatEvent>,
    ) -> Self {
        Self {
            session_id,
            name: name.into(),
            outbound,
            joined_at: Utc::now(),
        }
    }
}

/// A chat room bound to one distribution channel.
pub struct Room {
    /// Room ID, also the bus channel name.
    id: String,
    /// The distribution bus this room publishes to.
    bus: Arc<dyn DistributionBus>,
    /// Members indexed by session ID.
    members: RwLock<HashMap<Uuid, RoomMember>>,
    /// Recent delivered messages.
    history: RwLock<RoomLog>,
    /// Fan-out task owning the bus subscription.
    fanout: Mutex<Option<JoinHandle<()>>>,
}

impl Room {
    /// Create a room and begin listening on its bus channel.
    ///
    /// The room holds exactly one subscription for its lifetime; it is
    /// released when the registry closes the room.
    pub(crate) async fn open(
        id: impl Into<String>,
        bus: Arc<dyn DistributionBus>,
        history_capacity: usize,
    ) -> Result<Arc<Self>> {
        let id = id.into();
        let deliveries = bus.subscribe(&id).await?;

        let room = Arc::new(Self {
            id,
            bus,
            members: RwLock::new(HashMap::new()),
            history: RwLock::new(RoomLog::new(history_capacity)),
            fanout: Mutex::new(None),
        });

        // The task holds only a weak reference, so a closed room is not
        // kept alive by its own pump.
        let task = tokio::spawn(fanout_loop(Arc::downgrade(&room), deliveries));
        *room.fanout.lock().await = Some(task);

        Ok(room)
    }

    /// Get the room ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Add a member.
    ///
    /// Returns false without side effects if the session is already a
    /// member.
    pub async fn connect(&self, member: RoomMember) -> bool {
        let mut members = self.members.write().await;
        if members.contains_key(&member.session_id) {
            debug!(
                "Session {} is already in room {}",
                member.session_id, self.id
            );
            return false;
        }

        debug!("{} joined room {}", member.name, self.id);
        members.insert(member.session_id, member);
        true
    }

    /// Remove a member.
    ///
    /// Returns false if the session was not a member.
    pub async fn disconnect(&self, session_id: Uuid) -> bool {
        let mut members = self.members.write().await;
        if let Some(member) = members.remove(&session_id) {
            debug!("{} left room {}", member.name, self.id);
            true
        } else {
            false
        }
    }

    /// Get the number of members.
    pub async fn member_count(&self) -> usize {
        self.members.read().await.len()
    }

    /// Get a list of member names.
    pub async fn member_names(&self) -> Vec<String> {
        self.members
            .read()
            .await
            .values()
            .map(|m| m.name.clone())
            .collect()
    }

    /// Check if a session is a member.
    pub async fn is_member(&self, session_id: Uuid) -> bool {
        self.members.read().await.contains_key(&session_id)
    }

    /// Publish a chat event to this room's distribution channel.
    ///
    /// Only `Chat` events may be published. Local members receive the
    /// event via the bus subscription, not from this call.
    pub async fn publish(&self, event: &ChatEvent) -> Result<()> {
        if !matches!(event, ChatEvent::Chat { .. }) {
            return Err(RelayError::ProtocolViolation(format!(
                "cannot publish {} event to a room",
                event.kind()
            )));
        }

        self.bus.publish(&self.id, event.encode()?).await
    }

    /// The last `n` delivered chat messages, oldest first.
    pub async fn recent_messages(&self, n: usize) -> Vec<LogEntry> {
        self.history.read().await.recent(n)
    }

    /// Stop the fan-out task, releasing the bus subscription.
    ///
    /// Called by the registry when the last member leaves.
    pub(crate) async fn close(&self) {
        if let Some(task) = self.fanout.lock().await.take() {
            task.abort();
            // Wait for the pump to wind down so the subscription is
            // released before the room is reported destroyed
            let _ = task.await;
        }
        debug!("Room {} closed", self.id);
    }

    /// Forward one delivered event to every current member, in order.
    async fn deliver(&self, event: ChatEvent) {
        if let ChatEvent::Chat { message, user } = &event {
            self.history
                .write()
                .await
                .push(LogEntry::new(user.clone(), message.clone()));
        }

        let members = self.members.read().await;
        for member in members.values() {
            if member.outbound.try_send(event.clone()).is_err() {
                warn!(
                    "Dropping message for slow session {} in room {}",
                    member.session_id, self.id
                );
            }
        }
    }
}

/// Pump bus deliveries into the room's members until the subscription ends
/// or the room is dropped.
async fn fanout_loop(room: Weak<Room>, mut deliveries: Deliveries) {
    while let Some(payload) = deliveries.next().await {
        let Some(room) = room.upgrade() else {
            break;
        };

        match ChatEvent::decode(&payload) {
            Ok(event) => room.deliver(event).await,
            Err(e) => warn!("Dropping undecodable payload on room {}: {}", room.id(), e),
        }
    }
}
