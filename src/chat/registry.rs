//! Room registry for chatrelay.
//!
//! Process-wide table of active rooms, created on first join and destroyed
//! when the last member leaves. The registry is constructed explicitly at
//! startup and passed to the relay loop; rooms are owned here and only
//! referenced from sessions.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use super::history::DEFAULT_HISTORY_CAPACITY;
use super::room::{Room, RoomMember};
use crate::bridge::DistributionBus;
use crate::{RelayError, Result};

/// Registry of active rooms.
///
/// Room ids are case-sensitive strings. The write lock serializes room
/// creation and removal together with the accompanying membership change,
/// so concurrent joins for the same new id resolve to exactly one room and
/// no empty room is ever left behind. Per-room fan-out and bus publishes
/// never hold this lock.
pub struct RoomRegistry {
    /// The bus new rooms subscribe to.
    bus: Arc<dyn DistributionBus>,
    /// Rooms indexed by ID.
    rooms: RwLock<HashMap<String, Arc<Room>>>,
    /// History capacity for new rooms.
    history_capacity: usize,
}

impl RoomRegistry {
    /// Create a new, empty registry.
    pub fn new(bus: Arc<dyn DistributionBus>) -> Self {
        Self::with_history_capacity(bus, DEFAULT_HISTORY_CAPACITY)
    }

    /// Create a registry whose rooms keep `history_capacity` messages.
    pub fn with_history_capacity(bus: Arc<dyn DistributionBus>, history_capacity: usize) -> Self {
        Self {
            bus,
            rooms: RwLock::new(HashMap::new()),
            history_capacity,
        }
    }

    /// Join a room, creating it first if it does not exist.
    ///
    /// Joining an existing room as an existing member is a no-op on the
    /// membership set. Fails with `InvalidRoomId` for a blank id; a bus
    /// failure while opening a new room surfaces as `BridgeUnavailable`
    /// and leaves the registry unchanged.
    pub async fn join_or_create(&self, room_id: &str, member: RoomMember) -> Result<Arc<Room>> {
        if room_id.trim().is_empty() {
            return Err(RelayError::InvalidRoomId(room_id.to_string()));
        }

        let mut rooms = self.rooms.write().await;
        let room = match rooms.get(room_id) {
            Some(room) => Arc::clone(room),
            None => {
                let room =
                    Room::open(room_id, Arc::clone(&self.bus), self.history_capacity).await?;
                rooms.insert(room_id.to_string(), Arc::clone(&room));
                info!("Created room {} (total: {})", room_id, rooms.len());
                room
            }
        };

        room.connect(member).await;
        Ok(room)
    }

    /// Remove a session from a room, destroying the room if it empties.
    ///
    /// Idempotent: an unknown room or a session that is not a member is a
    /// silent no-op returning false.
    pub async fn leave(&self, room_id: &str, session_id: Uuid) -> bool {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get(room_id) else {
            return false;
        };

        let removed = room.disconnect(session_id).await;
        if room.member_count().await == 0 {
            if let Some(room) = rooms.remove(room_id) {
                room.close().await;
                info!("Destroyed empty room {} (total: {})", room_id, rooms.len());
            }
        }

        removed
    }

    /// Get a room by ID.
    pub async fn get(&self, room_id: &str) -> Option<Arc<Room>> {
        self.rooms.read().await.get(room_id).cloned()
    }

    /// Number of active rooms.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// IDs of all active rooms, sorted for consistent ordering.
    pub async fn room_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.rooms.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}
