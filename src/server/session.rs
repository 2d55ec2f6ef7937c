//! Session management for the relay server.

use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::chat::RoomMember;
use crate::protocol::ChatEvent;

/// Session state representing the current phase of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport established, no room yet.
    Connected,
    /// Join request received, room resolution in progress.
    Joining,
    /// Member of a room, pumping messages.
    Active,
    /// Terminal state.
    Closed,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Connected
    }
}

/// A connected participant.
///
/// Holds identity, the current room back-reference (used only for
/// routing), and the sender side of the outbound delivery queue. The
/// receiver side stays with the relay loop.
pub struct Session {
    /// Unique session identifier.
    id: Uuid,
    /// Display name supplied at join time.
    username: String,
    /// Current session state.
    state: SessionState,
    /// ID of the joined room, if any.
    room_id: Option<String>,
    /// Sender side of the outbound delivery queue.
    outbound: mpsc::Sender<ChatEvent>,
}

impl Session {
    /// Create a new session.
    pub fn new(username: impl Into<String>, outbound: mpsc::Sender<ChatEvent>) -> Self {
        let id = Uuid::new_v4();
        let username = username.into();
        debug!("Created session {} for {}", id, username);

        Self {
            id,
            username,
            state: SessionState::Connected,
            room_id: None,
            outbound,
        }
    }

    /// Get the session ID.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Get the display name.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Get the current session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Set the session state.
    pub fn set_state(&mut self, state: SessionState) {
        debug!(
            "Session {} state changed: {:?} -> {:?}",
            self.id, self.state, state
        );
        self.state = state;
    }

    /// Get the joined room ID, if any.
    pub fn room_id(&self) -> Option<&str> {
        self.room_id.as_deref()
    }

    /// Record the joined room.
    pub fn set_room(&mut self, room_id: impl Into<String>) {
        self.room_id = Some(room_id.into());
    }

    /// Clear the room back-reference.
    pub fn clear_room(&mut self) {
        self.room_id = None;
    }

    /// Produce the membership handle handed to the registry.
    pub fn member_handle(&self) -> RoomMember {
        RoomMember::new(self.id, &self.username, self.outbound.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_session() -> Session {
        let (tx, _rx) = mpsc::channel(16);
        Session::new("alice", tx)
    }

    #[test]
    fn test_session_creation() {
        let session = test_session();
        assert_eq!(session.username(), "alice");
        assert_eq!(session.state(), SessionState::Connected);
        assert!(session.room_id().is_none());
    }

    #[test]
    fn test_state_transitions() {
        let mut session = test_session();

        session.set_state(SessionState::Joining);
        assert_eq!(session.state(), SessionState::Joining);

        session.set_state(SessionState::Active);
        assert_eq!(session.state(), SessionState::Active);

        session.set_state(SessionState::Closed);
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn test_room_back_reference() {
        let mut session = test_session();

        session.set_room("lobby");
        assert_eq!(session.room_id(), Some("lobby"));

        session.clear_room();
        assert!(session.room_id().is_none());
    }

    #[test]
    fn test_member_handle() {
        let session = test_session();
        let member = session.member_handle();
        assert_eq!(member.session_id, session.id());
        assert_eq!(member.name, "alice");
    }

    #[test]
    fn test_session_ids_are_unique() {
        let a = test_session();
        let b = test_session();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_state_default() {
        assert_eq!(SessionState::default(), SessionState::Connected);
    }
}
