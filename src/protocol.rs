//! Wire protocol for chatrelay.
//!
//! Events are JSON objects, one per frame, tagged by a `type` field:
//! `{"type":"join","username":...,"roomid":...}` for the handshake,
//! `{"type":"chat","message":...,"user":...}` in both directions, and
//! `{"type":"server_msg","message":...}` from relay to client.

use serde::{Deserialize, Serialize};

use crate::{RelayError, Result};

/// A single event on the wire.
///
/// The `type` tag determines which fields are required; an event missing a
/// required field for its kind fails to decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// Join request (client to relay). Both fields required.
    Join {
        /// Display name of the joining user.
        username: String,
        /// Identifier of the room to join.
        roomid: String,
    },
    /// Chat message (either direction).
    Chat {
        /// Message body.
        message: String,
        /// Display name of the sender. Stamped by the relay on inbound
        /// messages; the client-supplied value is not trusted.
        user: String,
    },
    /// Notice from the relay to one client.
    ServerMsg {
        /// Notice text.
        message: String,
    },
}

impl ChatEvent {
    /// Get the wire name of this event's kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ChatEvent::Join { .. } => "join",
            ChatEvent::Chat { .. } => "chat",
            ChatEvent::ServerMsg { .. } => "server_msg",
        }
    }

    /// Create a chat event.
    pub fn chat(message: impl Into<String>, user: impl Into<String>) -> Self {
        ChatEvent::Chat {
            message: message.into(),
            user: user.into(),
        }
    }

    /// Create a server notice.
    pub fn server_msg(message: impl Into<String>) -> Self {
        ChatEvent::ServerMsg {
            message: message.into(),
        }
    }

    /// Serialize to a single JSON frame.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| RelayError::ProtocolViolation(e.to_string()))
    }

    /// Deserialize from a single JSON frame.
    ///
    /// Unrecognized `type` values and missing required fields are protocol
    /// violations.
    pub fn decode(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| RelayError::ProtocolViolation(e.to_string()))
    }
}

/// Parse the handshake frame of a new connection.
///
/// Returns `(username, roomid)`. Anything other than a well-formed join
/// event with a non-empty username is a malformed join request; room id
/// validation is left to the registry.
pub fn parse_join(raw: &str) -> Result<(String, String)> {
    let event: ChatEvent = serde_json::from_str(raw)
        .map_err(|e| RelayError::MalformedJoinRequest(e.to_string()))?;

    match event {
        ChatEvent::Join { username, roomid } => {
            if username.trim().is_empty() {
                return Err(RelayError::MalformedJoinRequest(
                    "empty username".to_string(),
                ));
            }
            Ok((username, roomid))
        }
        other => Err(RelayError::MalformedJoinRequest(format!(
            "expected join event, got {}",
            other.kind()
        ))),
    }
}
