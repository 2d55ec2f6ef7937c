//! Chat module for chatrelay.
//!
//! This module provides the room subsystem:
//! - Rooms bound to a distribution channel, with local fan-out
//! - Membership management (connect/disconnect)
//! - The process-wide room registry with create-on-first-join and
//!   destroy-on-empty semantics
//! - Per-room in-memory message history

mod history;
mod registry;
mod room;

pub use history::{LogEntry, RoomLog, DEFAULT_HISTORY_CAPACITY};
pub use registry::RoomRegistry;
pub use room::{Room, RoomMember};
