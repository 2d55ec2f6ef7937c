//! chatrelay - real-time chat relay
//!
//! Clients join named rooms over a persistent connection and exchange
//! short JSON events fanned out to every member of the room. Rooms are
//! shared between relay processes through a publish/subscribe distribution
//! bus; a process-local in-memory bus is included.

pub mod bridge;
pub mod chat;
pub mod config;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod server;

pub use bridge::{Deliveries, DistributionBus, InMemoryBus};
pub use chat::{LogEntry, Room, RoomLog, RoomMember, RoomRegistry};
pub use config::Config;
pub use error::{RelayError, Result};
pub use protocol::{parse_join, ChatEvent};
pub use server::{RelayHandler, RelayServer, Session, SessionState};
