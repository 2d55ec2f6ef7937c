//! Relay loop: the per-session pumps between the wire and the room.
//!
//! Each connection gets an inbound pump (wire to room) and an outbound
//! pump (room to wire) racing under `tokio::select!`, so whichever side
//! terminates first cancels the other. Teardown always releases the
//! session's room membership.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info};

use super::session::{Session, SessionState};
use crate::chat::{Room, RoomRegistry};
use crate::config::{RelayConfig, ServerConfig};
use crate::protocol::{self, ChatEvent};
use crate::{RelayError, Result};

/// Per-connection relay driver, shared by all connection tasks.
pub struct RelayHandler {
    registry: Arc<RoomRegistry>,
    outbound_queue: usize,
    handshake_timeout: Duration,
}

impl RelayHandler {
    /// Create a handler serving rooms from `registry`.
    pub fn new(registry: Arc<RoomRegistry>, server: &ServerConfig, relay: &RelayConfig) -> Self {
        Self {
            registry,
            outbound_queue: relay.outbound_queue.max(1),
            handshake_timeout: Duration::from_secs(server.handshake_timeout_secs),
        }
    }

    /// Drive one connection from handshake to teardown.
    ///
    /// Errors are session-local: they close this connection and are
    /// logged, never propagated to other sessions.
    pub async fn handle(&self, stream: TcpStream, addr: SocketAddr) {
        match self.run_session(stream, addr).await {
            Ok(()) => info!("Connection from {} closed", addr),
            Err(e) => info!("Connection from {} closed: {}", addr, e),
        }
    }

    async fn run_session(&self, stream: TcpStream, addr: SocketAddr) -> Result<()> {
        let (reader, writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();

        // Join handshake: the first frame decides whether a session
        // exists at all. No registry side effects on failure.
        let first = timeout(self.handshake_timeout, lines.next_line())
            .await
            .map_err(|_| RelayError::MalformedJoinRequest("handshake timed out".to_string()))??
            .ok_or_else(|| {
                RelayError::MalformedJoinRequest("connection closed before join".to_string())
            })?;
        let (username, roomid) = protocol::parse_join(&first)?;

        let (outbound_tx, outbound_rx) = mpsc::channel(self.outbound_queue);
        let mut session = Session::new(username, outbound_tx);
        session.set_state(SessionState::Joining);

        let room = self
            .registry
            .join_or_create(&roomid, session.member_handle())
            .await?;
        session.set_room(&roomid);
        session.set_state(SessionState::Active);
        info!("{} joined {} from {}", session.username(), roomid, addr);

        let result = relay_pumps(&room, &session, lines, writer, outbound_rx).await;

        // Pumps are gone; release membership. leave is idempotent and
        // safe to race against a concurrent disconnect.
        self.registry.leave(&roomid, session.id()).await;
        session.set_state(SessionState::Closed);
        debug!("Session {} torn down", session.id());

        result
    }
}

/// Send the join notice, then run both pumps until either terminates.
async fn relay_pumps(
    room: &Arc<Room>,
    session: &Session,
    mut lines: Lines<BufReader<OwnedReadHalf>>,
    mut writer: OwnedWriteHalf,
    mut outbound_rx: mpsc::Receiver<ChatEvent>,
) -> Result<()> {
    // The joining session is already a member, so everyone else is
    // `count - 1`. Sent before any chat traffic is relayed.
    let others = room.member_count().await.saturating_sub(1);
    let notice = ChatEvent::server_msg(format!(
        "Joined {} - {} other user(s) online.",
        room.id(),
        others
    ));
    write_frame(&mut writer, &notice).await?;

    let username = session.username().to_string();

    let inbound = async {
        loop {
            let Some(line) = lines.next_line().await? else {
                // Wire closed by the peer
                break Ok(());
            };

            match ChatEvent::decode(&line)? {
                ChatEvent::Chat { message, .. } => {
                    // The sender name comes from the session, not the wire
                    room.publish(&ChatEvent::chat(message, username.clone()))
                        .await?;
                }
                other => {
                    break Err(RelayError::ProtocolViolation(format!(
                        "unexpected {} event after join",
                        other.kind()
                    )));
                }
            }
        }
    };

    let outbound = async {
        while let Some(event) = outbound_rx.recv().await {
            write_frame(&mut writer, &event).await?;
        }
        Ok(())
    };

    // Either pump terminating cancels the other
    tokio::select! {
        result = inbound => result,
        result = outbound => result,
    }
}

async fn write_frame(writer: &mut OwnedWriteHalf, event: &ChatEvent) -> Result<()> {
    let frame = event.encode()?;
    writer.write_all(frame.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    Ok(())
}
