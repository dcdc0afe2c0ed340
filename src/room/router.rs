//! Per-connection state and dispatch of inbound intents to rooms.

use tracing::{debug, error, info};

use super::manager::{Member, Outbox, RoomError, RoomManager};
use crate::config::Config;
use crate::game::Action;
use crate::protocol::{ClientMessage, Role, ServerMessage};
use crate::util::id::ConnectionId;

/// State the router keeps for one live connection.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    outbox: Outbox,
    seat: Option<(String, Role)>,
}

impl Connection {
    pub fn id(&self) -> ConnectionId { self.id }

    pub fn room(&self) -> Option<&str> {
        self.seat.as_ref().map(|(room, _)| room.as_str())
    }

    pub fn role(&self) -> Option<Role> {
        self.seat.as_ref().map(|(_, role)| *role)
    }

    fn send(&self, msg: &ServerMessage) {
        let payload = match msg.to_payload() {
            Ok(p) => p,
            Err(err) => {
                error!(conn = %self.id, %err, "failed to encode message");
                return;
            }
        };
        if self.outbox.send(payload).is_err() {
            debug!(conn = %self.id, "skipping send to closed connection");
        }
    }
}

/// Entry point for the transport: connect, deliver messages, disconnect.
#[derive(Debug)]
pub struct ConnectionRouter {
    rooms: RoomManager,
}

impl ConnectionRouter {
    pub fn new(config: &Config) -> Self {
        Self { rooms: RoomManager::new(config.rules, config.reap_empty_rooms) }
    }

    pub fn rooms(&self) -> &RoomManager { &self.rooms }

    /// Registers a new connection whose payloads go to `outbox`.
    pub fn connect(&self, outbox: Outbox) -> Connection {
        let conn = Connection { id: ConnectionId::new(), outbox, seat: None };
        debug!(conn = %conn.id, "connected");
        conn
    }

    /// Parses and dispatches one raw text frame. Malformed input is dropped.
    pub fn on_message(&self, conn: &mut Connection, raw: &str) {
        match serde_json::from_str::<ClientMessage>(raw) {
            Ok(msg) => self.dispatch(conn, msg),
            Err(err) => debug!(conn = %conn.id, %err, "dropping malformed message"),
        }
    }

    pub fn dispatch(&self, conn: &mut Connection, msg: ClientMessage) {
        if msg.room().is_empty() {
            debug!(conn = %conn.id, "dropping message without room");
            return;
        }
        match msg {
            ClientMessage::Join { room } => self.join(conn, room),
            ClientMessage::Action { room, action } => self.action(conn, &room, action),
            ClientMessage::Chat { room, msg } => {
                let Some(role) = self.member_role(conn, &room) else { return };
                if let Some(r) = self.rooms.get(&room) {
                    r.chat(role, msg);
                }
            }
        }
    }

    /// Removes the connection from its room, if any.
    pub fn disconnect(&self, conn: &Connection) {
        if let Some((room, role)) = &conn.seat {
            self.rooms.leave(room, conn.id);
            info!(%room, conn = %conn.id, %role, "left room");
        } else {
            debug!(conn = %conn.id, "disconnected");
        }
    }

    fn join(&self, conn: &mut Connection, room: String) {
        if let Some(current) = conn.room() {
            debug!(conn = %conn.id, %current, requested = %room, "already in a room, ignoring join");
            return;
        }
        let role = self.rooms.join(&room, Member::new(conn.id, conn.outbox.clone()));
        info!(%room, conn = %conn.id, %role, "joined room");
        conn.seat = Some((room, role));
    }

    /// Role of `conn` if it sits in `room`; messages aimed elsewhere are dropped.
    fn member_role(&self, conn: &Connection, room: &str) -> Option<Role> {
        match &conn.seat {
            Some((joined, role)) if joined == room => Some(*role),
            Some((joined, _)) => {
                debug!(conn = %conn.id, %joined, target = %room, "dropping message for another room");
                None
            }
            None => {
                debug!(conn = %conn.id, target = %room, "dropping message before join");
                None
            }
        }
    }

    fn action(&self, conn: &Connection, room: &str, action: Action) {
        let Some(role) = self.member_role(conn, room) else { return };
        let Some(player) = role.player() else {
            debug!(%room, conn = %conn.id, action = action.name(), "ignoring spectator action");
            return;
        };
        let Some(target) = self.rooms.get(room) else { return };
        match target.apply(player, action) {
            Ok(outcome) => debug!(%room, %player, ?outcome, "action applied"),
            Err(RoomError::Rejected(err)) => {
                debug!(%room, %player, action = action.name(), %err, "action rejected");
                conn.send(&ServerMessage::Error { msg: err.to_string() });
            }
            // already logged by the room
            Err(RoomError::Internal(_)) => {}
        }
    }
}
