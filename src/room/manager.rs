//! Registry of rooms and per-room fan-out.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::game::{Action, ActionError, GameSession, Outcome, Player, Rules};
use crate::protocol::{Role, ServerMessage, StateSnapshot};
use crate::util::id::ConnectionId;

/// Outbound queue of one connection; the websocket task drains it.
pub type Outbox = mpsc::UnboundedSender<String>;

/// A connection as seen by a room.
#[derive(Debug, Clone)]
pub struct Member {
    pub id: ConnectionId,
    pub outbox: Outbox,
}

impl Member {
    pub fn new(id: ConnectionId, outbox: Outbox) -> Self { Self { id, outbox } }

    fn deliver(&self, room: &str, payload: &str) {
        if self.outbox.send(payload.to_owned()).is_err() {
            debug!(%room, conn = %self.id, "skipping send to closed connection");
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum RoomError {
    #[error(transparent)]
    Rejected(#[from] ActionError),
    #[error("action failed: {0}")]
    Internal(String),
}

#[derive(Debug)]
struct RoomInner {
    session: GameSession,
    seats: [Option<Member>; 2],
    spectators: Vec<Member>,
}

impl RoomInner {
    fn members(&self) -> impl Iterator<Item = &Member> {
        self.seats.iter().flatten().chain(self.spectators.iter())
    }

    fn send(&self, room: &str, to: &Member, msg: &ServerMessage) {
        match msg.to_payload() {
            Ok(payload) => to.deliver(room, &payload),
            Err(err) => error!(%room, %err, "failed to encode message"),
        }
    }

    fn broadcast(&self, room: &str, msg: &ServerMessage) {
        match msg.to_payload() {
            Ok(payload) => self.members().for_each(|m| m.deliver(room, &payload)),
            Err(err) => error!(%room, %err, "failed to encode message"),
        }
    }
}

/// One room: its game plus the connections seated in or watching it.
///
/// A single mutex serializes every action against the session, and the
/// resulting snapshot is queued to all members before the lock is released,
/// so members see updates in the order they were applied.
#[derive(Debug)]
pub struct Room {
    id: String,
    inner: Mutex<RoomInner>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomSummary {
    pub id: String,
    pub players: usize,
    pub spectators: usize,
    pub active: bool,
}

impl Room {
    pub fn new(id: impl Into<String>, rules: Rules) -> Self {
        Self {
            id: id.into(),
            inner: Mutex::new(RoomInner {
                session: GameSession::new(rules),
                seats: [None, None],
                spectators: Vec::new(),
            }),
        }
    }

    /// Seats `member` in the first free slot, or as a spectator, and sends it
    /// a WELCOME followed by the current state.
    pub fn join(&self, member: Member) -> Role {
        let mut inner = self.inner.lock();
        let role = match inner.seats.iter().position(Option::is_none) {
            Some(0) => Role::Player(Player::One),
            Some(_) => Role::Player(Player::Two),
            None => Role::Spectator,
        };
        match role {
            Role::Player(p) => inner.seats[p.index()] = Some(member.clone()),
            Role::Spectator => inner.spectators.push(member.clone()),
        }
        inner.send(&self.id, &member, &ServerMessage::Welcome { role });
        let snapshot = StateSnapshot::of(inner.session.state());
        inner.send(&self.id, &member, &ServerMessage::StateUpdate(snapshot));
        role
    }

    /// Removes the connection from its seat or the spectators.
    pub fn leave(&self, id: ConnectionId) -> bool {
        let mut inner = self.inner.lock();
        for seat in inner.seats.iter_mut() {
            if seat.as_ref().is_some_and(|m| m.id == id) {
                *seat = None;
                return true;
            }
        }
        let before = inner.spectators.len();
        inner.spectators.retain(|m| m.id != id);
        inner.spectators.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().members().next().is_none()
    }

    /// Runs `action` for `player` and broadcasts the new state on success.
    ///
    /// A panic inside the rules is contained here: the session only commits
    /// completed actions, so the room stays usable and nothing is broadcast.
    pub fn apply(&self, player: Player, action: Action) -> Result<Outcome, RoomError> {
        let mut inner = self.inner.lock();
        let result = panic::catch_unwind(AssertUnwindSafe(|| inner.session.handle_action(player, action)));
        match result {
            Ok(Ok(outcome)) => {
                let snapshot = StateSnapshot::of(inner.session.state());
                inner.broadcast(&self.id, &ServerMessage::StateUpdate(snapshot));
                Ok(outcome)
            }
            Ok(Err(rejected)) => Err(rejected.into()),
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(room = %self.id, %player, action = action.name(), %reason, "action processing failed");
                Err(RoomError::Internal(reason))
            }
        }
    }

    /// Relays a chat message, tagged with the sender's role, to every member.
    pub fn chat(&self, role: Role, msg: serde_json::Value) {
        let inner = self.inner.lock();
        inner.broadcast(&self.id, &ServerMessage::Chat { msg, role });
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot::of(self.inner.lock().session.state())
    }

    pub fn summary(&self) -> RoomSummary {
        let inner = self.inner.lock();
        RoomSummary {
            id: self.id.clone(),
            players: inner.seats.iter().flatten().count(),
            spectators: inner.spectators.len(),
            active: inner.session.state().status.active,
        }
    }
}

/// Maps room ids to rooms; rooms are created on first join.
#[derive(Debug)]
pub struct RoomManager {
    rooms: DashMap<String, Arc<Room>>,
    rules: Rules,
    reap_empty: bool,
}

impl RoomManager {
    pub fn new(rules: Rules, reap_empty: bool) -> Self {
        Self { rooms: DashMap::new(), rules, reap_empty }
    }

    /// Joins `member` to `room_id`, creating the room if needed.
    pub fn join(&self, room_id: &str, member: Member) -> Role {
        // The shard stays locked while seating, so a concurrent reap cannot
        // drop the room between lookup and join.
        let room = self.rooms.entry(room_id.to_owned()).or_insert_with(|| {
            info!(room = %room_id, "room created");
            Arc::new(Room::new(room_id, self.rules))
        });
        room.join(member)
    }

    pub fn get(&self, room_id: &str) -> Option<Arc<Room>> {
        self.rooms.get(room_id).map(|r| r.clone())
    }

    /// Removes the connection from the room and reaps the room once empty.
    pub fn leave(&self, room_id: &str, id: ConnectionId) {
        let Some(room) = self.get(room_id) else { return };
        if !room.leave(id) {
            return;
        }
        if self.reap_empty && self.rooms.remove_if(room_id, |_, r| r.is_empty()).is_some() {
            info!(room = %room_id, "room destroyed");
        }
    }

    pub fn summaries(&self) -> Vec<RoomSummary> {
        let mut out: Vec<RoomSummary> = self.rooms.iter().map(|r| r.summary()).collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Cell, Coord};
    use std::thread;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn member() -> (Member, UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Member::new(ConnectionId::new(), tx), rx)
    }

    fn drain(rx: &mut UnboundedReceiver<String>) -> Vec<serde_json::Value> {
        let mut out = Vec::new();
        while let Ok(raw) = rx.try_recv() {
            out.push(serde_json::from_str(&raw).unwrap());
        }
        out
    }

    #[test]
    fn seats_two_players_then_spectators() {
        let room = Room::new("A", Rules::default());
        let (a, _ra) = member();
        let (b, _rb) = member();
        let (c, _rc) = member();
        assert_eq!(room.join(a), Role::Player(Player::One));
        assert_eq!(room.join(b), Role::Player(Player::Two));
        assert_eq!(room.join(c), Role::Spectator);
        let s = room.summary();
        assert_eq!((s.players, s.spectators), (2, 1));
    }

    #[test]
    fn freed_seat_is_reassigned() {
        let room = Room::new("A", Rules::default());
        let (a, _ra) = member();
        let (b, _rb) = member();
        let (c, _rc) = member();
        let a_id = a.id;
        room.join(a);
        room.join(b);
        assert!(room.leave(a_id));
        assert!(!room.leave(a_id));
        assert_eq!(room.join(c), Role::Player(Player::One));
    }

    #[test]
    fn join_sends_welcome_then_state() {
        let room = Room::new("A", Rules::default());
        let (a, mut ra) = member();
        room.join(a);
        let msgs = drain(&mut ra);
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0]["type"], "WELCOME");
        assert_eq!(msgs[0]["role"], 1);
        assert_eq!(msgs[1]["type"], "STATE_UPDATE");
    }

    #[test]
    fn rejected_action_is_not_broadcast() {
        let room = Room::new("A", Rules::default());
        let (a, mut ra) = member();
        room.join(a);
        drain(&mut ra);
        let err = room.apply(Player::Two, Action::Place { r: 0, c: 0 }).unwrap_err();
        assert!(matches!(err, RoomError::Rejected(ActionError::NotYourTurn)));
        assert!(drain(&mut ra).is_empty());
    }

    #[test]
    fn closed_member_does_not_block_others() {
        let room = Room::new("A", Rules::default());
        let (a, ra) = member();
        let (b, mut rb) = member();
        room.join(a);
        room.join(b);
        drop(ra);
        drain(&mut rb);
        room.apply(Player::One, Action::Place { r: 1, c: 1 }).unwrap();
        let msgs = drain(&mut rb);
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0]["currentPlayer"], 2);
    }

    #[test]
    fn failed_action_is_a_no_op() {
        let room = Room::new("A", Rules::default());
        let (a, mut ra) = member();
        let (b, mut rb) = member();
        room.join(a);
        room.join(b);
        drain(&mut ra);
        drain(&mut rb);

        room.inner.lock().session.fail_next_action();
        let err = room.apply(Player::One, Action::Place { r: 0, c: 0 }).unwrap_err();
        assert!(matches!(err, RoomError::Internal(ref reason) if reason.contains("PLACE")));
        assert!(drain(&mut ra).is_empty());
        assert!(drain(&mut rb).is_empty());
        let snap = room.snapshot();
        assert_eq!(snap.board.get(Coord::new(0, 0)), Cell::Empty);
        assert_eq!(snap.current_player, Player::One);

        // the room keeps working afterwards
        room.apply(Player::One, Action::Place { r: 0, c: 0 }).unwrap();
        let msgs = drain(&mut rb);
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0]["board"][0][0]["owner"], 1);
    }

    fn owned_cells(state: &serde_json::Value) -> usize {
        state["board"]
            .as_array()
            .unwrap()
            .iter()
            .flat_map(|row| row.as_array().unwrap())
            .filter(|cell| cell["state"] == "owned")
            .count()
    }

    #[test]
    fn concurrent_actions_on_one_room_are_serialized() {
        let room = Arc::new(Room::new("A", Rules { winning_score: u32::MAX }));
        let (a, _ra) = member();
        let (b, _rb) = member();
        let (watcher, mut rw) = member();
        room.join(a);
        room.join(b);
        room.join(watcher);

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let room = Arc::clone(&room);
                thread::spawn(move || {
                    let player = if t % 2 == 0 { Player::One } else { Player::Two };
                    let mut accepted = 0usize;
                    for k in 0..200i64 {
                        let cell = (k * 7 + t) % 225;
                        if room.apply(player, Action::Place { r: cell / 15, c: cell % 15 }).is_ok() {
                            accepted += 1;
                        }
                    }
                    accepted
                })
            })
            .collect();
        let accepted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert!(accepted > 0);

        let msgs = drain(&mut rw);
        assert_eq!(msgs[0]["type"], "WELCOME");
        let updates: Vec<_> = msgs[1..].iter().filter(|m| m["type"] == "STATE_UPDATE").collect();
        assert_eq!(msgs.len(), updates.len() + 1);
        // join snapshot plus one update per accepted action
        assert_eq!(updates.len(), accepted + 1);
        for (i, update) in updates.iter().enumerate() {
            assert_eq!(owned_cells(update), i);
        }
        let last = serde_json::to_value(room.snapshot()).unwrap();
        assert_eq!(owned_cells(&last), accepted);
        assert_eq!(updates.last().unwrap()["board"], last["board"]);
    }

    #[test]
    fn manager_reaps_empty_rooms() {
        let rooms = RoomManager::new(Rules::default(), true);
        let (a, _ra) = member();
        let (b, _rb) = member();
        let (a_id, b_id) = (a.id, b.id);
        rooms.join("A", a);
        rooms.join("A", b);
        rooms.leave("A", a_id);
        assert_eq!(rooms.summaries().len(), 1);
        rooms.leave("A", b_id);
        assert!(rooms.summaries().is_empty());
        assert!(rooms.get("A").is_none());
    }

    #[test]
    fn manager_keeps_rooms_when_reaping_disabled() {
        let rooms = RoomManager::new(Rules::default(), false);
        let (a, _ra) = member();
        let a_id = a.id;
        rooms.join("A", a);
        rooms.join("B", member().0);
        rooms.leave("A", a_id);
        assert_eq!(rooms.summaries().len(), 2);
        let ids: Vec<String> = rooms.summaries().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["A".to_string(), "B".to_string()]);
    }
}
