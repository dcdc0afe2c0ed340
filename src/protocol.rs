//! Wire messages exchanged over the websocket.

use serde::{Deserialize, Serialize, Serializer};

use crate::game::{Action, Board, GameState, Player};

/// Seat held by a connection inside its room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Player(Player),
    Spectator,
}

impl Role {
    pub fn player(self) -> Option<Player> {
        match self {
            Role::Player(p) => Some(p),
            Role::Spectator => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Player(p) => write!(f, "P{p}"),
            Role::Spectator => f.write_str("spectator"),
        }
    }
}

// 1, 2 or "spectator"
impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Role::Player(p) => serializer.serialize_u8(p.number()),
            Role::Spectator => serializer.serialize_str("spectator"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Join { room: String },
    Action {
        room: String,
        #[serde(flatten)]
        action: Action,
    },
    Chat {
        room: String,
        #[serde(default)]
        msg: serde_json::Value,
    },
}

impl ClientMessage {
    pub fn room(&self) -> &str {
        match self {
            ClientMessage::Join { room }
            | ClientMessage::Action { room, .. }
            | ClientMessage::Chat { room, .. } => room,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "WELCOME")]
    Welcome { role: Role },
    #[serde(rename = "STATE_UPDATE")]
    StateUpdate(StateSnapshot),
    #[serde(rename = "ERROR")]
    Error { msg: String },
    #[serde(rename = "chat")]
    Chat { msg: serde_json::Value, role: Role },
}

impl ServerMessage {
    pub fn to_payload(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Per-player values keyed by player number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PerPlayer<T> {
    #[serde(rename = "1")]
    pub one: T,
    #[serde(rename = "2")]
    pub two: T,
}

impl<T> PerPlayer<T> {
    fn from_fn(mut f: impl FnMut(Player) -> T) -> Self {
        Self { one: f(Player::One), two: f(Player::Two) }
    }
}

/// Full authoritative state, broadcast after every accepted action.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub board: Board,
    pub scores: PerPlayer<u32>,
    pub nuke_counts: PerPlayer<u32>,
    pub booster_counts: PerPlayer<u32>,
    pub bunker_counts: PerPlayer<u32>,
    pub current_player: Player,
    pub bonus_turn_active: bool,
    pub active: bool,
    pub winner: Option<Player>,
}

impl StateSnapshot {
    pub fn of(state: &GameState) -> Self {
        Self {
            board: state.board.clone(),
            scores: PerPlayer::from_fn(|p| state.resources(p).score),
            nuke_counts: PerPlayer::from_fn(|p| state.resources(p).nuke_count),
            booster_counts: PerPlayer::from_fn(|p| state.resources(p).booster_count),
            bunker_counts: PerPlayer::from_fn(|p| state.resources(p).bunker_count),
            current_player: state.turn.current_player,
            bonus_turn_active: state.turn.bonus_turn_active,
            active: state.status.active,
            winner: state.status.winner,
        }
    }
}
