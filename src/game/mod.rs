//! Authoritative rules for the grid-conquest game.

pub mod board;
pub mod engine;
pub mod error;
pub mod patterns;
pub mod session;

pub use board::{Board, Cell, Coord, Decoration, Player, BOARD_SIZE};
pub use error::ActionError;
pub use patterns::{PatternId, PatternRegistry};
pub use session::{Action, GameSession, GameState, Outcome, PlayerResources, Rules};
