//! One game: board, resources, turn state and the action state machine.

use serde::{Deserialize, Serialize};

use super::board::{Board, Cell, Coord, Decoration, Player};
use super::engine::{self, BlastReport};
use super::error::ActionError;
use super::patterns::PatternRegistry;

pub const DEFAULT_WINNING_SCORE: u32 = 5;
/// Boosters exchanged for one nuke when crafting.
pub const CRAFT_COST: u32 = 3;
/// Bunker cells credited for each new plus shape.
pub const PLUS_BUNKER_GRANT: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rules {
    pub winning_score: u32,
}

impl Default for Rules {
    fn default() -> Self { Self { winning_score: DEFAULT_WINNING_SCORE } }
}

/// A client intent against the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "UPPERCASE")]
pub enum Action {
    Place { r: i64, c: i64 },
    Nuke {
        r: i64,
        c: i64,
        #[serde(default, rename = "boostLevel")]
        boost_level: u32,
    },
    Craft,
    Reset,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Place { .. } => "PLACE",
            Action::Nuke { .. } => "NUKE",
            Action::Craft => "CRAFT",
            Action::Reset => "RESET",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlayerResources {
    pub score: u32,
    pub nuke_count: u32,
    pub booster_count: u32,
    pub bunker_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnState {
    pub current_player: Player,
    pub bonus_turn_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameStatus {
    pub active: bool,
    pub winner: Option<Player>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    pub board: Board,
    resources: [PlayerResources; 2],
    pub turn: TurnState,
    pub status: GameStatus,
    pub patterns: PatternRegistry,
}

impl Default for GameState {
    fn default() -> Self { Self::new() }
}

/// What an accepted action did; used for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Placed {
        at: Coord,
        lines: u32,
        squares: usize,
        pluses: usize,
        winner: Option<Player>,
    },
    Nuked {
        at: Coord,
        boost_level: u32,
        blast: BlastReport,
    },
    Crafted,
    Reset,
}

impl GameState {
    pub fn new() -> Self {
        Self {
            board: Board::new(),
            resources: [PlayerResources::default(); 2],
            turn: TurnState { current_player: Player::One, bonus_turn_active: false },
            status: GameStatus { active: true, winner: None },
            patterns: PatternRegistry::new(),
        }
    }

    pub fn resources(&self, player: Player) -> &PlayerResources {
        &self.resources[player.index()]
    }

    fn resources_mut(&mut self, player: Player) -> &mut PlayerResources {
        &mut self.resources[player.index()]
    }

    fn end_turn(&mut self, player: Player, bonus: bool) {
        self.turn = if bonus {
            TurnState { current_player: player, bonus_turn_active: true }
        } else {
            TurnState { current_player: player.opponent(), bonus_turn_active: false }
        };
    }

    fn place(&mut self, rules: &Rules, player: Player, row: i64, col: i64) -> Result<Outcome, ActionError> {
        let at = Coord::checked(row, col).ok_or(ActionError::OutOfBounds { row, col })?;
        if !self.board.get(at).is_open() {
            return Err(ActionError::Occupied(at));
        }
        self.board.set(at, Cell::Owned { owner: player, decoration: Decoration::Plain, scored: false });

        let budget = rules.winning_score.saturating_sub(self.resources(player).score);
        let lines = engine::score_lines(&mut self.board, player, budget);
        let res = &mut self.resources[player.index()];
        res.score += lines;
        res.nuke_count += lines;

        let (mut squares, mut pluses) = (0, 0);
        let mut winner = None;
        if res.score >= rules.winning_score {
            self.status = GameStatus { active: false, winner: Some(player) };
            winner = Some(player);
        } else {
            squares = engine::claim_squares(&self.board, &mut self.patterns, player, at);
            pluses = engine::claim_pluses(&mut self.board, &mut self.patterns, player, at);
            let grants = pluses as u32;
            let res = self.resources_mut(player);
            res.bunker_count += PLUS_BUNKER_GRANT * grants;
            res.booster_count += grants;
        }

        self.end_turn(player, squares > 0);
        Ok(Outcome::Placed { at, lines, squares, pluses, winner })
    }

    fn nuke(&mut self, player: Player, row: i64, col: i64, boost_level: u32) -> Result<Outcome, ActionError> {
        let res = *self.resources(player);
        if res.nuke_count == 0 {
            return Err(ActionError::NoNukes);
        }
        if boost_level > res.booster_count {
            return Err(ActionError::InsufficientBoosters { requested: boost_level, available: res.booster_count });
        }
        let at = Coord::checked(row, col).ok_or(ActionError::OutOfBounds { row, col })?;
        if boost_level == 0 && !self.board.get(at).owned_by(player) {
            return Err(ActionError::SelfTargetRequired);
        }

        let res = self.resources_mut(player);
        res.nuke_count -= 1;
        res.booster_count -= boost_level;

        let blast = engine::detonate(&mut self.board, at, boost_level);
        for p in Player::ALL {
            let res = self.resources_mut(p);
            res.bunker_count = res.bunker_count.saturating_sub(blast.bunkers_destroyed_for(p));
        }

        self.end_turn(player, false);
        Ok(Outcome::Nuked { at, boost_level, blast })
    }

    fn craft(&mut self, player: Player) -> Result<Outcome, ActionError> {
        let res = self.resources_mut(player);
        if res.booster_count < CRAFT_COST {
            return Err(ActionError::CraftRequiresBoosters { needed: CRAFT_COST, available: res.booster_count });
        }
        res.booster_count -= CRAFT_COST;
        res.nuke_count += 1;
        Ok(Outcome::Crafted)
    }
}

/// Authoritative game for a single room.
#[derive(Debug, Clone)]
pub struct GameSession {
    rules: Rules,
    state: GameState,
    #[cfg(test)]
    fail_next: bool,
}

impl GameSession {
    pub fn new(rules: Rules) -> Self {
        Self {
            rules,
            state: GameState::new(),
            #[cfg(test)]
            fail_next: false,
        }
    }

    /// Makes the next action that passes validation panic before it commits.
    #[cfg(test)]
    pub(crate) fn fail_next_action(&mut self) {
        self.fail_next = true;
    }

    pub fn state(&self) -> &GameState { &self.state }

    /// Validates and applies `action` on behalf of `player`.
    ///
    /// The action runs against a copy of the state which replaces the live
    /// state only once it completed, so a rejection or a failure halfway
    /// through never leaves a partially mutated board behind.
    ///
    /// RESET is accepted from either player at any time. Everything else
    /// requires an active game and `player` to hold the turn; a bonus turn
    /// keeps the turn with the same player. CRAFT leaves the turn untouched,
    /// so a player may craft repeatedly before moving.
    pub fn handle_action(&mut self, player: Player, action: Action) -> Result<Outcome, ActionError> {
        if !matches!(action, Action::Reset) {
            if !self.state.status.active {
                return Err(ActionError::GameOver);
            }
            if player != self.state.turn.current_player {
                return Err(ActionError::NotYourTurn);
            }
        }

        let mut next = self.state.clone();
        let outcome = match action {
            Action::Place { r, c } => next.place(&self.rules, player, r, c)?,
            Action::Nuke { r, c, boost_level } => next.nuke(player, r, c, boost_level)?,
            Action::Craft => next.craft(player)?,
            Action::Reset => {
                next = GameState::new();
                Outcome::Reset
            }
        };
        #[cfg(test)]
        if std::mem::take(&mut self.fail_next) {
            panic!("injected failure during {}", action.name());
        }
        self.state = next;
        Ok(outcome)
    }
}
