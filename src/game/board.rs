//! Board model: players, cells and the fixed-size grid.

use serde::{Deserialize, Serialize};

/// Side length of the square board.
pub const BOARD_SIZE: usize = 15;

/// One of the two seated players. Serialized as `1` or `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Player {
    One,
    Two,
}

impl Player {
    pub const ALL: [Player; 2] = [Player::One, Player::Two];

    pub fn opponent(self) -> Player {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Player::One => 1,
            Player::Two => 2,
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Player::One => 0,
            Player::Two => 1,
        }
    }
}

impl From<Player> for u8 {
    fn from(p: Player) -> u8 { p.number() }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid player number {0}")]
pub struct InvalidPlayer(pub u8);

impl TryFrom<u8> for Player {
    type Error = InvalidPlayer;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        match n {
            1 => Ok(Player::One),
            2 => Ok(Player::Two),
            other => Err(InvalidPlayer(other)),
        }
    }
}

impl std::fmt::Display for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.number())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decoration {
    Plain,
    /// Survives unboosted nukes.
    Bunker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Cell {
    #[default]
    Empty,
    Owned { owner: Player, decoration: Decoration, scored: bool },
    Crater,
}

impl Cell {
    pub fn owned_by(&self, player: Player) -> bool {
        matches!(self, Cell::Owned { owner, .. } if *owner == player)
    }

    /// Empty cells and craters accept a new mark.
    pub fn is_open(&self) -> bool {
        matches!(self, Cell::Empty | Cell::Crater)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Coord {
    pub row: usize,
    pub col: usize,
}

impl Coord {
    pub const fn new(row: usize, col: usize) -> Self { Self { row, col } }

    /// Validates raw client coordinates against the board bounds.
    pub fn checked(row: i64, col: i64) -> Option<Coord> {
        let size = BOARD_SIZE as i64;
        if (0..size).contains(&row) && (0..size).contains(&col) {
            Some(Coord::new(row as usize, col as usize))
        } else {
            None
        }
    }

    /// Offset by a signed delta, `None` when the result leaves the board.
    pub fn offset(self, dr: i64, dc: i64) -> Option<Coord> {
        Coord::checked(self.row as i64 + dr, self.col as i64 + dc)
    }

    pub fn manhattan(self, other: Coord) -> usize {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }

    /// The four orthogonal neighbours that lie on the board.
    pub fn neighbours(self) -> impl Iterator<Item = Coord> {
        [(-1, 0), (1, 0), (0, -1), (0, 1)]
            .into_iter()
            .filter_map(move |(dr, dc)| self.offset(dr, dc))
    }
}

impl std::fmt::Display for Coord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// The N×N grid, owned by exactly one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Board {
    cells: [[Cell; BOARD_SIZE]; BOARD_SIZE],
}

impl Default for Board {
    fn default() -> Self { Self::new() }
}

impl Board {
    pub fn new() -> Self {
        Self { cells: [[Cell::Empty; BOARD_SIZE]; BOARD_SIZE] }
    }

    pub fn get(&self, at: Coord) -> Cell {
        self.cells[at.row][at.col]
    }

    pub fn set(&mut self, at: Coord, cell: Cell) {
        self.cells[at.row][at.col] = cell;
    }

    pub fn get_mut(&mut self, at: Coord) -> &mut Cell {
        &mut self.cells[at.row][at.col]
    }

    /// Every in-bounds cell within Manhattan distance `radius` of `center`.
    pub fn blast_area(center: Coord, radius: usize) -> impl Iterator<Item = Coord> {
        let r0 = center.row.saturating_sub(radius);
        let r1 = (center.row + radius).min(BOARD_SIZE - 1);
        let c0 = center.col.saturating_sub(radius);
        let c1 = (center.col + radius).min(BOARD_SIZE - 1);
        (r0..=r1)
            .flat_map(move |row| (c0..=c1).map(move |col| Coord::new(row, col)))
            .filter(move |c| c.manhattan(center) <= radius)
    }
}
