use super::board::Coord;

/// Why an action was refused. The message is what the actor sees.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("Game is over")]
    GameOver,
    #[error("Not your turn")]
    NotYourTurn,
    #[error("Target ({row}, {col}) is off the board")]
    OutOfBounds { row: i64, col: i64 },
    #[error("Cell {0} is already taken")]
    Occupied(Coord),
    #[error("No nukes left")]
    NoNukes,
    #[error("Boost level {requested} exceeds available boosters ({available})")]
    InsufficientBoosters { requested: u32, available: u32 },
    #[error("Unboosted nukes must target your own cell")]
    SelfTargetRequired,
    #[error("Crafting needs {needed} boosters, you have {available}")]
    CraftRequiresBoosters { needed: u32, available: u32 },
}
