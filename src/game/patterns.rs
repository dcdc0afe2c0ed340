//! Registry of spatial patterns that have already paid out.

use std::collections::HashSet;

use super::board::Coord;

/// Canonical identifier of a rewarded shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternId {
    /// 2×2 square, cells sorted row-major.
    Square([Coord; 4]),
    /// Plus shape, identified by its center.
    Plus(Coord),
}

impl PatternId {
    pub fn square(mut cells: [Coord; 4]) -> Self {
        cells.sort_unstable();
        PatternId::Square(cells)
    }

    pub fn plus(center: Coord) -> Self { PatternId::Plus(center) }
}

/// Grows monotonically; a reset replaces the whole registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternRegistry {
    claimed: HashSet<PatternId>,
}

impl PatternRegistry {
    pub fn new() -> Self { Self::default() }

    /// Records `id`; returns `true` only the first time it is seen.
    pub fn claim(&mut self, id: PatternId) -> bool {
        self.claimed.insert(id)
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, id: &PatternId) -> bool {
        self.claimed.contains(id)
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool { self.claimed.is_empty() }
}
