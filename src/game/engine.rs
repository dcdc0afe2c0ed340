//! Rule engine: line scoring, pattern claiming and blast resolution.
//!
//! These functions only touch the board and the pattern registry; resource
//! and turn bookkeeping lives in [`super::session`].

use super::board::{Board, Cell, Coord, Decoration, Player, BOARD_SIZE};
use super::patterns::{PatternId, PatternRegistry};

/// Cells in a scoring line.
pub const LINE_LENGTH: usize = 5;

// horizontal, vertical, down-right, down-left
const LINE_DIRECTIONS: [(i64, i64); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

fn line_from(origin: Coord, dr: i64, dc: i64) -> Option<[Coord; LINE_LENGTH]> {
    let mut line = [origin; LINE_LENGTH];
    for (i, slot) in line.iter_mut().enumerate() {
        let step = i as i64;
        *slot = origin.offset(dr * step, dc * step)?;
    }
    Some(line)
}

fn line_qualifies(board: &Board, line: &[Coord; LINE_LENGTH], player: Player) -> bool {
    let mut fresh = false;
    for at in line {
        match board.get(*at) {
            Cell::Owned { owner, scored, .. } if owner == player => fresh |= !scored,
            _ => return false,
        }
    }
    fresh
}

/// Scans the whole board for five-in-a-row runs owned by `player` that still
/// contain an unscored cell. Each qualifying run is marked scored as soon as it
/// is found, so later overlapping runs only qualify through their own fresh
/// cells. Stops after `budget` runs. Returns the number of runs scored.
pub fn score_lines(board: &mut Board, player: Player, budget: u32) -> u32 {
    let mut count = 0;
    for row in 0..BOARD_SIZE {
        for col in 0..BOARD_SIZE {
            for (dr, dc) in LINE_DIRECTIONS {
                if count >= budget {
                    return count;
                }
                let Some(line) = line_from(Coord::new(row, col), dr, dc) else { continue };
                if !line_qualifies(board, &line, player) {
                    continue;
                }
                for at in line {
                    if let Cell::Owned { scored, .. } = board.get_mut(at) {
                        *scored = true;
                    }
                }
                count += 1;
            }
        }
    }
    count
}

fn square_at(origin: Coord) -> Option<[Coord; 4]> {
    Some([origin, origin.offset(0, 1)?, origin.offset(1, 0)?, origin.offset(1, 1)?])
}

/// Claims every not-yet-registered 2×2 square of `player` containing `at`.
pub fn claim_squares(board: &Board, registry: &mut PatternRegistry, player: Player, at: Coord) -> usize {
    let mut claimed = 0;
    for (dr, dc) in [(-1, -1), (-1, 0), (0, -1), (0, 0)] {
        let Some(cells) = at.offset(dr, dc).and_then(square_at) else { continue };
        if cells.iter().all(|c| board.get(*c).owned_by(player)) && registry.claim(PatternId::square(cells)) {
            claimed += 1;
        }
    }
    claimed
}

fn plus_arms(center: Coord) -> Option<[Coord; 4]> {
    Some([
        center.offset(-1, 0)?,
        center.offset(1, 0)?,
        center.offset(0, -1)?,
        center.offset(0, 1)?,
    ])
}

/// Claims plus shapes of `player` centered on `at` or one of its orthogonal
/// neighbours. Each newly claimed plus promotes its five cells to bunkers,
/// keeping their scored flag.
pub fn claim_pluses(board: &mut Board, registry: &mut PatternRegistry, player: Player, at: Coord) -> usize {
    let mut claimed = 0;
    let centers: Vec<Coord> = std::iter::once(at).chain(at.neighbours()).collect();
    for center in centers {
        let Some(arms) = plus_arms(center) else { continue };
        let shape = std::iter::once(center).chain(arms);
        if !shape.clone().all(|c| board.get(c).owned_by(player)) {
            continue;
        }
        if !registry.claim(PatternId::plus(center)) {
            continue;
        }
        for cell in shape {
            if let Cell::Owned { decoration, .. } = board.get_mut(cell) {
                *decoration = Decoration::Bunker;
            }
        }
        claimed += 1;
    }
    claimed
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BlastReport {
    pub cratered: usize,
    pub bunkers_survived: usize,
    /// Destroyed bunkers per owner, indexed by player.
    pub bunkers_destroyed: [u32; 2],
}

impl BlastReport {
    pub fn bunkers_destroyed_for(&self, player: Player) -> u32 {
        self.bunkers_destroyed[player.index()]
    }
}

/// Turns every cell within `1 + boost_level` of `center` into a crater.
/// Bunkers only fall to boosted blasts.
pub fn detonate(board: &mut Board, center: Coord, boost_level: u32) -> BlastReport {
    let radius = 1 + boost_level as usize;
    let mut report = BlastReport::default();
    for at in Board::blast_area(center, radius) {
        match board.get(at) {
            Cell::Owned { decoration: Decoration::Bunker, .. } if boost_level == 0 => {
                report.bunkers_survived += 1;
            }
            cell => {
                if let Cell::Owned { owner, decoration: Decoration::Bunker, .. } = cell {
                    report.bunkers_destroyed[owner.index()] += 1;
                }
                board.set(at, Cell::Crater);
                report.cratered += 1;
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mark(board: &mut Board, player: Player, cells: &[(usize, usize)]) {
        for &(r, c) in cells {
            board.set(
                Coord::new(r, c),
                Cell::Owned { owner: player, decoration: Decoration::Plain, scored: false },
            );
        }
    }

    fn is_scored(board: &Board, r: usize, c: usize) -> bool {
        matches!(board.get(Coord::new(r, c)), Cell::Owned { scored: true, .. })
    }

    #[test]
    fn scores_each_direction() {
        let mut board = Board::new();
        mark(&mut board, Player::One, &[(0, 0), (1, 0), (2, 0), (3, 0), (4, 0)]);
        assert_eq!(score_lines(&mut board, Player::One, u32::MAX), 1);

        let mut board = Board::new();
        mark(&mut board, Player::One, &[(0, 4), (1, 3), (2, 2), (3, 1), (4, 0)]);
        assert_eq!(score_lines(&mut board, Player::One, u32::MAX), 1);
        assert!(is_scored(&board, 2, 2));

        let mut board = Board::new();
        mark(&mut board, Player::Two, &[(10, 10), (11, 11), (12, 12), (13, 13), (14, 14)]);
        assert_eq!(score_lines(&mut board, Player::Two, u32::MAX), 1);
        assert_eq!(score_lines(&mut board, Player::One, u32::MAX), 0);
    }

    #[test]
    fn scored_line_is_not_rescored() {
        let mut board = Board::new();
        mark(&mut board, Player::One, &[(5, 0), (5, 1), (5, 2), (5, 3), (5, 4)]);
        assert_eq!(score_lines(&mut board, Player::One, u32::MAX), 1);
        assert_eq!(score_lines(&mut board, Player::One, u32::MAX), 0);
    }

    #[test]
    fn extending_a_scored_line_scores_again() {
        let mut board = Board::new();
        mark(&mut board, Player::One, &[(5, 0), (5, 1), (5, 2), (5, 3), (5, 4)]);
        score_lines(&mut board, Player::One, u32::MAX);
        mark(&mut board, Player::One, &[(5, 5)]);
        assert_eq!(score_lines(&mut board, Player::One, u32::MAX), 1);
        assert!(is_scored(&board, 5, 5));
    }

    #[test]
    fn four_in_a_row_or_mixed_owners_do_not_score() {
        let mut board = Board::new();
        mark(&mut board, Player::One, &[(0, 0), (0, 1), (0, 2), (0, 3)]);
        mark(&mut board, Player::Two, &[(0, 4)]);
        assert_eq!(score_lines(&mut board, Player::One, u32::MAX), 0);
        assert!(!is_scored(&board, 0, 0));
    }

    #[test]
    fn budget_caps_scoring() {
        let mut board = Board::new();
        mark(&mut board, Player::One, &[(0, 0), (0, 1), (0, 2), (0, 3), (0, 4)]);
        mark(&mut board, Player::One, &[(2, 0), (2, 1), (2, 2), (2, 3), (2, 4)]);
        assert_eq!(score_lines(&mut board, Player::One, 1), 1);
        assert!(!is_scored(&board, 2, 0));
    }

    #[test]
    fn square_claimed_once() {
        let mut board = Board::new();
        let mut reg = PatternRegistry::new();
        mark(&mut board, Player::One, &[(3, 3), (3, 4), (4, 3), (4, 4)]);
        assert_eq!(claim_squares(&board, &mut reg, Player::One, Coord::new(4, 4)), 1);
        assert_eq!(claim_squares(&board, &mut reg, Player::One, Coord::new(3, 3)), 0);
        mark(&mut board, Player::One, &[(3, 5), (4, 5)]);
        assert_eq!(claim_squares(&board, &mut reg, Player::One, Coord::new(4, 5)), 1);
    }

    #[test]
    fn square_at_board_edge() {
        let mut board = Board::new();
        let mut reg = PatternRegistry::new();
        mark(&mut board, Player::Two, &[(13, 13), (13, 14), (14, 13), (14, 14)]);
        assert_eq!(claim_squares(&board, &mut reg, Player::Two, Coord::new(14, 14)), 1);
    }

    #[test]
    fn plus_promotes_to_bunkers_and_keeps_scored() {
        let mut board = Board::new();
        let mut reg = PatternRegistry::new();
        mark(&mut board, Player::One, &[(5, 5), (4, 5), (6, 5), (5, 4), (5, 6)]);
        if let Cell::Owned { scored, .. } = board.get_mut(Coord::new(4, 5)) {
            *scored = true;
        }
        assert_eq!(claim_pluses(&mut board, &mut reg, Player::One, Coord::new(5, 6)), 1);
        for (r, c) in [(5, 5), (4, 5), (6, 5), (5, 4), (5, 6)] {
            assert!(matches!(
                board.get(Coord::new(r, c)),
                Cell::Owned { decoration: Decoration::Bunker, .. }
            ));
        }
        assert!(is_scored(&board, 4, 5));
        assert!(!is_scored(&board, 5, 5));
        assert_eq!(claim_pluses(&mut board, &mut reg, Player::One, Coord::new(5, 5)), 0);
    }

    #[test]
    fn plus_on_edge_never_qualifies() {
        let mut board = Board::new();
        let mut reg = PatternRegistry::new();
        mark(&mut board, Player::One, &[(0, 5), (1, 5), (0, 4), (0, 6)]);
        assert_eq!(claim_pluses(&mut board, &mut reg, Player::One, Coord::new(0, 5)), 0);
    }

    #[test]
    fn unboosted_blast_spares_bunkers() {
        let mut board = Board::new();
        mark(&mut board, Player::Two, &[(7, 8)]);
        board.set(
            Coord::new(7, 7),
            Cell::Owned { owner: Player::One, decoration: Decoration::Bunker, scored: false },
        );
        let report = detonate(&mut board, Coord::new(7, 7), 0);
        assert_eq!(report.bunkers_survived, 1);
        assert_eq!(report.cratered, 4);
        assert_eq!(board.get(Coord::new(7, 8)), Cell::Crater);
        assert!(board.get(Coord::new(7, 7)).owned_by(Player::One));
    }

    #[test]
    fn boosted_blast_destroys_bunkers() {
        let mut board = Board::new();
        board.set(
            Coord::new(7, 7),
            Cell::Owned { owner: Player::One, decoration: Decoration::Bunker, scored: true },
        );
        board.set(
            Coord::new(9, 7),
            Cell::Owned { owner: Player::Two, decoration: Decoration::Bunker, scored: false },
        );
        let report = detonate(&mut board, Coord::new(7, 7), 1);
        assert_eq!(report.cratered, 13);
        assert_eq!(report.bunkers_destroyed_for(Player::One), 1);
        assert_eq!(report.bunkers_destroyed_for(Player::Two), 1);
        assert_eq!(board.get(Coord::new(9, 7)), Cell::Crater);
        assert_eq!(board.get(Coord::new(10, 7)), Cell::Empty);
    }
}
