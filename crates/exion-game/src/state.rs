//! Shared board-state snapshot for grid games with from/to moves.

use serde::{Deserialize, Serialize};

/// Player identifier. Players are numbered from zero.
pub type Player = u8;

/// A board coordinate. Signed so that feature-pattern offsets can be added
/// without intermediate casts; legal board cells are always non-negative.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Coord {
    pub x: i8,
    pub y: i8,
}

impl Coord {
    #[must_use]
    pub const fn new(x: i8, y: i8) -> Self {
        Self { x, y }
    }

    /// Returns this coordinate shifted by the given offset.
    #[must_use]
    pub const fn offset(self, dx: i8, dy: i8) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// One decision-defining action: a piece of `mover` travels `from` → `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridMove {
    pub from: Coord,
    pub to: Coord,
    pub mover: Player,
}

impl GridMove {
    #[must_use]
    pub const fn new(from: Coord, to: Coord, mover: Player) -> Self {
        Self { from, to, mover }
    }
}

/// Outcome of a finished game from one player's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum Outcome {
    Win,
    Loss,
    Draw,
    /// The game has not terminated yet.
    Ongoing,
}

impl Outcome {
    /// Scalar training value: win = 1, loss = -1, draw = 0.
    ///
    /// # Panics
    ///
    /// Panics if the game is still ongoing.
    #[must_use]
    pub fn value(self) -> f32 {
        match self {
            Outcome::Win => 1.0,
            Outcome::Loss => -1.0,
            Outcome::Draw => 0.0,
            Outcome::Ongoing => panic!("outcome requested for an unfinished game"),
        }
    }
}

/// Snapshot of a grid-game position.
///
/// Cells hold the owning player or nothing. The snapshot also carries the
/// last decision-defining move, because reactive spatial features condition
/// on the previous decision's from/to cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardState {
    width: u8,
    height: u8,
    cells: Vec<Option<Player>>,
    mover: Player,
    ply: u32,
    last_move: Option<GridMove>,
}

impl BoardState {
    /// Creates an empty board with the given dimensions, player 0 to move.
    #[must_use]
    pub fn empty(width: u8, height: u8) -> Self {
        Self {
            width,
            height,
            cells: vec![None; usize::from(width) * usize::from(height)],
            mover: 0,
            ply: 0,
            last_move: None,
        }
    }

    #[must_use]
    pub fn width(&self) -> u8 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u8 {
        self.height
    }

    /// Whether the coordinate lies on the board.
    #[must_use]
    pub fn contains(&self, coord: Coord) -> bool {
        coord.x >= 0
            && coord.y >= 0
            && coord.x < self.width as i8
            && coord.y < self.height as i8
    }

    /// The piece at `coord`, or `None` for an empty cell.
    ///
    /// # Panics
    ///
    /// Panics if the coordinate is off the board.
    #[must_use]
    pub fn piece_at(&self, coord: Coord) -> Option<Player> {
        assert!(self.contains(coord), "coordinate off the board: {coord:?}");
        self.cells[self.cell_index(coord)]
    }

    pub fn set_piece(&mut self, coord: Coord, piece: Option<Player>) {
        assert!(self.contains(coord), "coordinate off the board: {coord:?}");
        let index = self.cell_index(coord);
        self.cells[index] = piece;
    }

    /// The player whose decision defines the current state.
    #[must_use]
    pub fn mover(&self) -> Player {
        self.mover
    }

    pub fn set_mover(&mut self, mover: Player) {
        self.mover = mover;
    }

    /// Number of decisions applied since the initial state.
    #[must_use]
    pub fn ply(&self) -> u32 {
        self.ply
    }

    /// The last decision-defining move, if any decision has been made.
    #[must_use]
    pub fn last_move(&self) -> Option<GridMove> {
        self.last_move
    }

    /// Records one applied decision: advances the ply counter and stores the
    /// move for reactive feature matching. Rules implementations call this
    /// at the end of `apply`.
    pub fn record_move(&mut self, mv: GridMove) {
        self.ply += 1;
        self.last_move = Some(mv);
    }

    /// Iterates over all occupied cells as `(coord, player)` pairs.
    pub fn pieces(&self) -> impl Iterator<Item = (Coord, Player)> + '_ {
        self.cells.iter().enumerate().filter_map(|(i, cell)| {
            cell.map(|player| {
                #[expect(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
                let coord = Coord::new(
                    (i % usize::from(self.width)) as i8,
                    (i / usize::from(self.width)) as i8,
                );
                (coord, player)
            })
        })
    }

    /// Number of pieces the given player has on the board.
    #[must_use]
    pub fn piece_count(&self, player: Player) -> usize {
        self.cells.iter().filter(|cell| **cell == Some(player)).count()
    }

    fn cell_index(&self, coord: Coord) -> usize {
        #[expect(clippy::cast_sign_loss)]
        let (x, y) = (coord.x as usize, coord.y as usize);
        y * usize::from(self.width) + x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_board_has_no_pieces() {
        let state = BoardState::empty(6, 6);
        assert_eq!(state.pieces().count(), 0);
        assert_eq!(state.mover(), 0);
        assert_eq!(state.ply(), 0);
        assert!(state.last_move().is_none());
    }

    #[test]
    fn set_and_get_piece() {
        let mut state = BoardState::empty(4, 4);
        let coord = Coord::new(2, 3);
        state.set_piece(coord, Some(1));
        assert_eq!(state.piece_at(coord), Some(1));
        assert_eq!(state.piece_count(1), 1);
        assert_eq!(state.piece_count(0), 0);
    }

    #[test]
    fn contains_rejects_off_board() {
        let state = BoardState::empty(4, 4);
        assert!(state.contains(Coord::new(0, 0)));
        assert!(state.contains(Coord::new(3, 3)));
        assert!(!state.contains(Coord::new(-1, 0)));
        assert!(!state.contains(Coord::new(4, 0)));
    }

    #[test]
    fn record_move_updates_ply_and_last_move() {
        let mut state = BoardState::empty(4, 4);
        let mv = GridMove::new(Coord::new(0, 0), Coord::new(0, 1), 0);
        state.record_move(mv);
        assert_eq!(state.ply(), 1);
        assert_eq!(state.last_move(), Some(mv));
    }

    #[test]
    fn state_round_trips_through_json() {
        let mut state = BoardState::empty(3, 3);
        state.set_piece(Coord::new(1, 1), Some(0));
        state.record_move(GridMove::new(Coord::new(1, 0), Coord::new(1, 1), 0));
        let json = serde_json::to_string(&state).unwrap();
        let restored: BoardState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, state);
    }
}
