//! Breakthrough: the bundled rules engine used by self-play runs and tests.
//!
//! Two players face each other across a rectangular board, each starting
//! with two ranks of pawns. Pawns move one cell straight or diagonally
//! forward into an empty cell and capture diagonally forward only. A player
//! wins by landing a pawn on the opponent's back rank or by capturing every
//! opposing pawn. There are no draws: material can only decrease and a pawn
//! always has a forward move until it is captured or the game ends, except
//! in fully blocked positions, which count as a loss for the player unable
//! to move.

use crate::{
    rules::GameRules,
    state::{BoardState, Coord, GridMove, Outcome, Player},
};

const PLAYER_COUNT: Player = 2;

/// Breakthrough rules on a `width` × `height` board.
#[derive(Debug, Clone)]
pub struct Breakthrough {
    width: u8,
    height: u8,
}

impl Breakthrough {
    /// Standard 6×6 board with two pawn ranks per side.
    #[must_use]
    pub fn new() -> Self {
        Self::with_size(6, 6)
    }

    /// Custom board size. Height must leave at least one empty rank between
    /// the two starting formations.
    #[must_use]
    pub fn with_size(width: u8, height: u8) -> Self {
        assert!(width >= 2 && height >= 5, "board too small for two pawn ranks");
        Self { width, height }
    }

    /// Forward direction for a player: player 0 advances toward increasing
    /// `y`, player 1 toward decreasing `y`.
    fn forward(player: Player) -> i8 {
        if player == 0 { 1 } else { -1 }
    }

    /// The rank a player must reach to win.
    fn goal_rank(&self, player: Player) -> i8 {
        if player == 0 { self.height as i8 - 1 } else { 0 }
    }

    fn reached_goal(&self, state: &BoardState, player: Player) -> bool {
        let y = self.goal_rank(player);
        (0..self.width as i8).any(|x| state.piece_at(Coord::new(x, y)) == Some(player))
    }

    fn winner(&self, state: &BoardState) -> Option<Player> {
        for player in 0..PLAYER_COUNT {
            if self.reached_goal(state, player) {
                return Some(player);
            }
            if state.piece_count(1 - player) == 0 {
                return Some(player);
            }
        }
        // A mover with no legal moves loses; checked last because it is the
        // expensive test.
        if self.moves_for(state, state.mover()).is_empty() {
            return Some(1 - state.mover());
        }
        None
    }

    fn moves_for(&self, state: &BoardState, player: Player) -> Vec<GridMove> {
        let dy = Self::forward(player);
        let mut moves = Vec::new();
        for (from, owner) in state.pieces() {
            if owner != player {
                continue;
            }
            for dx in [-1i8, 0, 1] {
                let to = from.offset(dx, dy);
                if !state.contains(to) {
                    continue;
                }
                let target = state.piece_at(to);
                let legal = if dx == 0 {
                    // straight ahead never captures
                    target.is_none()
                } else {
                    // diagonal: empty or capture
                    target != Some(player)
                };
                if legal {
                    moves.push(GridMove::new(from, to, player));
                }
            }
        }
        moves
    }
}

impl Default for Breakthrough {
    fn default() -> Self {
        Self::new()
    }
}

impl GameRules for Breakthrough {
    fn name(&self) -> &str {
        "breakthrough"
    }

    fn player_count(&self) -> Player {
        PLAYER_COUNT
    }

    fn initial_state(&self) -> BoardState {
        let mut state = BoardState::empty(self.width, self.height);
        for x in 0..self.width as i8 {
            state.set_piece(Coord::new(x, 0), Some(0));
            state.set_piece(Coord::new(x, 1), Some(0));
            state.set_piece(Coord::new(x, self.height as i8 - 1), Some(1));
            state.set_piece(Coord::new(x, self.height as i8 - 2), Some(1));
        }
        state
    }

    fn legal_moves(&self, state: &BoardState) -> Vec<GridMove> {
        if self.is_terminal(state) {
            return Vec::new();
        }
        self.moves_for(state, state.mover())
    }

    fn apply(&self, state: &mut BoardState, mv: GridMove) {
        debug_assert_eq!(mv.mover, state.mover());
        state.set_piece(mv.from, None);
        state.set_piece(mv.to, Some(mv.mover));
        state.set_mover(1 - mv.mover);
        state.record_move(mv);
    }

    fn is_terminal(&self, state: &BoardState) -> bool {
        self.winner(state).is_some()
    }

    fn outcome(&self, state: &BoardState, player: Player) -> Outcome {
        match self.winner(state) {
            Some(winner) if winner == player => Outcome::Win,
            Some(_) => Outcome::Loss,
            None => Outcome::Ongoing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_has_two_ranks_per_player() {
        let rules = Breakthrough::new();
        let state = rules.initial_state();
        assert_eq!(state.piece_count(0), 12);
        assert_eq!(state.piece_count(1), 12);
        assert!(!rules.is_terminal(&state));
    }

    #[test]
    fn opening_moves_advance_front_rank() {
        let rules = Breakthrough::new();
        let state = rules.initial_state();
        let moves = rules.legal_moves(&state);
        // Six pawns on rank 1; edge pawns have 2 forward cells, inner 3.
        assert_eq!(moves.len(), 2 + 3 * 4 + 2);
        assert!(moves.iter().all(|mv| mv.mover == 0));
        assert!(moves.iter().all(|mv| mv.to.y == 2));
    }

    #[test]
    fn straight_move_cannot_capture() {
        let rules = Breakthrough::with_size(4, 6);
        let mut state = BoardState::empty(4, 6);
        state.set_piece(Coord::new(1, 2), Some(0));
        state.set_piece(Coord::new(1, 3), Some(1));
        state.set_piece(Coord::new(3, 0), Some(0));
        state.set_piece(Coord::new(3, 5), Some(1));
        let moves = rules.moves_for(&state, 0);
        assert!(!moves.contains(&GridMove::new(Coord::new(1, 2), Coord::new(1, 3), 0)));
        assert!(moves.contains(&GridMove::new(Coord::new(1, 2), Coord::new(0, 3), 0)));
        assert!(moves.contains(&GridMove::new(Coord::new(1, 2), Coord::new(2, 3), 0)));
    }

    #[test]
    fn diagonal_capture_removes_piece() {
        let rules = Breakthrough::with_size(4, 6);
        let mut state = BoardState::empty(4, 6);
        state.set_piece(Coord::new(1, 2), Some(0));
        state.set_piece(Coord::new(2, 3), Some(1));
        state.set_piece(Coord::new(3, 5), Some(1));
        let mv = GridMove::new(Coord::new(1, 2), Coord::new(2, 3), 0);
        let mut next = state.clone();
        rules.apply(&mut next, mv);
        assert_eq!(next.piece_at(Coord::new(2, 3)), Some(0));
        assert_eq!(next.piece_count(1), 1);
        assert_eq!(next.mover(), 1);
        assert_eq!(next.last_move(), Some(mv));
    }

    #[test]
    fn reaching_back_rank_wins() {
        let rules = Breakthrough::with_size(4, 5);
        let mut state = BoardState::empty(4, 5);
        state.set_piece(Coord::new(0, 3), Some(0));
        state.set_piece(Coord::new(3, 4), Some(1));
        state.set_piece(Coord::new(3, 3), Some(1));
        rules.apply(&mut state, GridMove::new(Coord::new(0, 3), Coord::new(0, 4), 0));
        assert!(rules.is_terminal(&state));
        assert!(rules.outcome(&state, 0).is_win());
        assert!(rules.outcome(&state, 1).is_loss());
    }

    #[test]
    fn capturing_all_pieces_wins() {
        let rules = Breakthrough::with_size(4, 5);
        let mut state = BoardState::empty(4, 5);
        state.set_piece(Coord::new(1, 1), Some(0));
        state.set_piece(Coord::new(2, 2), Some(1));
        rules.apply(&mut state, GridMove::new(Coord::new(1, 1), Coord::new(2, 2), 0));
        assert!(rules.is_terminal(&state));
        assert!(rules.outcome(&state, 0).is_win());
    }

    #[test]
    fn try_apply_rejects_illegal_moves() {
        let rules = Breakthrough::new();
        let mut state = rules.initial_state();
        // backwards move is never legal
        let illegal = GridMove::new(Coord::new(0, 1), Coord::new(0, 0), 0);
        assert!(rules.try_apply(&mut state, illegal).is_err());
        let legal = rules.legal_moves(&state)[0];
        assert!(rules.try_apply(&mut state, legal).is_ok());
        assert_eq!(state.ply(), 1);
    }

    #[test]
    fn game_played_to_completion_produces_winner() {
        let rules = Breakthrough::new();
        let mut state = rules.initial_state();
        let mut plies = 0;
        while !rules.is_terminal(&state) {
            let moves = rules.legal_moves(&state);
            let mv = moves[plies % moves.len()];
            rules.apply(&mut state, mv);
            plies += 1;
            assert!(plies < 500, "game did not terminate");
        }
        let outcomes = rules.outcome_values(&state);
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes.iter().sum::<f32>(), 0.0);
    }
}
