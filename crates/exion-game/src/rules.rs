//! The rules-engine contract consumed by the training core.

use std::fmt;

use crate::{
    IllegalMoveError,
    state::{BoardState, GridMove, Outcome, Player},
};

/// Rules of an abstract grid game with from/to moves.
///
/// Implementations are stateless: all game progress lives in the
/// [`BoardState`] snapshots the trainer owns, so one rules value can be
/// shared freely across threads during parallel feature expansion.
pub trait GameRules: fmt::Debug + Send + Sync {
    /// Short identifier used in logs and model files.
    fn name(&self) -> &str;

    /// Number of players. Player identifiers are `0..player_count`.
    fn player_count(&self) -> Player;

    /// The starting position.
    fn initial_state(&self) -> BoardState;

    /// Legal moves for the state's mover. Empty iff the state is terminal.
    ///
    /// The ordering is part of the contract: callers index expert
    /// distributions by position in this sequence, so two calls on equal
    /// states must return the same ordering.
    fn legal_moves(&self, state: &BoardState) -> Vec<GridMove>;

    /// Applies a legal move in place, switching the mover and recording the
    /// move for reactive feature matching.
    fn apply(&self, state: &mut BoardState, mv: GridMove);

    /// Applies `mv` after checking it against [`Self::legal_moves`].
    fn try_apply(&self, state: &mut BoardState, mv: GridMove) -> Result<(), IllegalMoveError> {
        if !self.legal_moves(state).contains(&mv) {
            return Err(IllegalMoveError);
        }
        self.apply(state, mv);
        Ok(())
    }

    /// Whether the game is over in this state.
    fn is_terminal(&self, state: &BoardState) -> bool;

    /// The outcome for `player`; [`Outcome::Ongoing`] while not terminal.
    fn outcome(&self, state: &BoardState, player: Player) -> Outcome;

    /// Outcome values for every player, for terminal states.
    fn outcome_values(&self, state: &BoardState) -> Vec<f32> {
        (0..self.player_count())
            .map(|p| self.outcome(state, p).value())
            .collect()
    }
}
