//! Special-move analysis: provably winning, losing and anti-defeating
//! moves at one decision point.
//!
//! The analysis is one ply deep, plus one opponent reply for the
//! defeating-response counts. Moves that grant the mover another turn are
//! left unresolved (the count is [`UNRESOLVED_REPLIES`]) rather than
//! simulated forward; the design intentionally avoids deeper game-tree
//! lookahead during annotation.

use exion_experience::MoveSet;
use exion_game::{BoardState, GameRules, GridMove};

/// Sentinel for a move whose defeating-response count was not resolved
/// because the mover would move again.
pub const UNRESOLVED_REPLIES: i32 = i32::MAX;

/// Result of analysing one decision point's legal moves.
#[derive(Debug)]
pub struct SpecialMoves {
    /// Moves that win the game immediately.
    pub winning: MoveSet,
    /// Moves that lose the game immediately.
    pub losing: MoveSet,
    /// Moves admitting strictly fewer losing opponent replies than the
    /// worst move available in this state.
    pub anti_defeating: MoveSet,
    /// Per-move count of opponent replies that would make the mover lose;
    /// zero for terminal moves, [`UNRESOLVED_REPLIES`] for extra-turn
    /// moves.
    pub defeating_replies: Vec<i32>,
}

/// Analyses the legal moves of a decision point.
#[must_use]
pub fn analyse_special_moves(
    rules: &dyn GameRules,
    state: &BoardState,
    legal_moves: &[GridMove],
) -> SpecialMoves {
    let count = legal_moves.len();
    let mover = state.mover();
    let mut winning = MoveSet::new(count);
    let mut losing = MoveSet::new(count);
    let mut anti_defeating = MoveSet::new(count);
    let mut defeating_replies = vec![0i32; count];

    for (i, &mv) in legal_moves.iter().enumerate() {
        let mut next = state.clone();
        rules.apply(&mut next, mv);

        if rules.is_terminal(&next) {
            let outcome = rules.outcome(&next, mover);
            if outcome.is_win() {
                winning.insert(i);
            } else if outcome.is_loss() {
                losing.insert(i);
            }
            continue;
        }

        if next.mover() == mover {
            // the mover moves again; forward simulation is not generalised
            // for extra-turn moves, so the count stays uncertain
            defeating_replies[i] = UNRESOLVED_REPLIES;
            continue;
        }

        defeating_replies[i] = count_losing_replies(rules, &next, mover);
    }

    // the anti-defeating moves admit strictly fewer losing replies than the
    // worst resolved move; unresolved counts take no part in either side
    let worst = legal_moves
        .iter()
        .enumerate()
        .filter(|&(i, _)| {
            !winning.contains(i) && !losing.contains(i) && defeating_replies[i] != UNRESOLVED_REPLIES
        })
        .map(|(i, _)| defeating_replies[i])
        .max();
    if let Some(worst) = worst {
        for i in 0..count {
            if !winning.contains(i)
                && !losing.contains(i)
                && defeating_replies[i] != UNRESOLVED_REPLIES
                && defeating_replies[i] < worst
            {
                anti_defeating.insert(i);
            }
        }
    }

    SpecialMoves {
        winning,
        losing,
        anti_defeating,
        defeating_replies,
    }
}

/// Number of opponent replies at `state` after which `player` has lost.
fn count_losing_replies(
    rules: &dyn GameRules,
    state: &BoardState,
    player: exion_game::Player,
) -> i32 {
    let mut count = 0;
    for reply in rules.legal_moves(state) {
        let mut after = state.clone();
        rules.apply(&mut after, reply);
        if rules.is_terminal(&after) && rules.outcome(&after, player).is_loss() {
            count += 1;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use exion_game::{Breakthrough, Coord};

    use super::*;

    #[test]
    fn immediate_win_is_flagged() {
        let rules = Breakthrough::with_size(4, 5);
        let mut state = BoardState::empty(4, 5);
        state.set_piece(Coord::new(0, 3), Some(0));
        state.set_piece(Coord::new(3, 0), Some(0));
        state.set_piece(Coord::new(3, 4), Some(1));
        state.set_piece(Coord::new(2, 4), Some(1));

        let legal_moves = rules.legal_moves(&state);
        let special = analyse_special_moves(&rules, &state, &legal_moves);
        let goal_moves: Vec<usize> = legal_moves
            .iter()
            .enumerate()
            .filter(|(_, mv)| mv.to.y == 4)
            .map(|(i, _)| i)
            .collect();
        assert!(!goal_moves.is_empty());
        for i in goal_moves {
            assert!(special.winning.contains(i));
        }
    }

    #[test]
    fn walking_into_capture_near_goal_admits_losing_replies() {
        // if player 0 advances the (1,2) pawn straight, player 1's pawn at
        // (2,4) can later break through; concretely, the reply capturing at
        // (1,3) leaves player 0 with one pawn and no loss yet, but the
        // reply landing on y=0 would win for player 1
        let rules = Breakthrough::with_size(3, 5);
        let mut state = BoardState::empty(3, 5);
        state.set_piece(Coord::new(0, 0), Some(0));
        state.set_piece(Coord::new(1, 1), Some(1));

        let legal_moves = rules.legal_moves(&state);
        let special = analyse_special_moves(&rules, &state, &legal_moves);

        // moving to (1,1) captures the last enemy pawn and wins outright
        let capture = legal_moves
            .iter()
            .position(|mv| mv.to == Coord::new(1, 1))
            .unwrap();
        assert!(special.winning.contains(capture));

        // moving to (0,1) lets the enemy pawn reach y=0 next turn
        let advance = legal_moves
            .iter()
            .position(|mv| mv.to == Coord::new(0, 1))
            .unwrap();
        assert!(!special.winning.contains(advance));
        assert!(special.defeating_replies[advance] > 0);
    }

    #[test]
    fn anti_defeating_requires_strictly_fewer_replies() {
        // all quiet moves in the opening admit zero losing replies, so no
        // move is anti-defeating
        let rules = Breakthrough::new();
        let state = rules.initial_state();
        let legal_moves = rules.legal_moves(&state);
        let special = analyse_special_moves(&rules, &state, &legal_moves);
        assert!(special.winning.is_empty());
        assert!(special.losing.is_empty());
        assert!(special.anti_defeating.is_empty());
    }
}
