//! The search-expert contract and a flat Monte-Carlo baseline.
//!
//! The expert is the search-based policy that produces training targets
//! during self-play: for each decision it reports the chosen move, a move
//! distribution, per-move value estimates, and the experience samples
//! derived from them. Optional capabilities (score bounds) are exposed
//! through accessor methods rather than downcasting, so any expert may opt
//! in without the trainer branching on concrete types.

use exion_experience::ExperienceSample;
use exion_game::{BoardState, GameRules, GridMove};
use exion_policy::linear::softmax;
use rand::{Rng as _, RngCore};

/// An expert that can prune playouts with material score bounds.
pub trait SupportsScoreBounds {
    /// Enables or disables score-bound pruning.
    fn set_score_bounds(&mut self, enabled: bool);
}

/// The expert contract consumed by the self-play orchestrator.
pub trait Expert {
    /// Runs search at `state` and returns the move to play. The expert
    /// retains its last search results for the query methods below.
    fn select_action(
        &mut self,
        rules: &dyn GameRules,
        state: &BoardState,
        thinking_budget: u32,
        rng: &mut dyn RngCore,
    ) -> GridMove;

    /// The legal moves of the last `select_action` call, in the ordering
    /// all derived vectors refer to.
    fn last_legal_moves(&self) -> &[GridMove];

    /// The expert's move distribution from the last search.
    fn expert_policy(&self) -> &[f32];

    /// Experience samples derived from the last search: one per mover the
    /// expert decided for (usually one).
    fn generate_experiences(&self) -> Vec<ExperienceSample>;

    /// Score-bounds capability, if this expert supports it.
    fn as_score_bounds(&mut self) -> Option<&mut dyn SupportsScoreBounds> {
        None
    }
}

/// How sharply the move distribution concentrates on high-value moves.
const VALUE_SHARPNESS: f32 = 2.0;

/// Playout length cap, as a multiple of the board cell count.
const PLAYOUT_PLY_FACTOR: u32 = 4;

/// Flat Monte-Carlo expert: the thinking budget is split evenly across the
/// legal moves, each move is evaluated by uniform random playouts, and the
/// reported distribution is a softmax over the mean playout values.
#[derive(Debug, Default)]
pub struct FlatMonteCarloExpert {
    score_bounds: bool,
    last_state: Option<BoardState>,
    last_legal_moves: Vec<GridMove>,
    last_distribution: Vec<f32>,
    last_values: Vec<f32>,
}

impl FlatMonteCarloExpert {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mean playout value of `mv` for the state's mover.
    fn evaluate_move(
        &self,
        rules: &dyn GameRules,
        state: &BoardState,
        mv: GridMove,
        playouts: u32,
        rng: &mut dyn RngCore,
    ) -> f32 {
        let mover = state.mover();
        let mut total = 0.0;
        for _ in 0..playouts {
            let mut playout_state = state.clone();
            rules.apply(&mut playout_state, mv);
            total += self.playout_value(rules, &mut playout_state, mover, rng);
        }
        #[expect(clippy::cast_precision_loss)]
        let value = total / playouts as f32;
        value
    }

    /// Plays uniformly random moves until the game ends, the ply cap is
    /// hit, or (with score bounds enabled) the material balance becomes
    /// decisive.
    fn playout_value(
        &self,
        rules: &dyn GameRules,
        state: &mut BoardState,
        perspective: exion_game::Player,
        rng: &mut dyn RngCore,
    ) -> f32 {
        let cap = u32::from(state.width()) * u32::from(state.height()) * PLAYOUT_PLY_FACTOR;
        for _ in 0..cap {
            if rules.is_terminal(state) {
                return rules.outcome(state, perspective).value();
            }
            if self.score_bounds {
                if let Some(bound) = material_bound(state, perspective) {
                    return bound;
                }
            }
            let moves = rules.legal_moves(state);
            let mv = moves[rng.random_range(0..moves.len())];
            rules.apply(state, mv);
        }
        // ran out of plies without a result
        0.0
    }
}

/// Decisive material bound: once one side is down to a single piece while
/// the other keeps a full rank's worth, the playout outcome is treated as
/// settled.
fn material_bound(state: &BoardState, perspective: exion_game::Player) -> Option<f32> {
    let own = state.piece_count(perspective);
    let other = state.pieces().count() - own;
    let decisive = usize::from(state.width());
    if own <= 1 && other >= decisive {
        Some(-1.0)
    } else if other <= 1 && own >= decisive {
        Some(1.0)
    } else {
        None
    }
}

impl Expert for FlatMonteCarloExpert {
    fn select_action(
        &mut self,
        rules: &dyn GameRules,
        state: &BoardState,
        thinking_budget: u32,
        rng: &mut dyn RngCore,
    ) -> GridMove {
        let legal_moves = rules.legal_moves(state);
        assert!(!legal_moves.is_empty(), "expert queried at a terminal state");

        #[expect(clippy::cast_possible_truncation)]
        let playouts = u32::max(1, thinking_budget / legal_moves.len() as u32);
        let values: Vec<f32> = legal_moves
            .iter()
            .map(|&mv| self.evaluate_move(rules, state, mv, playouts, rng))
            .collect();
        let logits: Vec<f32> = values.iter().map(|v| v * VALUE_SHARPNESS).collect();
        let distribution = softmax(&logits);

        let chosen = weighted_choice(&distribution, rng);
        self.last_state = Some(state.clone());
        self.last_legal_moves = legal_moves;
        self.last_distribution = distribution;
        self.last_values = values;
        self.last_legal_moves[chosen]
    }

    fn last_legal_moves(&self) -> &[GridMove] {
        &self.last_legal_moves
    }

    fn expert_policy(&self) -> &[f32] {
        &self.last_distribution
    }

    fn generate_experiences(&self) -> Vec<ExperienceSample> {
        let Some(state) = &self.last_state else {
            return Vec::new();
        };
        vec![ExperienceSample::new(
            state.clone(),
            self.last_legal_moves.clone(),
            self.last_distribution.clone(),
            self.last_values.clone(),
        )]
    }

    fn as_score_bounds(&mut self) -> Option<&mut dyn SupportsScoreBounds> {
        Some(self)
    }
}

impl SupportsScoreBounds for FlatMonteCarloExpert {
    fn set_score_bounds(&mut self, enabled: bool) {
        self.score_bounds = enabled;
    }
}

fn weighted_choice(distribution: &[f32], rng: &mut dyn RngCore) -> usize {
    let mut target = rng.random_range(0.0..1.0f32);
    for (i, p) in distribution.iter().enumerate() {
        target -= p;
        if target < 0.0 {
            return i;
        }
    }
    distribution.len() - 1
}

#[cfg(test)]
mod tests {
    use exion_game::{Breakthrough, Coord};
    use rand::SeedableRng as _;
    use rand_pcg::Pcg64Mcg;

    use super::*;

    #[test]
    fn expert_reports_consistent_search_results() {
        let rules = Breakthrough::new();
        let state = rules.initial_state();
        let mut expert = FlatMonteCarloExpert::new();
        let mut rng = Pcg64Mcg::seed_from_u64(11);

        let chosen = expert.select_action(&rules, &state, 64, &mut rng);
        assert!(expert.last_legal_moves().contains(&chosen));
        assert_eq!(expert.expert_policy().len(), expert.last_legal_moves().len());
        assert!((expert.expert_policy().iter().sum::<f32>() - 1.0).abs() < 1e-4);

        let experiences = expert.generate_experiences();
        assert_eq!(experiences.len(), 1);
        assert_eq!(experiences[0].legal_moves(), expert.last_legal_moves());
        assert_eq!(experiences[0].mover(), 0);
    }

    #[test]
    fn immediate_win_gets_the_most_mass() {
        // player 0 pawn one step from the goal rank; every playout through
        // the winning move scores 1.0 instantly
        let rules = Breakthrough::with_size(4, 5);
        let mut state = exion_game::BoardState::empty(4, 5);
        state.set_piece(Coord::new(0, 3), Some(0));
        state.set_piece(Coord::new(3, 0), Some(0));
        state.set_piece(Coord::new(3, 4), Some(1));
        state.set_piece(Coord::new(2, 4), Some(1));

        let mut expert = FlatMonteCarloExpert::new();
        let mut rng = Pcg64Mcg::seed_from_u64(5);
        let _mv = expert.select_action(&rules, &state, 200, &mut rng);

        let moves = expert.last_legal_moves();
        let policy = expert.expert_policy();
        let winning_index = moves
            .iter()
            .position(|mv| mv.from == Coord::new(0, 3) && mv.to == Coord::new(0, 4))
            .unwrap();
        let best = policy.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        assert!((policy[winning_index] - best).abs() < 1e-6);
    }

    #[test]
    fn score_bounds_capability_is_exposed() {
        let mut expert = FlatMonteCarloExpert::new();
        let bounds = expert.as_score_bounds();
        assert!(bounds.is_some());
        bounds.unwrap().set_score_bounds(true);
        assert!(expert.score_bounds);
    }
}
