//! One decision point of self-play experience.

use exion_game::{BoardState, GridMove, Player};
use serde::{Deserialize, Serialize};

use crate::move_set::MoveSet;

/// Sentinel for a sample whose episode has not terminated yet.
pub const DURATION_UNSET: i32 = -1;

/// An immutable-after-construction record of one decision point.
///
/// Lifecycle: created when a decision is made during a game; annotated with
/// special-move bitsets exactly once immediately afterwards; finalised with
/// episode duration and per-player outcomes when the episode ends; then
/// pushed into a replay buffer and never mutated again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperienceSample {
    state: BoardState,
    legal_moves: Vec<GridMove>,
    expert_distribution: Vec<f32>,
    expert_value_estimates: Vec<f32>,
    winning_moves: MoveSet,
    losing_moves: MoveSet,
    anti_defeating_moves: MoveSet,
    annotated: bool,
    episode_duration: i32,
    player_outcomes: Option<Vec<f32>>,
    weight_visit_count: f32,
    weight_per: f32,
}

impl ExperienceSample {
    /// Creates a sample from the expert's report for one decision point.
    ///
    /// # Panics
    ///
    /// Panics if the distribution or value vector length does not match the
    /// legal-move count, or if the distribution does not sum to 1 within
    /// floating tolerance.
    #[must_use]
    pub fn new(
        state: BoardState,
        legal_moves: Vec<GridMove>,
        expert_distribution: Vec<f32>,
        expert_value_estimates: Vec<f32>,
    ) -> Self {
        assert_eq!(legal_moves.len(), expert_distribution.len());
        assert_eq!(legal_moves.len(), expert_value_estimates.len());
        let sum: f32 = expert_distribution.iter().sum();
        assert!(
            (sum - 1.0).abs() < 1e-4,
            "expert distribution sums to {sum}, expected 1"
        );
        let count = legal_moves.len();
        Self {
            state,
            legal_moves,
            expert_distribution,
            expert_value_estimates,
            winning_moves: MoveSet::new(count),
            losing_moves: MoveSet::new(count),
            anti_defeating_moves: MoveSet::new(count),
            annotated: false,
            episode_duration: DURATION_UNSET,
            player_outcomes: None,
            weight_visit_count: 1.0,
            weight_per: 1.0,
        }
    }

    /// The state snapshot, including the last decision-defining move.
    #[must_use]
    pub fn state(&self) -> &BoardState {
        &self.state
    }

    /// The player whose decision this sample records.
    #[must_use]
    pub fn mover(&self) -> Player {
        self.state.mover()
    }

    /// The legal moves, in the ordering every index in this sample refers
    /// to.
    #[must_use]
    pub fn legal_moves(&self) -> &[GridMove] {
        &self.legal_moves
    }

    /// The expert's raw move distribution.
    #[must_use]
    pub fn raw_expert_distribution(&self) -> &[f32] {
        &self.expert_distribution
    }

    /// The expert's per-move value estimates.
    #[must_use]
    pub fn expert_value_estimates(&self) -> &[f32] {
        &self.expert_value_estimates
    }

    #[must_use]
    pub fn winning_moves(&self) -> &MoveSet {
        &self.winning_moves
    }

    #[must_use]
    pub fn losing_moves(&self) -> &MoveSet {
        &self.losing_moves
    }

    #[must_use]
    pub fn anti_defeating_moves(&self) -> &MoveSet {
        &self.anti_defeating_moves
    }

    /// Episode length in decisions, or [`DURATION_UNSET`].
    #[must_use]
    pub fn episode_duration(&self) -> i32 {
        self.episode_duration
    }

    /// Final outcome value per player, once the episode has terminated.
    #[must_use]
    pub fn player_outcomes(&self) -> Option<&[f32]> {
        self.player_outcomes.as_deref()
    }

    #[must_use]
    pub fn weight_visit_count(&self) -> f32 {
        self.weight_visit_count
    }

    #[must_use]
    pub fn weight_per(&self) -> f32 {
        self.weight_per
    }

    /// Importance-sampling weights; set by replay logic outside this core.
    pub fn set_weights(&mut self, visit_count: f32, per: f32) {
        assert!(visit_count > 0.0 && per > 0.0);
        self.weight_visit_count = visit_count;
        self.weight_per = per;
    }

    /// Records the special-move annotation. Called exactly once per sample,
    /// immediately after construction.
    ///
    /// # Panics
    ///
    /// Panics on a second call, or if a bitset capacity does not match the
    /// legal-move count.
    pub fn annotate_special_moves(
        &mut self,
        winning: MoveSet,
        losing: MoveSet,
        anti_defeating: MoveSet,
    ) {
        assert!(!self.annotated, "sample annotated twice");
        assert_eq!(winning.len(), self.legal_moves.len());
        assert_eq!(losing.len(), self.legal_moves.len());
        assert_eq!(anti_defeating.len(), self.legal_moves.len());
        self.winning_moves = winning;
        self.losing_moves = losing;
        self.anti_defeating_moves = anti_defeating;
        self.annotated = true;
    }

    /// Fills in episode metadata when the episode terminates.
    ///
    /// # Panics
    ///
    /// Panics if the sample was already finalised.
    pub fn finalise_episode(&mut self, duration: i32, outcomes: Vec<f32>) {
        assert_eq!(self.episode_duration, DURATION_UNSET, "sample finalised twice");
        assert!(duration >= 0);
        self.episode_duration = duration;
        self.player_outcomes = Some(outcomes);
    }

    /// The expert distribution adjusted for known special moves.
    ///
    /// Returns a fresh vector; the stored raw distribution is never
    /// mutated. Winning moves are amplified to twice the raw maximum,
    /// losing moves suppressed to half the raw minimum, anti-defeating
    /// moves raised to the raw maximum, and the result renormalised. When
    /// all three bitsets are empty the raw distribution is returned
    /// unchanged.
    #[must_use]
    pub fn expert_distribution(&self) -> Vec<f32> {
        let mut adjusted = self.expert_distribution.clone();
        if self.winning_moves.is_empty()
            && self.losing_moves.is_empty()
            && self.anti_defeating_moves.is_empty()
        {
            return adjusted;
        }

        let max = adjusted.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let min = adjusted.iter().copied().fold(f32::INFINITY, f32::min);
        for i in self.winning_moves.iter() {
            adjusted[i] = 2.0 * max;
        }
        for i in self.losing_moves.iter() {
            adjusted[i] = 0.5 * min;
        }
        for i in self.anti_defeating_moves.iter() {
            adjusted[i] = f32::max(adjusted[i], max);
        }

        let sum: f32 = adjusted.iter().sum();
        if sum > 0.0 {
            for p in &mut adjusted {
                *p /= sum;
            }
        }
        adjusted
    }
}
