//! The linear softmax policy and its gradient.

use serde::{Deserialize, Serialize};

use crate::weights;

/// Per-player linear policy over sparse feature activations.
///
/// A move is described by the indices of the features active for it; its
/// logit is the sum of the corresponding weights. Distributions are the
/// softmax of the logits over a state's legal moves.
///
/// Players can hold weight vectors of different lengths: feature sets grow
/// independently per player during training.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearPolicy {
    weights: Vec<Vec<f32>>,
}

impl LinearPolicy {
    /// Zero-initialised policy: every distribution starts uniform.
    #[must_use]
    pub fn new(player_count: usize, feature_count: usize) -> Self {
        Self {
            weights: (0..player_count).map(|_| weights::zeros(feature_count)).collect(),
        }
    }

    /// Restores a policy from per-player weight vectors.
    #[must_use]
    pub fn from_weights(weights: Vec<Vec<f32>>) -> Self {
        Self { weights }
    }

    #[must_use]
    pub fn player_count(&self) -> usize {
        self.weights.len()
    }

    /// Number of features player `player`'s weight vector covers.
    #[must_use]
    pub fn feature_count(&self, player: usize) -> usize {
        self.weights[player].len()
    }

    #[must_use]
    pub fn player_weights(&self, player: usize) -> &[f32] {
        &self.weights[player]
    }

    /// The logit of one move: the sum of its active features' weights.
    ///
    /// Feature indices beyond the weight vector contribute zero; a sample
    /// recorded before the last expansion may reference a shorter
    /// vocabulary than the policy now carries, never a longer one.
    #[must_use]
    pub fn logit(&self, player: usize, active_features: &[usize]) -> f32 {
        let weights = &self.weights[player];
        active_features.iter().map(|&f| weights.get(f).copied().unwrap_or(0.0)).sum()
    }

    /// Softmax distribution over a state's legal moves, each described by
    /// its active feature indices.
    #[must_use]
    pub fn compute_distribution(
        &self,
        move_features: &[Vec<usize>],
        player: usize,
    ) -> Vec<f32> {
        let logits: Vec<f32> = move_features
            .iter()
            .map(|active| self.logit(player, active))
            .collect();
        softmax(&logits)
    }

    /// Grows player `player`'s weight vector for an expanded feature set.
    pub fn expand_player(&mut self, player: usize, feature_count: usize) {
        weights::extend_zeros(&mut self.weights[player], feature_count);
    }

    /// Applies a pre-scaled update (already containing the learning rate
    /// and sign) to player `player`'s weights.
    ///
    /// # Panics
    ///
    /// Panics if the update length does not match the weight vector.
    pub fn apply_update(&mut self, player: usize, update: &[f32]) {
        let weights = &mut self.weights[player];
        assert_eq!(weights.len(), update.len());
        for (w, u) in weights.iter_mut().zip(update) {
            *w += u;
        }
    }
}

/// Numerically stable softmax.
#[must_use]
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.iter().map(|e| e / sum).collect()
}

/// Cross-entropy gradient of the softmax policy with respect to the
/// feature weights, for one decision point.
///
/// With predicted distribution `p` and target distribution `t`, the
/// gradient of the cross-entropy loss with respect to move `i`'s logit is
/// `p[i] - t[i]`; each move scatters that value into the weights of its
/// active features.
#[must_use]
pub fn cross_entropy_gradients(
    move_features: &[Vec<usize>],
    predicted: &[f32],
    target: &[f32],
    feature_count: usize,
) -> Vec<f32> {
    assert_eq!(move_features.len(), predicted.len());
    assert_eq!(predicted.len(), target.len());
    let mut gradients = weights::zeros(feature_count);
    for (active, (&p, &t)) in move_features.iter().zip(predicted.iter().zip(target)) {
        let error = p - t;
        for &f in active {
            if f < feature_count {
                gradients[f] += error;
            }
        }
    }
    gradients
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_policy_is_uniform() {
        let policy = LinearPolicy::new(2, 4);
        let moves = vec![vec![0], vec![1, 2], vec![]];
        let dist = policy.compute_distribution(&moves, 0);
        assert_eq!(dist.len(), 3);
        for p in &dist {
            assert!((p - 1.0 / 3.0).abs() < 1e-6);
        }
    }

    #[test]
    fn heavier_features_get_more_mass() {
        let mut policy = LinearPolicy::new(1, 2);
        policy.apply_update(0, &[1.0, -1.0]);
        let moves = vec![vec![0], vec![1]];
        let dist = policy.compute_distribution(&moves, 0);
        assert!(dist[0] > dist[1]);
        assert!((dist.iter().sum::<f32>() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn expansion_preserves_existing_weights() {
        let mut policy = LinearPolicy::new(2, 2);
        policy.apply_update(0, &[0.5, -0.5]);
        policy.expand_player(0, 4);
        assert_eq!(policy.player_weights(0), &[0.5, -0.5, 0.0, 0.0]);
        // other players untouched
        assert_eq!(policy.feature_count(1), 2);
    }

    #[test]
    fn stale_feature_indices_contribute_zero() {
        let policy = LinearPolicy::new(1, 2);
        assert_eq!(policy.logit(0, &[0, 1, 7]), 0.0);
    }

    #[test]
    fn gradient_is_zero_when_prediction_matches_target() {
        let moves = vec![vec![0], vec![1]];
        let grads = cross_entropy_gradients(&moves, &[0.5, 0.5], &[0.5, 0.5], 2);
        assert_eq!(grads, vec![0.0, 0.0]);
    }

    #[test]
    fn gradient_points_toward_target() {
        let moves = vec![vec![0], vec![1]];
        let grads = cross_entropy_gradients(&moves, &[0.5, 0.5], &[1.0, 0.0], 2);
        // move 0 underpredicted: its feature's gradient is negative, so a
        // descent step (subtracting the gradient) raises the weight
        assert!(grads[0] < 0.0);
        assert!(grads[1] > 0.0);
    }

    #[test]
    fn softmax_handles_large_logits() {
        let dist = softmax(&[1000.0, 1000.0]);
        assert!((dist[0] - 0.5).abs() < 1e-6);
    }
}
