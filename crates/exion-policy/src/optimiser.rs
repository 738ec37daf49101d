//! RMSProp update rule with per-player accumulator state.

use serde::{Deserialize, Serialize};

use crate::linear::LinearPolicy;

/// RMSProp optimiser.
///
/// Keeps one squared-gradient accumulator per player weight vector. The
/// accumulators grow in lockstep with the policy when a player's feature
/// set expands, and serialize with the optimiser so training runs resume
/// without losing adaptation state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RmsProp {
    pub learning_rate: f32,
    pub decay: f32,
    pub epsilon: f32,
    cache: Vec<Vec<f32>>,
}

impl RmsProp {
    /// Standard RMSProp constants.
    #[must_use]
    pub fn new(player_count: usize, learning_rate: f32) -> Self {
        Self {
            learning_rate,
            decay: 0.9,
            epsilon: 1e-8,
            cache: vec![Vec::new(); player_count],
        }
    }

    /// One descent step on player `player`'s weights.
    pub fn step(&mut self, policy: &mut LinearPolicy, player: usize, gradients: &[f32]) {
        let cache = &mut self.cache[player];
        cache.resize(gradients.len(), 0.0);

        let mut update = Vec::with_capacity(gradients.len());
        for (c, &g) in cache.iter_mut().zip(gradients) {
            *c = self.decay * *c + (1.0 - self.decay) * g * g;
            update.push(-self.learning_rate * g / (c.sqrt() + self.epsilon));
        }
        policy.apply_update(player, &update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_descends_along_gradient() {
        let mut policy = LinearPolicy::new(1, 2);
        let mut optimiser = RmsProp::new(1, 0.01);
        optimiser.step(&mut policy, 0, &[1.0, -1.0]);
        let weights = policy.player_weights(0);
        assert!(weights[0] < 0.0);
        assert!(weights[1] > 0.0);
    }

    #[test]
    fn repeated_steps_accumulate() {
        let mut policy = LinearPolicy::new(1, 1);
        let mut optimiser = RmsProp::new(1, 0.01);
        optimiser.step(&mut policy, 0, &[1.0]);
        let after_one = policy.player_weights(0)[0];
        optimiser.step(&mut policy, 0, &[1.0]);
        assert!(policy.player_weights(0)[0] < after_one);
    }

    #[test]
    fn cache_grows_with_expanded_policy() {
        let mut policy = LinearPolicy::new(1, 1);
        let mut optimiser = RmsProp::new(1, 0.01);
        optimiser.step(&mut policy, 0, &[1.0]);
        policy.expand_player(0, 3);
        optimiser.step(&mut policy, 0, &[0.0, 1.0, 1.0]);
        assert_eq!(policy.feature_count(0), 3);
    }
}
