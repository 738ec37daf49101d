//! Bounded instance selection with batch-global consistency.
//!
//! Only a capped number of instances per decision (and per batch) may be
//! absorbed into pair statistics. Which instances are kept is decided by
//! softmax-weighted sampling over a heuristic informativeness score, with
//! one hard consistency rule: an instance preserved at one decision is
//! preserved at every later decision in the same batch, and likewise for
//! discarded instances. The two sets live in an explicit parameter object
//! scoped to one expansion call, never in process-wide state.

use std::collections::HashSet;

use exion_features::{FeatureInstance, FeatureSet, InstancePair, MatchEngine};
use rand::RngCore;

use crate::observations::BatchObservations;

/// Preserve/discard bookkeeping for one expansion call.
#[derive(Debug, Default)]
pub struct InstanceSelection {
    preserved: HashSet<FeatureInstance>,
    discarded: HashSet<FeatureInstance>,
}

impl InstanceSelection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_preserved(&self, instance: &FeatureInstance) -> bool {
        self.preserved.contains(instance)
    }

    #[must_use]
    pub fn is_discarded(&self, instance: &FeatureInstance) -> bool {
        self.discarded.contains(instance)
    }
}

/// Caps on how many instances may be absorbed into statistics.
#[derive(Debug, Clone, Copy)]
pub struct InstanceBudget {
    /// Newly preserved instances allowed per decision/action case.
    pub per_case: usize,
    /// Newly preserved instances remaining across the whole batch.
    pub remaining: usize,
}

/// Selects the instances to keep for one decision/action case.
///
/// Previously preserved instances are kept outright; previously discarded
/// ones are dropped; instances of features whose activation ratio has
/// saturated are dropped as uninformative. The remaining candidates are
/// sampled without replacement, each draw weighted by
/// `exp(score) / same-feature multiplicity`, until the per-case cap or the
/// global budget is exhausted. After each draw, candidates that are
/// structurally identical to the drawn instance (they would collapse to
/// the same statistic key) are kept for free.
#[expect(clippy::too_many_arguments)]
pub fn select_case_instances(
    instances: &[FeatureInstance],
    observations: &BatchObservations<'_>,
    player_weights: &[f32],
    features: &FeatureSet,
    matcher: &dyn MatchEngine,
    selection: &mut InstanceSelection,
    budget: &mut InstanceBudget,
    rng: &mut dyn RngCore,
) -> Vec<FeatureInstance> {
    let mut kept: Vec<FeatureInstance> = Vec::new();
    let mut candidates: Vec<FeatureInstance> = Vec::new();

    for &instance in instances {
        if selection.is_preserved(&instance) {
            kept.push(instance);
        } else if !selection.is_discarded(&instance) && !observations.is_saturated(instance.feature)
        {
            candidates.push(instance);
        }
    }

    let mut weights: Vec<f64> = candidates
        .iter()
        .map(|instance| {
            let multiplicity = candidates
                .iter()
                .filter(|other| other.feature == instance.feature)
                .count();
            #[expect(clippy::cast_precision_loss)]
            let multiplicity = multiplicity as f64;
            f64::from(instance_score(instance, observations, player_weights)).exp() / multiplicity
        })
        .collect();

    let mut newly_kept = 0;
    while !candidates.is_empty() && newly_kept < budget.per_case && budget.remaining > 0 {
        let picked_index = weighted_draw(&weights, rng);
        let picked = candidates.swap_remove(picked_index);
        weights.swap_remove(picked_index);
        kept.push(picked);
        selection.preserved.insert(picked);
        newly_kept += 1;
        budget.remaining -= 1;

        // free rides: candidates that merge into the picked instance's
        // statistic key anyway
        let picked_pattern = features.pattern(picked.feature);
        let mut i = 0;
        while i < candidates.len() {
            let candidate = candidates[i];
            let merged = candidate.feature == picked.feature
                && InstancePair::new(matcher, features, candidate, picked).combined()
                    == picked_pattern;
            if merged {
                candidates.swap_remove(i);
                weights.swap_remove(i);
                kept.push(candidate);
                selection.preserved.insert(candidate);
            } else {
                i += 1;
            }
        }
    }

    for candidate in candidates {
        selection.discarded.insert(candidate);
    }
    kept
}

/// Heuristic informativeness of a candidate instance: the magnitude of its
/// feature's error correlation, the magnitude of its expected error when
/// active, and the magnitude of its current policy weight.
fn instance_score(
    instance: &FeatureInstance,
    observations: &BatchObservations<'_>,
    player_weights: &[f32],
) -> f32 {
    let feature = instance.feature;
    let weight = player_weights.get(feature).copied().unwrap_or(0.0);
    observations.feature_error_correlation(feature).abs()
        + observations.expected_error_given_active(feature).abs()
        + weight.abs()
}

/// Draws an index proportionally to the given non-negative weights.
fn weighted_draw(weights: &[f64], rng: &mut dyn RngCore) -> usize {
    use rand::Rng as _;

    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        // all weights degenerate: fall back to a uniform draw
        return rng.random_range(0..weights.len());
    }
    let mut target = rng.random_range(0.0..total);
    for (i, w) in weights.iter().enumerate() {
        target -= w;
        if target < 0.0 {
            return i;
        }
    }
    weights.len() - 1
}
