//! The correlation-based feature-set expansion engine.

use std::{cmp::Ordering, collections::BinaryHeap, collections::HashSet};

use exion_experience::ExperienceSample;
use exion_features::{FeatureSet, InstancePair, MatchEngine, Pattern};
use exion_policy::LinearPolicy;
use exion_stats::correlation;
use rand::{Rng as _, RngCore, seq::SliceRandom as _};

use crate::{
    FeatureExpander,
    observations::BatchObservations,
    selection::{InstanceBudget, InstanceSelection, select_case_instances},
    statistics::PairStatistics,
};

/// Tuning knobs for the correlation expander.
#[derive(Debug, Clone, Copy)]
pub struct ExpansionConfig {
    /// Critical value for the Fisher confidence interval (1.96 ≙ 95%).
    pub critical_value: f32,
    /// Instances absorbed into statistics per decision/action case.
    pub max_instances_per_case: usize,
    /// Instances absorbed into statistics across the whole batch.
    pub max_instances_per_batch: usize,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            critical_value: 1.96,
            max_instances_per_case: 10,
            max_instances_per_batch: 512,
        }
    }
}

/// Grows the feature vocabulary by pairing co-active instances whose
/// co-activation correlates with the policy's prediction errors.
///
/// One call adds at most one proactive and one reactive compound feature.
/// Candidates must survive a sequence of filters: sufficient support, no
/// perfect correlation with a constituent or the whole batch, a finite
/// redundancy-penalised score, and a confidence interval on the error
/// correlation that excludes zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct CorrelationFeatureExpander {
    pub config: ExpansionConfig,
}

impl CorrelationFeatureExpander {
    #[must_use]
    pub fn new(config: ExpansionConfig) -> Self {
        Self { config }
    }
}

struct ScoredCandidate {
    score: f32,
    /// Insertion sequence; breaks score ties deterministically.
    sequence: usize,
    pattern: Pattern,
}

impl PartialEq for ScoredCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScoredCandidate {}

impl PartialOrd for ScoredCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl FeatureExpander for CorrelationFeatureExpander {
    fn expand(
        &self,
        batch: &[&ExperienceSample],
        features: &FeatureSet,
        policy: &LinearPolicy,
        player: usize,
        matcher: &dyn MatchEngine,
        rng: &mut dyn RngCore,
    ) -> Option<FeatureSet> {
        let observations = BatchObservations::collect(batch, features, policy, player, matcher);
        if !observations.has_error_signal() {
            return None;
        }

        let stats = self.accumulate_statistics(&observations, features, policy, player, matcher, rng);
        let (proactive, reactive) = self.score_candidates(&stats, &observations, features, matcher, rng);

        // proactive first; the reactive queue starts from the possibly
        // already-expanded base
        let mut base: Option<FeatureSet> = None;
        for queue in [proactive, reactive] {
            let current = base.clone();
            let current = current.as_ref().unwrap_or(features);
            if let Some(expanded) = materialise_first(queue, current) {
                base = Some(expanded);
            }
        }
        base
    }
}

impl CorrelationFeatureExpander {
    /// Passes 2–4: ordered traversal, bounded instance selection, and
    /// pair-keyed accumulation.
    fn accumulate_statistics(
        &self,
        observations: &BatchObservations<'_>,
        features: &FeatureSet,
        policy: &LinearPolicy,
        player: usize,
        matcher: &dyn MatchEngine,
        rng: &mut dyn RngCore,
    ) -> PairStatistics {
        let player_weights = policy.player_weights(player);
        let mut selection = InstanceSelection::new();
        let mut budget = InstanceBudget {
            per_case: self.config.max_instances_per_case,
            remaining: self.config.max_instances_per_batch,
        };
        let mut stats = PairStatistics::new();

        for case_index in observations.case_order() {
            let case = &observations.cases[case_index];
            for move_index in move_priority_order(case.sample, rng) {
                let kept = select_case_instances(
                    &case.move_instances[move_index],
                    observations,
                    player_weights,
                    features,
                    matcher,
                    &mut selection,
                    &mut budget,
                    rng,
                );
                if kept.is_empty() {
                    continue;
                }

                let error = case.contributing_error(move_index);
                // several structurally distinct instance pairs may collapse
                // to one key; each key counts at most once per case
                let mut counted: HashSet<InstancePair> = HashSet::new();
                for (i, &a) in kept.iter().enumerate() {
                    for &b in &kept[i..] {
                        let pair = InstancePair::new(matcher, features, a, b);
                        if counted.insert(pair.clone()) {
                            stats.record(pair, error);
                        }
                    }
                }
            }
        }
        stats
    }

    /// Pass 5: scoring and partitioning into proactive/reactive queues.
    fn score_candidates(
        &self,
        stats: &PairStatistics,
        observations: &BatchObservations<'_>,
        features: &FeatureSet,
        matcher: &dyn MatchEngine,
        rng: &mut dyn RngCore,
    ) -> (BinaryHeap<ScoredCandidate>, BinaryHeap<ScoredCandidate>) {
        let total = observations.total_cases;
        let min_support: u32 = rng.random_range(3..=5);
        let mut proactive = BinaryHeap::new();
        let mut reactive = BinaryHeap::new();

        for (sequence, record) in stats.records().iter().enumerate() {
            if record.pair.is_self_pair() {
                continue;
            }
            let n_pair = record.count;
            if n_pair < min_support {
                continue;
            }
            let (a, b) = (record.pair.first(), record.pair.second());
            let n_a = stats.count(&InstancePair::new(matcher, features, a, a));
            let n_b = stats.count(&InstancePair::new(matcher, features, b, b));
            // perfectly correlated with a constituent or the whole batch:
            // the compound adds nothing over what is already observable
            if n_pair == total || n_pair == n_a || n_pair == n_b {
                continue;
            }

            let error_corr = correlation::point_biserial(
                record.error_sum,
                n_pair,
                observations.error_sum,
                observations.error_sq_sum,
                total,
            );
            let (lower, upper) = correlation::fisher_confidence_interval(
                error_corr,
                total,
                self.config.critical_value,
            );
            let corr_a = correlation::phi(n_pair, n_pair, n_a, total);
            let corr_b = correlation::phi(n_pair, n_pair, n_b, total);
            let redundancy = if corr_a.abs() >= corr_b.abs() { corr_a } else { corr_b };

            // the conservative end of the interval; positive only when the
            // interval excludes zero
            let bound = if error_corr > 0.0 { lower } else { -upper };
            let score = bound * (1.0 - redundancy * redundancy);
            if !score.is_finite() || score <= 0.0 {
                continue;
            }

            let candidate = ScoredCandidate {
                score,
                sequence,
                pattern: record.pair.combined().clone(),
            };
            if candidate.pattern.is_reactive() {
                reactive.push(candidate);
            } else {
                proactive.push(candidate);
            }
        }
        (proactive, reactive)
    }
}

/// Drains a queue by descending score until a candidate synthesizes a
/// genuinely new feature. Duplicate synthesis is a normal negative result;
/// an exhausted queue contributes nothing.
fn materialise_first(
    mut queue: BinaryHeap<ScoredCandidate>,
    base: &FeatureSet,
) -> Option<FeatureSet> {
    while let Some(candidate) = queue.pop() {
        if let Some(expanded) = base.expand(candidate.pattern) {
            return Some(expanded);
        }
    }
    None
}

/// Legal-move visit order for instance selection: winning moves first,
/// then losing, then anti-defeating, then the rest in random order.
fn move_priority_order(sample: &ExperienceSample, rng: &mut dyn RngCore) -> Vec<usize> {
    let count = sample.legal_moves().len();
    let mut order = Vec::with_capacity(count);
    let mut queued = vec![false; count];
    let classes = [
        sample.winning_moves(),
        sample.losing_moves(),
        sample.anti_defeating_moves(),
    ];
    for class in classes {
        for i in class.iter() {
            if !queued[i] {
                queued[i] = true;
                order.push(i);
            }
        }
    }
    let mut rest: Vec<usize> = (0..count).filter(|&i| !queued[i]).collect();
    rest.shuffle(rng);
    order.extend(rest);
    order
}

#[cfg(test)]
mod tests {
    use exion_experience::MoveSet;
    use exion_features::{CellTest, GridMatchEngine, PatternElement};
    use exion_game::{BoardState, Coord, GridMove};
    use rand::SeedableRng;
    use rand_pcg::Pcg64Mcg;

    use super::*;

    /// Feature 0: an enemy on the anchor cell (a capture).
    /// Feature 1: an enemy adjacent to the anchor.
    fn capture_features() -> FeatureSet {
        FeatureSet::new(vec![
            Pattern::proactive(vec![PatternElement::new(0, 0, CellTest::Enemy)]),
            Pattern::proactive(vec![PatternElement::new(0, 1, CellTest::Enemy)]),
        ])
    }

    /// A sample with two legal moves: a capture of (2,2) from (1,1), and a
    /// quiet move far away. `enemy_behind` adds an enemy at (2,3) so both
    /// features fire for the capture; `enemy_target` controls whether the
    /// anchor holds an enemy at all.
    fn capture_sample(
        enemy_target: bool,
        enemy_behind: bool,
        expert: Vec<f32>,
    ) -> ExperienceSample {
        let mut state = BoardState::empty(6, 6);
        state.set_piece(Coord::new(1, 1), Some(0));
        state.set_piece(Coord::new(4, 0), Some(0));
        if enemy_target {
            state.set_piece(Coord::new(2, 2), Some(1));
        }
        if enemy_behind {
            state.set_piece(Coord::new(2, 3), Some(1));
        }
        let moves = vec![
            GridMove::new(Coord::new(1, 1), Coord::new(2, 2), 0),
            GridMove::new(Coord::new(4, 0), Coord::new(4, 1), 0),
        ];
        ExperienceSample::new(state, moves, expert, vec![0.0, 0.0])
    }

    fn expand_once(
        batch: &[ExperienceSample],
        features: &FeatureSet,
        seed: u64,
    ) -> Option<FeatureSet> {
        let refs: Vec<&ExperienceSample> = batch.iter().collect();
        let policy = LinearPolicy::new(1, features.len());
        let expander = CorrelationFeatureExpander::default();
        let mut rng = Pcg64Mcg::seed_from_u64(seed);
        expander.expand(
            &refs,
            features,
            &policy,
            0,
            &GridMatchEngine::new(),
            &mut rng,
        )
    }

    #[test]
    fn zero_signal_short_circuits() {
        // uniform expert equals the zero policy's uniform prediction:
        // every error is exactly zero
        let batch: Vec<ExperienceSample> = (0..10)
            .map(|_| capture_sample(true, true, vec![0.5, 0.5]))
            .collect();
        assert!(expand_once(&batch, &capture_features(), 1).is_none());
    }

    #[test]
    fn dominant_pair_adds_exactly_one_feature() {
        let mut batch = Vec::new();
        // both features co-active and the policy badly underpredicts
        for _ in 0..8 {
            batch.push(capture_sample(true, true, vec![0.9, 0.1]));
        }
        // each feature also fires alone, with little error
        for _ in 0..4 {
            batch.push(capture_sample(true, false, vec![0.6, 0.4]));
            batch.push(capture_sample(false, true, vec![0.5, 0.5]));
        }

        let features = capture_features();
        let expanded = expand_once(&batch, &features, 7).expect("expected an expansion");
        assert_eq!(expanded.len(), features.len() + 1);
        // existing features keep their indices
        for i in 0..features.len() {
            assert_eq!(expanded.pattern(i), features.pattern(i));
        }
        // the new feature is the union of the two constituents
        let combined = expanded.pattern(features.len());
        assert_eq!(combined.size(), 2);
        assert!(!combined.is_reactive());
    }

    #[test]
    fn expansion_is_deterministic_under_fixed_seed() {
        let mut batch = Vec::new();
        for _ in 0..8 {
            batch.push(capture_sample(true, true, vec![0.9, 0.1]));
        }
        for _ in 0..4 {
            batch.push(capture_sample(true, false, vec![0.6, 0.4]));
            batch.push(capture_sample(false, true, vec![0.5, 0.5]));
        }
        let features = capture_features();
        let first = expand_once(&batch, &features, 99);
        let second = expand_once(&batch, &features, 99);
        assert_eq!(first, second);
        assert!(first.is_some());
    }

    #[test]
    fn perfectly_correlated_pair_is_rejected() {
        // feature 1 replaced by a reactive response that fires exactly when
        // the capture feature fires: the opponent always just moved onto
        // the anchor
        let features = FeatureSet::new(vec![
            Pattern::proactive(vec![PatternElement::new(0, 0, CellTest::Enemy)]),
            Pattern::response(vec![], (0, 0)),
        ]);
        let batch: Vec<ExperienceSample> = (0..8)
            .map(|_| {
                let mut state = BoardState::empty(6, 6);
                state.set_piece(Coord::new(1, 1), Some(0));
                state.set_piece(Coord::new(4, 0), Some(0));
                state.set_piece(Coord::new(2, 2), Some(1));
                state.record_move(GridMove::new(Coord::new(3, 3), Coord::new(2, 2), 1));
                ExperienceSample::new(
                    state,
                    vec![
                        GridMove::new(Coord::new(1, 1), Coord::new(2, 2), 0),
                        GridMove::new(Coord::new(4, 0), Coord::new(4, 1), 0),
                    ],
                    vec![0.9, 0.1],
                    vec![0.0, 0.0],
                )
            })
            .collect();

        // the only non-self pair is perfectly correlated with both
        // constituents, so nothing survives scoring
        assert!(expand_once(&batch, &features, 13).is_none());
    }

    #[test]
    fn winning_moves_are_visited_first() {
        let mut sample = capture_sample(true, true, vec![0.5, 0.5]);
        sample.annotate_special_moves(
            MoveSet::from_indices(2, &[1]),
            MoveSet::new(2),
            MoveSet::new(2),
        );
        let mut rng = Pcg64Mcg::seed_from_u64(0);
        let order = move_priority_order(&sample, &mut rng);
        assert_eq!(order[0], 1);
        assert_eq!(order.len(), 2);
    }
}
