//! Per-batch error computation and feature activation bookkeeping.
//!
//! The first pass over a batch computes, for every sample, the policy's
//! predicted distribution and the signed error vector against the expert's
//! (adjusted) distribution, along with the active pattern instances per
//! legal move. One decision/action *case* is one (sample, legal move)
//! pair; all counts and correlations downstream are out of the total
//! number of cases.

use exion_experience::ExperienceSample;
use exion_features::{FeatureInstance, FeatureSet, MatchEngine};
use exion_policy::LinearPolicy;
use exion_stats::correlation;

/// One sample's worth of derived data.
pub struct CaseData<'a> {
    pub sample: &'a ExperienceSample,
    /// Active pattern instances per legal move.
    pub move_instances: Vec<Vec<FeatureInstance>>,
    /// Unique active feature indices per legal move.
    pub move_features: Vec<Vec<usize>>,
    /// Signed error per legal move: predicted minus expert.
    pub errors: Vec<f32>,
    /// Sum of absolute errors; drives the sample processing order.
    pub abs_error_sum: f32,
    /// Smallest signed error across this sample's moves.
    pub min_error: f32,
    /// Largest signed error across this sample's moves.
    pub max_error: f32,
}

impl CaseData<'_> {
    /// The error contribution a move feeds into pair statistics.
    ///
    /// Winning moves contribute the sample's minimum error, losing moves
    /// the maximum, anti-defeating moves at most slightly above the
    /// minimum. This deliberately biases statistics toward correlation
    /// with known-good and known-bad outcomes rather than raw policy
    /// error alone.
    #[must_use]
    pub fn contributing_error(&self, move_index: usize) -> f32 {
        let sample = self.sample;
        if sample.winning_moves().contains(move_index) {
            self.min_error
        } else if sample.losing_moves().contains(move_index) {
            self.max_error
        } else if sample.anti_defeating_moves().contains(move_index) {
            f32::min(self.errors[move_index], self.min_error + 0.1)
        } else {
            self.errors[move_index]
        }
    }
}

/// Aggregates over all cases of a batch.
pub struct BatchObservations<'a> {
    pub cases: Vec<CaseData<'a>>,
    /// Total number of decision/action cases.
    pub total_cases: u32,
    /// Signed error sum over all cases.
    pub error_sum: f32,
    /// Sum of squared errors over all cases.
    pub error_sq_sum: f32,
    /// Sum of absolute errors over all cases.
    pub abs_error_sum: f32,
    /// Per feature: number of cases in which it was active.
    pub feature_active_count: Vec<u32>,
    /// Per feature: signed error sum over cases in which it was active.
    pub feature_error_sum: Vec<f32>,
}

impl<'a> BatchObservations<'a> {
    /// Runs the error-computation pass over a batch.
    pub fn collect(
        batch: &[&'a ExperienceSample],
        features: &FeatureSet,
        policy: &LinearPolicy,
        player: usize,
        matcher: &dyn MatchEngine,
    ) -> Self {
        let mut cases = Vec::with_capacity(batch.len());
        let mut total_cases = 0u32;
        let mut error_sum = 0.0;
        let mut error_sq_sum = 0.0;
        let mut abs_error_sum = 0.0;
        let mut feature_active_count = vec![0u32; features.len()];
        let mut feature_error_sum = vec![0.0f32; features.len()];

        for sample in batch {
            let move_instances: Vec<Vec<FeatureInstance>> = sample
                .legal_moves()
                .iter()
                .map(|&mv| matcher.active_instances(features, sample.state(), mv))
                .collect();
            let move_features: Vec<Vec<usize>> = move_instances
                .iter()
                .map(|instances| {
                    let mut active: Vec<usize> =
                        instances.iter().map(|inst| inst.feature).collect();
                    active.sort_unstable();
                    active.dedup();
                    active
                })
                .collect();

            let predicted = policy.compute_distribution(&move_features, player);
            let expert = sample.expert_distribution();
            let errors: Vec<f32> = predicted
                .iter()
                .zip(&expert)
                .map(|(p, e)| p - e)
                .collect();

            let mut sample_abs_sum = 0.0;
            let mut min_error = f32::INFINITY;
            let mut max_error = f32::NEG_INFINITY;
            for (active, &err) in move_features.iter().zip(&errors) {
                total_cases += 1;
                error_sum += err;
                error_sq_sum += err * err;
                sample_abs_sum += err.abs();
                min_error = f32::min(min_error, err);
                max_error = f32::max(max_error, err);
                for &f in active {
                    feature_active_count[f] += 1;
                    feature_error_sum[f] += err;
                }
            }
            abs_error_sum += sample_abs_sum;

            cases.push(CaseData {
                sample,
                move_instances,
                move_features,
                errors,
                abs_error_sum: sample_abs_sum,
                min_error,
                max_error,
            });
        }

        Self {
            cases,
            total_cases,
            error_sum,
            error_sq_sum,
            abs_error_sum,
            feature_active_count,
            feature_error_sum,
        }
    }

    /// Whether the batch carries any error signal at all.
    #[must_use]
    pub fn has_error_signal(&self) -> bool {
        self.abs_error_sum != 0.0 && self.error_sq_sum != 0.0
    }

    /// Whether a feature's running activation ratio has saturated to 1.0
    /// (active in every case, hence uninformative).
    #[must_use]
    pub fn is_saturated(&self, feature: usize) -> bool {
        self.feature_active_count[feature] == self.total_cases
    }

    /// Auxiliary correlation heuristic between a feature's activation and
    /// the error, used to prioritise candidate instances. Zero when the
    /// correlation is undefined.
    #[must_use]
    pub fn feature_error_correlation(&self, feature: usize) -> f32 {
        let r = correlation::point_biserial(
            self.feature_error_sum[feature],
            self.feature_active_count[feature],
            self.error_sum,
            self.error_sq_sum,
            self.total_cases,
        );
        if r.is_finite() { r } else { 0.0 }
    }

    /// Mean error observed while a feature was active. Zero for features
    /// never seen active.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn expected_error_given_active(&self, feature: usize) -> f32 {
        let count = self.feature_active_count[feature];
        if count == 0 {
            0.0
        } else {
            self.feature_error_sum[feature] / count as f32
        }
    }

    /// Case indices ordered by descending sum of absolute errors, so the
    /// bounded instance budget is spent on the worst-predicted samples
    /// first.
    #[must_use]
    pub fn case_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.cases.len()).collect();
        order.sort_by(|&a, &b| {
            self.cases[b]
                .abs_error_sum
                .total_cmp(&self.cases[a].abs_error_sum)
        });
        order
    }
}
