//! Online discovery of compound spatial features.
//!
//! The discovery engine consumes a batch of experience samples together
//! with the current policy and feature set, and proposes at most one new,
//! strictly larger feature set per call. Candidates are pairs of co-active
//! pattern instances; the engine performs statistical hypothesis testing
//! over their co-activation/error correlation to decide which compound
//! pattern, if any, best explains the policy's prediction errors.
//!
//! Failure to expand is a statistically expected, frequent outcome: a call
//! that finds no justified candidate returns `None` and the caller simply
//! trains longer on the existing vocabulary.
//!
//! # Modules
//!
//! - [`observations`]: per-batch error computation and per-feature
//!   activation bookkeeping
//! - [`selection`]: bounded, softmax-weighted instance selection with
//!   batch-global preserve/discard consistency
//! - [`statistics`]: pair-keyed co-activation and error accumulators
//! - [`expander`]: the correlation-based expansion engine itself

use exion_experience::ExperienceSample;
use exion_features::{FeatureSet, MatchEngine};
use exion_policy::LinearPolicy;
use rand::RngCore;

pub use self::expander::{CorrelationFeatureExpander, ExpansionConfig};

pub mod expander;
pub mod observations;
pub mod selection;
pub mod statistics;

/// A feature-set growth policy.
///
/// Implementations must not mutate the inputs, must be deterministic up to
/// the supplied random source, and must be safe to call concurrently for
/// different players/feature sets.
pub trait FeatureExpander: Send + Sync {
    /// Proposes a strictly richer feature set for one player, or `None`
    /// when no statistically justified candidate exists.
    fn expand(
        &self,
        batch: &[&ExperienceSample],
        features: &FeatureSet,
        policy: &LinearPolicy,
        player: usize,
        matcher: &dyn MatchEngine,
        rng: &mut dyn RngCore,
    ) -> Option<FeatureSet>;
}
