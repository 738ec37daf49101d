//! Feature instances and canonically ordered instance pairs.

use exion_game::Coord;

use crate::{feature_set::FeatureSet, matcher::MatchEngine, pattern::Pattern};

/// One concrete placement of a pattern: a feature index into the active
/// [`FeatureSet`], an anchor cell, and the symmetry image that matched.
///
/// Field order matters: the derived ordering (feature index, then
/// reflection, then rotation, then anchor) is the canonical ordering used
/// to make instance pairs side-independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureInstance {
    pub feature: usize,
    pub reflection: bool,
    pub rotation: u8,
    pub anchor: Coord,
}

impl FeatureInstance {
    #[must_use]
    pub const fn new(feature: usize, anchor: Coord, rotation: u8, reflection: bool) -> Self {
        Self {
            feature,
            reflection,
            rotation,
            anchor,
        }
    }
}

/// A pair of active instances at one decision point, with the compound
/// pattern both would synthesize computed once at construction.
///
/// The constituents are stored in canonical order, so `(a, b)` and `(b, a)`
/// construct identical pairs. Equality and hashing are defined **solely**
/// by the combined pattern: two structurally different instance pairs that
/// synthesize an equal compound pattern are the same key. The discovery
/// engine relies on this to merge their statistics.
#[derive(Debug, Clone)]
pub struct InstancePair {
    a: FeatureInstance,
    b: FeatureInstance,
    combined: Pattern,
}

impl InstancePair {
    /// Builds the pair, ordering the constituents canonically and
    /// synthesizing the combined pattern through the matching engine.
    ///
    /// The self-pair `(a, a)` degenerates to the instance's own underlying
    /// pattern; it is used to aggregate per-feature activation statistics.
    #[must_use]
    pub fn new(
        engine: &dyn MatchEngine,
        features: &FeatureSet,
        a: FeatureInstance,
        b: FeatureInstance,
    ) -> Self {
        let (a, b) = if a <= b { (a, b) } else { (b, a) };
        let combined = if a == b {
            features.pattern(a.feature).clone()
        } else {
            engine.combine(features, a, b)
        };
        Self { a, b, combined }
    }

    /// The canonically first constituent.
    #[must_use]
    pub fn first(&self) -> FeatureInstance {
        self.a
    }

    /// The canonically second constituent.
    #[must_use]
    pub fn second(&self) -> FeatureInstance {
        self.b
    }

    /// Whether this is the degenerate self-pair.
    #[must_use]
    pub fn is_self_pair(&self) -> bool {
        self.a == self.b
    }

    /// The compound pattern this pair synthesizes.
    #[must_use]
    pub fn combined(&self) -> &Pattern {
        &self.combined
    }
}

impl PartialEq for InstancePair {
    fn eq(&self, other: &Self) -> bool {
        self.combined == other.combined
    }
}

impl Eq for InstancePair {}

impl std::hash::Hash for InstancePair {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.combined.hash(state);
    }
}
