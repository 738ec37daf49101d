//! Monotone per-feature special-move status.
//!
//! For every feature the table tracks whether, so far in the run, each of
//! its active instances has only ever occurred for winning (respectively
//! losing, anti-defeating) moves. A bit is cleared the first time the
//! feature is seen active for a move without the property and is never set
//! again: the flagged sets shrink monotonically across the whole run.

/// Per-feature "always winning / losing / anti-defeating" flags for one
/// player.
#[derive(Debug, Clone)]
pub struct FeatureStatusTable {
    always_winning: Vec<bool>,
    always_losing: Vec<bool>,
    always_anti_defeating: Vec<bool>,
}

impl FeatureStatusTable {
    /// All features start fully flagged; observations only clear bits.
    #[must_use]
    pub fn new(feature_count: usize) -> Self {
        Self {
            always_winning: vec![true; feature_count],
            always_losing: vec![true; feature_count],
            always_anti_defeating: vec![true; feature_count],
        }
    }

    /// Grows the table for an expanded feature set; new features start
    /// fully flagged.
    ///
    /// # Panics
    ///
    /// Panics if `feature_count` shrinks the table.
    pub fn grow(&mut self, feature_count: usize) {
        assert!(feature_count >= self.always_winning.len());
        self.always_winning.resize(feature_count, true);
        self.always_losing.resize(feature_count, true);
        self.always_anti_defeating.resize(feature_count, true);
    }

    /// Records one observed move with the given properties and active
    /// features, clearing the flags the move contradicts.
    pub fn observe(
        &mut self,
        winning: bool,
        losing: bool,
        anti_defeating: bool,
        active_features: &[usize],
    ) {
        for &f in active_features {
            if !winning {
                self.always_winning[f] = false;
            }
            if !losing {
                self.always_losing[f] = false;
            }
            if !anti_defeating {
                self.always_anti_defeating[f] = false;
            }
        }
    }

    #[must_use]
    pub fn is_always_winning(&self, feature: usize) -> bool {
        self.always_winning[feature]
    }

    #[must_use]
    pub fn is_always_losing(&self, feature: usize) -> bool {
        self.always_losing[feature]
    }

    #[must_use]
    pub fn is_always_anti_defeating(&self, feature: usize) -> bool {
        self.always_anti_defeating[feature]
    }

    /// Number of features still flagged as always winning.
    #[must_use]
    pub fn always_winning_count(&self) -> usize {
        self.always_winning.iter().filter(|b| **b).count()
    }

    fn flags(&self) -> impl Iterator<Item = bool> + '_ {
        self.always_winning
            .iter()
            .chain(&self.always_losing)
            .chain(&self.always_anti_defeating)
            .copied()
    }

    /// Whether `other` could have evolved from `self` by observations
    /// alone: no flag cleared here may be set there.
    #[must_use]
    pub fn is_shrinkage_of(&self, earlier: &Self) -> bool {
        self.flags()
            .zip(earlier.flags())
            .all(|(now, before)| before || !now)
    }
}
