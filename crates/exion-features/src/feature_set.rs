//! Ordered collections of distinct spatial patterns.

use serde::{Deserialize, Serialize};

use crate::pattern::{CellTest, Pattern, PatternElement};

/// An ordered, duplicate-free collection of patterns.
///
/// Feature indices into the set are stable: expansion only ever appends.
/// Because patterns are canonicalised at construction, duplicate detection
/// in [`FeatureSet::expand`] is insensitive to rotation and reflection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSet {
    patterns: Vec<Pattern>,
}

impl FeatureSet {
    /// Builds a feature set from patterns.
    ///
    /// # Panics
    ///
    /// Panics if two patterns are equal under symmetry; starter sets are
    /// built by hand and must not carry hidden duplicates.
    #[must_use]
    pub fn new(patterns: Vec<Pattern>) -> Self {
        for (i, a) in patterns.iter().enumerate() {
            for b in &patterns[..i] {
                assert!(a != b, "duplicate pattern in feature set");
            }
        }
        Self { patterns }
    }

    /// A small starter vocabulary of atomic patterns: every cell test at
    /// the two symmetry-distinct neighbour offsets, a capture test on the
    /// anchor itself, and one reactive response pattern keyed on the
    /// previous decision's target cell.
    #[must_use]
    pub fn starter() -> Self {
        let mut patterns = Vec::new();
        for test in [CellTest::Empty, CellTest::Friend, CellTest::Enemy] {
            patterns.push(Pattern::proactive(vec![PatternElement::new(0, 1, test)]));
            patterns.push(Pattern::proactive(vec![PatternElement::new(1, 1, test)]));
        }
        // moving onto an occupied cell (a capture)
        patterns.push(Pattern::proactive(vec![PatternElement::new(
            0,
            0,
            CellTest::Enemy,
        )]));
        // responding on the cell the opponent just moved to
        patterns.push(Pattern::response(vec![], (0, 0)));
        Self::new(patterns)
    }

    /// Number of features in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// The pattern at a feature index.
    #[must_use]
    pub fn pattern(&self, feature: usize) -> &Pattern {
        &self.patterns[feature]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pattern> + '_ {
        self.patterns.iter()
    }

    /// Returns a strictly larger feature set with `pattern` appended, or
    /// `None` if an equal pattern (under any rotation or reflection)
    /// already exists. Duplicate synthesis is a normal negative result for
    /// the discovery engine, not an error.
    #[must_use]
    pub fn expand(&self, pattern: Pattern) -> Option<FeatureSet> {
        if self.patterns.contains(&pattern) {
            return None;
        }
        let mut patterns = self.patterns.clone();
        patterns.push(pattern);
        Some(Self { patterns })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starter_set_is_duplicate_free() {
        let set = FeatureSet::starter();
        assert!(set.len() >= 8);
        for (i, a) in set.iter().enumerate() {
            for (j, b) in set.iter().enumerate() {
                assert_eq!(i == j, a == b);
            }
        }
    }

    #[test]
    fn expand_appends_new_pattern() {
        let set = FeatureSet::starter();
        let pattern = Pattern::proactive(vec![
            PatternElement::new(0, 1, CellTest::Enemy),
            PatternElement::new(1, 1, CellTest::Enemy),
        ]);
        let expanded = set.expand(pattern.clone()).unwrap();
        assert_eq!(expanded.len(), set.len() + 1);
        assert_eq!(expanded.pattern(set.len()), &pattern);
        // original indices are untouched
        for i in 0..set.len() {
            assert_eq!(expanded.pattern(i), set.pattern(i));
        }
    }

    #[test]
    fn expand_rejects_existing_pattern() {
        let set = FeatureSet::starter();
        let existing = set.pattern(0).clone();
        assert!(set.expand(existing).is_none());
    }

    #[test]
    fn expand_rejects_symmetric_image_of_existing_pattern() {
        let set = FeatureSet::new(vec![Pattern::proactive(vec![PatternElement::new(
            0,
            1,
            CellTest::Enemy,
        )])]);
        // the same test one quarter-turn away
        let rotated = Pattern::proactive(vec![PatternElement::new(-1, 0, CellTest::Enemy)]);
        assert!(set.expand(rotated).is_none());
    }
}
