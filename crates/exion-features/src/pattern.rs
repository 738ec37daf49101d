//! Pattern templates and their canonical form.
//!
//! A pattern is a set of cell tests at offsets relative to an anchor (the
//! target cell of a move), plus two optional positional constraints: the
//! offset of the move's own from-cell, and the offset of the *previous*
//! decision's target cell. A pattern carrying the latter is *reactive*: it
//! can only be active when the immediately preceding move landed at a
//! specific cell relative to the anchor.
//!
//! Two patterns that differ only by board rotation or reflection describe
//! the same structural situation, so every pattern is stored in canonical
//! form: of the eight symmetric images, the lexicographically smallest one.
//! Equality and hashing on [`Pattern`] therefore coincide with structural
//! identity under symmetry.

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

/// Test applied to one board cell, relative to the moving player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellTest {
    /// The cell is empty.
    Empty,
    /// The cell holds a piece of the mover.
    Friend,
    /// The cell holds a piece of any other player.
    Enemy,
}

/// One cell test at an offset from the anchor.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct PatternElement {
    pub dx: i8,
    pub dy: i8,
    pub test: CellTest,
}

impl PatternElement {
    #[must_use]
    pub const fn new(dx: i8, dy: i8, test: CellTest) -> Self {
        Self { dx, dy, test }
    }
}

/// One of the eight grid symmetries: an optional reflection followed by a
/// quarter-turn rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symmetry {
    pub rotation: u8,
    pub reflection: bool,
}

impl Symmetry {
    /// Identity transform.
    pub const IDENTITY: Self = Self {
        rotation: 0,
        reflection: false,
    };

    /// All eight grid symmetries, identity first.
    #[must_use]
    pub fn all() -> ArrayVec<Self, 8> {
        let mut all = ArrayVec::new();
        for reflection in [false, true] {
            for rotation in 0..4 {
                all.push(Self {
                    rotation,
                    reflection,
                });
            }
        }
        all
    }

    /// Applies the transform to an offset.
    #[must_use]
    pub fn apply(self, dx: i8, dy: i8) -> (i8, i8) {
        let (mut x, mut y) = if self.reflection { (-dx, dy) } else { (dx, dy) };
        for _ in 0..self.rotation {
            (x, y) = (-y, x);
        }
        (x, y)
    }
}

/// A canonicalised spatial pattern.
///
/// Constructors canonicalise, so two patterns are `==` exactly when they
/// are the same structure under some grid symmetry. Elements are sorted and
/// deduplicated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pattern {
    elements: Vec<PatternElement>,
    from_offset: Option<(i8, i8)>,
    last_from_offset: Option<(i8, i8)>,
    last_to_offset: Option<(i8, i8)>,
}

impl Pattern {
    /// Builds a proactive pattern from cell tests alone.
    #[must_use]
    pub fn proactive(elements: Vec<PatternElement>) -> Self {
        Self::new(elements, None, None, None)
    }

    /// Builds a reactive pattern keyed on the previous decision's target
    /// cell.
    #[must_use]
    pub fn response(elements: Vec<PatternElement>, last_to_offset: (i8, i8)) -> Self {
        Self::new(elements, None, None, Some(last_to_offset))
    }

    /// Builds a pattern with optional from-cell and previous-move
    /// constraints, canonicalising under the eight grid symmetries.
    ///
    /// # Panics
    ///
    /// Panics if the pattern is completely empty (no elements and no
    /// positional constraints); such a pattern would be active everywhere
    /// and carries no information.
    #[must_use]
    pub fn new(
        elements: Vec<PatternElement>,
        from_offset: Option<(i8, i8)>,
        last_from_offset: Option<(i8, i8)>,
        last_to_offset: Option<(i8, i8)>,
    ) -> Self {
        assert!(
            !elements.is_empty()
                || from_offset.is_some()
                || last_from_offset.is_some()
                || last_to_offset.is_some(),
            "empty pattern"
        );
        Symmetry::all()
            .into_iter()
            .map(|sym| {
                let mut transformed: Vec<PatternElement> = elements
                    .iter()
                    .map(|e| {
                        let (dx, dy) = sym.apply(e.dx, e.dy);
                        PatternElement::new(dx, dy, e.test)
                    })
                    .collect();
                transformed.sort_unstable();
                transformed.dedup();
                Self {
                    elements: transformed,
                    from_offset: from_offset.map(|(dx, dy)| sym.apply(dx, dy)),
                    last_from_offset: last_from_offset.map(|(dx, dy)| sym.apply(dx, dy)),
                    last_to_offset: last_to_offset.map(|(dx, dy)| sym.apply(dx, dy)),
                }
            })
            .min_by(|a, b| a.form().cmp(&b.form()))
            .unwrap()
    }

    /// Total ordering key used to pick the canonical image.
    #[expect(clippy::type_complexity)]
    fn form(
        &self,
    ) -> (
        &[PatternElement],
        Option<(i8, i8)>,
        Option<(i8, i8)>,
        Option<(i8, i8)>,
    ) {
        (
            &self.elements,
            self.from_offset,
            self.last_from_offset,
            self.last_to_offset,
        )
    }

    /// Cell tests relative to the anchor, in canonical order.
    #[must_use]
    pub fn elements(&self) -> &[PatternElement] {
        &self.elements
    }

    /// Required offset of the move's from-cell, if constrained.
    #[must_use]
    pub fn from_offset(&self) -> Option<(i8, i8)> {
        self.from_offset
    }

    /// Required offset of the previous decision's source cell, if any.
    #[must_use]
    pub fn last_from_offset(&self) -> Option<(i8, i8)> {
        self.last_from_offset
    }

    /// Required offset of the previous decision's target cell, if any.
    #[must_use]
    pub fn last_to_offset(&self) -> Option<(i8, i8)> {
        self.last_to_offset
    }

    /// Whether the pattern conditions on the previous decision.
    #[must_use]
    pub fn is_reactive(&self) -> bool {
        self.last_from_offset.is_some() || self.last_to_offset.is_some()
    }

    /// Number of cell tests; a proxy for pattern specificity.
    #[must_use]
    pub fn size(&self) -> usize {
        self.elements.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetry_identity_is_noop() {
        assert_eq!(Symmetry::IDENTITY.apply(2, -3), (2, -3));
    }

    #[test]
    fn four_rotations_return_home() {
        let sym = Symmetry {
            rotation: 1,
            reflection: false,
        };
        let mut offset = (2, 1);
        for _ in 0..4 {
            offset = sym.apply(offset.0, offset.1);
        }
        assert_eq!(offset, (2, 1));
    }

    #[test]
    fn rotated_patterns_are_equal() {
        let a = Pattern::proactive(vec![PatternElement::new(0, 1, CellTest::Enemy)]);
        let b = Pattern::proactive(vec![PatternElement::new(1, 0, CellTest::Enemy)]);
        let c = Pattern::proactive(vec![PatternElement::new(0, -1, CellTest::Enemy)]);
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn reflected_patterns_are_equal() {
        let a = Pattern::proactive(vec![
            PatternElement::new(1, 1, CellTest::Enemy),
            PatternElement::new(0, 1, CellTest::Empty),
        ]);
        let b = Pattern::proactive(vec![
            PatternElement::new(-1, 1, CellTest::Enemy),
            PatternElement::new(0, 1, CellTest::Empty),
        ]);
        assert_eq!(a, b);
    }

    #[test]
    fn different_tests_differ() {
        let a = Pattern::proactive(vec![PatternElement::new(0, 1, CellTest::Enemy)]);
        let b = Pattern::proactive(vec![PatternElement::new(0, 1, CellTest::Friend)]);
        assert_ne!(a, b);
    }

    #[test]
    fn positional_constraints_rotate_with_elements() {
        let a = Pattern::new(
            vec![PatternElement::new(0, 1, CellTest::Empty)],
            Some((0, -1)),
            None,
            None,
        );
        let b = Pattern::new(
            vec![PatternElement::new(1, 0, CellTest::Empty)],
            Some((-1, 0)),
            None,
            None,
        );
        assert_eq!(a, b);
    }

    #[test]
    fn reactive_flag_survives_canonicalisation() {
        let p = Pattern::response(vec![PatternElement::new(1, 1, CellTest::Friend)], (0, 1));
        assert!(p.is_reactive());
        let q = Pattern::proactive(vec![PatternElement::new(1, 1, CellTest::Friend)]);
        assert!(!q.is_reactive());
        assert_ne!(p, q);
    }

    #[test]
    fn last_from_and_last_to_are_distinct_constraints() {
        let by_source = Pattern::new(vec![], None, Some((0, 1)), None);
        let by_target = Pattern::new(vec![], None, None, Some((0, 1)));
        assert!(by_source.is_reactive());
        assert!(by_target.is_reactive());
        assert_ne!(by_source, by_target);
    }

    #[test]
    fn duplicate_elements_are_merged() {
        let p = Pattern::proactive(vec![
            PatternElement::new(0, 1, CellTest::Enemy),
            PatternElement::new(0, 1, CellTest::Enemy),
        ]);
        assert_eq!(p.size(), 1);
    }

    #[test]
    fn pattern_round_trips_through_json() {
        let p = Pattern::new(
            vec![PatternElement::new(1, 1, CellTest::Enemy)],
            Some((0, -1)),
            None,
            Some((1, 0)),
        );
        let json = serde_json::to_string(&p).unwrap();
        let restored: Pattern = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, p);
    }
}
