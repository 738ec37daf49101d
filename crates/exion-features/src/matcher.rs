//! Activation testing of pattern instances against game states.
//!
//! The matching engine is the boundary the training core consumes: given a
//! state and an action it reports the complete set of active pattern
//! instances, and given two co-active instances it synthesizes their
//! structural combination deterministically. The discovery engine's
//! statistics are only sound if `combine` is deterministic and
//! side-independent, which it gets for free here because combination works
//! on absolute cell tests and [`Pattern::new`] canonicalises the result.

use std::collections::HashSet;

use exion_game::{BoardState, GridMove};

use crate::{
    feature_set::FeatureSet,
    instance::FeatureInstance,
    pattern::{CellTest, Pattern, PatternElement, Symmetry},
};

/// Matching-engine contract (spec'd activation and synthesis primitives).
pub trait MatchEngine: Send + Sync {
    /// The complete set of pattern instances active for `mv` at `state`.
    ///
    /// Cell tests run against the state *before* the move is applied, so an
    /// `Enemy` test on the anchor itself recognises captures. Reactive
    /// patterns additionally require the state's last move.
    fn active_instances(
        &self,
        features: &FeatureSet,
        state: &BoardState,
        mv: GridMove,
    ) -> Vec<FeatureInstance>;

    /// Synthesizes the structural combination of two instances sharing an
    /// anchor. Deterministic: equal inputs in either order produce equal
    /// patterns.
    fn combine(&self, features: &FeatureSet, a: FeatureInstance, b: FeatureInstance) -> Pattern;
}

/// Matching engine for rectangular grid games.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridMatchEngine;

impl GridMatchEngine {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn cell_matches(state: &BoardState, mv: GridMove, x: i8, y: i8, test: CellTest) -> bool {
        let coord = mv.to.offset(x, y);
        if !state.contains(coord) {
            return false;
        }
        match test {
            CellTest::Empty => state.piece_at(coord).is_none(),
            CellTest::Friend => state.piece_at(coord) == Some(mv.mover),
            CellTest::Enemy => {
                state.piece_at(coord).is_some_and(|owner| owner != mv.mover)
            }
        }
    }

    fn image_matches(
        pattern: &Pattern,
        sym: Symmetry,
        state: &BoardState,
        mv: GridMove,
    ) -> bool {
        if let Some((dx, dy)) = pattern.from_offset() {
            let (dx, dy) = sym.apply(dx, dy);
            if mv.to.offset(dx, dy) != mv.from {
                return false;
            }
        }
        if let Some((dx, dy)) = pattern.last_from_offset() {
            let Some(last) = state.last_move() else {
                return false;
            };
            let (dx, dy) = sym.apply(dx, dy);
            if mv.to.offset(dx, dy) != last.from {
                return false;
            }
        }
        if let Some((dx, dy)) = pattern.last_to_offset() {
            let Some(last) = state.last_move() else {
                return false;
            };
            let (dx, dy) = sym.apply(dx, dy);
            if mv.to.offset(dx, dy) != last.to {
                return false;
            }
        }
        pattern.elements().iter().all(|e| {
            let (dx, dy) = sym.apply(e.dx, e.dy);
            Self::cell_matches(state, mv, dx, dy, e.test)
        })
    }

    /// The absolute footprint of one symmetry image: transformed elements
    /// and constraints, used to drop images that test identical cells.
    fn absolute_form(pattern: &Pattern, sym: Symmetry) -> AbsoluteForm {
        let mut elements: Vec<PatternElement> = pattern
            .elements()
            .iter()
            .map(|e| {
                let (dx, dy) = sym.apply(e.dx, e.dy);
                PatternElement::new(dx, dy, e.test)
            })
            .collect();
        elements.sort_unstable();
        AbsoluteForm {
            elements,
            from: pattern.from_offset().map(|(dx, dy)| sym.apply(dx, dy)),
            last_from: pattern.last_from_offset().map(|(dx, dy)| sym.apply(dx, dy)),
            last_to: pattern.last_to_offset().map(|(dx, dy)| sym.apply(dx, dy)),
        }
    }
}

/// One symmetry image's cell tests and constraints in anchor-relative
/// absolute coordinates.
#[derive(Debug, PartialEq, Eq, Hash)]
struct AbsoluteForm {
    elements: Vec<PatternElement>,
    from: Option<(i8, i8)>,
    last_from: Option<(i8, i8)>,
    last_to: Option<(i8, i8)>,
}

impl MatchEngine for GridMatchEngine {
    fn active_instances(
        &self,
        features: &FeatureSet,
        state: &BoardState,
        mv: GridMove,
    ) -> Vec<FeatureInstance> {
        let mut instances = Vec::new();
        for (feature, pattern) in features.iter().enumerate() {
            // Symmetric patterns match through several images with the same
            // absolute footprint; only the first of each footprint counts.
            let mut seen = HashSet::new();
            for sym in Symmetry::all() {
                if !Self::image_matches(pattern, sym, state, mv) {
                    continue;
                }
                if !seen.insert(Self::absolute_form(pattern, sym)) {
                    continue;
                }
                instances.push(FeatureInstance::new(
                    feature,
                    mv.to,
                    sym.rotation,
                    sym.reflection,
                ));
            }
        }
        instances
    }

    fn combine(&self, features: &FeatureSet, a: FeatureInstance, b: FeatureInstance) -> Pattern {
        assert_eq!(a.anchor, b.anchor, "combined instances must share an anchor");
        let sym_a = Symmetry {
            rotation: a.rotation,
            reflection: a.reflection,
        };
        let sym_b = Symmetry {
            rotation: b.rotation,
            reflection: b.reflection,
        };
        let form_a = Self::absolute_form(features.pattern(a.feature), sym_a);
        let form_b = Self::absolute_form(features.pattern(b.feature), sym_b);
        let mut elements = form_a.elements;
        elements.extend(form_b.elements);
        Pattern::new(
            elements,
            form_a.from.or(form_b.from),
            form_a.last_from.or(form_b.last_from),
            form_a.last_to.or(form_b.last_to),
        )
    }
}
