//! Spatial feature system for the Exion training core.
//!
//! A *spatial feature* is a structural template over board cells, anchored
//! at a move's target cell, that a state/action pair either matches or does
//! not. This crate provides:
//!
//! - [`Pattern`]: a canonicalised template of relative cell tests, with
//!   optional from-cell and previous-move constraints ([`pattern`] module)
//! - [`FeatureInstance`]: one concrete placement of a pattern at an
//!   anchor/rotation/reflection, and [`InstancePair`], the canonically
//!   ordered pair entity the discovery engine aggregates statistics over
//!   ([`instance`] module)
//! - [`FeatureSet`]: an ordered collection of distinct patterns with a
//!   duplicate-rejecting expansion primitive ([`feature_set`] module)
//! - [`MatchEngine`] and [`GridMatchEngine`]: activation testing of pattern
//!   instances against game states, and deterministic synthesis of compound
//!   patterns from two co-active instances ([`matcher`] module)
//!
//! Patterns are always stored in canonical form: equality and hashing are
//! insensitive to board rotation and reflection, which is what makes
//! duplicate rejection and pair-statistics aggregation sound.

pub use self::{
    feature_set::FeatureSet,
    instance::{FeatureInstance, InstancePair},
    matcher::{GridMatchEngine, MatchEngine},
    pattern::{CellTest, Pattern, PatternElement, Symmetry},
};

pub mod feature_set;
pub mod instance;
pub mod matcher;
pub mod pattern;
