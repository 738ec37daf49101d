//! Abstract-game contract for the Exion training system.
//!
//! This crate defines the rules-engine boundary the trainer and the feature
//! discovery engine operate against: a shared [`BoardState`] snapshot type
//! for grid games with from/to moves, an object-safe [`GameRules`] trait,
//! and one bundled implementation ([`Breakthrough`]) used by self-play runs
//! and tests.
//!
//! The contract is deliberately narrow. Everything the training core needs
//! is: the legal moves at a state, move application, terminal detection,
//! per-player outcomes, and enough board introspection (cell contents, the
//! last decision-defining move) for spatial feature matching.

pub use self::{
    breakthrough::Breakthrough,
    rules::GameRules,
    state::{BoardState, Coord, GridMove, Outcome, Player},
};

pub mod breakthrough;
pub mod rules;
pub mod state;

#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("move is not legal in this state")]
pub struct IllegalMoveError;
