//! Linear policy over sparse spatial-feature activations.
//!
//! The learned policy is a per-player linear function: a move's logit is
//! the sum of the weights of the features active for that move, and the
//! policy distribution over a state's legal moves is the softmax of those
//! logits. The policy imitates a search-based expert via cross-entropy
//! gradient steps, and its weight vectors grow online as the feature
//! vocabulary grows.
//!
//! # Modules
//!
//! - [`linear`]: the policy itself and its gradient computation
//! - [`optimiser`]: RMSProp update rule with per-player state
//! - [`weights`]: weight-vector helpers

pub use self::{linear::LinearPolicy, optimiser::RmsProp};

pub mod linear;
pub mod optimiser;
pub mod weights;
