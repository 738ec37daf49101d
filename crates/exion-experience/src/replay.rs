//! Uniform replay buffer.

use std::collections::VecDeque;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::sample::ExperienceSample;

/// A capacity-bounded FIFO of experience samples with uniform sampling.
///
/// Appends happen on the orchestrator thread at episode end; sampling takes
/// `&self` and may run from parallel expansion tasks, which is sound
/// because the borrow checker forbids an append while any sampling borrow
/// is live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniformReplayBuffer {
    samples: VecDeque<ExperienceSample>,
    capacity: usize,
}

impl UniformReplayBuffer {
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "replay buffer capacity must be positive");
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends a finalised sample, evicting the oldest when full.
    pub fn add(&mut self, sample: ExperienceSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Draws up to `n` samples uniformly without replacement.
    pub fn sample_batch<R>(&self, n: usize, rng: &mut R) -> Vec<&ExperienceSample>
    where
        R: Rng + ?Sized,
    {
        let amount = n.min(self.samples.len());
        rand::seq::index::sample(rng, self.samples.len(), amount)
            .into_iter()
            .map(|i| &self.samples[i])
            .collect()
    }
}
