//! Pair-keyed co-activation and error accumulators.
//!
//! Statistics are keyed by the canonical combined pattern of an instance
//! pair, so structurally different pairs that synthesize the same compound
//! pattern share one accumulator. Entries preserve insertion order, which
//! keeps the whole expansion call deterministic under a fixed seed (hash
//! map iteration order would not).

use std::collections::HashMap;

use exion_features::InstancePair;

/// Accumulator for one combined-pattern key.
#[derive(Debug)]
pub struct PairRecord {
    /// A representative pair synthesizing this key's pattern.
    pub pair: InstancePair,
    /// Number of cases in which the pair was co-active (and kept).
    pub count: u32,
    /// Sum of contributing errors over those cases.
    pub error_sum: f32,
}

/// Insertion-ordered map from combined-pattern keys to accumulators.
#[derive(Debug, Default)]
pub struct PairStatistics {
    records: Vec<PairRecord>,
    index: HashMap<InstancePair, usize>,
}

impl PairStatistics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one co-activation case for the pair's key.
    pub fn record(&mut self, pair: InstancePair, error: f32) {
        if let Some(&i) = self.index.get(&pair) {
            let record = &mut self.records[i];
            record.count += 1;
            record.error_sum += error;
        } else {
            self.index.insert(pair.clone(), self.records.len());
            self.records.push(PairRecord {
                pair,
                count: 1,
                error_sum: error,
            });
        }
    }

    /// Number of cases in which the given key was counted; zero for keys
    /// never recorded.
    #[must_use]
    pub fn count(&self, pair: &InstancePair) -> u32 {
        self.index.get(pair).map_or(0, |&i| self.records[i].count)
    }

    /// All records in insertion order.
    #[must_use]
    pub fn records(&self) -> &[PairRecord] {
        &self.records
    }
}
