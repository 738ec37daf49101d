use chrono::{DateTime, Utc};
use exion_features::FeatureSet;
use serde::{Deserialize, Serialize};

/// Exported result of one training run.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrainedModel {
    pub name: String,
    pub game: String,
    pub trained_at: DateTime<Utc>,
    pub games: u32,
    pub actions: u64,
    pub players: Vec<PlayerModel>,
}

/// One player's learned vocabulary and weights.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayerModel {
    pub features: FeatureSet,
    pub weights: Vec<f32>,
}

impl PlayerModel {
    /// Feature indices ordered by descending weight magnitude.
    #[must_use]
    pub fn features_by_influence(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.weights.len()).collect();
        order.sort_by(|&a, &b| self.weights[b].abs().total_cmp(&self.weights[a].abs()));
        order
    }
}
