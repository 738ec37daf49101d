use std::path::PathBuf;

use chrono::Utc;
use exion_discovery::ExpansionConfig;
use exion_features::FeatureSet;
use exion_game::{Breakthrough, GameRules};
use exion_trainer::{
    CheckpointCounter, Expert as _, FlatMonteCarloExpert, SelfPlayTrainer, TrainerConfig,
};

use crate::{
    model::trained_model::{PlayerModel, TrainedModel},
    util,
};

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, derive_more::FromStr)]
pub enum CounterKind {
    #[default]
    Games,
    WeightUpdates,
}

impl From<CounterKind> for CheckpointCounter {
    fn from(kind: CounterKind) -> Self {
        match kind {
            CounterKind::Games => CheckpointCounter::Games,
            CounterKind::WeightUpdates => CheckpointCounter::WeightUpdates,
        }
    }
}

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct TrainArg {
    /// Model name recorded in the output file
    #[arg(long, default_value = "exion")]
    name: String,
    /// Number of self-play games
    #[arg(long, default_value_t = 100)]
    games: u32,
    /// Board width
    #[arg(long, default_value_t = 6)]
    width: u8,
    /// Board height
    #[arg(long, default_value_t = 6)]
    height: u8,
    /// Run feature discovery every N games (0 disables growth)
    #[arg(long, default_value_t = 5)]
    add_feature_every: u32,
    /// Gradient step every N actions
    #[arg(long, default_value_t = 16)]
    update_weights_every: u64,
    /// Batch size for gradient updates and discovery
    #[arg(long, default_value_t = 32)]
    batch_size: usize,
    /// Expert playout budget per decision
    #[arg(long, default_value_t = 128)]
    thinking_budget: u32,
    /// Let the expert prune playouts with material score bounds
    #[arg(long)]
    score_bounds: bool,
    /// Random seed
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Checkpoint directory (checkpoints disabled when absent)
    #[arg(long)]
    checkpoint_dir: Option<PathBuf>,
    /// Checkpoint every N games
    #[arg(long, default_value_t = 25)]
    checkpoint_every: u32,
    /// Which counter names checkpoint files
    #[arg(long, default_value = "games")]
    checkpoint_counter: CounterKind,
    /// Output file path for the trained model
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &TrainArg) -> anyhow::Result<()> {
    let rules = Breakthrough::with_size(arg.width, arg.height);
    let config = TrainerConfig {
        games: arg.games,
        add_feature_every: arg.add_feature_every.max(1),
        update_weights_every: arg.update_weights_every,
        batch_size: arg.batch_size,
        thinking_budget: arg.thinking_budget,
        grow_features: arg.add_feature_every > 0,
        expansion: ExpansionConfig::default(),
        checkpoint_every_games: arg.checkpoint_dir.as_ref().map(|_| arg.checkpoint_every),
        checkpoint_counter: arg.checkpoint_counter.into(),
        seed: arg.seed,
        ..TrainerConfig::default()
    };

    let mut trainer = SelfPlayTrainer::new(&rules, FeatureSet::starter(), config)?;
    if let Some(dir) = &arg.checkpoint_dir {
        trainer = trainer.with_checkpoint_dir(dir.clone());
    }

    let mut expert = FlatMonteCarloExpert::new();
    if arg.score_bounds {
        match expert.as_score_bounds() {
            Some(bounds) => bounds.set_score_bounds(true),
            None => eprintln!("expert does not support score bounds; ignoring"),
        }
    }

    eprintln!(
        "Training on {} ({}x{}), {} games, thinking budget {}",
        rules.name(),
        arg.width,
        arg.height,
        arg.games,
        arg.thinking_budget
    );
    let report = trainer.run(&mut expert)?;

    eprintln!();
    eprintln!("Training finished:");
    eprintln!("  Games:           {}", report.games);
    eprintln!("  Actions:         {}", report.actions);
    eprintln!("  Weight updates:  {}", report.weight_updates);
    eprintln!("  Feature counts:  {:?}", report.feature_counts);
    eprintln!("  Buffered:        {:?}", report.buffered_samples);
    if report.interrupted {
        eprintln!("  (run was interrupted)");
    }

    let players = trainer
        .feature_sets()
        .iter()
        .enumerate()
        .map(|(player, features)| PlayerModel {
            features: features.clone(),
            weights: trainer.policy().player_weights(player).to_vec(),
        })
        .collect();
    let model = TrainedModel {
        name: arg.name.clone(),
        game: rules.name().to_owned(),
        trained_at: Utc::now(),
        games: report.games,
        actions: report.actions,
        players,
    };
    util::save_json(&model, arg.output.as_ref())?;

    eprintln!();
    eprintln!("Model saved");
    if let Some(path) = &arg.output {
        eprintln!("  Path: {}", path.display());
    }
    eprintln!("  Name: {}", model.name);
    eprintln!("  Trained at: {}", model.trained_at);

    Ok(())
}
