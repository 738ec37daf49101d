use std::path::PathBuf;

use crate::{model::trained_model::TrainedModel, util};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct ShowModelArg {
    /// Path to the trained model JSON file
    model: PathBuf,
    /// How many features to list per player
    #[arg(long, default_value_t = 8)]
    top: usize,
}

pub(crate) fn run(arg: &ShowModelArg) -> anyhow::Result<()> {
    let model: TrainedModel = util::read_json_file("trained model", &arg.model)?;

    println!("Model: {} ({})", model.name, model.game);
    println!("Trained at: {}", model.trained_at);
    println!("Games: {}, actions: {}", model.games, model.actions);
    for (player, player_model) in model.players.iter().enumerate() {
        println!();
        println!(
            "Player {player}: {} features",
            player_model.features.len()
        );
        for &feature in player_model
            .features_by_influence()
            .iter()
            .take(arg.top)
        {
            let pattern = player_model.features.pattern(feature);
            println!(
                "  #{feature:<3} w={:+.4}  {} elements{}",
                player_model.weights[feature],
                pattern.size(),
                if pattern.is_reactive() { ", reactive" } else { "" },
            );
        }
    }
    Ok(())
}
