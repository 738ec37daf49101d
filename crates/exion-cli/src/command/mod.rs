use clap::{Parser, Subcommand};

use self::{show_model::ShowModelArg, train::TrainArg};

mod show_model;
mod train;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// What mode to run the program in
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Train a policy by self-play with online feature discovery
    Train(#[clap(flatten)] TrainArg),
    /// Summarize a trained model file
    ShowModel(#[clap(flatten)] ShowModelArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::Train(arg) => train::run(&arg)?,
        Mode::ShowModel(arg) => show_model::run(&arg)?,
    }
    Ok(())
}
