use clap::Subcommand;

use crate::commands::dev::commands::runs::RunsCommand;

pub(crate) mod commands;

#[derive(Subcommand, Debug)]
pub enum DevCommands {
    #[command(about = "Subcommands for archived run reports")]
    Runs(RunsCommand),
}

pub(crate) async fn run(args: DevCommands) -> anyhow::Result<()> {
    match args {
        DevCommands::Runs(args) => commands::runs::run(args).await,
    }
}
