use clap::{Parser, Subcommand};

pub mod inspect;
pub mod list;

#[derive(Subcommand, Debug)]
pub enum RunsSubcommands {
    #[clap(about = "List archived runs")]
    List(list::RunsListArgs),
    #[clap(about = "Inspect a run report")]
    Inspect(inspect::RunsInspectArgs),
}

#[derive(Parser, Debug)]
pub struct RunsCommand {
    #[command(subcommand)]
    command: Option<RunsSubcommands>,
    #[clap(flatten)]
    args: list::RunsListArgs,
}

pub async fn run(args: RunsCommand) -> anyhow::Result<()> {
    match args.command {
        Some(RunsSubcommands::List(args)) => list::run(args).await,
        Some(RunsSubcommands::Inspect(args)) => inspect::run(args).await,
        None => list::run(args.args).await,
    }
}
