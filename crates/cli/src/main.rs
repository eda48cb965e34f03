use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vault_ops_common::{
    config::{init_global_config, GlobalConfig},
    error::log_error,
    logger,
};
use xshell::Shell;

use crate::commands::{
    configure::ConfigureArgs, deploy::DeployArgs, dev::DevCommands, predict::PredictArgs,
};

pub mod abi;
mod commands;
mod deploy_ctx;
mod orchestrator;
mod utils;

#[derive(Parser, Debug)]
#[command(name = "vault-ops", about)]
struct VaultOps {
    #[command(subcommand)]
    command: VaultOpsSubcommands,
    #[clap(flatten)]
    global: VaultOpsGlobalArgs,
}

#[derive(Subcommand, Debug)]
pub enum VaultOpsSubcommands {
    /// Deploy a vault and its strategy from a deployment record
    Deploy(Box<DeployArgs>),
    /// Re-run post-deploy configuration against an existing pair
    Configure(Box<ConfigureArgs>),
    /// Print the addresses an account's next creations will occupy
    Predict(PredictArgs),
    /// Dev related commands
    #[command(subcommand)]
    Dev(Box<DevCommands>),
}

#[derive(Parser, Debug)]
#[clap(next_help_heading = "Global options")]
struct VaultOpsGlobalArgs {
    /// Verbose mode
    #[clap(short, long, global = true)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    human_panic::setup_panic!();
    let cli_args = VaultOps::parse();
    init_tracing(cli_args.global.verbose);
    match run_subcommand(cli_args).await {
        Ok(_) => {}
        Err(error) => {
            log_error(error);
            std::process::exit(1);
        }
    }
    Ok(())
}

/// `RUST_LOG` wins; otherwise `--verbose` turns on debug diagnostics.
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::registry()
        .with(fmt::Layer::default().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

async fn run_subcommand(cli_args: VaultOps) -> anyhow::Result<()> {
    logger::new_empty_line();
    logger::intro();

    init_global_config(GlobalConfig {
        verbose: cli_args.global.verbose,
    });
    let shell = Shell::new()?;

    match cli_args.command {
        VaultOpsSubcommands::Deploy(args) => commands::deploy::run(&shell, *args).await?,
        VaultOpsSubcommands::Configure(args) => commands::configure::run(&shell, *args).await?,
        VaultOpsSubcommands::Predict(args) => commands::predict::run(args).await?,
        VaultOpsSubcommands::Dev(args) => commands::dev::run(*args).await?,
    }
    Ok(())
}
