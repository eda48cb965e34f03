use clap::Parser;
use ethers::types::Address;
use vault_ops_common::{address::predict, chain::ChainClient, logger};

use crate::deploy_ctx::ConnectionArgs;

#[derive(Debug, Parser)]
pub struct PredictArgs {
    /// Account to predict for; defaults to the signer
    #[clap(long)]
    pub account: Option<Address>,
    /// Number of upcoming creations to list
    #[clap(long, default_value_t = 2)]
    pub count: u64,
    #[clap(flatten)]
    pub connection: ConnectionArgs,
}

pub async fn run(args: PredictArgs) -> anyhow::Result<()> {
    let client = match args.account {
        Some(_) => args.connection.connect_read_only().await?,
        None => args.connection.connect().await?,
    };
    let account = args.account.unwrap_or_else(|| client.sender());

    let offsets: Vec<u64> = (0..args.count).collect();
    let prediction = predict(&client, account, &offsets).await?;

    logger::info(format!(
        "Account {account:#x} is at nonce {}",
        prediction.base_nonce
    ));
    let lines: Vec<String> = prediction
        .addresses
        .iter()
        .map(|(offset, address)| format!("nonce {}: {address:#x}", prediction.nonce(*offset)))
        .collect();
    logger::note("Upcoming creation addresses", lines.join("\n"));
    logger::outro("Only valid while the account sends nothing else in between");
    Ok(())
}
