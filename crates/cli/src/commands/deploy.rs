use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use vault_ops_common::{artifacts::ArtifactStore, logger, verifier::ForgeVerifier};
use vault_ops_config::{traits::ReadConfig, DeploymentConfig};
use vault_ops_types::NoncePinning;
use xshell::Shell;

use crate::{
    deploy_ctx::ConnectionArgs,
    orchestrator::Orchestrator,
    utils::{paths, report, runlog},
};

#[derive(Debug, Parser)]
pub struct DeployArgs {
    /// Deployment record (path, or name under configs/deployments)
    #[clap(long)]
    pub config: PathBuf,
    /// Submit both contracts for source verification
    #[clap(long)]
    pub verify: bool,
    /// Let the signer pick creation nonces instead of pinning the predicted ones
    #[clap(long)]
    pub no_pin_nonces: bool,
    #[clap(flatten)]
    pub connection: ConnectionArgs,
}

/// Applies the command line toggles on top of the record.
fn apply_flags(config: &mut DeploymentConfig, args: &DeployArgs) {
    if args.verify {
        config.verify = true;
    }
    if args.no_pin_nonces {
        config.nonce_pinning = NoncePinning::Unpinned;
    }
}

pub async fn run(shell: &Shell, args: DeployArgs) -> anyhow::Result<()> {
    let record = paths::deployment_record(&args.config);
    let mut config = DeploymentConfig::read(shell, &record)?;
    apply_flags(&mut config, &args);

    let client = args.connection.connect().await?;
    if let Some(expected) = config.network.as_ref().and_then(|n| n.chain_id()) {
        if expected != client.chain_id() {
            logger::warn(format!(
                "Record targets chain {expected} but the RPC reports chain {}",
                client.chain_id()
            ));
        }
    }

    let contracts_root = paths::contracts_root();
    let artifacts = ArtifactStore::new(contracts_root.clone());
    let verifier = ForgeVerifier::new(contracts_root, client.chain_id())
        .with_api_key(std::env::var("ETHERSCAN_API_KEY").ok());
    let orchestrator = Orchestrator::new(&client, &artifacts, args.connection.confirmation_timeout())
        .with_verifier(Arc::new(verifier));

    let run = orchestrator.run(&config).await;
    report::print(&run.report);
    runlog::archive(&run.report, "deploy");

    if let Some(verification) = run.verification {
        logger::step(format!(
            "Waiting for {} verification job(s)",
            verification.len()
        ));
        verification.join().await;
    }

    if let Some(error) = run.error {
        return Err(anyhow::Error::new(error).context("Deployment aborted"));
    }
    if !run.report.complete {
        anyhow::bail!(
            "Deployment finished with failed configuration steps; re-run them with `vault-ops configure`"
        );
    }

    logger::outro("Deployment complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_the_record() {
        let args = DeployArgs::parse_from([
            "deploy",
            "--config",
            "fantom-boo-dola-inv",
            "--verify",
            "--no-pin-nonces",
            "--dev",
        ]);
        let mut config = DeploymentConfig::default();
        apply_flags(&mut config, &args);
        assert!(config.verify);
        assert_eq!(config.nonce_pinning, NoncePinning::Unpinned);
        assert!(args.connection.dev);
    }

    #[test]
    fn record_values_survive_without_flags() {
        let key = format!("{:#x}", ethers::types::H256::repeat_byte(1));
        let args = DeployArgs::parse_from(["deploy", "--config", "x.yaml", "--pk", &key]);
        let mut config = DeploymentConfig {
            verify: true,
            ..Default::default()
        };
        apply_flags(&mut config, &args);
        assert!(config.verify);
        assert_eq!(config.nonce_pinning, NoncePinning::Pinned);
        assert!(args.connection.private_key.is_some());
    }
}
