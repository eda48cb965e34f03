use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use ethers::types::Address;
use vault_ops_common::{
    artifacts::{ArtifactSource, ArtifactStore},
    chain::ChainClient,
    logger,
    verifier::{spawn_verifications, ForgeVerifier, VerificationRequest},
};
use vault_ops_config::{traits::ReadConfig, DeploymentConfig, DeploymentParams};
use vault_ops_types::{ConfigurationStep, DeploymentPhase, RunReport, VerificationState};
use xshell::Shell;

use crate::{
    deploy_ctx::ConnectionArgs,
    orchestrator::{Capabilities, Configurator, DeployedPair},
    utils::{paths, report, runlog},
};

/// Steps `configure` can run on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigureStep {
    CallFee,
    PendingRewards,
    Subsidy,
    Verify,
}

impl ConfigureStep {
    fn configuration_step(self) -> Option<ConfigurationStep> {
        match self {
            ConfigureStep::CallFee => Some(ConfigurationStep::CallFee),
            ConfigureStep::PendingRewards => Some(ConfigurationStep::PendingRewards),
            ConfigureStep::Subsidy => Some(ConfigurationStep::Subsidy),
            ConfigureStep::Verify => None,
        }
    }
}

#[derive(Debug, Parser)]
pub struct ConfigureArgs {
    /// Deployment record the pair was deployed from
    #[clap(long)]
    pub config: PathBuf,
    /// Address of the deployed vault
    #[clap(long)]
    pub vault: Address,
    /// Address of the deployed strategy
    #[clap(long)]
    pub strategy: Address,
    /// Run a single step instead of all of them
    #[clap(long, value_enum)]
    pub step: Option<ConfigureStep>,
    #[clap(flatten)]
    pub connection: ConnectionArgs,
}

/// Verification requests rebuilt from the record: the vault was created with
/// the strategy's address and the strategy with the vault's.
fn verification_requests(
    artifacts: &dyn ArtifactSource,
    params: &DeploymentParams,
    pair: DeployedPair,
) -> anyhow::Result<Vec<VerificationRequest>> {
    let vault = artifacts.load(&params.contracts.vault)?;
    let strategy = artifacts.load(&params.contracts.strategy)?;
    Ok(vec![
        VerificationRequest {
            contract_name: vault.name.clone(),
            address: pair.vault,
            constructor_args: vault
                .encode_constructor_args(&params.vault.constructor_args(pair.strategy))?,
        },
        VerificationRequest {
            contract_name: strategy.name.clone(),
            address: pair.strategy,
            constructor_args: strategy
                .encode_constructor_args(&params.strategy.constructor_args(pair.vault))?,
        },
    ])
}

pub async fn run(shell: &Shell, args: ConfigureArgs) -> anyhow::Result<()> {
    let record = paths::deployment_record(&args.config);
    let params = DeploymentConfig::read(shell, &record)?
        .validate()
        .context("Deployment record is incomplete")?;
    let capabilities = Capabilities::resolve(&params);
    let pair = DeployedPair {
        vault: args.vault,
        strategy: args.strategy,
    };

    let client = args.connection.connect().await?;
    let mut report = RunReport::new(Some(params.network.clone()), client.sender());
    report.vault = Some(pair.vault);
    report.strategy = Some(pair.strategy);
    report.want = Some(params.strategy.want);
    report.pool = Some(params.strategy.pool_identifier());
    report.phase = DeploymentPhase::Configuring;

    let only = args.step.map(ConfigureStep::configuration_step);
    // `--step verify` skips every configuration step.
    if only != Some(None) {
        logger::step("Configuring strategy");
        let registered =
            runlog::registered_contracts(&runlog::default_runs_root(), pair.vault, pair.strategy)?;
        let configurator =
            Configurator::new(&client, &capabilities, args.connection.confirmation_timeout())
                .with_registered(registered);
        report.steps = configurator.run(pair, only.flatten()).await;
    }

    report.phase = DeploymentPhase::Verifying;
    let verify = match args.step {
        Some(step) => step == ConfigureStep::Verify,
        None => params.verify,
    };
    let verification = if verify {
        let contracts_root = paths::contracts_root();
        let artifacts = ArtifactStore::new(contracts_root.clone());
        let requests = verification_requests(&artifacts, &params, pair)?;
        let verifier = ForgeVerifier::new(contracts_root, client.chain_id())
            .with_api_key(std::env::var("ETHERSCAN_API_KEY").ok());
        report.verification = VerificationState::Submitted;
        Some(spawn_verifications(Arc::new(verifier), requests))
    } else {
        None
    };

    report.finish();
    report::print(&report);
    runlog::archive(&report, "configure");

    if let Some(verification) = verification {
        let outcomes = verification.join().await;
        if outcomes.iter().any(|o| !o.is_success()) && args.step == Some(ConfigureStep::Verify) {
            anyhow::bail!("Source verification failed");
        }
    }
    if !report.complete {
        anyhow::bail!("Some configuration steps failed");
    }
    logger::outro("Configuration complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use ethers::{
        abi::{parse_abi, Token},
        types::Bytes,
    };
    use vault_ops_common::{artifacts::ContractArtifact, testing::InMemoryArtifacts};

    use super::*;

    const RECORD: &str = r#"
network: polygon
vault:
  name: Moo Quick WETH-UNI
  symbol: mooQuickWETH-UNI
  approval_delay: 21600
strategy:
  kind: reward_pool
  want: "0x0000000000000000000000000000000000000010"
  reward_pool: "0x0000000000000000000000000000000000000016"
  unirouter: "0x0000000000000000000000000000000000000011"
  strategist: "0x0000000000000000000000000000000000000012"
  keeper: "0x0000000000000000000000000000000000000013"
  fee_recipient: "0x0000000000000000000000000000000000000014"
  output_to_native_route: ["0x0000000000000000000000000000000000000020"]
  output_to_lp0_route: ["0x0000000000000000000000000000000000000020", "0x0000000000000000000000000000000000000021"]
  output_to_lp1_route: ["0x0000000000000000000000000000000000000020", "0x0000000000000000000000000000000000000022"]
contracts:
  vault: BeefyVaultV6
  strategy: StrategyCommonRewardPoolLP
"#;

    #[test]
    fn step_names_match_the_command_line() {
        let args = ConfigureArgs::parse_from([
            "configure",
            "--config",
            "r.yaml",
            "--vault",
            "0x00000000000000000000000000000000000000a1",
            "--strategy",
            "0x00000000000000000000000000000000000000b2",
            "--step",
            "pending-rewards",
        ]);
        assert_eq!(args.step, Some(ConfigureStep::PendingRewards));
        assert_eq!(
            args.step.and_then(ConfigureStep::configuration_step),
            Some(ConfigurationStep::PendingRewards)
        );
        assert_eq!(ConfigureStep::Verify.configuration_step(), None);
    }

    #[test]
    fn verification_arguments_are_cross_wired() {
        let params = serde_yaml::from_str::<DeploymentConfig>(RECORD)
            .unwrap()
            .validate()
            .unwrap();
        let artifact = |name: &str, constructor: &str| {
            ContractArtifact::new(name, parse_abi(&[constructor]).unwrap(), Bytes::from(vec![0x60]))
        };
        let artifacts = InMemoryArtifacts::default()
            .with(artifact("BeefyVaultV6", "constructor(address,string,string,uint256)"))
            .with(artifact(
                "StrategyCommonRewardPoolLP",
                "constructor(address,address,address,address,address,address,address,address[],address[],address[])",
            ));
        let pair = DeployedPair {
            vault: Address::repeat_byte(0xa1),
            strategy: Address::repeat_byte(0xb2),
        };

        let requests = verification_requests(&artifacts, &params, pair).unwrap();
        assert_eq!(requests.len(), 2);

        let vault = artifacts.load("BeefyVaultV6").unwrap();
        let mut creation = vault.bytecode.to_vec();
        creation.extend_from_slice(&requests[0].constructor_args);
        let args = vault.decode_constructor_args(&creation).unwrap();
        assert_eq!(args[0], Token::Address(pair.strategy));

        let strategy = artifacts.load("StrategyCommonRewardPoolLP").unwrap();
        let mut creation = strategy.bytecode.to_vec();
        creation.extend_from_slice(&requests[1].constructor_args);
        let args = strategy.decode_constructor_args(&creation).unwrap();
        assert_eq!(args[2], Token::Address(pair.vault));
    }
}
