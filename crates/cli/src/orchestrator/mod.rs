//! End-to-end deployment of a vault and its strategy.
//!
//! The vault's constructor needs the strategy's address and the strategy's
//! constructor needs the vault's, so the strategy address is predicted from
//! the deployer's nonce before the vault is created.

use std::{sync::Arc, time::Duration};

use ethers::types::Address;
use vault_ops_common::{
    address::predict,
    artifacts::ArtifactSource,
    chain::ChainClient,
    deployer::{ContractDeployer, DeployOverrides, DeployedContract},
    logger,
    verifier::{spawn_verifications, SourceVerifier, VerificationHandle, VerificationRequest},
};
use vault_ops_config::DeploymentConfig;
use vault_ops_types::{DeploymentPhase, RunReport, VerificationState};

mod capabilities;
mod configurator;
mod error;

pub use capabilities::Capabilities;
pub use configurator::{Configurator, DeployedPair};
pub use error::OrchestratorError;

/// Nonce offsets of the two creations, relative to the predicted base nonce.
const VAULT_OFFSET: u64 = 0;
const STRATEGY_OFFSET: u64 = 1;

/// Both contracts of a successful deployment.
#[derive(Debug, Clone)]
pub struct DeploymentResult {
    pub vault: DeployedContract,
    pub strategy: DeployedContract,
}

impl DeploymentResult {
    pub fn pair(&self) -> DeployedPair {
        DeployedPair {
            vault: self.vault.address,
            strategy: self.strategy.address,
        }
    }

    pub fn verification_requests(&self) -> Vec<VerificationRequest> {
        [&self.vault, &self.strategy]
            .into_iter()
            .map(|contract| VerificationRequest {
                contract_name: contract.name.clone(),
                address: contract.address,
                constructor_args: contract.constructor_args.clone(),
            })
            .collect()
    }
}

/// Outcome of [`Orchestrator::run`]. The report is always filled in, even
/// for aborted runs.
pub struct DeploymentRun {
    pub report: RunReport,
    pub deployment: Option<DeploymentResult>,
    /// Background verification jobs, if any were started.
    pub verification: Option<VerificationHandle>,
    pub error: Option<OrchestratorError>,
}

pub struct Orchestrator<'a> {
    client: &'a dyn ChainClient,
    artifacts: &'a dyn ArtifactSource,
    verifier: Option<Arc<dyn SourceVerifier>>,
    confirmation_timeout: Duration,
}

fn advance(report: &mut RunReport, next: DeploymentPhase) {
    debug_assert!(
        report.phase.can_advance_to(next),
        "invalid transition {} -> {}",
        report.phase,
        next
    );
    tracing::debug!(from = %report.phase, to = %next, "phase transition");
    report.phase = next;
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        client: &'a dyn ChainClient,
        artifacts: &'a dyn ArtifactSource,
        confirmation_timeout: Duration,
    ) -> Self {
        Self {
            client,
            artifacts,
            verifier: None,
            confirmation_timeout,
        }
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn SourceVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub async fn run(&self, config: &DeploymentConfig) -> DeploymentRun {
        let mut run = DeploymentRun {
            report: RunReport::new(config.network.clone(), self.client.sender()),
            deployment: None,
            verification: None,
            error: None,
        };

        match self.deploy_pair(config, &mut run.report).await {
            Ok((capabilities, deployment)) => {
                self.configure(&capabilities, &deployment, &mut run).await;
                run.deployment = Some(deployment);
            }
            Err(err) => {
                tracing::debug!(from = %run.report.phase, to = %DeploymentPhase::Aborted, "phase transition");
                logger::error(format!("Deployment aborted: {err}"));
                run.report.abort(&err);
                run.error = Some(err);
            }
        }
        run
    }

    async fn deploy_pair(
        &self,
        config: &DeploymentConfig,
        report: &mut RunReport,
    ) -> Result<(Capabilities, DeploymentResult), OrchestratorError> {
        logger::step("Validating deployment record");
        let params = config.validate()?;
        let capabilities = Capabilities::resolve(&params);

        let vault_artifact = self.artifacts.load(&params.contracts.vault)?;
        let strategy_artifact = self.artifacts.load(&params.contracts.strategy)?;
        // Argument shapes do not depend on the addresses filled in later.
        vault_artifact.encode_constructor_args(&params.vault.constructor_args(Address::zero()))?;
        strategy_artifact
            .encode_constructor_args(&params.strategy.constructor_args(Address::zero()))?;

        report.want = Some(params.strategy.want);
        report.pool = Some(params.strategy.pool_identifier());

        advance(report, DeploymentPhase::PredictingAddresses);
        let account = self.client.sender();
        let prediction = predict(self.client, account, &[VAULT_OFFSET, STRATEGY_OFFSET]).await?;
        let predicted_vault = prediction.address(VAULT_OFFSET);
        let predicted_strategy = prediction.address(STRATEGY_OFFSET);
        logger::info(format!(
            "Predicted vault {predicted_vault:#x} and strategy {predicted_strategy:#x} from nonce {}",
            prediction.base_nonce
        ));

        let overrides = |offset: u64| DeployOverrides {
            gas_limit: Some(capabilities.gas_limit),
            gas_price: capabilities.gas_price,
            nonce: capabilities
                .nonce_pinning
                .is_pinned()
                .then(|| prediction.nonce(offset)),
        };
        let deployer = ContractDeployer::new(self.client, self.confirmation_timeout);

        advance(report, DeploymentPhase::DeployingA);
        logger::step(format!("Deploying {}", vault_artifact.name));
        let vault = deployer
            .deploy(
                &vault_artifact,
                &params.vault.constructor_args(predicted_strategy),
                &overrides(VAULT_OFFSET),
            )
            .await?;
        report.vault = Some(vault.address);
        logger::success(format!("{} deployed at {:#x}", vault.name, vault.address));
        if vault.address != predicted_vault {
            return Err(OrchestratorError::NonceConflict {
                contract: vault.name,
                reason: format!(
                    "deployed at {:#x} instead of {predicted_vault:#x}; it references strategy {predicted_strategy:#x} which will never exist",
                    vault.address
                ),
            });
        }

        advance(report, DeploymentPhase::DeployingB);
        logger::step(format!("Deploying {}", strategy_artifact.name));
        let strategy = deployer
            .deploy(
                &strategy_artifact,
                &params.strategy.constructor_args(vault.address),
                &overrides(STRATEGY_OFFSET),
            )
            .await?;
        report.strategy = Some(strategy.address);
        logger::success(format!("{} deployed at {:#x}", strategy.name, strategy.address));
        if strategy.address != predicted_strategy {
            return Err(OrchestratorError::NonceConflict {
                contract: strategy.name,
                reason: format!(
                    "deployed at {:#x} instead of {predicted_strategy:#x}; vault {:#x} and the strategy are not wired to each other",
                    strategy.address, vault.address
                ),
            });
        }

        Ok((capabilities, DeploymentResult { vault, strategy }))
    }

    async fn configure(
        &self,
        capabilities: &Capabilities,
        deployment: &DeploymentResult,
        run: &mut DeploymentRun,
    ) {
        advance(&mut run.report, DeploymentPhase::Configuring);
        logger::step("Configuring strategy");
        let configurator = Configurator::new(self.client, capabilities, self.confirmation_timeout);
        run.report.steps = configurator.run(deployment.pair(), None).await;

        advance(&mut run.report, DeploymentPhase::Verifying);
        if capabilities.verify {
            match &self.verifier {
                Some(verifier) => {
                    logger::step("Submitting source verification");
                    run.verification = Some(spawn_verifications(
                        Arc::clone(verifier),
                        deployment.verification_requests(),
                    ));
                    run.report.verification = VerificationState::Submitted;
                }
                None => logger::warn("Verification requested but no verifier is available"),
            }
        }

        tracing::debug!(from = %run.report.phase, to = %DeploymentPhase::Done, "phase transition");
        run.report.finish();
    }
}

#[cfg(test)]
mod tests {
    use ethers::{
        abi::{self, parse_abi, Token},
        types::{Bytes, U256},
    };
    use vault_ops_common::{
        address::create_address,
        artifacts::ContractArtifact,
        testing::{InMemoryArtifacts, MockChain, RecordingVerifier},
    };
    use vault_ops_config::{
        ContractNamesConfig, StrategyConfig, StrategyKindName, VaultConfig,
    };
    use vault_ops_types::{ConfigurationStep, Network, NoncePinning, StepStatus};

    use super::*;

    const VAULT: &str = "BeefyVaultV6";
    const CHEF_STRATEGY: &str = "StrategyCommonChefLP";
    const REWARD_POOL_STRATEGY: &str = "StrategyCommonRewardPoolLP";
    const REGISTER: &str = "registerContract(address,address)";

    fn deployer() -> Address {
        Address::repeat_byte(0xde)
    }

    fn registry() -> Address {
        Address::repeat_byte(0x5b)
    }

    fn artifacts() -> InMemoryArtifacts {
        let artifact = |name: &str, constructor: &str| {
            ContractArtifact::new(
                name,
                parse_abi(&[constructor]).unwrap(),
                Bytes::from(vec![0x60, 0x80, 0x60, 0x40]),
            )
        };
        InMemoryArtifacts::default()
            .with(artifact(VAULT, "constructor(address,string,string,uint256)"))
            .with(artifact(
                CHEF_STRATEGY,
                "constructor(address,uint256,address,address,address,address,address,address,address[],address[],address[])",
            ))
            .with(artifact(
                REWARD_POOL_STRATEGY,
                "constructor(address,address,address,address,address,address,address,address[],address[],address[])",
            ))
    }

    fn chef_config(network: Network) -> DeploymentConfig {
        let a = Address::repeat_byte;
        DeploymentConfig {
            network: Some(network),
            vault: VaultConfig {
                name: Some("Moo Boo DOLA-INV".to_string()),
                symbol: Some("mooBooDOLA-INV".to_string()),
                approval_delay: Some(21600),
            },
            strategy: StrategyConfig {
                kind: Some(StrategyKindName::Chef),
                want: Some(a(0x10)),
                unirouter: Some(a(0x11)),
                strategist: Some(a(0x12)),
                keeper: Some(a(0x13)),
                fee_recipient: Some(a(0x14)),
                output_to_native_route: Some(vec![a(0x20), a(0x21)]),
                output_to_lp0_route: Some(vec![a(0x20), a(0x22)]),
                output_to_lp1_route: Some(vec![a(0x20), a(0x23)]),
                pool_id: Some(7),
                chef: Some(a(0x15)),
                pending_rewards_function_name: Some("pendingBOO".to_string()),
                reward_pool: None,
            },
            contracts: ContractNamesConfig {
                vault: Some(VAULT.to_string()),
                strategy: Some(CHEF_STRATEGY.to_string()),
            },
            subsidy_registry: Some(registry()),
            ..Default::default()
        }
    }

    fn reward_pool_config() -> DeploymentConfig {
        let mut config = chef_config(Network::Polygon);
        config.strategy.kind = Some(StrategyKindName::RewardPool);
        config.strategy.pool_id = None;
        config.strategy.chef = None;
        config.strategy.pending_rewards_function_name = None;
        config.strategy.reward_pool = Some(Address::repeat_byte(0x16));
        config.contracts.strategy = Some(REWARD_POOL_STRATEGY.to_string());
        config
    }

    fn chain() -> MockChain {
        let chain = MockChain::new(deployer(), 5);
        chain
            .link_setter("setCallFee(uint256)", "callFee()")
            .link_setter(
                "setPendingRewardsFunctionName(string)",
                "pendingRewardsFunctionName()",
            );
        chain
    }

    fn at_nonce(nonce: u64) -> Address {
        create_address(deployer(), U256::from(nonce))
    }

    async fn run(chain: &MockChain, config: &DeploymentConfig) -> DeploymentRun {
        let artifacts = artifacts();
        Orchestrator::new(chain, &artifacts, Duration::from_secs(1))
            .run(config)
            .await
    }

    fn status(report: &RunReport, step: ConfigurationStep) -> StepStatus {
        report
            .steps
            .iter()
            .find(|s| s.step == step)
            .map(|s| s.status.clone())
            .unwrap()
    }

    #[tokio::test]
    async fn deploys_the_pair_at_predicted_addresses() {
        let chain = chain();
        let run = run(&chain, &chef_config(Network::Fantom)).await;

        assert!(run.error.is_none());
        let report = run.report;
        assert_eq!(report.phase, DeploymentPhase::Done);
        assert!(report.complete);
        assert_eq!(report.vault, Some(at_nonce(5)));
        assert_eq!(report.strategy, Some(at_nonce(6)));
        assert_eq!(report.want, Some(Address::repeat_byte(0x10)));
        assert_eq!(report.pool.as_deref(), Some("7"));

        let creations = chain.creations();
        assert_eq!(creations.len(), 2);
        assert_eq!(creations[0].address, at_nonce(5));
        assert_eq!(creations[1].address, at_nonce(6));
    }

    #[tokio::test]
    async fn constructors_are_cross_wired() {
        let chain = chain();
        let run = run(&chain, &chef_config(Network::Fantom)).await;
        let deployment = run.deployment.unwrap();
        let artifacts = artifacts();
        let creations = chain.creations();

        let vault_args = artifacts
            .load(VAULT)
            .unwrap()
            .decode_constructor_args(&creations[0].data)
            .unwrap();
        assert_eq!(vault_args[0], Token::Address(at_nonce(6)));
        assert_eq!(vault_args[1], Token::String("Moo Boo DOLA-INV".to_string()));
        assert_eq!(vault_args[3], Token::Uint(U256::from(21600)));

        let strategy_args = artifacts
            .load(CHEF_STRATEGY)
            .unwrap()
            .decode_constructor_args(&creations[1].data)
            .unwrap();
        assert_eq!(strategy_args[1], Token::Uint(U256::from(7)));
        assert_eq!(strategy_args[3], Token::Address(deployment.vault.address));
        assert_eq!(
            deployment.strategy.constructor_args,
            Bytes::from(abi::encode(&strategy_args))
        );
    }

    #[tokio::test]
    async fn missing_fields_stop_before_any_rpc() {
        let chain = chain();
        let mut config = chef_config(Network::Fantom);
        config.vault.name = None;
        config.strategy.output_to_lp1_route = Some(vec![]);

        let run = run(&chain, &config).await;
        match run.error {
            Some(OrchestratorError::IncompleteConfiguration(err)) => assert_eq!(
                err.missing,
                vec!["vault.name", "strategy.output_to_lp1_route"]
            ),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(run.report.is_aborted());
        assert_eq!(chain.rpc_call_count(), 0);
    }

    #[tokio::test]
    async fn missing_artifact_stops_before_any_rpc() {
        let chain = chain();
        let mut config = chef_config(Network::Fantom);
        config.contracts.strategy = Some("StrategyNobodyCompiled".to_string());

        let run = run(&chain, &config).await;
        assert!(matches!(run.error, Some(OrchestratorError::Artifact(_))));
        assert_eq!(chain.rpc_call_count(), 0);
    }

    #[tokio::test]
    async fn call_fee_already_in_place_is_not_rewritten() {
        let chain = chain();
        chain.set_view(
            at_nonce(6),
            "callFee()",
            Bytes::from(abi::encode(&[Token::Uint(U256::from(11))])),
        );

        let run = run(&chain, &chef_config(Network::Fantom)).await;
        assert_eq!(
            status(&run.report, ConfigurationStep::CallFee),
            StepStatus::Unchanged
        );
        assert!(run.report.complete);
        let set_call_fee = ethers::utils::id("setCallFee(uint256)");
        assert!(chain
            .transactions_to(at_nonce(6))
            .iter()
            .all(|tx| tx.data[..4] != set_call_fee));
    }

    #[tokio::test]
    async fn failed_subsidy_registration_leaves_run_incomplete() {
        let chain = chain();
        chain.fail_calls_to(REGISTER);

        let run = run(&chain, &chef_config(Network::Bsc)).await;
        let report = run.report;
        assert!(run.error.is_none());
        assert_eq!(report.phase, DeploymentPhase::Done);
        assert!(!report.complete);
        assert_eq!(report.vault, Some(at_nonce(5)));
        assert_eq!(report.strategy, Some(at_nonce(6)));
        assert!(status(&report, ConfigurationStep::Subsidy).is_failure());
        assert_eq!(
            status(&report, ConfigurationStep::PendingRewards),
            StepStatus::Applied
        );
    }

    #[tokio::test]
    async fn subsidy_registration_only_on_bsc() {
        let chain = chain();
        run(&chain, &chef_config(Network::Bsc)).await;
        let registrations = chain.transactions_to(registry());
        assert_eq!(registrations.len(), 2);
        let registered: Vec<Token> = registrations
            .iter()
            .map(|tx| {
                abi::decode(
                    &[abi::ParamType::Address, abi::ParamType::Address],
                    &tx.data[4..],
                )
                .unwrap()[0]
                    .clone()
            })
            .collect();
        assert_eq!(
            registered,
            vec![Token::Address(at_nonce(5)), Token::Address(at_nonce(6))]
        );

        let chain = self::chain();
        let run = run(&chain, &chef_config(Network::Fantom)).await;
        assert!(chain.transactions_to(registry()).is_empty());
        assert_eq!(
            status(&run.report, ConfigurationStep::Subsidy),
            StepStatus::NotApplicable
        );
    }

    #[tokio::test]
    async fn pinning_controls_creation_nonces() {
        let creation_nonces = |chain: &MockChain| -> Vec<Option<U256>> {
            chain
                .sent_transactions()
                .iter()
                .filter(|tx| tx.to.is_none())
                .map(|tx| tx.nonce)
                .collect()
        };

        let chain = chain();
        run(&chain, &chef_config(Network::Fantom)).await;
        assert_eq!(
            creation_nonces(&chain),
            vec![Some(U256::from(5)), Some(U256::from(6))]
        );

        let chain = self::chain();
        let mut config = chef_config(Network::Fantom);
        config.nonce_pinning = NoncePinning::Unpinned;
        run(&chain, &config).await;
        assert_eq!(creation_nonces(&chain), vec![None, None]);
    }

    #[tokio::test]
    async fn interleaved_transaction_is_a_nonce_conflict_when_pinned() {
        let chain = chain();
        chain.interleave_external_transactions(1);

        let run = run(&chain, &chef_config(Network::Fantom)).await;
        assert!(matches!(
            run.error,
            Some(OrchestratorError::NonceConflict { .. })
        ));
        assert_eq!(run.report.vault, None);
        assert!(chain.creations().is_empty());
    }

    #[tokio::test]
    async fn interleaved_transaction_orphans_the_vault_when_unpinned() {
        let chain = chain();
        chain.interleave_external_transactions(1);
        let mut config = chef_config(Network::Fantom);
        config.nonce_pinning = NoncePinning::Unpinned;

        let run = run(&chain, &config).await;
        assert!(matches!(
            run.error,
            Some(OrchestratorError::NonceConflict { .. })
        ));
        assert_eq!(run.report.vault, Some(at_nonce(6)));
        assert_eq!(run.report.orphaned_vault, Some(at_nonce(6)));
        assert_eq!(run.report.strategy, None);
        assert_eq!(chain.creations().len(), 1);
    }

    #[tokio::test]
    async fn failed_strategy_creation_reports_orphaned_vault() {
        let chain = chain();
        chain.fail_creation_at(6);

        let run = run(&chain, &chef_config(Network::Fantom)).await;
        assert!(matches!(
            run.error,
            Some(OrchestratorError::DeploymentReverted { .. })
        ));
        assert!(run.report.is_aborted());
        assert!(!run.report.complete);
        assert_eq!(run.report.orphaned_vault, Some(at_nonce(5)));
        assert!(run.report.steps.is_empty());
    }

    #[tokio::test]
    async fn unconfirmed_vault_aborts_without_retry() {
        let chain = chain();
        chain.stall_receipts();
        let artifacts = artifacts();

        let run = Orchestrator::new(&chain, &artifacts, Duration::from_millis(50))
            .run(&chef_config(Network::Fantom))
            .await;
        assert!(matches!(
            run.error,
            Some(OrchestratorError::DeploymentTimeout { .. })
        ));
        assert_eq!(chain.write_count(), 1);
        assert_eq!(run.report.vault, None);
    }

    #[tokio::test]
    async fn unavailable_nonce_is_fatal_before_deploying() {
        let chain = chain();
        chain.make_nonce_unavailable();

        let run = run(&chain, &chef_config(Network::Fantom)).await;
        assert!(matches!(
            run.error,
            Some(OrchestratorError::AccountStateUnavailable(_))
        ));
        assert_eq!(chain.write_count(), 0);
    }

    #[tokio::test]
    async fn reward_pool_strategy_has_no_pending_rewards_step() {
        let chain = chain();
        let run = run(&chain, &reward_pool_config()).await;

        let report = run.report;
        assert!(report.complete);
        assert_eq!(
            report.pool,
            Some(format!("{:#x}", Address::repeat_byte(0x16)))
        );
        assert_eq!(
            status(&report, ConfigurationStep::PendingRewards),
            StepStatus::NotApplicable
        );
        assert_eq!(
            status(&report, ConfigurationStep::CallFee),
            StepStatus::Applied
        );
        assert_eq!(
            chain.view(at_nonce(6), "callFee()"),
            Some(Bytes::from(abi::encode(&[Token::Uint(U256::from(11))])))
        );
    }

    #[tokio::test]
    async fn unknown_network_skips_call_fee() {
        let chain = chain();
        let run = run(&chain, &chef_config(Network::Other("kava".into()))).await;
        assert!(run.report.complete);
        assert_eq!(
            status(&run.report, ConfigurationStep::CallFee),
            StepStatus::NotApplicable
        );
    }

    #[tokio::test]
    async fn verification_is_submitted_for_both_contracts() {
        let chain = chain();
        let artifacts = artifacts();
        let verifier = Arc::new(RecordingVerifier::default());
        let mut config = chef_config(Network::Fantom);
        config.verify = true;

        let run = Orchestrator::new(&chain, &artifacts, Duration::from_secs(1))
            .with_verifier(verifier.clone())
            .run(&config)
            .await;
        assert_eq!(run.report.verification, VerificationState::Submitted);
        assert_eq!(run.report.phase, DeploymentPhase::Done);

        let outcomes = run.verification.unwrap().join().await;
        assert!(outcomes.iter().all(|o| o.is_success()));
        let requested: Vec<Address> = verifier.requests().iter().map(|r| r.address).collect();
        assert_eq!(requested, vec![at_nonce(5), at_nonce(6)]);
    }

    #[tokio::test]
    async fn verification_disabled_by_default() {
        let chain = chain();
        let run = run(&chain, &chef_config(Network::Fantom)).await;
        assert!(run.verification.is_none());
        assert_eq!(run.report.verification, VerificationState::Disabled);
    }
}
