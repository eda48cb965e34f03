use std::time::Duration;

use ethers::{
    abi::Detokenize,
    contract::{AbiError, BaseContract},
    types::{Address, Bytes, U256},
};
use lazy_static::lazy_static;
use strum::IntoEnumIterator;
use vault_ops_common::{
    chain::{submit_and_wait, ChainClient, TxError, TxReceipt, TxRequest},
    logger,
};
use vault_ops_types::{ConfigurationStep, StepReport, StepStatus};

use super::Capabilities;
use crate::abi::{ISTRATEGYABI_ABI, ISUBSIDYREGISTRYABI_ABI};

lazy_static! {
    static ref STRATEGY_FUNCTIONS: BaseContract = BaseContract::from(ISTRATEGYABI_ABI.clone());
    static ref SUBSIDY_REGISTRY_FUNCTIONS: BaseContract =
        BaseContract::from(ISUBSIDYREGISTRYABI_ABI.clone());
}

/// Addresses of a deployed vault and its strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeployedPair {
    pub vault: Address,
    pub strategy: Address,
}

#[derive(Debug, thiserror::Error)]
enum StepError {
    #[error("failed to encode call: {0}")]
    Abi(#[from] AbiError),
    #[error(transparent)]
    Tx(#[from] TxError),
    #[error("registering {contract:#x} failed: {source}")]
    Registration {
        contract: Address,
        #[source]
        source: TxError,
    },
}

/// Applies post-deploy configuration to a vault/strategy pair.
///
/// Every step reads the current on-chain value first and only writes when it
/// differs, so any step can be re-run after a partial failure. The subsidy
/// registry has no getter; contracts registered by earlier runs are passed in
/// through [`Configurator::with_registered`] instead.
pub struct Configurator<'a> {
    client: &'a dyn ChainClient,
    capabilities: &'a Capabilities,
    confirmation_timeout: Duration,
    registered: Vec<Address>,
}

impl<'a> Configurator<'a> {
    pub fn new(
        client: &'a dyn ChainClient,
        capabilities: &'a Capabilities,
        confirmation_timeout: Duration,
    ) -> Self {
        Self {
            client,
            capabilities,
            confirmation_timeout,
            registered: Vec::new(),
        }
    }

    /// Contracts already registered with the subsidy registry.
    pub fn with_registered(mut self, registered: impl IntoIterator<Item = Address>) -> Self {
        self.registered.extend(registered);
        self
    }

    /// Runs every step in order, or only `only`. A failed step is recorded and
    /// the remaining steps still run.
    pub async fn run(
        &self,
        pair: DeployedPair,
        only: Option<ConfigurationStep>,
    ) -> Vec<StepReport> {
        let mut reports = Vec::new();
        for step in ConfigurationStep::iter() {
            if only.is_some_and(|only| only != step) {
                continue;
            }
            let mut registered = Vec::new();
            let status = match self.apply(step, pair, &mut registered).await {
                Ok(status) => status,
                Err(err) => {
                    logger::warn(format!("Step {step} failed: {err}"));
                    StepStatus::Failed {
                        reason: err.to_string(),
                    }
                }
            };
            tracing::debug!(step = %step, status = ?status, "configuration step finished");
            reports.push(StepReport {
                step,
                status,
                registered,
            });
        }
        reports
    }

    async fn apply(
        &self,
        step: ConfigurationStep,
        pair: DeployedPair,
        registered: &mut Vec<Address>,
    ) -> Result<StepStatus, StepError> {
        let caps = self.capabilities;
        match step {
            ConfigurationStep::CallFee => match caps.call_fee {
                Some(fee) => self.correct_call_fee(pair.strategy, fee).await,
                None => Ok(StepStatus::NotApplicable),
            },
            ConfigurationStep::PendingRewards => match caps.pending_rewards_function_name.as_deref() {
                Some(name) => self.set_pending_rewards_function(pair.strategy, name).await,
                None => Ok(StepStatus::NotApplicable),
            },
            ConfigurationStep::Subsidy => match caps.subsidy_registry {
                Some(registry) => self.register_subsidy(registry, pair, registered).await,
                None => Ok(StepStatus::NotApplicable),
            },
        }
    }

    async fn correct_call_fee(&self, strategy: Address, fee: U256) -> Result<StepStatus, StepError> {
        if self.read::<U256>(strategy, "callFee").await == Some(fee) {
            return Ok(StepStatus::Unchanged);
        }
        logger::info(format!("Setting call fee of {strategy:#x} to {fee}"));
        let data = STRATEGY_FUNCTIONS.encode("setCallFee", fee)?;
        self.send(strategy, data).await?;
        Ok(StepStatus::Applied)
    }

    async fn set_pending_rewards_function(
        &self,
        strategy: Address,
        name: &str,
    ) -> Result<StepStatus, StepError> {
        let current = self
            .read::<String>(strategy, "pendingRewardsFunctionName")
            .await;
        if current.as_deref() == Some(name) {
            return Ok(StepStatus::Unchanged);
        }
        logger::info(format!("Setting pending rewards function of {strategy:#x} to {name}"));
        let data = STRATEGY_FUNCTIONS.encode("setPendingRewardsFunctionName", name.to_string())?;
        self.send(strategy, data).await?;
        Ok(StepStatus::Applied)
    }

    async fn register_subsidy(
        &self,
        registry: Address,
        pair: DeployedPair,
        registered: &mut Vec<Address>,
    ) -> Result<StepStatus, StepError> {
        let registrant = self.client.sender();
        let mut sent = false;
        for contract in [pair.vault, pair.strategy] {
            if self.registered.contains(&contract) {
                tracing::debug!(contract = %format!("{contract:#x}"), "already registered");
                registered.push(contract);
                continue;
            }
            logger::info(format!("Registering {contract:#x} with subsidy registry {registry:#x}"));
            let data =
                SUBSIDY_REGISTRY_FUNCTIONS.encode("registerContract", (contract, registrant))?;
            self.send(registry, data)
                .await
                .map_err(|source| StepError::Registration { contract, source })?;
            registered.push(contract);
            sent = true;
        }
        Ok(if sent {
            StepStatus::Applied
        } else {
            StepStatus::Unchanged
        })
    }

    /// Current value of a strategy getter; `None` when it cannot be read, in
    /// which case the setter is sent unconditionally.
    async fn read<D: Detokenize>(&self, contract: Address, function: &str) -> Option<D> {
        let data = STRATEGY_FUNCTIONS.encode(function, ()).ok()?;
        match self.client.call(contract, data).await {
            Ok(output) => STRATEGY_FUNCTIONS.decode_output(function, output).ok(),
            Err(err) => {
                tracing::debug!(function, error = %err, "current value unavailable");
                None
            }
        }
    }

    async fn send(&self, to: Address, data: Bytes) -> Result<TxReceipt, TxError> {
        let tx = TxRequest {
            to: Some(to),
            data,
            gas_price: self.capabilities.gas_price,
            ..Default::default()
        };
        submit_and_wait(self.client, tx, self.confirmation_timeout).await
    }
}
