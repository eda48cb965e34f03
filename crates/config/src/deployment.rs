use ethers::types::Address;
use serde::{Deserialize, Serialize};
use vault_ops_types::{Network, NoncePinning};

use crate::{
    consts::DEFAULT_GAS_LIMIT,
    errors::IncompleteConfiguration,
    strategy::{StrategyConfig, StrategyKind, StrategyKindName, StrategyParameters},
    traits::FileConfigTrait,
    vault::{VaultConfig, VaultParameters},
};

/// Artifact names instantiated for the vault and strategy roles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractNamesConfig {
    pub vault: Option<String>,
    pub strategy: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractNames {
    pub vault: String,
    pub strategy: String,
}

/// One deployment record, the input of a single run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    pub network: Option<Network>,
    #[serde(default)]
    pub vault: VaultConfig,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub contracts: ContractNamesConfig,
    /// Registry receiving both addresses on the subsidy network.
    #[serde(default)]
    pub subsidy_registry: Option<Address>,
    #[serde(default)]
    pub verify: bool,
    #[serde(default)]
    pub nonce_pinning: NoncePinning,
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
    /// Legacy gas price in wei; left to the node when unset.
    #[serde(default)]
    pub gas_price: Option<u64>,
}

impl FileConfigTrait for DeploymentConfig {}

fn default_gas_limit() -> u64 {
    DEFAULT_GAS_LIMIT
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            network: None,
            vault: VaultConfig::default(),
            strategy: StrategyConfig::default(),
            contracts: ContractNamesConfig::default(),
            subsidy_registry: None,
            verify: false,
            nonce_pinning: NoncePinning::default(),
            gas_limit: DEFAULT_GAS_LIMIT,
            gas_price: None,
        }
    }
}

/// A deployment record with every required field present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentParams {
    pub network: Network,
    pub vault: VaultParameters,
    pub strategy: StrategyParameters,
    pub contracts: ContractNames,
    pub subsidy_registry: Option<Address>,
    pub verify: bool,
    pub nonce_pinning: NoncePinning,
    pub gas_limit: u64,
    pub gas_price: Option<u64>,
}

/// Collects every unset field instead of stopping at the first one.
#[derive(Default)]
struct Required {
    missing: Vec<String>,
}

impl Required {
    fn take<T: Clone + Default>(&mut self, field: &str, value: &Option<T>) -> T {
        match value {
            Some(value) => value.clone(),
            None => {
                self.missing.push(field.to_string());
                T::default()
            }
        }
    }

    fn text(&mut self, field: &str, value: &Option<String>) -> String {
        match value.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => {
                self.missing.push(field.to_string());
                String::new()
            }
        }
    }

    fn route(&mut self, field: &str, value: &Option<Vec<Address>>) -> Vec<Address> {
        match value {
            Some(route) if !route.is_empty() => route.clone(),
            _ => {
                self.missing.push(field.to_string());
                Vec::new()
            }
        }
    }

    fn finish<T>(self, value: T) -> Result<T, IncompleteConfiguration> {
        if self.missing.is_empty() {
            Ok(value)
        } else {
            Err(IncompleteConfiguration {
                missing: self.missing,
            })
        }
    }
}

impl DeploymentConfig {
    /// Checks that no required field is left unset.
    ///
    /// Placeholders filled in for missing fields never leave this function:
    /// any missing field turns the whole record into an error.
    pub fn validate(&self) -> Result<DeploymentParams, IncompleteConfiguration> {
        let mut required = Required::default();

        let network = required.take("network", &self.network);

        let vault = VaultParameters {
            name: required.text("vault.name", &self.vault.name),
            symbol: required.text("vault.symbol", &self.vault.symbol),
            approval_delay: required.take("vault.approval_delay", &self.vault.approval_delay),
        };

        let s = &self.strategy;
        let kind = match s.kind {
            Some(StrategyKindName::Chef) => Some(StrategyKind::Chef {
                pool_id: required.take("strategy.pool_id", &s.pool_id),
                chef: required.take("strategy.chef", &s.chef),
                pending_rewards_function_name: required.text(
                    "strategy.pending_rewards_function_name",
                    &s.pending_rewards_function_name,
                ),
            }),
            Some(StrategyKindName::RewardPool) => Some(StrategyKind::RewardPool {
                reward_pool: required.take("strategy.reward_pool", &s.reward_pool),
            }),
            None => {
                required.missing.push("strategy.kind".to_string());
                None
            }
        };
        let strategy = StrategyParameters {
            want: required.take("strategy.want", &s.want),
            kind: kind.unwrap_or(StrategyKind::RewardPool {
                reward_pool: Address::zero(),
            }),
            unirouter: required.take("strategy.unirouter", &s.unirouter),
            strategist: required.take("strategy.strategist", &s.strategist),
            keeper: required.take("strategy.keeper", &s.keeper),
            fee_recipient: required.take("strategy.fee_recipient", &s.fee_recipient),
            output_to_native_route: required
                .route("strategy.output_to_native_route", &s.output_to_native_route),
            output_to_lp0_route: required
                .route("strategy.output_to_lp0_route", &s.output_to_lp0_route),
            output_to_lp1_route: required
                .route("strategy.output_to_lp1_route", &s.output_to_lp1_route),
        };

        let contracts = ContractNames {
            vault: required.text("contracts.vault", &self.contracts.vault),
            strategy: required.text("contracts.strategy", &self.contracts.strategy),
        };

        let subsidy_registry = if self.network.as_ref().is_some_and(Network::is_subsidy_network) {
            Some(required.take("subsidy_registry", &self.subsidy_registry))
        } else {
            None
        };

        if self.gas_limit == 0 {
            required.missing.push("gas_limit".to_string());
        }

        required.finish(DeploymentParams {
            network,
            vault,
            strategy,
            contracts,
            subsidy_registry,
            verify: self.verify,
            nonce_pinning: self.nonce_pinning,
            gas_limit: self.gas_limit,
            gas_price: self.gas_price,
        })
    }
}
