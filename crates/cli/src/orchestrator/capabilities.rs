use ethers::types::{Address, U256};
use vault_ops_config::{call_fee, DeploymentParams};
use vault_ops_types::NoncePinning;

/// What a run is going to do, decided once from the validated record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    pub call_fee: Option<U256>,
    pub pending_rewards_function_name: Option<String>,
    pub subsidy_registry: Option<Address>,
    pub verify: bool,
    pub nonce_pinning: NoncePinning,
    pub gas_limit: U256,
    pub gas_price: Option<U256>,
}

impl Capabilities {
    pub fn resolve(params: &DeploymentParams) -> Self {
        let subsidy_registry = params
            .subsidy_registry
            .filter(|_| params.network.is_subsidy_network());
        Self {
            call_fee: call_fee(&params.network),
            pending_rewards_function_name: params
                .strategy
                .pending_rewards_function_name()
                .map(str::to_string),
            subsidy_registry,
            verify: params.verify,
            nonce_pinning: params.nonce_pinning,
            gas_limit: U256::from(params.gas_limit),
            gas_price: params.gas_price.map(U256::from),
        }
    }
}
