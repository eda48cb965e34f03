use ethers::{
    abi::Token,
    types::{Address, U256},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKindName {
    Chef,
    RewardPool,
}

/// Strategy section of a deployment record, as written in the file.
///
/// `pool_id`, `chef` and `pending_rewards_function_name` belong to `chef`
/// strategies, `reward_pool` to `reward_pool` strategies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub kind: Option<StrategyKindName>,
    pub want: Option<Address>,
    pub unirouter: Option<Address>,
    pub strategist: Option<Address>,
    pub keeper: Option<Address>,
    pub fee_recipient: Option<Address>,
    pub output_to_native_route: Option<Vec<Address>>,
    pub output_to_lp0_route: Option<Vec<Address>>,
    pub output_to_lp1_route: Option<Vec<Address>>,
    pub pool_id: Option<u64>,
    pub chef: Option<Address>,
    pub pending_rewards_function_name: Option<String>,
    pub reward_pool: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyKind {
    Chef {
        pool_id: u64,
        chef: Address,
        /// View function on the chef reporting claimable rewards.
        pending_rewards_function_name: String,
    },
    RewardPool {
        reward_pool: Address,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyParameters {
    pub want: Address,
    #[serde(flatten)]
    pub kind: StrategyKind,
    pub unirouter: Address,
    pub strategist: Address,
    pub keeper: Address,
    pub fee_recipient: Address,
    pub output_to_native_route: Vec<Address>,
    pub output_to_lp0_route: Vec<Address>,
    pub output_to_lp1_route: Vec<Address>,
}

fn route(addresses: &[Address]) -> Token {
    Token::Array(addresses.iter().copied().map(Token::Address).collect())
}

impl StrategyParameters {
    /// Constructor arguments with the vault's confirmed address.
    ///
    /// Chef strategies take `(want, poolId, chef, vault, ...)`, reward pool
    /// strategies `(want, rewardPool, vault, ...)`; the tail is shared.
    pub fn constructor_args(&self, vault: Address) -> Vec<Token> {
        let mut args = vec![Token::Address(self.want)];
        match &self.kind {
            StrategyKind::Chef { pool_id, chef, .. } => {
                args.push(Token::Uint(U256::from(*pool_id)));
                args.push(Token::Address(*chef));
            }
            StrategyKind::RewardPool { reward_pool } => {
                args.push(Token::Address(*reward_pool));
            }
        }
        args.extend([
            Token::Address(vault),
            Token::Address(self.unirouter),
            Token::Address(self.keeper),
            Token::Address(self.strategist),
            Token::Address(self.fee_recipient),
            route(&self.output_to_native_route),
            route(&self.output_to_lp0_route),
            route(&self.output_to_lp1_route),
        ]);
        args
    }

    /// Pool identifier for the run report.
    pub fn pool_identifier(&self) -> String {
        match &self.kind {
            StrategyKind::Chef { pool_id, .. } => pool_id.to_string(),
            StrategyKind::RewardPool { reward_pool } => format!("{:#x}", reward_pool),
        }
    }

    pub fn pending_rewards_function_name(&self) -> Option<&str> {
        match &self.kind {
            StrategyKind::Chef {
                pending_rewards_function_name,
                ..
            } => Some(pending_rewards_function_name),
            StrategyKind::RewardPool { .. } => None,
        }
    }
}
