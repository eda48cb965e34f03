use ethers::{
    abi::Token,
    types::{Address, U256},
};
use serde::{Deserialize, Serialize};

/// Vault section of a deployment record, as written in the file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    pub name: Option<String>,
    pub symbol: Option<String>,
    /// Seconds a strategy upgrade proposal must wait before it can be applied.
    pub approval_delay: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultParameters {
    pub name: String,
    pub symbol: String,
    pub approval_delay: u64,
}

impl VaultParameters {
    /// `constructor(address strategy, string name, string symbol, uint256 approvalDelay)`
    pub fn constructor_args(&self, strategy: Address) -> Vec<Token> {
        vec![
            Token::Address(strategy),
            Token::String(self.name.clone()),
            Token::String(self.symbol.clone()),
            Token::Uint(U256::from(self.approval_delay)),
        ]
    }
}
