//! Contract creation: submit, wait for confirmation, report the address.

use std::time::Duration;

use ethers::{
    abi::Token,
    types::{Address, Bytes, H256, U256},
};

use crate::{
    artifacts::{ArtifactError, ContractArtifact},
    chain::{submit_and_wait, ChainClient, ChainError, TxError, TxRequest},
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployOverrides {
    pub gas_limit: Option<U256>,
    pub gas_price: Option<U256>,
    /// Nonce the creation must consume. Checked against the live nonce
    /// before submission.
    pub nonce: Option<U256>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedContract {
    pub name: String,
    pub address: Address,
    pub transaction_hash: H256,
    pub confirmed_at_block: Option<u64>,
    /// ABI-encoded constructor arguments, as needed for source verification.
    pub constructor_args: Bytes,
}

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("nonce conflict while deploying {contract}: {reason}")]
    NonceConflict { contract: String, reason: String },
    #[error("deployment of {contract} was not confirmed (transaction {tx_hash:#x}); not retrying")]
    Timeout { contract: String, tx_hash: H256 },
    #[error("deployment of {contract} reverted (transaction {tx_hash:#x})")]
    Reverted { contract: String, tx_hash: H256 },
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error("rpc failure while deploying {contract}: {source}")]
    Rpc {
        contract: String,
        #[source]
        source: ChainError,
    },
}

/// Deploys contracts from a single account, one confirmed creation at a time.
pub struct ContractDeployer<'a> {
    client: &'a dyn ChainClient,
    confirmation_timeout: Duration,
}

impl<'a> ContractDeployer<'a> {
    pub fn new(client: &'a dyn ChainClient, confirmation_timeout: Duration) -> Self {
        Self {
            client,
            confirmation_timeout,
        }
    }

    pub async fn deploy(
        &self,
        artifact: &ContractArtifact,
        args: &[Token],
        overrides: &DeployOverrides,
    ) -> Result<DeployedContract, DeployError> {
        let contract = artifact.name.clone();
        let constructor_args = artifact.encode_constructor_args(args)?;
        let data = artifact.creation_code(args)?;

        if let Some(expected) = overrides.nonce {
            let live = self
                .client
                .transaction_count(self.client.sender())
                .await
                .map_err(|source| DeployError::Rpc {
                    contract: contract.clone(),
                    source,
                })?;
            if live != expected {
                return Err(DeployError::NonceConflict {
                    contract,
                    reason: format!("account nonce is {live}, creation was pinned to {expected}"),
                });
            }
        }

        let tx = TxRequest {
            to: None,
            data,
            gas_limit: overrides.gas_limit,
            gas_price: overrides.gas_price,
            nonce: overrides.nonce,
        };

        tracing::info!(contract = %contract, nonce = ?overrides.nonce, "submitting creation transaction");
        let receipt = submit_and_wait(self.client, tx, self.confirmation_timeout)
            .await
            .map_err(|err| match err {
                TxError::Chain(ChainError::NonceRejected(reason)) => DeployError::NonceConflict {
                    contract: contract.clone(),
                    reason,
                },
                TxError::Chain(source) => DeployError::Rpc {
                    contract: contract.clone(),
                    source,
                },
                TxError::Timeout { tx_hash } | TxError::Dropped { tx_hash } => {
                    DeployError::Timeout {
                        contract: contract.clone(),
                        tx_hash,
                    }
                }
                TxError::Reverted { tx_hash } => DeployError::Reverted {
                    contract: contract.clone(),
                    tx_hash,
                },
            })?;

        let address = receipt
            .contract_address
            .ok_or_else(|| DeployError::Reverted {
                contract: contract.clone(),
                tx_hash: receipt.transaction_hash,
            })?;

        tracing::info!(
            contract = %contract,
            address = %format!("{address:#x}"),
            block = ?receipt.block_number,
            "contract deployed"
        );

        Ok(DeployedContract {
            name: contract,
            address,
            transaction_hash: receipt.transaction_hash,
            confirmed_at_block: receipt.block_number,
            constructor_args,
        })
    }
}
