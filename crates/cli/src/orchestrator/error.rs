use ethers::types::H256;
use vault_ops_common::{
    address::PredictError, artifacts::ArtifactError, chain::ChainError, deployer::DeployError,
};
use vault_ops_config::IncompleteConfiguration;

/// Failures that end a run before both contracts are in place.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    IncompleteConfiguration(#[from] IncompleteConfiguration),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error(transparent)]
    AccountStateUnavailable(#[from] PredictError),
    #[error("nonce conflict while deploying {contract}: {reason}")]
    NonceConflict { contract: String, reason: String },
    #[error("deployment of {contract} was not confirmed (transaction {tx_hash:#x})")]
    DeploymentTimeout { contract: String, tx_hash: H256 },
    #[error("deployment of {contract} reverted (transaction {tx_hash:#x})")]
    DeploymentReverted { contract: String, tx_hash: H256 },
    #[error("rpc failure while deploying {contract}: {source}")]
    Rpc {
        contract: String,
        #[source]
        source: ChainError,
    },
}

impl From<DeployError> for OrchestratorError {
    fn from(err: DeployError) -> Self {
        match err {
            DeployError::NonceConflict { contract, reason } => {
                Self::NonceConflict { contract, reason }
            }
            DeployError::Timeout { contract, tx_hash } => {
                Self::DeploymentTimeout { contract, tx_hash }
            }
            DeployError::Reverted { contract, tx_hash } => {
                Self::DeploymentReverted { contract, tx_hash }
            }
            DeployError::Artifact(err) => Self::Artifact(err),
            DeployError::Rpc { contract, source } => Self::Rpc { contract, source },
        }
    }
}
