//! Source verification with a block explorer, run in the background so it
//! never delays or fails a deployment.

use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use ethers::types::{Address, Bytes};
use tokio::task::JoinHandle;
use xshell::{cmd, Shell};

use crate::{
    cmd::{Cmd, CmdError},
    logger,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRequest {
    pub contract_name: String,
    pub address: Address,
    pub constructor_args: Bytes,
}

#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("could not prepare the verification shell: {0}")]
    Shell(#[from] xshell::Error),
    #[error(transparent)]
    Command(#[from] CmdError),
    #[error("verification task stopped before completion: {0}")]
    Interrupted(String),
    #[error("{0}")]
    Rejected(String),
}

#[async_trait]
pub trait SourceVerifier: Send + Sync {
    async fn verify(&self, request: &VerificationRequest) -> Result<(), VerificationError>;
}

/// Submits sources through `forge verify-contract` from the contracts project.
#[derive(Debug, Clone)]
pub struct ForgeVerifier {
    project_root: PathBuf,
    chain_id: u64,
    etherscan_api_key: Option<String>,
}

impl ForgeVerifier {
    pub fn new(project_root: PathBuf, chain_id: u64) -> Self {
        Self {
            project_root,
            chain_id,
            etherscan_api_key: None,
        }
    }

    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.etherscan_api_key = key;
        self
    }
}

#[async_trait]
impl SourceVerifier for ForgeVerifier {
    async fn verify(&self, request: &VerificationRequest) -> Result<(), VerificationError> {
        let root = self.project_root.clone();
        let chain_id = self.chain_id.to_string();
        let api_key = self.etherscan_api_key.clone();
        let name = request.contract_name.clone();
        let address = format!("{:#x}", request.address);
        let args = format!("0x{}", hex::encode(&request.constructor_args));

        tokio::task::spawn_blocking(move || -> Result<(), VerificationError> {
            let shell = Shell::new()?;
            shell.change_dir(&root);
            let mut command = Cmd::new(cmd!(
                shell,
                "forge verify-contract --chain {chain_id} --constructor-args {args} --watch {address} {name}"
            ));
            if let Some(key) = api_key.as_deref() {
                command = command.env("ETHERSCAN_API_KEY", key);
            }
            command.run()?;
            Ok(())
        })
        .await
        .map_err(|err| VerificationError::Interrupted(err.to_string()))?
    }
}

#[derive(Debug)]
pub struct VerificationOutcome {
    pub contract_name: String,
    pub address: Address,
    pub result: Result<(), String>,
}

impl VerificationOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Verification jobs started by a run. Dropping the handle detaches them.
pub struct VerificationHandle {
    tasks: Vec<(VerificationRequest, JoinHandle<Result<(), VerificationError>>)>,
}

impl VerificationHandle {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Waits for every job. Failures are logged and returned, never raised.
    pub async fn join(self) -> Vec<VerificationOutcome> {
        let mut outcomes = Vec::with_capacity(self.tasks.len());
        for (request, task) in self.tasks {
            let result = match task.await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(err)) => Err(err.to_string()),
                Err(err) => Err(VerificationError::Interrupted(err.to_string()).to_string()),
            };
            match &result {
                Ok(()) => logger::success(format!(
                    "Verified {} at {:#x}",
                    request.contract_name, request.address
                )),
                Err(reason) => logger::warn(format!(
                    "Verification of {} at {:#x} failed: {reason}",
                    request.contract_name, request.address
                )),
            }
            outcomes.push(VerificationOutcome {
                contract_name: request.contract_name,
                address: request.address,
                result,
            });
        }
        outcomes
    }
}

/// Starts one verification job per request and returns without waiting.
pub fn spawn_verifications(
    verifier: Arc<dyn SourceVerifier>,
    requests: Vec<VerificationRequest>,
) -> VerificationHandle {
    let tasks = requests
        .into_iter()
        .map(|request| {
            let verifier = Arc::clone(&verifier);
            let job = request.clone();
            tracing::debug!(contract = %job.contract_name, "verification submitted");
            let task = tokio::spawn(async move { verifier.verify(&job).await });
            (request, task)
        })
        .collect();
    VerificationHandle { tasks }
}
