//! In-memory doubles for the chain, the artifact store and the verifier.

use std::{
    collections::{HashMap, HashSet},
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use ethers::{
    types::{Address, Bytes, H256, U256},
    utils::id,
};

use crate::{
    address::create_address,
    artifacts::{ArtifactError, ArtifactSource, ContractArtifact},
    chain::{ChainClient, ChainError, TxReceipt, TxRequest},
    verifier::{SourceVerifier, VerificationError, VerificationRequest},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcCall {
    TransactionCount(Address),
    SendTransaction(TxRequest),
    WaitForReceipt(H256),
    Call { to: Address, data: Bytes },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Creation {
    pub address: Address,
    pub nonce: U256,
    pub data: Bytes,
}

#[derive(Default)]
struct State {
    nonce: u64,
    block: u64,
    calls: Vec<RpcCall>,
    creations: Vec<Creation>,
    receipts: HashMap<H256, TxReceipt>,
    storage: HashMap<(Address, [u8; 4]), Bytes>,
    setters: HashMap<[u8; 4], [u8; 4]>,
    failing: HashSet<[u8; 4]>,
    /// Transactions left before a selector starts reverting.
    allowances: HashMap<[u8; 4], usize>,
    failing_creations: HashSet<u64>,
    pending_external: u64,
    nonce_unavailable: bool,
    stall: bool,
}

/// A single-account chain that mines every accepted transaction instantly.
///
/// Contracts have no code: a call to a setter registered with
/// [`MockChain::link_setter`] stores its argument bytes, which the linked
/// getter then returns verbatim.
pub struct MockChain {
    sender: Address,
    state: Mutex<State>,
}

fn selector(data: &[u8]) -> Option<[u8; 4]> {
    data.get(..4).and_then(|s| s.try_into().ok())
}

impl MockChain {
    pub fn new(sender: Address, nonce: u64) -> Self {
        Self {
            sender,
            state: Mutex::new(State {
                nonce,
                block: 100,
                ..Default::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn link_setter(&self, setter: &str, getter: &str) -> &Self {
        self.state().setters.insert(id(setter), id(getter));
        self
    }

    /// Seeds the value returned by `getter` on `contract`.
    pub fn set_view(&self, contract: Address, getter: &str, value: Bytes) -> &Self {
        self.state().storage.insert((contract, id(getter)), value);
        self
    }

    /// Transactions and calls hitting `signature` revert.
    pub fn fail_calls_to(&self, signature: &str) -> &Self {
        self.state().failing.insert(id(signature));
        self
    }

    /// The first `succeeding` transactions hitting `signature` go through;
    /// every later one reverts.
    pub fn fail_calls_after(&self, signature: &str, succeeding: usize) -> &Self {
        self.state().allowances.insert(id(signature), succeeding);
        self
    }

    pub fn clear_failures(&self) -> &Self {
        let mut state = self.state();
        state.failing.clear();
        state.allowances.clear();
        drop(state);
        self
    }

    /// The creation sent with `nonce` is mined but reverts.
    pub fn fail_creation_at(&self, nonce: u64) -> &Self {
        self.state().failing_creations.insert(nonce);
        self
    }

    /// Receipts never arrive.
    pub fn stall_receipts(&self) -> &Self {
        self.state().stall = true;
        self
    }

    pub fn make_nonce_unavailable(&self) -> &Self {
        self.state().nonce_unavailable = true;
        self
    }

    /// `count` transactions from the same account land right before the
    /// next submission.
    pub fn interleave_external_transactions(&self, count: u64) -> &Self {
        self.state().pending_external += count;
        self
    }

    pub fn rpc_call_count(&self) -> usize {
        self.state().calls.len()
    }

    /// Every submitted transaction, accepted or not.
    pub fn sent_transactions(&self) -> Vec<TxRequest> {
        self.state()
            .calls
            .iter()
            .filter_map(|call| match call {
                RpcCall::SendTransaction(tx) => Some(tx.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn write_count(&self) -> usize {
        self.sent_transactions().len()
    }

    pub fn transactions_to(&self, contract: Address) -> Vec<TxRequest> {
        self.sent_transactions()
            .into_iter()
            .filter(|tx| tx.to == Some(contract))
            .collect()
    }

    pub fn creations(&self) -> Vec<Creation> {
        self.state().creations.clone()
    }

    /// Raw value currently stored for `getter` on `contract`.
    pub fn view(&self, contract: Address, getter: &str) -> Option<Bytes> {
        self.state().storage.get(&(contract, id(getter))).cloned()
    }
}

#[async_trait]
impl ChainClient for MockChain {
    fn sender(&self) -> Address {
        self.sender
    }

    async fn transaction_count(&self, account: Address) -> Result<U256, ChainError> {
        let mut state = self.state();
        state.calls.push(RpcCall::TransactionCount(account));
        if state.nonce_unavailable {
            return Err(ChainError::Rpc("connection refused".to_string()));
        }
        if account != self.sender {
            return Ok(U256::zero());
        }
        Ok(U256::from(state.nonce))
    }

    async fn send_transaction(&self, tx: TxRequest) -> Result<H256, ChainError> {
        let mut state = self.state();
        state.calls.push(RpcCall::SendTransaction(tx.clone()));

        let external = std::mem::take(&mut state.pending_external);
        state.nonce += external;
        let nonce = state.nonce;
        if let Some(expected) = tx.nonce {
            if expected != U256::from(nonce) {
                return Err(ChainError::NonceRejected(format!(
                    "nonce too low: next nonce {nonce}, tx nonce {expected}"
                )));
            }
        }

        state.nonce += 1;
        state.block += 1;
        let tx_hash = H256::from_low_u64_be(nonce + 1);

        let (success, contract_address) = match tx.to {
            None => {
                let address = create_address(self.sender, U256::from(nonce));
                state.creations.push(Creation {
                    address,
                    nonce: U256::from(nonce),
                    data: tx.data.clone(),
                });
                if state.failing_creations.contains(&nonce) {
                    (false, None)
                } else {
                    (true, Some(address))
                }
            }
            Some(to) => {
                let selector = selector(&tx.data);
                let exhausted = match selector.and_then(|s| state.allowances.get_mut(&s)) {
                    Some(0) => true,
                    Some(left) => {
                        *left -= 1;
                        false
                    }
                    None => false,
                };
                let reverted = exhausted || selector.is_some_and(|s| state.failing.contains(&s));
                if !reverted {
                    if let Some(getter) = selector.and_then(|s| state.setters.get(&s).copied()) {
                        let value = Bytes::from(tx.data[4..].to_vec());
                        state.storage.insert((to, getter), value);
                    }
                }
                (!reverted, None)
            }
        };

        let block_number = Some(state.block);
        state.receipts.insert(
            tx_hash,
            TxReceipt {
                transaction_hash: tx_hash,
                block_number,
                contract_address,
                success,
            },
        );
        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: H256) -> Result<Option<TxReceipt>, ChainError> {
        let (stall, receipt) = {
            let mut state = self.state();
            state.calls.push(RpcCall::WaitForReceipt(tx_hash));
            (state.stall, state.receipts.get(&tx_hash).cloned())
        };
        if stall {
            std::future::pending::<()>().await;
        }
        Ok(receipt)
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError> {
        let mut state = self.state();
        state.calls.push(RpcCall::Call {
            to,
            data: data.clone(),
        });
        let selector = selector(&data)
            .filter(|s| !state.failing.contains(s))
            .ok_or_else(|| ChainError::Rpc("execution reverted".to_string()))?;
        state
            .storage
            .get(&(to, selector))
            .cloned()
            .ok_or_else(|| ChainError::Rpc("execution reverted".to_string()))
    }
}

/// Artifacts held in memory, keyed by contract name.
#[derive(Debug, Clone, Default)]
pub struct InMemoryArtifacts {
    artifacts: HashMap<String, ContractArtifact>,
}

impl InMemoryArtifacts {
    pub fn with(mut self, artifact: ContractArtifact) -> Self {
        self.artifacts.insert(artifact.name.clone(), artifact);
        self
    }
}

impl ArtifactSource for InMemoryArtifacts {
    fn load(&self, name: &str) -> Result<ContractArtifact, ArtifactError> {
        self.artifacts
            .get(name)
            .cloned()
            .ok_or_else(|| ArtifactError::NotFound {
                name: name.to_string(),
                searched: Vec::new(),
            })
    }
}

/// Records verification requests and fails those for one contract name.
#[derive(Debug, Default)]
pub struct RecordingVerifier {
    failing: Option<String>,
    requests: Mutex<Vec<VerificationRequest>>,
}

impl RecordingVerifier {
    pub fn failing_for(contract_name: &str) -> Self {
        Self {
            failing: Some(contract_name.to_string()),
            requests: Mutex::default(),
        }
    }

    pub fn requests(&self) -> Vec<VerificationRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl SourceVerifier for RecordingVerifier {
    async fn verify(&self, request: &VerificationRequest) -> Result<(), VerificationError> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request.clone());
        if self.failing.as_deref() == Some(request.contract_name.as_str()) {
            return Err(VerificationError::Rejected(
                "explorer rejected the submission".to_string(),
            ));
        }
        Ok(())
    }
}
