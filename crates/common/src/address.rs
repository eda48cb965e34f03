//! Address prediction for contracts created by a plain creation transaction.

use std::collections::BTreeMap;

use ethers::{
    types::{Address, U256},
    utils::{keccak256, rlp::RlpStream},
};

use crate::chain::{ChainClient, ChainError};

/// Address of the contract created by `sender` with transaction nonce `nonce`:
/// the low 160 bits of `keccak256(rlp([sender, nonce]))`.
///
/// The nonce is RLP-encoded as a minimal big-endian integer, so zero becomes
/// the empty string.
pub fn create_address(sender: Address, nonce: U256) -> Address {
    let mut stream = RlpStream::new_list(2);
    stream.append(&sender);
    stream.append(&nonce);
    let hash = keccak256(stream.out());
    Address::from_slice(&hash[12..])
}

#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    #[error("could not fetch the transaction count of {account:#x}: {source}")]
    AccountStateUnavailable {
        account: Address,
        #[source]
        source: ChainError,
    },
}

/// Addresses an account's upcoming creations will occupy, relative to the
/// nonce observed at prediction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prediction {
    pub account: Address,
    pub base_nonce: U256,
    pub addresses: BTreeMap<u64, Address>,
}

impl Prediction {
    /// Address of the creation `offset` transactions ahead. Offsets that were
    /// not part of the prediction are derived from the same base nonce.
    pub fn address(&self, offset: u64) -> Address {
        self.addresses
            .get(&offset)
            .copied()
            .unwrap_or_else(|| create_address(self.account, self.nonce(offset)))
    }

    /// Nonce the creation at `offset` has to be sent with.
    pub fn nonce(&self, offset: u64) -> U256 {
        self.base_nonce + U256::from(offset)
    }
}

/// Fetches the account's transaction count once and derives the address of
/// each creation `offset` transactions ahead.
///
/// Only valid while the account sends nothing but the predicted creations, in
/// order.
pub async fn predict(
    client: &dyn ChainClient,
    account: Address,
    offsets: &[u64],
) -> Result<Prediction, PredictError> {
    let base_nonce = client
        .transaction_count(account)
        .await
        .map_err(|source| PredictError::AccountStateUnavailable { account, source })?;

    let addresses = offsets
        .iter()
        .map(|&offset| {
            let nonce = base_nonce + U256::from(offset);
            (offset, create_address(account, nonce))
        })
        .collect();

    tracing::debug!(
        account = %format!("{account:#x}"),
        base_nonce = %base_nonce,
        "predicted creation addresses"
    );

    Ok(Prediction {
        account,
        base_nonce,
        addresses,
    })
}
