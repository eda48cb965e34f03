//! The chain RPC boundary every component talks to.

use std::time::Duration;

use async_trait::async_trait;
use ethers::types::{Address, Bytes, H256, U256};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    /// The node refused the transaction because its nonce does not match the
    /// account's live nonce.
    #[error("nonce rejected by node: {0}")]
    NonceRejected(String),
    #[error("rpc error: {0}")]
    Rpc(String),
}

/// A transaction as submitted by the deployer or the configurator.
///
/// `to == None` is a contract creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxRequest {
    pub to: Option<Address>,
    pub data: Bytes,
    pub gas_limit: Option<U256>,
    pub gas_price: Option<U256>,
    pub nonce: Option<U256>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub transaction_hash: H256,
    pub block_number: Option<u64>,
    pub contract_address: Option<Address>,
    pub success: bool,
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Account signing every transaction sent through this client.
    fn sender(&self) -> Address;

    async fn transaction_count(&self, account: Address) -> Result<U256, ChainError>;

    async fn send_transaction(&self, tx: TxRequest) -> Result<H256, ChainError>;

    /// Resolves once the transaction is confirmed, or with `None` if the node
    /// dropped it.
    async fn wait_for_receipt(&self, tx_hash: H256) -> Result<Option<TxReceipt>, ChainError>;

    /// Read-only call against the latest block.
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TxError {
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error("transaction {tx_hash:#x} was not confirmed in time")]
    Timeout { tx_hash: H256 },
    #[error("transaction {tx_hash:#x} was dropped by the node")]
    Dropped { tx_hash: H256 },
    #[error("transaction {tx_hash:#x} reverted")]
    Reverted { tx_hash: H256 },
}

/// Sends `tx` and waits up to `timeout` for a successful receipt.
pub async fn submit_and_wait(
    client: &dyn ChainClient,
    tx: TxRequest,
    timeout: Duration,
) -> Result<TxReceipt, TxError> {
    let tx_hash = client.send_transaction(tx).await?;
    tracing::debug!(tx_hash = %format!("{tx_hash:#x}"), "transaction submitted");

    let receipt = match tokio::time::timeout(timeout, client.wait_for_receipt(tx_hash)).await {
        Err(_) => return Err(TxError::Timeout { tx_hash }),
        Ok(receipt) => receipt?,
    };

    match receipt {
        None => Err(TxError::Dropped { tx_hash }),
        Some(receipt) if !receipt.success => Err(TxError::Reverted { tx_hash }),
        Some(receipt) => Ok(receipt),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockChain;

    #[tokio::test]
    async fn reverted_transaction_is_an_error() {
        let chain = MockChain::new(Address::repeat_byte(1), 0);
        let target = Address::repeat_byte(9);
        chain.fail_calls_to("harvest()");

        let tx = TxRequest {
            to: Some(target),
            data: ethers::utils::id("harvest()").to_vec().into(),
            ..Default::default()
        };
        let err = submit_and_wait(&chain, tx, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, TxError::Reverted { .. }));
    }

    #[tokio::test]
    async fn stalled_transaction_times_out() {
        let chain = MockChain::new(Address::repeat_byte(1), 0);
        chain.stall_receipts();

        let err = submit_and_wait(&chain, TxRequest::default(), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, TxError::Timeout { .. }));
    }
}
