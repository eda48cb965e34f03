use std::{fmt::Display, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use ethers::{
    middleware::SignerMiddleware,
    providers::{Http, Middleware, PendingTransaction, Provider},
    signers::{LocalWallet, Signer},
    types::{
        transaction::eip2718::TypedTransaction, Address, Bytes, TransactionReceipt,
        TransactionRequest, H256, U256,
    },
};

use crate::chain::{ChainClient, ChainError, TxReceipt, TxRequest};

/// Node error messages meaning the submitted nonce does not match the
/// account's live nonce.
const NONCE_ERRORS: &[&str] = &[
    "nonce too low",
    "nonce too high",
    "invalid nonce",
    "already known",
    "replacement transaction underpriced",
    "nonce has already been used",
];

const POLL_INTERVAL: Duration = Duration::from_secs(2);
const CONFIRMATIONS: usize = 1;

/// [`ChainClient`] over an HTTP JSON-RPC endpoint, signing with a local key.
pub struct EthersClient {
    inner: SignerMiddleware<Provider<Http>, LocalWallet>,
}

impl EthersClient {
    pub async fn connect(rpc_url: &str, wallet: LocalWallet) -> anyhow::Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .with_context(|| format!("Invalid RPC URL: {rpc_url}"))?
            .interval(POLL_INTERVAL);
        let chain_id = provider
            .get_chainid()
            .await
            .with_context(|| format!("Failed to fetch chain id from {rpc_url}"))?;
        let wallet = wallet.with_chain_id(chain_id.as_u64());

        Ok(Self {
            inner: SignerMiddleware::new(provider, wallet),
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.inner.signer().chain_id()
    }
}

fn classify(err: impl Display) -> ChainError {
    let message = err.to_string();
    let lower = message.to_lowercase();
    if NONCE_ERRORS.iter().any(|needle| lower.contains(needle)) {
        ChainError::NonceRejected(message)
    } else {
        ChainError::Rpc(message)
    }
}

impl From<TransactionReceipt> for TxReceipt {
    fn from(receipt: TransactionReceipt) -> Self {
        Self {
            transaction_hash: receipt.transaction_hash,
            block_number: receipt.block_number.map(|block| block.as_u64()),
            contract_address: receipt.contract_address,
            // Pre-byzantium receipts carry no status.
            success: receipt.status.map_or(true, |status| status.as_u64() == 1),
        }
    }
}

#[async_trait]
impl ChainClient for EthersClient {
    fn sender(&self) -> Address {
        self.inner.address()
    }

    async fn transaction_count(&self, account: Address) -> Result<U256, ChainError> {
        self.inner
            .get_transaction_count(account, None)
            .await
            .map_err(classify)
    }

    async fn send_transaction(&self, tx: TxRequest) -> Result<H256, ChainError> {
        let mut request = TransactionRequest::new().from(self.sender()).data(tx.data);
        if let Some(to) = tx.to {
            request = request.to(to);
        }
        if let Some(gas) = tx.gas_limit {
            request = request.gas(gas);
        }
        if let Some(gas_price) = tx.gas_price {
            request = request.gas_price(gas_price);
        }
        if let Some(nonce) = tx.nonce {
            request = request.nonce(nonce);
        }

        let pending = self
            .inner
            .send_transaction(request, None)
            .await
            .map_err(classify)?;
        Ok(pending.tx_hash())
    }

    async fn wait_for_receipt(&self, tx_hash: H256) -> Result<Option<TxReceipt>, ChainError> {
        let receipt = PendingTransaction::new(tx_hash, self.inner.provider())
            .interval(POLL_INTERVAL)
            .confirmations(CONFIRMATIONS)
            .await
            .map_err(classify)?;
        Ok(receipt.map(TxReceipt::from))
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError> {
        let tx: TypedTransaction = TransactionRequest::new().to(to).data(data).into();
        self.inner.call(&tx, None).await.map_err(classify)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonce_errors_are_recognised() {
        assert_eq!(
            classify("(code: -32000, message: nonce too low, data: None)"),
            ChainError::NonceRejected("(code: -32000, message: nonce too low, data: None)".into())
        );
        assert!(matches!(
            classify("Nonce Too High"),
            ChainError::NonceRejected(_)
        ));
        assert!(matches!(
            classify("insufficient funds for gas * price + value"),
            ChainError::Rpc(_)
        ));
    }

    #[test]
    fn receipt_without_status_counts_as_success() {
        let receipt = TransactionReceipt {
            transaction_hash: H256::repeat_byte(1),
            block_number: Some(12.into()),
            contract_address: Some(Address::repeat_byte(2)),
            status: None,
            ..Default::default()
        };
        let receipt = TxReceipt::from(receipt);
        assert!(receipt.success);
        assert_eq!(receipt.block_number, Some(12));
    }
}
