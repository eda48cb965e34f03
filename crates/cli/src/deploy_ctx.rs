use std::{str::FromStr, time::Duration};

use clap::Parser;
use ethers::{
    core::rand::thread_rng,
    signers::{LocalWallet, Signer},
    types::H256,
};
use vault_ops_common::{ethereum::EthersClient, logger};
use vault_ops_config::{DEFAULT_CONFIRMATION_TIMEOUT_SECS, DEFAULT_RPC_URL};

/// Anvil/Hardhat first default account private key.
/// Mnemonic: "test test test test test test test test test test test junk"
const DEV_PRIVATE_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// RPC endpoint and deployer account shared by every command that talks to a node.
#[derive(Debug, Clone, Parser)]
pub struct ConnectionArgs {
    /// RPC URL of the target network
    #[clap(long, default_value = DEFAULT_RPC_URL)]
    pub rpc_url: String,
    /// Private key of the deployer account
    #[clap(long, visible_alias = "pk")]
    pub private_key: Option<H256>,
    /// Use the anvil/hardhat default dev account
    #[clap(long)]
    pub dev: bool,
    /// Seconds to wait for each transaction to be confirmed
    #[clap(long, default_value_t = DEFAULT_CONFIRMATION_TIMEOUT_SECS)]
    pub confirmation_timeout: u64,
}

impl ConnectionArgs {
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout)
    }

    pub async fn connect(&self) -> anyhow::Result<EthersClient> {
        let wallet = resolve_signer(self.private_key, self.dev)?;
        self.connect_with(wallet).await
    }

    /// Connects without requiring a signer. Only safe for commands that never
    /// send transactions.
    pub async fn connect_read_only(&self) -> anyhow::Result<EthersClient> {
        let wallet = match resolve_signer(self.private_key, self.dev) {
            Ok(wallet) => wallet,
            Err(_) => LocalWallet::new(&mut thread_rng()),
        };
        self.connect_with(wallet).await
    }

    async fn connect_with(&self, wallet: LocalWallet) -> anyhow::Result<EthersClient> {
        logger::debug(format!(
            "Connecting to {} as {:#x}",
            self.rpc_url,
            wallet.address()
        ));
        EthersClient::connect(&self.rpc_url, wallet).await
    }
}

/// Resolves the deployer signer from CLI args.
///
/// `--private-key` wins over `--dev`; one of them must be provided.
pub fn resolve_signer(private_key: Option<H256>, dev: bool) -> anyhow::Result<LocalWallet> {
    let key = match (private_key, dev) {
        (Some(pk), _) => pk,
        (None, true) => H256::from_str(DEV_PRIVATE_KEY)?,
        (None, false) => anyhow::bail!("Either --private-key or --dev must be provided"),
    };
    LocalWallet::from_bytes(key.as_bytes())
        .map_err(|e| anyhow::anyhow!("Invalid private key: {}", e))
}

#[cfg(test)]
mod tests {
    use ethers::types::Address;

    use super::*;

    #[test]
    fn dev_flag_uses_the_default_anvil_account() {
        let wallet = resolve_signer(None, true).unwrap();
        let expected: Address = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse().unwrap();
        assert_eq!(wallet.address(), expected);
    }

    #[test]
    fn explicit_key_wins_over_dev() {
        let key = H256::repeat_byte(0x42);
        let wallet = resolve_signer(Some(key), true).unwrap();
        let expected = LocalWallet::from_bytes(key.as_bytes()).unwrap();
        assert_eq!(wallet.address(), expected.address());
    }

    #[test]
    fn a_signer_is_required() {
        assert!(resolve_signer(None, false).is_err());
    }
}
