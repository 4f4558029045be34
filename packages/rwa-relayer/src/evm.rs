//! alloy-backed implementations of [`ChainReader`] and [`TxSubmitter`].

use alloy::network::{EthereumWallet, ReceiptResponse, TransactionBuilder};
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use tracing::info;
use url::Url;

use crate::config::{Config, PrivateKey};
use crate::contracts::ContractCall;
use crate::rpc::{ChainReader, TxReceipt};
use crate::signer::TxSubmitter;

fn parse_rpc_url(config: &Config) -> Result<Url, crate::Error> {
    config
        .rpc_url
        .parse()
        .map_err(|e| crate::Error::Config(format!("Invalid rpc_url {}: {e}", config.rpc_url)))
}

/// JSON-RPC read client.
pub struct EvmReader {
    provider: DynProvider,
}

impl EvmReader {
    pub fn connect(config: &Config) -> Result<Self, crate::Error> {
        let url = parse_rpc_url(config)?;
        info!(rpc = %url, "RPC read client initialized");
        let provider = ProviderBuilder::new().connect_http(url).erased();
        Ok(Self { provider })
    }

    /// Fail fast when the endpoint serves a different chain than configured.
    pub async fn verify_chain_id(&self, expected: u64) -> Result<(), crate::Error> {
        let actual = self
            .provider
            .get_chain_id()
            .await
            .map_err(|e| crate::Error::Rpc(format!("eth_chainId failed: {e}")))?;
        if actual != expected {
            return Err(crate::Error::Config(format!(
                "rpc_url serves chain {actual}, expected chain_id {expected}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ChainReader for EvmReader {
    async fn balance(&self, address: Address) -> Result<U256, crate::Error> {
        self.provider
            .get_balance(address)
            .await
            .map_err(|e| crate::Error::Rpc(format!("eth_getBalance failed: {e}")))
    }

    async fn pending_nonce(&self, address: Address) -> Result<u64, crate::Error> {
        self.provider
            .get_transaction_count(address)
            .pending()
            .await
            .map_err(|e| crate::Error::Rpc(format!("eth_getTransactionCount failed: {e}")))
    }

    async fn receipt(&self, tx_hash: TxHash) -> Result<Option<TxReceipt>, crate::Error> {
        let receipt = self
            .provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(|e| crate::Error::Rpc(format!("eth_getTransactionReceipt failed: {e}")))?;

        Ok(receipt.map(|r| TxReceipt {
            tx_hash: r.transaction_hash,
            success: r.status(),
            gas_used: r.gas_used(),
            block_number: r.block_number,
        }))
    }

    async fn block_number(&self) -> Result<u64, crate::Error> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| crate::Error::Rpc(format!("eth_blockNumber failed: {e}")))
    }
}

/// Local private-key wallet. Gas and fees are filled by the provider;
/// nonce and chain id are always set explicitly.
pub struct WalletSubmitter {
    provider: DynProvider,
    address: Address,
    chain_id: u64,
}

impl WalletSubmitter {
    pub fn new(config: &Config, key: &PrivateKey) -> Result<Self, crate::Error> {
        let signer: PrivateKeySigner = key
            .expose()
            .parse()
            .map_err(|e| crate::Error::Config(format!("Invalid relayer private key: {e}")))?;
        let address = signer.address();
        let url = parse_rpc_url(config)?;

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();

        Ok(Self {
            provider,
            address,
            chain_id: config.chain_id,
        })
    }
}

#[async_trait]
impl TxSubmitter for WalletSubmitter {
    fn address(&self) -> Address {
        self.address
    }

    async fn send(&self, call: &ContractCall, nonce: u64) -> Result<TxHash, crate::Error> {
        let tx = TransactionRequest::default()
            .with_from(self.address)
            .with_to(call.to)
            .with_input(call.data.clone())
            .with_nonce(nonce)
            .with_chain_id(self.chain_id);

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| crate::Error::Submission(e.to_string()))?;

        Ok(*pending.tx_hash())
    }
}
