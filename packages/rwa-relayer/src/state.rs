//! Application state shared across handlers.

use crate::config::Config;
use crate::evm::{EvmReader, WalletSubmitter};
use crate::rpc::{ChainClient, ChainReader};
use crate::signer::{RelayerAccount, TxSubmitter};
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub chain: ChainClient,
    /// `None` when no private key is configured.
    relayer: Option<Arc<RelayerAccount>>,
    pub start_time: Instant,
    pub request_count: AtomicU64,
}

impl AppState {
    /// Create application state from configuration, connecting to the configured RPC.
    pub async fn new(config: Config) -> Result<Self, crate::Error> {
        let reader = EvmReader::connect(&config)?;
        let verified = match tokio::time::timeout(
            config.request_timeout(),
            reader.verify_chain_id(config.chain_id),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(crate::Error::Timeout("eth_chainId at startup".into())),
        };
        startup_chain_check(verified)?;

        let submitter: Option<Arc<dyn TxSubmitter>> = match &config.private_key {
            Some(key) if !key.is_empty() => Some(Arc::new(WalletSubmitter::new(&config, key)?)),
            _ => {
                warn!("RELAYER_PRIVATE_KEY not set, relay endpoints will answer 500");
                None
            }
        };

        Ok(Self::from_parts(config, Arc::new(reader), submitter))
    }

    /// Assemble state from explicit chain and signing backends.
    pub fn from_parts(
        config: Config,
        reader: Arc<dyn ChainReader>,
        submitter: Option<Arc<dyn TxSubmitter>>,
    ) -> Self {
        let chain = ChainClient::from_config(reader, &config);
        let relayer = submitter.map(|s| {
            Arc::new(RelayerAccount::new(s, chain.clone(), config.submit_timeout()))
        });

        if let Some(account) = &relayer {
            info!(address = %account.address(), chain_id = config.chain_id, "Loaded relayer key");
        }

        Self {
            config,
            chain,
            relayer,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
        }
    }

    /// The relayer handle, or a not-configured error.
    pub fn relayer(&self) -> Result<&RelayerAccount, crate::Error> {
        self.relayer
            .as_deref()
            .ok_or_else(|| crate::Error::NotConfigured("RELAYER_PRIVATE_KEY is not set".into()))
    }
}

/// An unreachable RPC at boot is only logged (`/health` reports it); a chain-id mismatch is fatal.
fn startup_chain_check(result: Result<(), crate::Error>) -> Result<(), crate::Error> {
    match result {
        Err(e @ (crate::Error::Rpc(_) | crate::Error::Timeout(_))) => {
            warn!(error = %e, "RPC unreachable at startup, chain id not verified");
            Ok(())
        }
        other => other,
    }
}
