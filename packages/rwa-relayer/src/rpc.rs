//! Read-only chain client with bounded retry, per-call timeouts and receipt polling.
//!
//! [`ChainReader`] is the raw RPC seam (alloy in production, a fake in tests).
//! [`ChainClient`] wraps it with the retry policy every read goes through.

use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::metrics::METRICS;

/// Mined transaction outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub success: bool,
    pub gas_used: u64,
    pub block_number: Option<u64>,
}

/// Raw read-only RPC operations.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Native-token balance in wei.
    async fn balance(&self, address: Address) -> Result<U256, crate::Error>;

    /// Transaction count including pending transactions.
    async fn pending_nonce(&self, address: Address) -> Result<u64, crate::Error>;

    /// `None` while the transaction is not mined yet.
    async fn receipt(&self, tx_hash: TxHash) -> Result<Option<TxReceipt>, crate::Error>;

    async fn block_number(&self) -> Result<u64, crate::Error>;
}

/// Retry and timeout policy for read calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub request_timeout: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_retries: config.rpc_max_retries,
            base_delay: Duration::from_millis(config.rpc_retry_base_ms),
            request_timeout: config.request_timeout(),
        }
    }

    /// Retry delay for attempt n (0-indexed).
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

/// Shared read client used for balances, nonces and receipt waits.
#[derive(Clone)]
pub struct ChainClient {
    reader: Arc<dyn ChainReader>,
    policy: RetryPolicy,
    receipt_timeout: Duration,
    poll_interval: Duration,
}

impl ChainClient {
    pub fn new(
        reader: Arc<dyn ChainReader>,
        policy: RetryPolicy,
        receipt_timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            reader,
            policy,
            receipt_timeout,
            poll_interval,
        }
    }

    pub fn from_config(reader: Arc<dyn ChainReader>, config: &Config) -> Self {
        Self::new(
            reader,
            RetryPolicy::from_config(config),
            config.receipt_timeout(),
            config.receipt_poll_interval(),
        )
    }

    pub async fn get_balance(&self, address: Address) -> Result<U256, crate::Error> {
        self.with_retry("get_balance", || self.reader.balance(address))
            .await
    }

    pub async fn pending_nonce(&self, address: Address) -> Result<u64, crate::Error> {
        self.with_retry("pending_nonce", || self.reader.pending_nonce(address))
            .await
    }

    pub async fn block_number(&self) -> Result<u64, crate::Error> {
        self.with_retry("block_number", || self.reader.block_number())
            .await
    }

    /// Single receipt lookup; `None` while pending.
    pub async fn get_receipt(&self, tx_hash: TxHash) -> Result<Option<TxReceipt>, crate::Error> {
        self.with_retry("get_receipt", || self.reader.receipt(tx_hash))
            .await
    }

    /// Poll until the transaction is mined. Bounded by the receipt timeout.
    pub async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TxReceipt, crate::Error> {
        let poll = async {
            loop {
                if let Some(receipt) = self.get_receipt(tx_hash).await? {
                    return Ok::<_, crate::Error>(receipt);
                }
                debug!(tx_hash = %tx_hash, "Receipt not available yet");
                tokio::time::sleep(self.poll_interval).await;
            }
        };

        match tokio::time::timeout(self.receipt_timeout, poll).await {
            Ok(result) => result,
            Err(_) => Err(crate::Error::Timeout(format!(
                "receipt for {tx_hash} not available after {}s",
                self.receipt_timeout.as_secs()
            ))),
        }
    }

    /// Run a read call with a per-attempt timeout and exponential backoff.
    async fn with_retry<T, F, Fut>(&self, op: &'static str, mut call: F) -> Result<T, crate::Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, crate::Error>>,
    {
        let mut last_err = None;
        for attempt in 0..=self.policy.max_retries {
            if attempt > 0 {
                let delay = self.policy.retry_delay(attempt - 1);
                METRICS.rpc_retries.fetch_add(1, Ordering::Relaxed);
                warn!(op, attempt, delay_ms = delay.as_millis() as u64, "Retrying RPC call");
                tokio::time::sleep(delay).await;
            }

            let err = match tokio::time::timeout(self.policy.request_timeout, call()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => e,
                Err(_) => crate::Error::Timeout(format!(
                    "{op} exceeded {}ms",
                    self.policy.request_timeout.as_millis()
                )),
            };
            METRICS.rpc_errors.fetch_add(1, Ordering::Relaxed);
            last_err = Some(err);
        }

        Err(last_err.unwrap_or_else(|| crate::Error::Rpc(format!("{op} failed after retries"))))
    }
}
