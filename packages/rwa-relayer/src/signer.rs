//! Relayer account: one signing key, one chain, one nonce sequence.
//!
//! [`TxSubmitter`] is the signing seam (a local alloy wallet in production).
//! [`RelayerAccount`] serializes every submission for the key so nonces are
//! assigned in order even when relay requests arrive concurrently.

use alloy::primitives::{Address, TxHash};
use async_trait::async_trait;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use crate::contracts::ContractCall;
use crate::metrics::METRICS;
use crate::rpc::ChainClient;

/// Signs a contract call with the relayer key and broadcasts it.
#[async_trait]
pub trait TxSubmitter: Send + Sync {
    fn address(&self) -> Address;

    /// Sign `call` with the given nonce and broadcast. Returns once the node accepts it.
    async fn send(&self, call: &ContractCall, nonce: u64) -> Result<TxHash, crate::Error>;
}

/// Transaction-signing handle bound to the relayer key.
pub struct RelayerAccount {
    submitter: Arc<dyn TxSubmitter>,
    chain: ChainClient,
    /// Next nonce to use. `None` = resync from chain before the next submission.
    /// Held across sign + broadcast; this is the single writer for the key.
    next_nonce: AsyncMutex<Option<u64>>,
    submit_timeout: Duration,
}

impl RelayerAccount {
    pub fn new(submitter: Arc<dyn TxSubmitter>, chain: ChainClient, submit_timeout: Duration) -> Self {
        info!(address = %submitter.address(), "Relayer account ready");
        Self {
            submitter,
            chain,
            next_nonce: AsyncMutex::new(None),
            submit_timeout,
        }
    }

    pub fn address(&self) -> Address {
        self.submitter.address()
    }

    /// Sign and broadcast `call`. Never retried; any failure clears the cached nonce.
    pub async fn submit(&self, call: &ContractCall) -> Result<TxHash, crate::Error> {
        let mut next_nonce = self.next_nonce.lock().await;

        let nonce = match *next_nonce {
            Some(n) => n,
            None => {
                let n = self.chain.pending_nonce(self.address()).await?;
                debug!(nonce = n, "Synced relayer nonce from chain");
                n
            }
        };

        let result =
            match tokio::time::timeout(self.submit_timeout, self.submitter.send(call, nonce)).await {
                Ok(result) => result,
                Err(_) => Err(crate::Error::Timeout(format!(
                    "{} submission exceeded {}s",
                    call.method,
                    self.submit_timeout.as_secs()
                ))),
            };

        match result {
            Ok(tx_hash) => {
                *next_nonce = Some(nonce + 1);
                debug!(tx_hash = %tx_hash, nonce, method = call.method, "Broadcast accepted");
                Ok(tx_hash)
            }
            Err(e) => {
                *next_nonce = None;
                METRICS.nonce_resyncs.fetch_add(1, Ordering::Relaxed);
                if e.is_nonce_error() {
                    warn!(nonce, error = %e, "Nonce rejected, will resync from chain");
                }
                Err(e)
            }
        }
    }

    /// Drop the cached nonce so the next submission resyncs from the chain.
    ///
    /// Called when a broadcast transaction never shows up on-chain; the node may
    /// have evicted it, leaving the cache ahead of the pending nonce.
    pub async fn invalidate_nonce(&self) {
        let mut next_nonce = self.next_nonce.lock().await;
        if let Some(stale) = next_nonce.take() {
            METRICS.nonce_resyncs.fetch_add(1, Ordering::Relaxed);
            warn!(cached = stale, "Dropping cached nonce, will resync from chain");
        }
    }
}

impl std::fmt::Debug for RelayerAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RelayerAccount({})", self.address())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fake_client, FakeChain};
    use alloy::primitives::U256;

    fn account(chain: &Arc<FakeChain>) -> RelayerAccount {
        RelayerAccount::new(chain.clone(), fake_client(chain), Duration::from_secs(5))
    }

    fn call(n: u64) -> ContractCall {
        ContractCall::finalize_proposal(FakeChain::dao_address(), U256::from(n))
    }

    #[tokio::test]
    async fn test_first_submit_syncs_nonce_from_chain() {
        let chain = Arc::new(FakeChain::new());
        chain.set_chain_nonce(41);
        let account = account(&chain);

        account.submit(&call(1)).await.unwrap();
        account.submit(&call(2)).await.unwrap();

        assert_eq!(chain.sent_nonces(), vec![41, 42]);
        // Second submission uses the cached nonce.
        assert_eq!(chain.nonce_calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_submits_get_sequential_nonces() {
        let chain = Arc::new(FakeChain::new());
        let account = Arc::new(account(&chain));

        let mut handles = Vec::new();
        for i in 0..16 {
            let account = Arc::clone(&account);
            handles.push(tokio::spawn(async move { account.submit(&call(i)).await }));
        }
        let mut hashes = Vec::new();
        for h in handles {
            hashes.push(h.await.unwrap().unwrap());
        }

        let mut nonces = chain.sent_nonces();
        nonces.sort_unstable();
        assert_eq!(nonces, (0..16).collect::<Vec<u64>>());
        hashes.sort();
        hashes.dedup();
        assert_eq!(hashes.len(), 16);
    }

    #[tokio::test]
    async fn test_failure_clears_nonce_and_resyncs() {
        let chain = Arc::new(FakeChain::new());
        let account = account(&chain);

        account.submit(&call(1)).await.unwrap();
        chain.fail_sends("insufficient funds for gas * price + value");
        let err = account.submit(&call(2)).await.unwrap_err();
        assert_eq!(
            err,
            crate::Error::Submission("insufficient funds for gas * price + value".into())
        );

        chain.clear_send_failure();
        account.submit(&call(3)).await.unwrap();
        assert_eq!(chain.sent_nonces(), vec![0, 1]);
        assert_eq!(chain.nonce_calls(), 2);
    }

    #[tokio::test]
    async fn test_out_of_band_nonce_drift_recovers() {
        let chain = Arc::new(FakeChain::new());
        let account = account(&chain);

        account.submit(&call(1)).await.unwrap();
        // Another process used the key.
        chain.set_chain_nonce(5);
        let err = account.submit(&call(2)).await.unwrap_err();
        assert!(err.is_nonce_error());

        account.submit(&call(3)).await.unwrap();
        assert_eq!(chain.sent_nonces(), vec![0, 5]);
    }

    #[tokio::test]
    async fn test_invalidate_nonce_rewinds_to_chain() {
        let chain = Arc::new(FakeChain::new());
        chain.drop_accepted_txs();
        let account = account(&chain);

        account.submit(&call(1)).await.unwrap();
        account.submit(&call(2)).await.unwrap();
        account.invalidate_nonce().await;
        account.submit(&call(3)).await.unwrap();

        // Both earlier transactions were lost; the pending nonce is still 0.
        assert_eq!(chain.sent_nonces(), vec![0, 1, 0]);
        assert_eq!(chain.nonce_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_broadcast_times_out() {
        let chain = Arc::new(FakeChain::new());
        chain.hang_sends();
        let account = account(&chain);
        let err = account.submit(&call(1)).await.unwrap_err();
        assert!(matches!(err, crate::Error::Timeout(_)));
    }
}
