//! In-memory chain used by unit and HTTP tests.
//!
//! Implements both [`ChainReader`] and [`TxSubmitter`] and counts every call,
//! so tests can assert that a rejected request never reached the chain.

use alloy::primitives::{address, Address, TxHash, U256};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::Config;
use crate::contracts::ContractCall;
use crate::rpc::{ChainClient, ChainReader, RetryPolicy, TxReceipt};
use crate::signer::TxSubmitter;

pub(crate) const RELAYER: Address = address!("0x00000000000000000000000000000000000000ee");
pub(crate) const DAO: Address = address!("0x00000000000000000000000000000000000000da");
pub(crate) const GOVERNOR: Address = address!("0x00000000000000000000000000000000000000a0");

pub(crate) struct FakeChain {
    balance: Mutex<U256>,
    chain_nonce: AtomicU64,
    sent: Mutex<Vec<(ContractCall, u64)>>,
    read_failures: AtomicU32,
    pending_polls: AtomicU32,
    revert: AtomicBool,
    send_error: Mutex<Option<String>>,
    hang: AtomicBool,
    drop_accepted: AtomicBool,
    balance_calls: AtomicUsize,
    nonce_calls: AtomicUsize,
    receipt_calls: AtomicUsize,
    send_calls: AtomicUsize,
}

impl FakeChain {
    pub(crate) fn new() -> Self {
        Self {
            balance: Mutex::new(U256::from(10u64).pow(U256::from(18))),
            chain_nonce: AtomicU64::new(0),
            sent: Mutex::new(Vec::new()),
            read_failures: AtomicU32::new(0),
            pending_polls: AtomicU32::new(0),
            revert: AtomicBool::new(false),
            send_error: Mutex::new(None),
            hang: AtomicBool::new(false),
            drop_accepted: AtomicBool::new(false),
            balance_calls: AtomicUsize::new(0),
            nonce_calls: AtomicUsize::new(0),
            receipt_calls: AtomicUsize::new(0),
            send_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn relayer_address(&self) -> Address {
        RELAYER
    }

    pub(crate) fn dao_address() -> Address {
        DAO
    }

    /// Deterministic hash: `0x1234…<nonce>`.
    pub(crate) fn tx_hash_for(nonce: u64) -> TxHash {
        let mut bytes = [0u8; 32];
        bytes[0] = 0x12;
        bytes[1] = 0x34;
        bytes[24..].copy_from_slice(&nonce.to_be_bytes());
        TxHash::from(bytes)
    }

    // --- Knobs ---

    pub(crate) fn set_balance(&self, wei: U256) {
        *self.balance.lock().unwrap() = wei;
    }

    pub(crate) fn balance_value(&self) -> U256 {
        *self.balance.lock().unwrap()
    }

    pub(crate) fn set_chain_nonce(&self, nonce: u64) {
        self.chain_nonce.store(nonce, Ordering::SeqCst);
    }

    /// Fail the next `n` read calls with an RPC error.
    pub(crate) fn fail_reads(&self, n: u32) {
        self.read_failures.store(n, Ordering::SeqCst);
    }

    /// Report "not mined" for the next `n` receipt polls.
    pub(crate) fn set_pending_polls(&self, n: u32) {
        self.pending_polls.store(n, Ordering::SeqCst);
    }

    pub(crate) fn set_revert(&self, revert: bool) {
        self.revert.store(revert, Ordering::SeqCst);
    }

    pub(crate) fn fail_sends(&self, msg: &str) {
        *self.send_error.lock().unwrap() = Some(msg.to_string());
    }

    pub(crate) fn clear_send_failure(&self) {
        *self.send_error.lock().unwrap() = None;
    }

    pub(crate) fn hang_sends(&self) {
        self.hang.store(true, Ordering::SeqCst);
    }

    /// Accept any nonce, then lose the transaction: the pending nonce never moves.
    pub(crate) fn drop_accepted_txs(&self) {
        self.drop_accepted.store(true, Ordering::SeqCst);
    }

    // --- Observations ---

    pub(crate) fn sent(&self) -> Vec<(ContractCall, u64)> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn sent_nonces(&self) -> Vec<u64> {
        self.sent().into_iter().map(|(_, n)| n).collect()
    }

    pub(crate) fn balance_calls(&self) -> usize {
        self.balance_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn nonce_calls(&self) -> usize {
        self.nonce_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn receipt_calls(&self) -> usize {
        self.receipt_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn send_calls(&self) -> usize {
        self.send_calls.load(Ordering::SeqCst)
    }

    /// Every call that touched the chain.
    pub(crate) fn total_calls(&self) -> usize {
        self.balance_calls() + self.nonce_calls() + self.receipt_calls() + self.send_calls()
    }

    fn take_read_failure(&self) -> Result<(), crate::Error> {
        let remaining = self.read_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.read_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(crate::Error::Rpc("connection reset by peer".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ChainReader for FakeChain {
    async fn balance(&self, _address: Address) -> Result<U256, crate::Error> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        self.take_read_failure()?;
        Ok(self.balance_value())
    }

    async fn pending_nonce(&self, _address: Address) -> Result<u64, crate::Error> {
        self.nonce_calls.fetch_add(1, Ordering::SeqCst);
        self.take_read_failure()?;
        Ok(self.chain_nonce.load(Ordering::SeqCst))
    }

    async fn receipt(&self, tx_hash: TxHash) -> Result<Option<TxReceipt>, crate::Error> {
        self.receipt_calls.fetch_add(1, Ordering::SeqCst);
        self.take_read_failure()?;
        let pending = self.pending_polls.load(Ordering::SeqCst);
        if pending > 0 {
            self.pending_polls.store(pending.saturating_sub(1), Ordering::SeqCst);
            return Ok(None);
        }
        Ok(Some(TxReceipt {
            tx_hash,
            success: !self.revert.load(Ordering::SeqCst),
            gas_used: 52_000,
            block_number: Some(100),
        }))
    }

    async fn block_number(&self) -> Result<u64, crate::Error> {
        self.take_read_failure()?;
        Ok(100)
    }
}

#[async_trait]
impl TxSubmitter for FakeChain {
    fn address(&self) -> Address {
        RELAYER
    }

    async fn send(&self, call: &ContractCall, nonce: u64) -> Result<TxHash, crate::Error> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        // Let concurrent submitters interleave if they are not serialized.
        tokio::task::yield_now().await;

        if let Some(msg) = self.send_error.lock().unwrap().clone() {
            return Err(crate::Error::Submission(msg));
        }
        if self.drop_accepted.load(Ordering::SeqCst) {
            self.sent.lock().unwrap().push((call.clone(), nonce));
            return Ok(Self::tx_hash_for(nonce));
        }
        let expected = self.chain_nonce.load(Ordering::SeqCst);
        if nonce != expected {
            return Err(crate::Error::Submission(format!(
                "nonce too low: next nonce {expected}, tx nonce {nonce}"
            )));
        }
        self.chain_nonce.store(nonce + 1, Ordering::SeqCst);
        self.sent.lock().unwrap().push((call.clone(), nonce));
        Ok(Self::tx_hash_for(nonce))
    }
}

/// Fast retry policy so failing reads do not slow tests down.
pub(crate) fn fake_client(chain: &Arc<FakeChain>) -> ChainClient {
    ChainClient::new(
        chain.clone(),
        RetryPolicy {
            max_retries: 1,
            base_delay: Duration::from_millis(1),
            request_timeout: Duration::from_secs(5),
        },
        Duration::from_secs(10),
        Duration::from_millis(5),
    )
}

pub(crate) fn test_config() -> Config {
    Config {
        dao_address: Some(DAO.to_string()),
        governor_address: Some(GOVERNOR.to_string()),
        balance_monitor_interval_secs: 0,
        ..Config::default()
    }
}
