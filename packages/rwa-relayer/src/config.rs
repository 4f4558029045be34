//! Relayer configuration.

use alloy::primitives::Address;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Configuration for the relayer. Loaded from `relayer.toml` and `RELAYER_*` env vars.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "defaults::bind_address")]
    pub bind_address: String,

    #[serde(default = "defaults::rpc_url")]
    pub rpc_url: String,

    #[serde(default = "defaults::chain_id")]
    pub chain_id: u64,

    /// Relayer secret key (hex). Unset = relay endpoints answer "not configured".
    #[serde(default)]
    pub private_key: Option<PrivateKey>,

    #[serde(default)]
    pub dao_address: Option<String>,

    #[serde(default)]
    pub governor_address: Option<String>,

    #[serde(default = "defaults::entry_point_address")]
    pub entry_point_address: String,

    #[serde(default = "defaults::explorer_url")]
    pub explorer_url: String,

    /// Operator key for relay routes. Unset = open relay.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "defaults::request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default = "defaults::submit_timeout_secs")]
    pub submit_timeout_secs: u64,

    #[serde(default = "defaults::receipt_timeout_secs")]
    pub receipt_timeout_secs: u64,

    #[serde(default = "defaults::receipt_poll_interval_ms")]
    pub receipt_poll_interval_ms: u64,

    #[serde(default = "defaults::rpc_max_retries")]
    pub rpc_max_retries: u32,

    #[serde(default = "defaults::rpc_retry_base_ms")]
    pub rpc_retry_base_ms: u64,

    #[serde(default = "defaults::estimated_tx_cost_wei")]
    pub estimated_tx_cost_wei: u64,

    #[serde(default = "defaults::low_balance_wei")]
    pub low_balance_wei: u64,

    /// 0 disables the background balance monitor.
    #[serde(default = "defaults::balance_monitor_interval_secs")]
    pub balance_monitor_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: defaults::bind_address(),
            rpc_url: defaults::rpc_url(),
            chain_id: defaults::chain_id(),
            private_key: None,
            dao_address: None,
            governor_address: None,
            entry_point_address: defaults::entry_point_address(),
            explorer_url: defaults::explorer_url(),
            api_key: None,
            request_timeout_ms: defaults::request_timeout_ms(),
            submit_timeout_secs: defaults::submit_timeout_secs(),
            receipt_timeout_secs: defaults::receipt_timeout_secs(),
            receipt_poll_interval_ms: defaults::receipt_poll_interval_ms(),
            rpc_max_retries: defaults::rpc_max_retries(),
            rpc_retry_base_ms: defaults::rpc_retry_base_ms(),
            estimated_tx_cost_wei: defaults::estimated_tx_cost_wei(),
            low_balance_wei: defaults::low_balance_wei(),
            balance_monitor_interval_secs: defaults::balance_monitor_interval_secs(),
        }
    }
}

impl Config {
    /// Load from `relayer.{toml,json,yaml}` (optional) overlaid with `RELAYER_*` env vars.
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name("relayer").required(false))
            .add_source(config::Environment::with_prefix("RELAYER"))
            .build()?
            .try_deserialize()
    }

    pub fn dao_address(&self) -> Result<Address, crate::Error> {
        parse_address("dao_address", self.dao_address.as_deref())
    }

    pub fn governor_address(&self) -> Result<Address, crate::Error> {
        parse_address("governor_address", self.governor_address.as_deref())
    }

    pub fn entry_point_address(&self) -> Result<Address, crate::Error> {
        parse_address("entry_point_address", Some(&self.entry_point_address))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.submit_timeout_secs)
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.receipt_timeout_secs)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }

    /// Explorer link for a transaction hash.
    pub fn explorer_tx_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{tx_hash}", self.explorer_url.trim_end_matches('/'))
    }
}

fn parse_address(field: &str, value: Option<&str>) -> Result<Address, crate::Error> {
    let raw = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| crate::Error::Config(format!("{field} is not set")))?;
    raw.parse()
        .map_err(|e| crate::Error::Config(format!("{field} is not a valid address: {e}")))
}

/// Relayer secret key. Never printed.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct PrivateKey(String);

impl PrivateKey {
    #[cfg(test)]
    pub(crate) fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        self.0.trim()
    }

    pub fn is_empty(&self) -> bool {
        self.expose().is_empty()
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

mod defaults {
    pub fn bind_address() -> String {
        "0.0.0.0:3040".into()
    }

    pub fn rpc_url() -> String {
        "https://ethereum-sepolia-rpc.publicnode.com".into()
    }

    pub fn chain_id() -> u64 {
        11_155_111
    }

    /// ERC-4337 v0.6 EntryPoint (same address on every chain).
    pub fn entry_point_address() -> String {
        "0x5FF137D4b0FDCD49DcA30c7CF57E578a026d2789".into()
    }

    pub fn explorer_url() -> String {
        "https://sepolia.etherscan.io".into()
    }

    pub fn request_timeout_ms() -> u64 {
        10_000
    }

    pub fn submit_timeout_secs() -> u64 {
        30
    }

    pub fn receipt_timeout_secs() -> u64 {
        120
    }

    pub fn receipt_poll_interval_ms() -> u64 {
        2_000
    }

    pub fn rpc_max_retries() -> u32 {
        2
    }

    pub fn rpc_retry_base_ms() -> u64 {
        200
    }

    /// ~300k gas at 2 gwei.
    pub fn estimated_tx_cost_wei() -> u64 {
        600_000_000_000_000
    }

    /// 0.05 ETH.
    pub fn low_balance_wei() -> u64 {
        50_000_000_000_000_000
    }

    pub fn balance_monitor_interval_secs() -> u64 {
        300
    }
}
