//! Response types for the relayer API.

use alloy::primitives::{Address, TxHash};
use serde::Serialize;

use crate::rpc::TxReceipt;

/// Response from the relay endpoints once the transaction is mined.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayResponse {
    pub tx_hash: TxHash,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<String>,
}

impl RelayResponse {
    pub fn from_receipt(receipt: &TxReceipt) -> Self {
        Self {
            tx_hash: receipt.tx_hash,
            success: receipt.success,
            gas_used: None,
        }
    }

    pub fn with_gas_used(mut self, receipt: &TxReceipt) -> Self {
        self.gas_used = Some(receipt.gas_used.to_string());
        self
    }
}

/// Response from `POST /bundler`. Returned right after broadcast.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundlerResponse {
    pub success: bool,
    pub hash: TxHash,
    pub message: String,
    pub etherscan_url: String,
}

/// Response from `GET /relay/balance`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub address: Address,
    /// Wei, decimal.
    pub balance: String,
    pub balance_eth: String,
    pub estimated_transactions_remaining: String,
    pub low_balance: bool,
}

/// Response from `GET /relay/tx/{tx_hash}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TxStatusResponse {
    pub tx_hash: TxHash,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
}

impl TxStatusResponse {
    pub fn pending(tx_hash: TxHash) -> Self {
        Self {
            tx_hash,
            status: "pending",
            gas_used: None,
            block_number: None,
        }
    }

    pub fn mined(receipt: &TxReceipt) -> Self {
        Self {
            tx_hash: receipt.tx_hash,
            status: if receipt.success { "success" } else { "failed" },
            gas_used: Some(receipt.gas_used.to_string()),
            block_number: receipt.block_number,
        }
    }
}

/// Response from the health endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relayer_address: Option<Address>,
    pub chain_id: u64,
    pub uptime_secs: u64,
    pub requests: u64,
    pub rpc_status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
}
