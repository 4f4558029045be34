//! HTTP request handlers.
//!
//! Each relay handler validates its body, builds exactly one contract call,
//! submits it through the relayer account and (except `/bundler`) blocks until
//! the receipt is available.

use crate::contracts::ContractCall;
use crate::metrics::METRICS;
use crate::middleware::RequestId;
use crate::request::{BundlerRequest, FinalizeRequest, InvestRequest, VoteDaoRequest, VoteRwaRequest};
use crate::response::{
    BalanceResponse, BundlerResponse, HealthResponse, RelayResponse, TxStatusResponse,
};
use crate::rpc::TxReceipt;
use crate::signer::RelayerAccount;
use crate::state::AppState;
use crate::Error;
use alloy::primitives::utils::format_ether;
use alloy::primitives::{TxHash, U256};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

type RelayResult = Result<Json<RelayResponse>, Error>;

/// Count the request and start the latency clock.
fn begin(state: &AppState) -> Instant {
    METRICS.relay_total.fetch_add(1, Ordering::Relaxed);
    state.request_count.fetch_add(1, Ordering::Relaxed);
    Instant::now()
}

/// Record the outcome of a relay request.
fn finish<T>(req_id: &RequestId, action: &str, start: Instant, result: Result<T, Error>) -> Result<T, Error> {
    METRICS.record_relay_duration(start);
    if let Err(e) = &result {
        METRICS.relay_error.fetch_add(1, Ordering::Relaxed);
        match e {
            Error::Validation(_) => warn!(req_id = %req_id.0, action, error = %e, "Relay request rejected"),
            _ => error!(req_id = %req_id.0, action, error = %e, "Relay request failed"),
        }
    }
    result
}

/// Submit `call` and wait for its receipt. A reverted transaction is not an error.
async fn submit_and_confirm(
    state: &AppState,
    relayer: &RelayerAccount,
    req_id: &RequestId,
    call: ContractCall,
) -> Result<TxReceipt, Error> {
    let tx_hash = relayer.submit(&call).await?;
    info!(req_id = %req_id.0, tx_hash = %tx_hash, method = call.method, to = %call.to, "TX submitted, waiting for receipt");

    let receipt = match state.chain.wait_for_receipt(tx_hash).await {
        Ok(receipt) => receipt,
        Err(e) => {
            // The transaction may never land; do not queue later nonces behind it.
            relayer.invalidate_nonce().await;
            return Err(match e {
                Error::Rpc(msg) => Error::Rpc(format!("waiting for receipt of {tx_hash:#x}: {msg}")),
                Error::Timeout(msg) => {
                    Error::Timeout(format!("waiting for receipt of {tx_hash:#x}: {msg}"))
                }
                other => other,
            });
        }
    };

    if receipt.success {
        METRICS.relay_success.fetch_add(1, Ordering::Relaxed);
        info!(req_id = %req_id.0, tx_hash = %tx_hash, gas_used = receipt.gas_used, "TX mined");
    } else {
        METRICS.relay_reverted.fetch_add(1, Ordering::Relaxed);
        warn!(req_id = %req_id.0, tx_hash = %tx_hash, "TX mined with failure status");
    }
    Ok(receipt)
}

/// Cast a vote on the main DAO governor. `POST /relay/vote-dao`
///
/// The vote is recorded on-chain as cast by the relayer, not by `userAddress`.
pub async fn vote_dao(
    State(state): State<Arc<AppState>>,
    Extension(req_id): Extension<RequestId>,
    payload: Result<Json<VoteDaoRequest>, JsonRejection>,
) -> RelayResult {
    let start = begin(&state);
    let result = async {
        let Json(body) = payload?;
        let vote = body.validate()?;
        info!(req_id = %req_id.0, action = "vote-dao", user = %vote.user, proposal_id = %vote.proposal_id, support = vote.support, "Relaying request");

        let relayer = state.relayer()?;
        let governor = state.config.governor_address()?;
        let call = ContractCall::cast_vote(governor, vote.proposal_id, vote.support);

        let receipt = submit_and_confirm(&state, relayer, &req_id, call).await?;
        Ok::<_, Error>(Json(RelayResponse::from_receipt(&receipt).with_gas_used(&receipt)))
    }
    .await;
    finish(&req_id, "vote-dao", start, result)
}

/// Cast a vote on an RWA sub-governor named in the request. `POST /relay/vote-rwa`
pub async fn vote_rwa(
    State(state): State<Arc<AppState>>,
    Extension(req_id): Extension<RequestId>,
    payload: Result<Json<VoteRwaRequest>, JsonRejection>,
) -> RelayResult {
    let start = begin(&state);
    let result = async {
        let Json(body) = payload?;
        let (governor, vote) = body.validate()?;
        info!(req_id = %req_id.0, action = "vote-rwa", user = %vote.user, governor = %governor, proposal_id = %vote.proposal_id, "Relaying request");

        let relayer = state.relayer()?;
        let call = ContractCall::cast_vote(governor, vote.proposal_id, vote.support);

        let receipt = submit_and_confirm(&state, relayer, &req_id, call).await?;
        Ok::<_, Error>(Json(RelayResponse::from_receipt(&receipt)))
    }
    .await;
    finish(&req_id, "vote-rwa", start, result)
}

/// Finalize a funding proposal. `POST /relay/finalize`
pub async fn finalize(
    State(state): State<Arc<AppState>>,
    Extension(req_id): Extension<RequestId>,
    payload: Result<Json<FinalizeRequest>, JsonRejection>,
) -> RelayResult {
    let start = begin(&state);
    let result = async {
        let Json(body) = payload?;
        let proposal_id = body.validate()?;
        info!(req_id = %req_id.0, action = "finalize", proposal_id = %proposal_id, "Relaying request");

        let relayer = state.relayer()?;
        let dao = state.config.dao_address()?;
        let call = ContractCall::finalize_proposal(dao, proposal_id);

        let receipt = submit_and_confirm(&state, relayer, &req_id, call).await?;
        Ok::<_, Error>(Json(RelayResponse::from_receipt(&receipt)))
    }
    .await;
    finish(&req_id, "finalize", start, result)
}

/// Invest in a funding proposal. `POST /relay/invest`
///
/// Tokens are pulled from the relayer's own balance; `userAddress` is only logged.
pub async fn invest(
    State(state): State<Arc<AppState>>,
    Extension(req_id): Extension<RequestId>,
    payload: Result<Json<InvestRequest>, JsonRejection>,
) -> RelayResult {
    let start = begin(&state);
    let result = async {
        let Json(body) = payload?;
        let investment = body.validate()?;
        info!(req_id = %req_id.0, action = "invest", user = %investment.user, proposal_id = %investment.proposal_id, amount = %investment.amount, "Relaying request");

        let relayer = state.relayer()?;
        let dao = state.config.dao_address()?;
        let call = ContractCall::invest(dao, investment.proposal_id, investment.amount);

        let receipt = submit_and_confirm(&state, relayer, &req_id, call).await?;
        Ok::<_, Error>(Json(RelayResponse::from_receipt(&receipt).with_gas_used(&receipt)))
    }
    .await;
    finish(&req_id, "invest", start, result)
}

/// Error body for `/bundler`: `{success, error, details}`.
pub struct BundlerError(Error);

impl IntoResponse for BundlerError {
    fn into_response(self) -> Response {
        let summary = match &self.0 {
            Error::Validation(_) => "Invalid user operation",
            Error::NotConfigured(_) | Error::Config(_) => "Bundler not configured",
            _ => "Failed to submit user operation",
        };
        let body = serde_json::json!({
            "success": false,
            "error": summary,
            "details": self.0.to_string()
        });
        (self.0.status(), Json(body)).into_response()
    }
}

/// Submit an ERC-4337 user operation via `handleOps`. `POST /bundler`
///
/// Returns right after broadcast; the receipt is not awaited.
pub async fn bundler(
    State(state): State<Arc<AppState>>,
    Extension(req_id): Extension<RequestId>,
    payload: Result<Json<BundlerRequest>, JsonRejection>,
) -> Result<Json<BundlerResponse>, BundlerError> {
    let start = begin(&state);
    let result = async {
        let Json(body) = payload?;
        let op = body.validate()?;
        info!(req_id = %req_id.0, action = "bundler", sender = %op.sender, paymaster = op.has_paymaster(), "Relaying user operation");

        let relayer = state.relayer()?;
        let entry_point = state.config.entry_point_address()?;
        let call = ContractCall::handle_ops(entry_point, op.into(), relayer.address());

        let tx_hash = relayer.submit(&call).await?;
        info!(req_id = %req_id.0, tx_hash = %tx_hash, "UserOperation broadcast");
        Ok::<_, Error>(Json(BundlerResponse {
            success: true,
            hash: tx_hash,
            message: "UserOperation submitted to EntryPoint".into(),
            etherscan_url: state.config.explorer_tx_url(&format!("{tx_hash:#x}")),
        }))
    }
    .await;
    finish(&req_id, "bundler", start, result).map_err(BundlerError)
}

/// Relayer address and native-token balance. `GET /relay/balance`
pub async fn balance(
    State(state): State<Arc<AppState>>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<BalanceResponse>, Error> {
    let relayer = state.relayer()?;
    let address = relayer.address();
    let balance = state.chain.get_balance(address).await.map_err(|e| {
        error!(req_id = %req_id.0, error = %e, "Balance query failed");
        e
    })?;

    let low_balance = balance < U256::from(state.config.low_balance_wei);
    if low_balance {
        warn!(address = %address, balance = %balance, "Relayer balance is low");
    }

    Ok(Json(BalanceResponse {
        address,
        balance: balance.to_string(),
        balance_eth: format_ether(balance),
        estimated_transactions_remaining: estimated_transactions_remaining(
            balance,
            state.config.estimated_tx_cost_wei,
        )
        .to_string(),
        low_balance,
    }))
}

/// How many relayed transactions the balance covers at the configured per-tx cost.
pub fn estimated_transactions_remaining(balance: U256, tx_cost_wei: u64) -> U256 {
    if tx_cost_wei == 0 {
        return U256::ZERO;
    }
    balance / U256::from(tx_cost_wei)
}

/// Single receipt lookup. `GET /relay/tx/{tx_hash}`
pub async fn tx_status(
    State(state): State<Arc<AppState>>,
    Path(tx_hash_str): Path<String>,
) -> Result<Json<TxStatusResponse>, Error> {
    let tx_hash: TxHash = tx_hash_str
        .parse()
        .map_err(|_| Error::Validation("Invalid tx_hash format".into()))?;

    match state.chain.get_receipt(tx_hash).await? {
        Some(receipt) => Ok(Json(TxStatusResponse::mined(&receipt))),
        None => Ok(Json(TxStatusResponse::pending(tx_hash))),
    }
}

/// Health check with relayer and RPC status.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let relayer_address = state.relayer().ok().map(|r| r.address());
    let block_number = state.chain.block_number().await.ok();

    let rpc_status = if block_number.is_some() { "ok" } else { "unavailable" };
    let status = if block_number.is_none() {
        "unavailable"
    } else if relayer_address.is_none() {
        "degraded"
    } else {
        "ok"
    };
    let code = if status == "unavailable" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (
        code,
        Json(HealthResponse {
            status,
            relayer_address,
            chain_id: state.config.chain_id,
            uptime_secs: state.start_time.elapsed().as_secs(),
            requests: state.request_count.load(Ordering::Relaxed),
            rpc_status,
            block_number,
        }),
    )
}

/// Prometheus metrics in text exposition format.
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = METRICS.render(state.relayer().is_ok());
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4",
        )],
        body,
    )
}
