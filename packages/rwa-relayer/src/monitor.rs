//! Background relayer balance monitor.

use alloy::primitives::utils::format_ether;
use alloy::primitives::U256;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::state::AppState;

/// Result of one balance check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceCheck {
    Healthy(U256),
    Low(U256),
    Unavailable,
}

/// Read the relayer balance once and log a warning when it is below threshold.
pub async fn check_balance(state: &AppState) -> BalanceCheck {
    let Ok(relayer) = state.relayer() else {
        return BalanceCheck::Unavailable;
    };
    let address = relayer.address();

    match state.chain.get_balance(address).await {
        Ok(balance) if balance < U256::from(state.config.low_balance_wei) => {
            warn!(
                address = %address,
                balance_eth = %format_ether(balance),
                threshold_wei = state.config.low_balance_wei,
                "Relayer balance low, top up to keep relaying"
            );
            BalanceCheck::Low(balance)
        }
        Ok(balance) => {
            debug!(address = %address, balance_eth = %format_ether(balance), "Relayer balance ok");
            BalanceCheck::Healthy(balance)
        }
        Err(e) => {
            warn!(address = %address, error = %e, "Balance monitor could not read balance");
            BalanceCheck::Unavailable
        }
    }
}

/// Periodically check the relayer balance until cancelled.
pub async fn run(state: Arc<AppState>, cancel: CancellationToken) {
    let period = state.config.balance_monitor_interval_secs;
    if period == 0 || state.relayer().is_err() {
        info!("Balance monitor disabled");
        return;
    }

    let mut interval = tokio::time::interval(Duration::from_secs(period));
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Balance monitor stopped");
                return;
            }
            _ = interval.tick() => {
                check_balance(&state).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_config, FakeChain};
    use crate::AppState;

    fn state(chain: &Arc<FakeChain>, with_key: bool) -> AppState {
        let submitter: Option<Arc<dyn crate::signer::TxSubmitter>> = if with_key {
            Some(chain.clone())
        } else {
            None
        };
        AppState::from_parts(test_config(), chain.clone(), submitter)
    }

    #[tokio::test]
    async fn test_low_balance_detected() {
        let chain = Arc::new(FakeChain::new());
        chain.set_balance(U256::from(1_000u64));
        assert_eq!(
            check_balance(&state(&chain, true)).await,
            BalanceCheck::Low(U256::from(1_000u64))
        );
    }

    #[tokio::test]
    async fn test_healthy_balance() {
        let chain = Arc::new(FakeChain::new());
        let balance = chain.balance_value();
        assert_eq!(
            check_balance(&state(&chain, true)).await,
            BalanceCheck::Healthy(balance)
        );
    }

    #[tokio::test]
    async fn test_no_key_is_unavailable() {
        let chain = Arc::new(FakeChain::new());
        assert_eq!(
            check_balance(&state(&chain, false)).await,
            BalanceCheck::Unavailable
        );
        assert_eq!(chain.total_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_cancel() {
        let chain = Arc::new(FakeChain::new());
        let mut config = test_config();
        config.balance_monitor_interval_secs = 60;
        let state = Arc::new(AppState::from_parts(config, chain.clone(), Some(chain.clone())));

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(state, cancel.clone()));
        tokio::time::sleep(Duration::from_secs(150)).await;
        cancel.cancel();
        handle.await.unwrap();

        // Ticks at 0s, 60s, 120s.
        assert_eq!(chain.balance_calls(), 3);
    }
}
