//! Prometheus metrics (lock-free atomics, zero allocation on hot path).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    // --- Traffic ---
    pub relay_total: AtomicU64,
    pub relay_success: AtomicU64,
    pub relay_reverted: AtomicU64,
    pub relay_error: AtomicU64,
    pub nonce_resyncs: AtomicU64,

    // --- Latency (μs, updated via CAS) ---
    pub relay_duration_us_sum: AtomicU64,
    pub relay_duration_us_max: AtomicU64,

    // --- RPC ---
    pub rpc_retries: AtomicU64,
    pub rpc_errors: AtomicU64,
}

impl Metrics {
    const fn new() -> Self {
        Self {
            relay_total: AtomicU64::new(0),
            relay_success: AtomicU64::new(0),
            relay_reverted: AtomicU64::new(0),
            relay_error: AtomicU64::new(0),
            nonce_resyncs: AtomicU64::new(0),
            relay_duration_us_sum: AtomicU64::new(0),
            relay_duration_us_max: AtomicU64::new(0),
            rpc_retries: AtomicU64::new(0),
            rpc_errors: AtomicU64::new(0),
        }
    }

    pub fn record_relay_duration(&self, start: Instant) {
        let us = start.elapsed().as_micros() as u64;
        self.relay_duration_us_sum.fetch_add(us, Ordering::Relaxed);
        // CAS loop for max tracking
        let mut cur = self.relay_duration_us_max.load(Ordering::Relaxed);
        while us > cur {
            match self.relay_duration_us_max.compare_exchange_weak(
                cur,
                us,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => cur = actual,
            }
        }
    }

    /// Render in Prometheus text exposition format.
    pub fn render(&self, relayer_configured: bool) -> String {
        let relay_total = self.relay_total.load(Ordering::Relaxed);
        let relay_success = self.relay_success.load(Ordering::Relaxed);
        let relay_reverted = self.relay_reverted.load(Ordering::Relaxed);
        let relay_error = self.relay_error.load(Ordering::Relaxed);
        let nonce_resyncs = self.nonce_resyncs.load(Ordering::Relaxed);
        let dur_sum = self.relay_duration_us_sum.load(Ordering::Relaxed);
        let dur_max = self.relay_duration_us_max.swap(0, Ordering::Relaxed);
        let rpc_retries = self.rpc_retries.load(Ordering::Relaxed);
        let rpc_errors = self.rpc_errors.load(Ordering::Relaxed);
        let configured = u8::from(relayer_configured);

        // Convert μs to seconds for Prometheus conventions
        let dur_sum_s = dur_sum as f64 / 1_000_000.0;
        let dur_max_s = dur_max as f64 / 1_000_000.0;

        format!(
            "\
# HELP relayer_relay_total Total relay requests received.\n\
# TYPE relayer_relay_total counter\n\
relayer_relay_total {relay_total}\n\
# HELP relayer_relay_success_total Relayed transactions mined with success status.\n\
# TYPE relayer_relay_success_total counter\n\
relayer_relay_success_total {relay_success}\n\
# HELP relayer_relay_reverted_total Relayed transactions mined with failure status.\n\
# TYPE relayer_relay_reverted_total counter\n\
relayer_relay_reverted_total {relay_reverted}\n\
# HELP relayer_relay_error_total Relay requests that returned an error.\n\
# TYPE relayer_relay_error_total counter\n\
relayer_relay_error_total {relay_error}\n\
# HELP relayer_nonce_resyncs_total Cached nonce dropped after a failed submission.\n\
# TYPE relayer_nonce_resyncs_total counter\n\
relayer_nonce_resyncs_total {nonce_resyncs}\n\
# HELP relayer_relay_duration_seconds_sum Total handler time (seconds).\n\
# TYPE relayer_relay_duration_seconds_sum counter\n\
relayer_relay_duration_seconds_sum {dur_sum_s:.6}\n\
# HELP relayer_relay_duration_seconds_max Max handler time since last scrape (seconds).\n\
# TYPE relayer_relay_duration_seconds_max gauge\n\
relayer_relay_duration_seconds_max {dur_max_s:.6}\n\
# HELP relayer_rpc_retries_total RPC read retries.\n\
# TYPE relayer_rpc_retries_total counter\n\
relayer_rpc_retries_total {rpc_retries}\n\
# HELP relayer_rpc_errors_total RPC errors.\n\
# TYPE relayer_rpc_errors_total counter\n\
relayer_rpc_errors_total {rpc_errors}\n\
# HELP relayer_key_configured Whether a relayer key is loaded.\n\
# TYPE relayer_key_configured gauge\n\
relayer_key_configured {configured}\n"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_all_series() {
        let metrics = Metrics::new();
        metrics.relay_total.fetch_add(3, Ordering::Relaxed);
        let body = metrics.render(true);
        assert!(body.contains("relayer_relay_total 3\n"));
        assert!(body.contains("relayer_key_configured 1\n"));
        assert!(body.contains("# TYPE relayer_rpc_errors_total counter"));
    }

    #[test]
    fn test_duration_max_resets_on_scrape() {
        let metrics = Metrics::new();
        metrics.relay_duration_us_max.store(2_500_000, Ordering::Relaxed);
        assert!(metrics.render(false).contains("relayer_relay_duration_seconds_max 2.500000"));
        assert!(metrics.render(false).contains("relayer_relay_duration_seconds_max 0.000000"));
    }
}
