//! # RWA Relayer
//!
//! Gasless transaction relayer for an RWA DAO on an EVM chain. Accepts
//! governance and investment requests over HTTP, signs them with a single
//! relayer key and submits them on-chain, paying gas on behalf of users.
//!
//! ## Quick Start
//! ```bash
//! RELAYER_PRIVATE_KEY=0x... RELAYER_DAO_ADDRESS=0x... cargo run --bin rwa-relayer
//! ```
//!
//! ## Endpoints
//! - `POST /relay/vote-dao` - Vote on the main DAO governor
//! - `POST /relay/vote-rwa` - Vote on an RWA sub-governor
//! - `POST /relay/finalize` - Finalize a funding proposal
//! - `POST /relay/invest` - Invest in a funding proposal
//! - `POST /bundler` - Submit an ERC-4337 user operation via `handleOps`
//! - `GET /relay/balance` - Relayer address and balance
//! - `GET /relay/tx/{tx_hash}` - Receipt lookup
//! - `GET /health` - Health check
//! - `GET /metrics` - Prometheus metrics

pub mod config;
pub mod contracts;
mod error;
pub mod evm;
mod handlers;
mod middleware;
pub mod metrics;
pub mod monitor;
pub mod request;
pub mod response;
mod router;
pub mod rpc;
pub mod signer;
mod state;
#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::Error;
pub use router::create as create_router;
pub use state::AppState;
