//! HTTP router setup.

use crate::handlers;
use crate::middleware::{api_key_auth, inject_request_id};
use crate::state::AppState;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create(state: Arc<AppState>) -> Router {
    let relay = Router::new()
        .route("/relay/vote-dao", post(handlers::vote_dao))
        .route("/relay/vote-rwa", post(handlers::vote_rwa))
        .route("/relay/finalize", post(handlers::finalize))
        .route("/relay/invest", post(handlers::invest))
        .route("/bundler", post(handlers::bundler))
        .route_layer(from_fn_with_state(state.clone(), api_key_auth));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .route("/relay/balance", get(handlers::balance))
        .route("/relay/tx/{tx_hash}", get(handlers::tx_status))
        .merge(relay)
        .layer(from_fn(inject_request_id))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
