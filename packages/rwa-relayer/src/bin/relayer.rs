//! RWA Relayer binary.

use rwa_relayer::{create_router, monitor, AppState, Config};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting RWA Relayer");

    let config = Config::load().unwrap_or_else(|e| {
        error!(error = %e, "FATAL: Config error, fix env vars or relayer.toml");
        std::process::exit(1);
    });

    if config.api_key.as_deref().is_some_and(|k| !k.is_empty()) {
        info!("API key auth enabled");
    } else {
        warn!("RELAYER_API_KEY not set, relay endpoints are open to any caller");
    }

    info!(
        rpc = %config.rpc_url,
        chain_id = config.chain_id,
        dao = config.dao_address.as_deref().unwrap_or("<unset>"),
        governor = config.governor_address.as_deref().unwrap_or("<unset>"),
        entry_point = %config.entry_point_address,
        "Configuration loaded"
    );

    let bind_address = config.bind_address.clone();
    let state = Arc::new(AppState::new(config).await?);

    let cancel = CancellationToken::new();
    let monitor_task = tokio::spawn(monitor::run(Arc::clone(&state), cancel.clone()));

    let app = create_router(state);

    info!(address = %bind_address, "Listening");

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cancel.cancel();
    if let Err(e) = monitor_task.await {
        error!(error = %e, "Balance monitor task failed");
    }

    info!("Relayer shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}
