use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use webhook_handler::{
    clock::SystemClock, create_router, http_server, logging, AppState, Config, EventStore,
    Ingestor,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    logging::init(config.log_format)?;

    info!("Starting SmarterOS Webhook Handler");
    info!(config = ?config, "Configuration loaded");

    if config.uses_default_secret() {
        warn!("WEBHOOK_SECRET is not set; using the insecure default secret");
    }
    if !config.require_signature {
        warn!("Unsigned deliveries will be accepted; set REQUIRE_SIGNATURE=true to reject them");
    }

    let store = EventStore::connect(&config.store_config())
        .await
        .with_context(|| format!("failed to open database at {}", config.db_path.display()))?;
    store
        .bootstrap()
        .await
        .context("failed to initialize database schema")?;
    info!(db_path = %config.db_path.display(), "Database ready");

    let ingestor = Ingestor::new(config.verifier(), store.clone(), Arc::new(SystemClock))
        .require_signature(config.require_signature);
    let router = create_router(AppState::new(ingestor));

    let addr = config.bind_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind HTTP server to {addr}"))?;
    info!(%addr, "Listening for webhooks");

    http_server::serve(listener, router, shutdown_signal())
        .await
        .context("HTTP server error")?;

    store.close().await;
    info!("Shutting down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
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
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
