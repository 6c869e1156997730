// obras-server main.rs
// HTTP API for incident report export

use anyhow::Context;
use clap::Parser;
use obras_server::{build_router, logging, AppState, Config};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    logging::init_logging(config.log_format);

    let state = AppState::from_config(&config).context("Failed to load incident catalog")?;

    tracing::info!("📁 Audit log: {}", state.audit.path().display());
    tracing::info!("📋 Incidents loaded: {}", state.catalog.len());
    if !state.authorizer.api_key_configured() {
        tracing::warn!("REPORTS_API_KEY is not set; only bearer tokens will be accepted");
    }

    let app = build_router(Arc::new(state));

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("🚀 Report export API running at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for ctrl+c");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down...");
}
