// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// HTTP surface over the pipeline

pub mod handlers;
pub mod router;
pub mod state;

pub use state::AppState;

use crate::config::SentinelConfig;
use crate::error::{Result, SentinelError};

/// Start the HTTP server with the given configuration.
pub async fn start(config: SentinelConfig) -> Result<()> {
    let app_state = AppState::from_config(&config)?;
    let app = router::build(app_state);

    let bind_addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| SentinelError::Config(format!("Failed to bind to {bind_addr}: {e}")))?;

    tracing::info!("Server listening on {bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
