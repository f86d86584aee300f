use anyhow::Context;
use tokio::net::TcpListener;

use crate::config::AppConfig;
use crate::database::Store;
use crate::state::AppState;
use crate::{mail, router};

pub async fn handle(mut config: AppConfig, port: Option<u16>) -> anyhow::Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }
    config.validate()?;

    let store = Store::connect(&config.database)
        .await
        .context("Failed to connect to the database")?;
    store.migrate().await?;

    let mailer = mail::from_config(&config.mail)?;
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    let state = AppState::new(config, store, mailer);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Atlas API listening on http://{}", bind_addr);

    axum::serve(listener, router::app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
