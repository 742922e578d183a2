use std::sync::Arc;

use anyhow::Context;
use tenant_relay::{config::AppConfig, routes, state::AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tenant_relay=debug,tower_http=debug")),
        )
        .init();

    let config = AppConfig::from_env()?;
    let state = Arc::new(AppState::from_config(&config)?);

    tokio::fs::create_dir_all(&config.logs_dir)
        .await
        .with_context(|| format!("creating logs directory {}", config.logs_dir.display()))?;

    let app = routes::create_router()
        .with_state(state.clone())
        .layer(routes::cors_layer(&config.cors_origins));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    tracing::info!(
        %addr,
        mode = %config.mode,
        api_key_configured = state.gateway.is_configured(),
        logs_dir = %config.logs_dir.display(),
        "tenant relay listening"
    );
    axum::serve(listener, app).await?;
    Ok(())
}
