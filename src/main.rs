use anyhow::Context;
use sandstone::config::{AppConfig, DEFAULT_LOG_FILTER};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    let addr = config.addr;
    let router = sandstone::router::init_router(config);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on {}", addr);
    axum::serve(listener, router)
        .await
        .context("Server stopped unexpectedly")?;
    Ok(())
}
