use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use judge::VerdictEngine;
use tracing::info;
use tracing_subscriber::EnvFilter;

use server::config::AppConfig;
use server::database::{ensure_indexes, init_db};
use server::gate::SystemClock;
use server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = init_db(&config.database)
        .await
        .context("Failed to connect to database")?;
    ensure_indexes(&db).await?;

    let engine = VerdictEngine::from_config(&config.judge)
        .context("Failed to initialize execution backend")?;
    info!(
        backend = ?config.judge.backend,
        max_concurrent_cases = config.judge.max_concurrent_cases,
        "Verdict engine ready"
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let state = AppState::new(db, config, Arc::new(engine), Arc::new(SystemClock));
    let app = server::build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server running at http://{}", addr);
    info!("API docs at http://{}/scalar", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
