use anyhow::{Context, Result};
use clap::Parser;
use onair_core::{Clock, SystemClock};
use onair_relay::RelayConfig;
use onair_server::{AppState, router, spawn_retention_sweep};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Hosted signal store and role directory for onair sessions.
///
/// Retention reads the same `ONAIR_POLL_WINDOW_MS`, `ONAIR_PURGE_CUTOFF_MS`
/// and `ONAIR_SWEEP_INTERVAL_MS` variables as the clients.
#[derive(Parser)]
#[command(name = "onair-server", version)]
struct Args {
    #[arg(long, env = "ONAIR_BIND", default_value = "0.0.0.0:3000")]
    bind: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = RelayConfig::from_env().context("Invalid retention settings")?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let state = AppState::new(clock.clone());
    spawn_retention_sweep(state.store.clone(), clock, &config)
        .context("Invalid retention settings")?;
    info!(
        "Purging signals older than {:?} (poll window {:?})",
        config.purge_cutoff, config.poll_window
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("Failed to bind {}", args.bind))?;
    info!("Signal relay listening on http://{}", args.bind);

    axum::serve(listener, app).await?;
    Ok(())
}
