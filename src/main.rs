//! Pulse Spread Monitor
//!
//! Polls the Pulse aggregator once per interval in a background task and
//! serves the spread report and static frontend over HTTP.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use pulse_monitor::analytics::{PairSelector, QueryService};
use pulse_monitor::config::{AppConfig, LoggingConfig};
use pulse_monitor::dashboard::{create_router, DashboardState};
use pulse_monitor::feed::sources::PulseClient;
use pulse_monitor::feed::{FeedMonitor, Fetcher};
use pulse_monitor::store::{SharedStore, TimeSeriesStore};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config.logging);

    tracing::info!(config = %config, "Pulse spread monitor starting");

    let store = SharedStore::new(TimeSeriesStore::new(
        config.store.price_capacity,
        config.store.funding_capacity,
    ));
    let monitor = Arc::new(FeedMonitor::new());

    // Background poller: sole writer of the store
    let source = PulseClient::from_config(&config.upstream)?;
    let fetcher = Fetcher::new(
        Arc::new(source),
        store.clone(),
        monitor.clone(),
        Duration::from_millis(config.upstream.poll_interval_ms),
    );
    tokio::spawn(async move { fetcher.run().await });

    let state = DashboardState {
        query: QueryService::new(
            store.clone(),
            PairSelector::new(&config.pairing.primary, &config.pairing.secondary),
        ),
        store,
        monitor,
        default_window: config.query.default_window,
    };
    let app = create_router(state, &config.server.static_dir);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!(
        addr = %addr,
        poll_ms = config.upstream.poll_interval_ms,
        "Listening on http://{addr}"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
