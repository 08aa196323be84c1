//! Collectibles service binary entrypoint.
//! Boots the Axum HTTP server with the aggregator, the forced refresh loop
//! and the Prometheus endpoint.

use shuttle_axum::ShuttleAxum;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use collectibles_notifier::api::{create_router, AppState};
use collectibles_notifier::config::load_config_default;
use collectibles_notifier::metrics::Metrics;
use collectibles_notifier::{gateway_aggregator, scheduler};

/// Compact logs by default, JSON lines when `COLLECTIBLES_LOG_JSON=1`.
/// Shuttle may already have installed a subscriber; that is fine.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("collectibles=info,warn"));

    let json = std::env::var("COLLECTIBLES_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    let res = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = load_config_default()?;
    tracing::info!(
        gateway = %cfg.gateway_url,
        partitions = cfg.partitions.len(),
        staleness_ms = cfg.staleness_ms,
        refresh_interval_secs = cfg.refresh_interval_secs,
        "collectibles config loaded"
    );

    let metrics = Metrics::init(cfg.staleness_ms)?;
    let aggregator = Arc::new(gateway_aggregator(&cfg)?);
    scheduler::spawn_refresh_loop(aggregator.clone(), cfg.refresh_interval());

    let router = create_router(AppState { aggregator }).merge(metrics.router());
    Ok(router.into())
}
