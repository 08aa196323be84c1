use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "collectibles_cycles_total",
            "Aggregation cycles that reached the backends."
        );
        describe_counter!(
            "collectibles_cache_hits_total",
            "Non-forced refreshes answered from the cache."
        );
        describe_counter!(
            "collectibles_inflight_skipped_total",
            "Refreshes dropped because a cycle was already running."
        );
        describe_counter!(
            "collectibles_cycle_failures_total",
            "Cycles that failed outside the per-source boundaries."
        );
        describe_counter!(
            "collectibles_source_errors_total",
            "Source failures degraded to a zero count."
        );
        describe_histogram!("collectibles_cycle_ms", "Cycle duration in milliseconds.");
        describe_gauge!(
            "collectibles_last_count",
            "Collectible count of the last successful cycle."
        );
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and expose the staleness window as a static gauge.
    pub fn init(staleness_ms: u64) -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        ensure_described();
        gauge!("collectibles_staleness_ms").set(staleness_ms as f64);

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
