// src/scheduler.rs
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::aggregator::{CollectiblesAggregator, RefreshOutcome};

/// Apply an identity change the way the dashboard does: a new identity gets
/// an initial non-forced check, logout is handled by the aggregator itself.
pub async fn apply_identity(
    agg: &CollectiblesAggregator,
    identity: Option<String>,
) -> Option<RefreshOutcome> {
    let changed = agg.set_identity(identity);
    if !changed || agg.identity().is_none() {
        return None;
    }
    Some(agg.refresh(false).await)
}

/// Spawn the recurring forced refresh. The first tick fires one `period`
/// after spawning; the initial check belongs to [`apply_identity`].
pub fn spawn_refresh_loop(agg: Arc<CollectiblesAggregator>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let start = tokio::time::Instant::now() + period;
        let mut ticker = tokio::time::interval_at(start, period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let outcome = agg.refresh(true).await;
            match &outcome {
                RefreshOutcome::Failed { error } => {
                    tracing::warn!(target: "collectibles", error = %error, "scheduled refresh failed");
                }
                other => {
                    tracing::debug!(target: "collectibles", outcome = ?other, "scheduled refresh tick");
                }
            }
        }
    })
}
