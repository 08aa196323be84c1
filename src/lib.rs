// src/lib.rs
// Public library surface for the service binary, the demo and integration tests.

pub mod aggregator;
pub mod api;
pub mod backends;
pub mod cache;
pub mod config;
pub mod inflight;
pub mod metrics;
pub mod registry;
pub mod scheduler;
pub mod sources;
pub mod types;

// ---- Re-exports for stable public API ----
pub use crate::aggregator::{CollectibleStatus, CollectiblesAggregator, RefreshOutcome};
pub use crate::api::create_router;
pub use crate::config::AggregatorConfig;
pub use crate::sources::{SourceCounts, Sources};

use std::sync::Arc;

use crate::backends::http::GatewayClient;
use crate::registry::SnsRegistry;

/// Wire an aggregator whose collaborators all sit behind the JSON gateway.
pub fn gateway_aggregator(cfg: &AggregatorConfig) -> anyhow::Result<CollectiblesAggregator> {
    cfg.validate()?;
    let gateway = GatewayClient::from_config(cfg)?;
    let partitions = SnsRegistry::from_config(cfg, &gateway);

    // The reward partition need not be one the maturity source walks.
    let reward_governance = cfg.reward_partition.as_deref().map(|root| {
        partitions
            .get(root)
            .map(|p| p.governance.clone())
            .unwrap_or_else(|| gateway.governance(root))
    });
    if reward_governance.is_none() {
        tracing::warn!(target: "collectibles", "no reward_partition configured; rewards source disabled");
    }

    let shared = Arc::new(gateway);
    let sources = Sources {
        reward_governance,
        rewards_ledger: shared.clone(),
        pool_registry: shared.clone(),
        pool_service: shared,
        partitions,
        page_size: cfg.page_size,
    };
    Ok(CollectiblesAggregator::new(sources, cfg.staleness()))
}
