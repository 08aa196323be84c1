// src/sources/mod.rs
//! The three collectible sources. Each one is an isolated failure boundary:
//! its public entry point never fails, an error just makes it count 0.

pub mod fees;
pub mod maturity;
pub mod rewards;

use anyhow::Result;
use metrics::counter;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;

use crate::backends::{GovernanceRegistry, PoolRegistry, PoolService, RewardsLedger};
use crate::registry::SnsRegistry;
use crate::types::Principal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Rewards,
    Fees,
    Maturity,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Rewards => "rewards",
            SourceKind::Fees => "fees",
            SourceKind::Maturity => "maturity",
        }
    }
}

/// Per-source contributions of one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceCounts {
    pub rewards: u64,
    pub fees: u64,
    pub maturity: u64,
}

impl SourceCounts {
    pub fn total(&self) -> u64 {
        self.rewards + self.fees + self.maturity
    }
}

/// Await a fallible source and degrade any error to 0 with a diagnostic.
pub(crate) async fn isolated<F>(kind: SourceKind, principal: &Principal, fut: F) -> u64
where
    F: Future<Output = Result<u64>>,
{
    match fut.await {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!(
                target: "collectibles",
                source = kind.as_str(),
                principal = %principal,
                error = %format!("{e:#}"),
                "source failed, counting 0"
            );
            counter!("collectibles_source_errors_total", "source" => kind.as_str()).increment(1);
            0
        }
    }
}

/// Collaborators the aggregator reads from.
#[derive(Clone)]
pub struct Sources {
    /// Partition whose neurons key the rewards ledger. `None` disables the rewards source.
    pub reward_governance: Option<Arc<dyn GovernanceRegistry>>,
    pub rewards_ledger: Arc<dyn RewardsLedger>,
    pub pool_registry: Arc<dyn PoolRegistry>,
    pub pool_service: Arc<dyn PoolService>,
    pub partitions: SnsRegistry,
    pub page_size: u64,
}

impl Sources {
    /// Run all three sources concurrently. Never fails.
    pub async fn collect(&self, principal: &Principal) -> SourceCounts {
        let rewards = async {
            match &self.reward_governance {
                Some(gov) => {
                    rewards::count_reward_positions(&**gov, &*self.rewards_ledger, principal).await
                }
                None => 0,
            }
        };
        let fees = fees::count_fee_positions(
            &*self.pool_registry,
            &*self.pool_service,
            principal,
            self.page_size,
        );
        let maturity = maturity::count_disbursable_maturity(&self.partitions, principal);

        let (rewards, fees, maturity) = tokio::join!(rewards, fees, maturity);
        SourceCounts {
            rewards,
            fees,
            maturity,
        }
    }
}
