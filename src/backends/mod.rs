// src/backends/mod.rs
//! Call contracts for the external services the aggregator reads from.
//! Nothing here writes to a backend.

pub mod http;
pub mod mock;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{Neuron, NeuronBalance, NeuronId, PoolId, PoolPosition, PositionId, Principal};

/// Governance canister of one SNS partition.
#[async_trait]
pub trait GovernanceRegistry: Send + Sync {
    /// Neurons where `principal` appears in the permission list.
    async fn list_neurons(&self, principal: &Principal) -> Result<Vec<Neuron>>;
    fn name(&self) -> &str;
}

/// Rewards ledger keyed by neuron id.
#[async_trait]
pub trait RewardsLedger: Send + Sync {
    async fn balances(&self, neuron_ids: &[NeuronId]) -> Result<Vec<NeuronBalance>>;
}

/// Market backend that knows which pools exist and which positions a user claimed.
#[async_trait]
pub trait PoolRegistry: Send + Sync {
    async fn list_pools(&self) -> Result<Vec<PoolId>>;
    async fn claimed_positions(&self, principal: &Principal, pool: &PoolId)
        -> Result<Vec<PositionId>>;
}

/// Per-pool position service, addressed by pool id.
#[async_trait]
pub trait PoolService: Send + Sync {
    async fn owned_position_ids(&self, pool: &PoolId, principal: &Principal)
        -> Result<Vec<PositionId>>;
    /// Page of the pool's position listing, `limit` entries starting at `offset`.
    async fn positions_page(&self, pool: &PoolId, offset: u64, limit: u64)
        -> Result<Vec<PoolPosition>>;
}
