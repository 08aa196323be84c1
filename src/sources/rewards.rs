// src/sources/rewards.rs
use anyhow::{Context, Result};

use super::{isolated, SourceKind};
use crate::backends::{GovernanceRegistry, RewardsLedger};
use crate::types::{NeuronId, Principal};

/// Number of the principal's neurons with a positive reward balance.
pub async fn count_reward_positions(
    governance: &dyn GovernanceRegistry,
    ledger: &dyn RewardsLedger,
    principal: &Principal,
) -> u64 {
    isolated(
        SourceKind::Rewards,
        principal,
        try_count(governance, ledger, principal),
    )
    .await
}

async fn try_count(
    governance: &dyn GovernanceRegistry,
    ledger: &dyn RewardsLedger,
    principal: &Principal,
) -> Result<u64> {
    let neurons = governance
        .list_neurons(principal)
        .await
        .with_context(|| format!("listing neurons in {}", governance.name()))?;
    if neurons.is_empty() {
        return Ok(0);
    }

    let ids: Vec<NeuronId> = neurons.into_iter().map(|n| n.id).collect();
    let balances = ledger
        .balances(&ids)
        .await
        .context("fetching reward balances")?;

    Ok(balances.iter().filter(|b| b.balance > 0).count() as u64)
}
