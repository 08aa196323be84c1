// src/sources/maturity.rs
use anyhow::{Context, Result};
use futures_util::future::try_join_all;

use super::{isolated, SourceKind};
use crate::registry::{SnsPartition, SnsRegistry};
use crate::types::{NeuronPermissionType, Principal};

/// Neurons across all partitions with maturity the principal may disburse.
pub async fn count_disbursable_maturity(registry: &SnsRegistry, principal: &Principal) -> u64 {
    isolated(SourceKind::Maturity, principal, try_count(registry, principal)).await
}

async fn try_count(registry: &SnsRegistry, principal: &Principal) -> Result<u64> {
    let per_sns = try_join_all(
        registry
            .partitions()
            .iter()
            .map(|sns| count_partition(sns, principal)),
    )
    .await?;
    Ok(per_sns.into_iter().sum())
}

async fn count_partition(sns: &SnsPartition, principal: &Principal) -> Result<u64> {
    let neurons = sns
        .governance
        .list_neurons(principal)
        .await
        .with_context(|| format!("listing neurons in {}", sns.name))?;

    Ok(neurons
        .iter()
        .filter(|n| {
            n.maturity_e8s_equivalent > 0
                && n.grants(principal, NeuronPermissionType::DisburseMaturity)
        })
        .count() as u64)
}
