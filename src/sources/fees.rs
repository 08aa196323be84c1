// src/sources/fees.rs
use anyhow::{Context, Result};
use futures_util::future::try_join_all;
use std::collections::HashSet;

use super::{isolated, SourceKind};
use crate::backends::{PoolRegistry, PoolService};
use crate::types::{PoolId, PositionId, Principal};

/// Upper bound on listing pages fetched for one pool in one cycle.
const MAX_PAGES_PER_POOL: usize = 1_000;

/// Number of the principal's pool positions with uncollected fees.
///
/// Claimed (registry) and owned (pool) ids are merged per pool; each pool's
/// listing is then paged in order until a short page comes back. A pool
/// that repeats a page or runs past the per-pool page cap stops early.
pub async fn count_fee_positions(
    registry: &dyn PoolRegistry,
    service: &dyn PoolService,
    principal: &Principal,
    page_size: u64,
) -> u64 {
    isolated(
        SourceKind::Fees,
        principal,
        try_count(registry, service, principal, page_size),
    )
    .await
}

async fn try_count(
    registry: &dyn PoolRegistry,
    service: &dyn PoolService,
    principal: &Principal,
    page_size: u64,
) -> Result<u64> {
    let pools = registry.list_pools().await.context("listing pools")?;
    let per_pool = try_join_all(
        pools
            .iter()
            .map(|pool| count_pool(registry, service, principal, pool, page_size)),
    )
    .await?;
    Ok(per_pool.into_iter().sum())
}

async fn count_pool(
    registry: &dyn PoolRegistry,
    service: &dyn PoolService,
    principal: &Principal,
    pool: &PoolId,
    page_size: u64,
) -> Result<u64> {
    let (claimed, owned) = tokio::try_join!(
        registry.claimed_positions(principal, pool),
        service.owned_position_ids(pool, principal),
    )
    .with_context(|| format!("resolving positions of pool {pool}"))?;

    let wanted: HashSet<PositionId> = claimed.into_iter().chain(owned).collect();
    if wanted.is_empty() {
        return Ok(0);
    }

    let limit = page_size.max(1);
    let mut offset = 0u64;
    let mut pages = 0usize;
    let mut previous: Vec<PositionId> = Vec::new();
    let mut with_fees: HashSet<PositionId> = HashSet::new();
    loop {
        let page = service
            .positions_page(pool, offset, limit)
            .await
            .with_context(|| format!("pool {pool} positions at offset {offset}"))?;
        pages += 1;

        let ids: Vec<PositionId> = page.iter().map(|p| p.id).collect();
        if !ids.is_empty() && ids == previous {
            tracing::warn!(
                target: "collectibles",
                pool = %pool,
                offset,
                "pool returned the same page twice, stopping"
            );
            break;
        }

        with_fees.extend(
            page.iter()
                .filter(|p| wanted.contains(&p.id) && p.has_uncollected_fees())
                .map(|p| p.id),
        );

        if (page.len() as u64) < limit {
            break;
        }
        if pages >= MAX_PAGES_PER_POOL {
            tracing::warn!(
                target: "collectibles",
                pool = %pool,
                pages,
                "page cap reached, stopping"
            );
            break;
        }
        previous = ids;
        offset += limit;
    }

    tracing::debug!(
        target: "collectibles",
        pool = %pool,
        wanted = wanted.len(),
        with_fees = with_fees.len(),
        "pool scanned"
    );
    Ok(with_fees.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::mock::MockBackend;
    use crate::types::PoolPosition;
    use async_trait::async_trait;
    use std::sync::atomic::Ordering;

    fn pos(id: u64, f0: u128, f1: u128) -> PoolPosition {
        PoolPosition {
            id: PositionId(id),
            tokens_owed0: f0,
            tokens_owed1: f1,
        }
    }

    fn me() -> Principal {
        Principal::from_text("2vxsx-fae").unwrap()
    }

    #[tokio::test]
    async fn counts_claimed_and_owned_with_fees() {
        let be = MockBackend::new();
        be.add_pool(
            "pool-a",
            vec![pos(1, 3, 0), pos(2, 0, 0), pos(3, 0, 7), pos(4, 9, 9)],
        );
        be.set_claimed("2vxsx-fae", "pool-a", &[1, 2]);
        be.set_owned("2vxsx-fae", "pool-a", &[3]);

        let n = count_fee_positions(&*be, &*be, &me(), 10).await;
        assert_eq!(n, 2); // 1 and 3; 4 is not ours, 2 has no fees
    }

    #[tokio::test]
    async fn pages_until_short_page() {
        let be = MockBackend::new();
        let positions: Vec<PoolPosition> = (0..25).map(|i| pos(i, 1, 0)).collect();
        be.add_pool("pool-a", positions);
        be.set_owned("2vxsx-fae", "pool-a", &[0, 12, 24]);

        let n = count_fee_positions(&*be, &*be, &me(), 10).await;
        assert_eq!(n, 3);
        // 10 + 10 + 5
        assert_eq!(be.calls.positions_page.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exact_multiple_needs_one_trailing_empty_page() {
        let be = MockBackend::new();
        let positions: Vec<PoolPosition> = (0..20).map(|i| pos(i, 1, 0)).collect();
        be.add_pool("pool-a", positions);
        be.set_owned("2vxsx-fae", "pool-a", &[19]);

        let n = count_fee_positions(&*be, &*be, &me(), 10).await;
        assert_eq!(n, 1);
        assert_eq!(be.calls.positions_page.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn empty_pool_stops_after_one_page() {
        let be = MockBackend::new();
        be.add_pool("pool-a", vec![]);
        be.set_claimed("2vxsx-fae", "pool-a", &[1]);

        let n = count_fee_positions(&*be, &*be, &me(), 10).await;
        assert_eq!(n, 0);
        assert_eq!(be.calls.positions_page.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn pool_without_our_positions_is_not_paged() {
        let be = MockBackend::new();
        be.add_pool("pool-a", vec![pos(1, 1, 1)]);

        let n = count_fee_positions(&*be, &*be, &me(), 10).await;
        assert_eq!(n, 0);
        assert_eq!(be.calls.positions_page.load(Ordering::SeqCst), 0);
    }

    /// Pool service that ignores `offset` and always serves the same full page.
    struct StuckPool;

    #[async_trait]
    impl PoolRegistry for StuckPool {
        async fn list_pools(&self) -> Result<Vec<PoolId>> {
            Ok(vec![PoolId("pool-stuck".into())])
        }
        async fn claimed_positions(
            &self,
            _principal: &Principal,
            _pool: &PoolId,
        ) -> Result<Vec<PositionId>> {
            Ok(vec![PositionId(1)])
        }
    }

    #[async_trait]
    impl PoolService for StuckPool {
        async fn owned_position_ids(
            &self,
            _pool: &PoolId,
            _principal: &Principal,
        ) -> Result<Vec<PositionId>> {
            Ok(vec![])
        }
        async fn positions_page(
            &self,
            _pool: &PoolId,
            _offset: u64,
            limit: u64,
        ) -> Result<Vec<PoolPosition>> {
            Ok((1..=limit).map(|i| pos(i, 1, 0)).collect())
        }
    }

    #[tokio::test]
    async fn repeated_full_page_ends_paging() {
        let stuck = StuckPool;
        let n = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            count_fee_positions(&stuck, &stuck, &me(), 10),
        )
        .await
        .expect("paging must terminate");
        assert_eq!(n, 1);
    }

    /// Listing that never ends: every page is full and new.
    struct EndlessPool {
        pages: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl PoolService for EndlessPool {
        async fn owned_position_ids(
            &self,
            _pool: &PoolId,
            _principal: &Principal,
        ) -> Result<Vec<PositionId>> {
            Ok(vec![])
        }
        async fn positions_page(
            &self,
            _pool: &PoolId,
            offset: u64,
            limit: u64,
        ) -> Result<Vec<PoolPosition>> {
            self.pages.fetch_add(1, Ordering::SeqCst);
            Ok((offset..offset + limit).map(|i| pos(i, 0, 0)).collect())
        }
    }

    #[tokio::test]
    async fn endless_listing_stops_at_page_cap() {
        let endless = EndlessPool {
            pages: std::sync::atomic::AtomicUsize::new(0),
        };
        let n = count_fee_positions(&StuckPool, &endless, &me(), 10).await;
        assert_eq!(n, 0);
        assert_eq!(endless.pages.load(Ordering::SeqCst), MAX_PAGES_PER_POOL);
    }

    #[tokio::test]
    async fn registry_failure_counts_zero() {
        let be = MockBackend::new();
        be.add_pool("pool-a", vec![pos(1, 1, 1)]);
        be.set_owned("2vxsx-fae", "pool-a", &[1]);
        be.fail_pool_registry(true);

        let n = count_fee_positions(&*be, &*be, &me(), 10).await;
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn pools_are_summed() {
        let be = MockBackend::new();
        be.add_pool("pool-a", vec![pos(1, 1, 0)]);
        be.add_pool("pool-b", vec![pos(1, 0, 1), pos(2, 1, 1)]);
        be.set_owned("2vxsx-fae", "pool-a", &[1]);
        be.set_claimed("2vxsx-fae", "pool-b", &[1, 2]);

        let n = count_fee_positions(&*be, &*be, &me(), 10).await;
        assert_eq!(n, 3);
    }
}
