// src/backends/mock.rs
//! In-memory backend for tests and the local demo.
//! One `MockBackend` plays every collaborator; `governance(root)` hands out
//! a per-partition view of it.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::{GovernanceRegistry, PoolRegistry, PoolService, RewardsLedger};
use crate::types::{Neuron, NeuronBalance, NeuronId, PoolId, PoolPosition, PositionId, Principal};

#[derive(Default)]
struct Data {
    neurons: HashMap<(String, String), Vec<Neuron>>,
    balances: HashMap<NeuronId, u128>,
    pools: Vec<PoolId>,
    claimed: HashMap<(String, PoolId), Vec<PositionId>>,
    owned: HashMap<(String, PoolId), Vec<PositionId>>,
    positions: HashMap<PoolId, Vec<PoolPosition>>,
    failing_roots: HashSet<String>,
    fail_ledger: bool,
    fail_pool_registry: bool,
    latency: Option<Duration>,
}

/// Per-method call counters.
#[derive(Default)]
pub struct MockCalls {
    pub list_neurons: AtomicUsize,
    pub balances: AtomicUsize,
    pub list_pools: AtomicUsize,
    pub claimed_positions: AtomicUsize,
    pub owned_position_ids: AtomicUsize,
    pub positions_page: AtomicUsize,
}

#[derive(Default)]
pub struct MockBackend {
    data: Mutex<Data>,
    pub calls: MockCalls,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn data(&self) -> MutexGuard<'_, Data> {
        match self.data.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }

    /// Per-partition governance view over this backend.
    pub fn governance(self: &Arc<Self>, root: &str) -> Arc<dyn GovernanceRegistry> {
        Arc::new(MockGovernance {
            backend: Arc::clone(self),
            root: root.to_string(),
        })
    }

    pub fn set_neurons(&self, root: &str, principal: &str, neurons: Vec<Neuron>) {
        self.data()
            .neurons
            .insert((root.to_string(), principal.to_string()), neurons);
    }

    pub fn set_balance(&self, neuron: &str, balance: u128) {
        self.data()
            .balances
            .insert(NeuronId(neuron.to_string()), balance);
    }

    pub fn add_pool(&self, pool: &str, positions: Vec<PoolPosition>) {
        let id = PoolId(pool.to_string());
        let mut d = self.data();
        d.pools.push(id.clone());
        d.positions.insert(id, positions);
    }

    pub fn set_claimed(&self, principal: &str, pool: &str, ids: &[u64]) {
        self.data().claimed.insert(
            (principal.to_string(), PoolId(pool.to_string())),
            ids.iter().copied().map(PositionId).collect(),
        );
    }

    pub fn set_owned(&self, principal: &str, pool: &str, ids: &[u64]) {
        self.data().owned.insert(
            (principal.to_string(), PoolId(pool.to_string())),
            ids.iter().copied().map(PositionId).collect(),
        );
    }

    pub fn fail_governance(&self, root: &str, fail: bool) {
        let mut d = self.data();
        if fail {
            d.failing_roots.insert(root.to_string());
        } else {
            d.failing_roots.remove(root);
        }
    }

    pub fn fail_ledger(&self, fail: bool) {
        self.data().fail_ledger = fail;
    }

    pub fn fail_pool_registry(&self, fail: bool) {
        self.data().fail_pool_registry = fail;
    }

    /// Every call sleeps this long before answering.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.data().latency = latency;
    }

    async fn delay(&self) {
        let latency = self.data().latency;
        if let Some(d) = latency {
            tokio::time::sleep(d).await;
        }
    }
}

#[async_trait]
impl RewardsLedger for MockBackend {
    async fn balances(&self, neuron_ids: &[NeuronId]) -> Result<Vec<NeuronBalance>> {
        self.calls.balances.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        let d = self.data();
        if d.fail_ledger {
            return Err(anyhow!("mock ledger unavailable"));
        }
        Ok(neuron_ids
            .iter()
            .map(|id| NeuronBalance {
                neuron_id: id.clone(),
                balance: d.balances.get(id).copied().unwrap_or(0),
            })
            .collect())
    }
}

#[async_trait]
impl PoolRegistry for MockBackend {
    async fn list_pools(&self) -> Result<Vec<PoolId>> {
        self.calls.list_pools.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        let d = self.data();
        if d.fail_pool_registry {
            return Err(anyhow!("mock pool registry unavailable"));
        }
        Ok(d.pools.clone())
    }

    async fn claimed_positions(
        &self,
        principal: &Principal,
        pool: &PoolId,
    ) -> Result<Vec<PositionId>> {
        self.calls.claimed_positions.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        let d = self.data();
        if d.fail_pool_registry {
            return Err(anyhow!("mock pool registry unavailable"));
        }
        Ok(d
            .claimed
            .get(&(principal.to_string(), pool.clone()))
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl PoolService for MockBackend {
    async fn owned_position_ids(
        &self,
        pool: &PoolId,
        principal: &Principal,
    ) -> Result<Vec<PositionId>> {
        self.calls.owned_position_ids.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        Ok(self
            .data()
            .owned
            .get(&(principal.to_string(), pool.clone()))
            .cloned()
            .unwrap_or_default())
    }

    async fn positions_page(
        &self,
        pool: &PoolId,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<PoolPosition>> {
        self.calls.positions_page.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        let d = self.data();
        let all = d
            .positions
            .get(pool)
            .ok_or_else(|| anyhow!("unknown pool {pool}"))?;
        Ok(all
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

struct MockGovernance {
    backend: Arc<MockBackend>,
    root: String,
}

#[async_trait]
impl GovernanceRegistry for MockGovernance {
    async fn list_neurons(&self, principal: &Principal) -> Result<Vec<Neuron>> {
        self.backend.calls.list_neurons.fetch_add(1, Ordering::SeqCst);
        self.backend.delay().await;
        let d = self.backend.data();
        if d.failing_roots.contains(&self.root) {
            return Err(anyhow!("mock governance {} unavailable", self.root));
        }
        Ok(d
            .neurons
            .get(&(self.root.clone(), principal.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn name(&self) -> &str {
        &self.root
    }
}
