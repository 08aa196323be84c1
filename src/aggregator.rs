//! # Collectibles aggregator
//! Computes the dashboard's "collectible count" for the acting principal by
//! summing three isolated sources (rewards, pool fees, neuron maturity).
//!
//! - One cycle at a time; a trigger while one runs is dropped, not queued.
//! - Non-forced refreshes are answered from the cache while it is younger
//!   than the staleness window and belongs to the acting principal.
//! - A failed cycle zeroes the visible count and surfaces the error, but the
//!   cache entry (and its `last_checked`) stays as the last success left it.
//! - Clearing the identity (logout) zeroes everything immediately.
//!
//! Observers either poll [`CollectiblesAggregator::status`] or follow the
//! `watch` channel from [`CollectiblesAggregator::subscribe`].

use anyhow::{Context, Result};
use metrics::{counter, gauge, histogram};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::watch;

use crate::cache::{Clock, CollectibleCache, CollectibleCacheEntry, SystemClock};
use crate::inflight::InFlight;
use crate::sources::{SourceCounts, Sources};
use crate::types::Principal;

/// What a UI layer renders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectibleStatus {
    pub count: u64,
    pub loading: bool,
    pub error: Option<String>,
    pub last_checked: Option<i64>,
    pub breakdown: Option<SourceCounts>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RefreshOutcome {
    /// No acting identity; state was zeroed, nothing was fetched.
    Anonymous,
    /// Another cycle was running; this trigger was dropped.
    InFlight,
    CacheHit { count: u64 },
    Refreshed { count: u64, counts: SourceCounts },
    /// The identity changed while the cycle ran; its result was thrown away.
    Discarded,
    Failed { error: String },
}

#[derive(Debug)]
struct State {
    identity: Option<String>,
    cache: CollectibleCache,
    visible_count: u64,
    loading: bool,
    error: Option<String>,
    breakdown: Option<SourceCounts>,
}

impl State {
    fn status(&self) -> CollectibleStatus {
        let last_checked = match &self.identity {
            Some(id) if self.cache.is_for(id) => self.cache.entry().last_checked,
            _ => None,
        };
        CollectibleStatus {
            count: self.visible_count,
            loading: self.loading,
            error: self.error.clone(),
            last_checked,
            breakdown: self.breakdown,
        }
    }

    fn zero(&mut self) {
        self.visible_count = 0;
        self.error = None;
        self.breakdown = None;
    }
}

pub struct CollectiblesAggregator {
    sources: Sources,
    clock: Arc<dyn Clock>,
    in_flight: InFlight,
    state: Mutex<State>,
    updates: watch::Sender<CollectibleStatus>,
}

impl CollectiblesAggregator {
    pub fn new(sources: Sources, staleness: Duration) -> Self {
        Self::with_clock(sources, staleness, Arc::new(SystemClock))
    }

    pub fn with_clock(sources: Sources, staleness: Duration, clock: Arc<dyn Clock>) -> Self {
        let (updates, _) = watch::channel(CollectibleStatus::default());
        Self {
            sources,
            clock,
            in_flight: InFlight::new(),
            state: Mutex::new(State {
                identity: None,
                cache: CollectibleCache::new(staleness),
                visible_count: 0,
                loading: false,
                error: None,
                breakdown: None,
            }),
            updates,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }

    fn publish(&self, state: &State) {
        self.updates.send_replace(state.status());
    }

    pub fn subscribe(&self) -> watch::Receiver<CollectibleStatus> {
        self.updates.subscribe()
    }

    /// Snapshot for the acting identity.
    pub fn status(&self) -> CollectibleStatus {
        self.lock().status()
    }

    /// Snapshot for `identity`. A cached count is only returned when the
    /// cache entry was computed for that same identity.
    pub fn get_count(&self, identity: Option<&str>) -> CollectibleStatus {
        let Some(id) = identity.map(str::trim).filter(|s| !s.is_empty()) else {
            return CollectibleStatus::default();
        };
        let s = self.lock();
        if s.identity.as_deref() == Some(id) {
            return s.status();
        }
        if s.cache.is_for(id) {
            let entry = s.cache.entry();
            return CollectibleStatus {
                count: entry.count,
                last_checked: entry.last_checked,
                ..CollectibleStatus::default()
            };
        }
        CollectibleStatus::default()
    }

    pub fn cache_entry(&self) -> CollectibleCacheEntry {
        self.lock().cache.entry().clone()
    }

    pub fn identity(&self) -> Option<String> {
        self.lock().identity.clone()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_busy()
    }

    /// Switch the acting identity. Returns `false` when nothing changed.
    /// `None` (logout) zeroes the count and clears the cache.
    pub fn set_identity(&self, identity: Option<String>) -> bool {
        let identity = identity
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let mut s = self.lock();
        if s.identity == identity {
            return false;
        }
        match &identity {
            None => {
                s.cache.clear();
                s.zero();
                s.loading = false;
                tracing::info!(target: "collectibles", "identity cleared, cache reset");
            }
            Some(id) => {
                s.zero();
                if s.cache.is_for(id) {
                    s.visible_count = s.cache.entry().count;
                }
                tracing::info!(target: "collectibles", principal = %id, "identity changed");
            }
        }
        s.identity = identity;
        self.publish(&s);
        true
    }

    /// Reset the cache entry and visible count.
    pub fn clear_cache(&self) {
        let mut s = self.lock();
        s.cache.clear();
        s.zero();
        self.publish(&s);
    }

    /// Recompute the count for the acting identity, unless the cache is
    /// fresh (`force == false`) or a cycle is already running.
    ///
    /// When the identity changes while the cycle runs, the result is
    /// discarded and, once the slot is free, the new identity gets its own
    /// non-forced check. Its trigger was dropped as `InFlight` meanwhile.
    pub async fn refresh(&self, force: bool) -> RefreshOutcome {
        crate::metrics::ensure_described();

        let outcome = self.refresh_once(force).await;
        if outcome == RefreshOutcome::Discarded {
            let mut next = RefreshOutcome::Discarded;
            while next == RefreshOutcome::Discarded && self.identity().is_some() {
                tracing::debug!(target: "collectibles", "rechecking for the new identity");
                next = self.refresh_once(false).await;
            }
        }
        outcome
    }

    async fn refresh_once(&self, force: bool) -> RefreshOutcome {
        let identity = self.lock().identity.clone();
        let Some(identity) = identity else {
            self.clear_cache();
            return RefreshOutcome::Anonymous;
        };

        let Some(_guard) = self.in_flight.try_acquire() else {
            counter!("collectibles_inflight_skipped_total").increment(1);
            tracing::debug!(target: "collectibles", principal = %identity, "cycle already in flight");
            return RefreshOutcome::InFlight;
        };

        if !force {
            let now = self.clock.now_ms();
            let cached = self.lock().cache.fresh_count(&identity, now);
            if let Some(count) = cached {
                counter!("collectibles_cache_hits_total").increment(1);
                return RefreshOutcome::CacheHit { count };
            }
        }

        {
            let mut s = self.lock();
            s.loading = true;
            self.publish(&s);
        }

        counter!("collectibles_cycles_total").increment(1);
        let t0 = Instant::now();
        let result = self.run_cycle(&identity).await;
        let elapsed_ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("collectibles_cycle_ms").record(elapsed_ms);

        self.finish_cycle(&identity, result, elapsed_ms)
    }

    async fn run_cycle(&self, identity: &str) -> Result<SourceCounts> {
        let principal = Principal::from_text(identity).context("resolving acting identity")?;
        Ok(self.sources.collect(&principal).await)
    }

    fn finish_cycle(
        &self,
        identity: &str,
        result: Result<SourceCounts>,
        elapsed_ms: f64,
    ) -> RefreshOutcome {
        let now = self.clock.now_ms();
        let mut s = self.lock();
        s.loading = false;

        if s.identity.as_deref() != Some(identity) {
            self.publish(&s);
            tracing::debug!(
                target: "collectibles",
                principal = %identity,
                "identity changed mid-cycle, result discarded"
            );
            return RefreshOutcome::Discarded;
        }

        let outcome = match result {
            Ok(counts) => {
                let total = counts.total();
                s.cache.store(identity, total, now);
                s.visible_count = total;
                s.error = None;
                s.breakdown = Some(counts);
                gauge!("collectibles_last_count").set(total as f64);
                tracing::info!(
                    target: "collectibles",
                    principal = %identity,
                    count = total,
                    rewards = counts.rewards,
                    fees = counts.fees,
                    maturity = counts.maturity,
                    elapsed_ms = elapsed_ms as u64,
                    "collectibles refreshed"
                );
                RefreshOutcome::Refreshed {
                    count: total,
                    counts,
                }
            }
            Err(e) => {
                let error = format!("{e:#}");
                s.visible_count = 0;
                s.breakdown = None;
                s.error = Some(error.clone());
                counter!("collectibles_cycle_failures_total").increment(1);
                tracing::warn!(
                    target: "collectibles",
                    principal = %identity,
                    error = %error,
                    "collectibles cycle failed"
                );
                RefreshOutcome::Failed { error }
            }
        };
        self.publish(&s);
        outcome
    }
}
