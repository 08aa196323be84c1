//! # Collectible cache
//! Single-entry cache of the last successful count, keyed by principal.
//!
//! The entry is owned by one aggregator instance. It only answers for the
//! principal it was computed for and only while younger than the staleness
//! window; `last_checked` moves only on a successful store.

use serde::Serialize;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

/// Millisecond wall clock, injectable for tests.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(start_ms),
        }
    }

    pub fn set(&self, ms: i64) {
        self.now.store(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectibleCacheEntry {
    pub count: u64,
    pub principal_id: Option<String>,
    /// Unix ms of the last successful cycle.
    pub last_checked: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct CollectibleCache {
    entry: CollectibleCacheEntry,
    staleness: Duration,
}

impl CollectibleCache {
    pub fn new(staleness: Duration) -> Self {
        Self {
            entry: CollectibleCacheEntry::default(),
            staleness,
        }
    }

    pub fn entry(&self) -> &CollectibleCacheEntry {
        &self.entry
    }

    pub fn staleness(&self) -> Duration {
        self.staleness
    }

    pub fn is_for(&self, principal: &str) -> bool {
        self.entry.principal_id.as_deref() == Some(principal)
    }

    /// Cached count when the entry belongs to `principal` and is younger than the window.
    pub fn fresh_count(&self, principal: &str, now_ms: i64) -> Option<u64> {
        if !self.is_for(principal) {
            return None;
        }
        let checked = self.entry.last_checked?;
        let age = now_ms.saturating_sub(checked);
        (age < self.staleness.as_millis() as i64).then_some(self.entry.count)
    }

    pub fn store(&mut self, principal: &str, count: u64, now_ms: i64) {
        self.entry = CollectibleCacheEntry {
            count,
            principal_id: Some(principal.to_string()),
            last_checked: Some(now_ms),
        };
    }

    pub fn clear(&mut self) {
        self.entry = CollectibleCacheEntry::default();
    }
}
