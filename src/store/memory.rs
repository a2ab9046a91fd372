//! In-process quota store.
//!
//! Suitable for single-process deployments and tests. Counters for one key
//! serialize on the map's shard lock, so concurrent increments within the
//! process never lose updates.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use super::{QuotaStore, StoreError};

/// Writes between opportunistic sweeps of dead keys.
const PURGE_INTERVAL_OPS: u64 = 4096;

struct Counter {
    count: u64,
    expires_at: Instant,
}

/// A quota store keeping counters in process memory.
///
/// Dead windows are swept on a write cadence, so a long-lived store does
/// not grow with every window that ever existed. `purge_expired` forces a
/// sweep.
#[derive(Default)]
pub struct MemoryStore {
    counters: DashMap<String, Counter>,
    ops_since_purge: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop expired keys. Reads already treat expired keys as absent, so
    /// this only reclaims memory.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.counters.retain(|_, counter| counter.expires_at > now);
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.counters
            .iter()
            .filter(|entry| entry.expires_at > now)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl QuotaStore for MemoryStore {
    async fn increment_and_expire(&self, key: &str, ttl: Duration) -> Result<u64, StoreError> {
        // Reads already treat expired keys as absent; the sweep only
        // reclaims their memory. Runs before any shard lock is taken.
        if self.ops_since_purge.fetch_add(1, Ordering::Relaxed) >= PURGE_INTERVAL_OPS {
            self.ops_since_purge.store(0, Ordering::Relaxed);
            self.purge_expired();
        }

        let now = Instant::now();
        let mut entry = self
            .counters
            .entry(key.to_string())
            .or_insert_with(|| Counter {
                count: 0,
                expires_at: now + ttl,
            });

        // An expired key behaves as absent: counting restarts and a fresh
        // expiry is set.
        if entry.expires_at <= now {
            entry.count = 0;
            entry.expires_at = now + ttl;
        }
        entry.count += 1;
        Ok(entry.count)
    }

    async fn get(&self, key: &str) -> Result<u64, StoreError> {
        let now = Instant::now();
        Ok(self
            .counters
            .get(key)
            .filter(|counter| counter.expires_at > now)
            .map(|counter| counter.count)
            .unwrap_or(0))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let now = Instant::now();
        match self.counters.get_mut(key) {
            Some(mut counter) if counter.expires_at > now => {
                counter.expires_at = now + ttl;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn time_to_live(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        let now = Instant::now();
        Ok(self
            .counters
            .get(key)
            .and_then(|counter| counter.expires_at.checked_duration_since(now)))
    }
}
