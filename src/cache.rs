//! The aggregation cache: a single slot holding the last cycle's records.
//!
//! The slot moves between EMPTY, FRESH (age < TTL) and STALE (age >= TTL).
//! All refresh paths (read-through, forced sync, background tick) run
//! through the same refresh lock, so two callers that both observe a stale
//! slot cannot start two concurrent scraping cycles: the second waits,
//! re-checks under the lock and reuses the first caller's result.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use time::OffsetDateTime;
use tracing::debug;

use crate::record::PlatformRecord;

pub type Clock = Arc<dyn Fn() -> OffsetDateTime + Send + Sync>;

/// An immutable view of the cache contents at some instant.
#[derive(Clone)]
pub struct CacheSnapshot {
    pub records: Arc<Vec<PlatformRecord>>,
    pub fetched_at: OffsetDateTime,
    pub next_update: OffsetDateTime,
}

/// Rejection for a forced refresh that arrived while the slot is FRESH.
#[derive(Debug, Clone, Copy)]
pub struct TooSoon {
    pub remaining: Duration,
    pub next_allowed: OffsetDateTime,
}

impl TooSoon {
    /// Remaining wait, rounded up to whole minutes (what the API reports).
    pub fn minutes_left(&self) -> u64 {
        self.remaining.as_secs().div_ceil(60).max(1)
    }
}

struct Slot {
    records: Arc<Vec<PlatformRecord>>,
    fetched_at: OffsetDateTime,
}

pub struct CacheStore {
    ttl: Duration,
    clock: Clock,
    slot: Mutex<Option<Slot>>,
    refresh_lock: tokio::sync::Mutex<()>,
}

impl CacheStore {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(OffsetDateTime::now_utc))
    }

    pub fn with_clock(ttl: Duration, clock: Clock) -> Self {
        CacheStore {
            ttl,
            clock,
            slot: Mutex::new(None),
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn now(&self) -> OffsetDateTime {
        (self.clock)()
    }

    fn snapshot_of(&self, slot: &Slot) -> CacheSnapshot {
        CacheSnapshot {
            records: slot.records.clone(),
            fetched_at: slot.fetched_at,
            next_update: slot.fetched_at + self.ttl,
        }
    }

    /// The current contents, FRESH or STALE, without triggering a refresh.
    pub fn current(&self) -> Option<CacheSnapshot> {
        let slot = self.slot.lock().unwrap();
        slot.as_ref().map(|slot| self.snapshot_of(slot))
    }

    fn fresh_snapshot(&self) -> Option<CacheSnapshot> {
        let slot = self.slot.lock().unwrap();
        let slot = slot.as_ref()?;

        if self.now() - slot.fetched_at < self.ttl {
            Some(self.snapshot_of(slot))
        } else {
            None
        }
    }

    fn store(&self, records: Vec<PlatformRecord>) -> CacheSnapshot {
        let slot = Slot {
            records: Arc::new(records),
            fetched_at: self.now(),
        };
        let snapshot = self.snapshot_of(&slot);

        *self.slot.lock().unwrap() = Some(slot);

        snapshot
    }

    /// Read-through access: returns the cached cycle while FRESH, otherwise
    /// runs `refresh` and replaces the slot. Concurrent stale observers
    /// coalesce into a single refresh.
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> CacheSnapshot
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Vec<PlatformRecord>>,
    {
        if let Some(snapshot) = self.fresh_snapshot() {
            return snapshot;
        }

        let _guard = self.refresh_lock.lock().await;

        // Someone may have refreshed while we waited for the lock.
        if let Some(snapshot) = self.fresh_snapshot() {
            debug!("Refresh coalesced with a concurrent one");
            return snapshot;
        }

        self.store(refresh().await)
    }

    /// Operator-triggered refresh, gated by the same TTL as read-through
    /// access so expensive scraping cannot be hammered.
    pub async fn force_refresh<F, Fut>(&self, refresh: F) -> Result<CacheSnapshot, TooSoon>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Vec<PlatformRecord>>,
    {
        if let Some(rejection) = self.too_soon() {
            return Err(rejection);
        }

        let _guard = self.refresh_lock.lock().await;

        if let Some(rejection) = self.too_soon() {
            return Err(rejection);
        }

        Ok(self.store(refresh().await))
    }

    fn too_soon(&self) -> Option<TooSoon> {
        let slot = self.slot.lock().unwrap();
        let slot = slot.as_ref()?;
        let age = (self.now() - slot.fetched_at).max(time::Duration::ZERO);

        if age >= self.ttl {
            return None;
        }

        let remaining = self.ttl - age.unsigned_abs();

        Some(TooSoon {
            remaining,
            next_allowed: slot.fetched_at + self.ttl,
        })
    }

    /// Empty the slot so the next read runs a full cycle, regardless of TTL.
    pub fn invalidate(&self) {
        *self.slot.lock().unwrap() = None;
    }
}
