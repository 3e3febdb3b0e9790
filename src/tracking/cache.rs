//! Content tracking cache
//!
//! Live records are kept in a bounded in-memory map with a sliding access
//! timeout. Records leaving the map are written to [`RecordPersistence`]
//! before the evicting call returns, and reloaded transparently on the next
//! access.
//!
//! The map itself sits behind a short synchronous lock that is never held
//! across an await. Each key owns an async cell that serializes loading,
//! updating and writing out that one record, so the first access to a key
//! loads or creates exactly one record while slow persistence of one key
//! never stalls callers working on another.

use crate::clock::{elapsed, Clock};
use crate::error::{DepotError, DepotResult};
use crate::store::StoreKey;
use crate::tracking::model::{StoreEffect, TrackedContentRecord, TrackingKey};
use crate::tracking::persist::RecordPersistence;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default sliding timeout for idle records
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3600);

/// Default bound on live records
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

/// Per-key state guarded by the key's own async lock
#[derive(Default)]
struct Cell {
    /// `None` until the first caller loads or creates the record
    record: Option<TrackedContentRecord>,
    /// Set once the slot has left the map; holders must look it up again
    retired: bool,
}

type SharedCell = Arc<tokio::sync::Mutex<Cell>>;

struct Slot {
    cell: SharedCell,
    last_access: DateTime<Utc>,
    /// Bumped on every access so an eviction can tell it raced with one
    touches: u64,
    evicting: bool,
}

struct Victim {
    id: String,
    cell: SharedCell,
    touches: u64,
}

enum Eviction {
    Evicted,
    /// Accessed while being written out, so it stays live
    Kept,
    Failed,
}

/// Tracking records keyed by tracking id
pub struct TrackingCache {
    slots: Mutex<HashMap<String, Slot>>,
    persistence: Arc<dyn RecordPersistence>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
    max_entries: usize,
}

impl TrackingCache {
    pub fn new(persistence: Arc<dyn RecordPersistence>, clock: Arc<dyn Clock>) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            persistence,
            clock,
            timeout: DEFAULT_TIMEOUT,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }

    /// Set the sliding timeout after which idle records are evicted
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the maximum number of live records (at least one)
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Attribute an upload or download of `path` in `store` to `key`
    pub async fn record_artifact(
        &self,
        key: &TrackingKey,
        store: &StoreKey,
        path: &str,
        effect: StoreEffect,
    ) -> DepotResult<()> {
        let added = self
            .with_record(key, true, |record| record.record(store, path, effect))
            .await?;
        if added == Some(true) {
            debug!("Tracked {} of {}/{} for {}", effect, store, path, key);
        }
        Ok(())
    }

    /// Current record for `key`, creating an empty one if none exists
    pub async fn get_or_create(&self, key: &TrackingKey) -> DepotResult<TrackedContentRecord> {
        self.with_record(key, true, |record| record.clone())
            .await?
            .ok_or_else(|| DepotError::Internal(format!("tracking record {} was not created", key)))
    }

    /// Record for `key` from memory or disk, without creating one
    pub async fn get_record(&self, key: &TrackingKey) -> DepotResult<Option<TrackedContentRecord>> {
        self.with_record(key, false, |record| record.clone()).await
    }

    /// Whether a record exists in memory or on disk
    pub async fn has_record(&self, key: &TrackingKey) -> DepotResult<bool> {
        let cell = self.slots().get(key.id()).map(|slot| slot.cell.clone());
        if let Some(cell) = cell {
            let guard = cell.lock().await;
            if !guard.retired && guard.record.is_some() {
                return Ok(true);
            }
        }
        self.persistence.exists(key).await
    }

    /// Drop a record from memory and disk; returns whether one existed
    pub async fn clear_record(&self, key: &TrackingKey) -> DepotResult<bool> {
        loop {
            let (cell, _) = self.slot_for(key.id(), false);
            let mut guard = cell.lock().await;
            if guard.retired {
                continue;
            }

            let live = guard.record.is_some();
            let deleted = self.persistence.delete(key).await;
            if deleted.is_ok() || !live {
                self.retire(key.id(), &cell, &mut guard);
            }
            let persisted = deleted?;

            if live || persisted {
                info!("Cleared tracking record {}", key);
            }
            return Ok(live || persisted);
        }
    }

    /// Evict every record idle past the timeout; returns how many were written out
    pub async fn sweep(&self) -> usize {
        self.evict_idle().await
    }

    /// Persist and drop every live record
    pub async fn flush_all(&self) -> DepotResult<usize> {
        let cells: Vec<(String, SharedCell)> = self
            .slots()
            .iter()
            .map(|(id, slot)| (id.clone(), slot.cell.clone()))
            .collect();

        let mut flushed = 0;
        for (id, cell) in cells {
            let mut guard = cell.lock().await;
            if guard.retired {
                continue;
            }
            if let Some(record) = guard.record.as_ref() {
                self.persistence.store(record).await?;
                flushed += 1;
            }
            self.retire(&id, &cell, &mut guard);
        }

        debug!("Flushed {} tracking record(s)", flushed);
        Ok(flushed)
    }

    /// Number of live (in-memory) records
    pub async fn live_count(&self) -> usize {
        self.slots().len()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run `apply` on the record for `key`, loading it from persistence or
    /// creating it first. Returns `None` when there is no record and
    /// `create` is false.
    async fn with_record<T>(
        &self,
        key: &TrackingKey,
        create: bool,
        apply: impl FnOnce(&mut TrackedContentRecord) -> T,
    ) -> DepotResult<Option<T>> {
        self.evict_idle().await;

        loop {
            let (cell, inserted) = self.slot_for(key.id(), true);
            if inserted {
                self.make_room(key.id()).await;
            }

            let mut guard = cell.lock().await;
            if guard.retired {
                continue;
            }

            if guard.record.is_none() {
                match self.persistence.load(key).await {
                    Ok(Some(record)) => {
                        debug!("Reloaded cold tracking record {}", key);
                        guard.record = Some(record);
                    }
                    Ok(None) if create => {
                        debug!("Created tracking record {}", key);
                        guard.record = Some(TrackedContentRecord::new(key.clone()));
                    }
                    Ok(None) => {
                        self.retire(key.id(), &cell, &mut guard);
                        return Ok(None);
                    }
                    Err(e) => {
                        self.retire(key.id(), &cell, &mut guard);
                        return Err(e);
                    }
                }
            }

            return Ok(guard.record.as_mut().map(apply));
        }
    }

    /// Cell for `id`, inserting an empty slot if there is none. Returns
    /// whether the slot is new.
    fn slot_for(&self, id: &str, touch: bool) -> (SharedCell, bool) {
        let now = self.clock.now();
        let mut slots = self.slots();

        if let Some(slot) = slots.get_mut(id) {
            if touch {
                slot.last_access = now;
                slot.touches += 1;
            }
            return (slot.cell.clone(), false);
        }

        let cell = SharedCell::default();
        slots.insert(
            id.to_string(),
            Slot {
                cell: cell.clone(),
                last_access: now,
                touches: 0,
                evicting: false,
            },
        );
        (cell, true)
    }

    /// Remove the slot holding `cell`, if it is still the one mapped at `id`
    fn retire(&self, id: &str, cell: &SharedCell, guard: &mut Cell) {
        guard.record = None;
        guard.retired = true;

        let mut slots = self.slots();
        if slots.get(id).is_some_and(|slot| Arc::ptr_eq(&slot.cell, cell)) {
            slots.remove(id);
        }
    }

    /// Write out records idle past the timeout. Slots another caller is
    /// already evicting are skipped. A record whose write fails stays live
    /// and is retried on the next pass.
    async fn evict_idle(&self) -> usize {
        let now = self.clock.now();
        let expired: Vec<Victim> = self
            .slots()
            .iter_mut()
            .filter(|(_, slot)| !slot.evicting && elapsed(slot.last_access, now) >= self.timeout)
            .map(|(id, slot)| {
                slot.evicting = true;
                Victim {
                    id: id.clone(),
                    cell: slot.cell.clone(),
                    touches: slot.touches,
                }
            })
            .collect();

        let mut evicted = 0;
        for victim in expired {
            if matches!(self.evict(victim).await, Eviction::Evicted) {
                evicted += 1;
            }
        }

        if evicted > 0 {
            debug!("Evicted {} idle tracking record(s)", evicted);
        }
        evicted
    }

    /// Evict least recently used records until the map is back within
    /// bounds. `keep` is the slot just inserted by the caller.
    async fn make_room(&self, keep: &str) {
        loop {
            let victim = {
                let mut slots = self.slots();
                if slots.len() <= self.max_entries {
                    return;
                }
                let Some((id, slot)) = slots
                    .iter_mut()
                    .filter(|(id, slot)| id.as_str() != keep && !slot.evicting)
                    .min_by_key(|(_, slot)| slot.last_access)
                else {
                    return;
                };
                slot.evicting = true;
                Victim {
                    id: id.clone(),
                    cell: slot.cell.clone(),
                    touches: slot.touches,
                }
            };

            if let Eviction::Failed = self.evict(victim).await {
                warn!("Tracking cache above its limit of {} record(s)", self.max_entries);
                return;
            }
        }
    }

    async fn evict(&self, victim: Victim) -> Eviction {
        let mut guard = victim.cell.lock().await;
        if guard.retired {
            return Eviction::Evicted;
        }

        if let Some(record) = guard.record.as_ref() {
            if let Err(e) = self.persistence.store(record).await {
                warn!("Failed to persist tracking record {}: {}", victim.id, e);
                self.release(&victim);
                return Eviction::Failed;
            }
        }

        let touched = self
            .slots()
            .get(&victim.id)
            .is_some_and(|slot| Arc::ptr_eq(&slot.cell, &victim.cell) && slot.touches != victim.touches);
        if touched {
            debug!("Tracking record {} was accessed during eviction, keeping it", victim.id);
            self.release(&victim);
            return Eviction::Kept;
        }

        self.retire(&victim.id, &victim.cell, &mut guard);
        Eviction::Evicted
    }

    fn release(&self, victim: &Victim) {
        if let Some(slot) = self.slots().get_mut(&victim.id) {
            if Arc::ptr_eq(&slot.cell, &victim.cell) {
                slot.evicting = false;
            }
        }
    }
}
