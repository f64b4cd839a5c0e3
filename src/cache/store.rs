//! Cache Store Module
//!
//! The shared response cache: a fixed array of slots plus LRU placement.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

use crate::cache::{CacheSlot, CacheStats, ReadAccess, RecencyClock, CACHE_SLOTS, MAX_OBJECT_SIZE};
use crate::error::{CacheError, CacheResult};

// == Store Outcome ==
/// What a successful `store` did to the slot array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOutcome {
    /// An empty slot was claimed
    Inserted { index: usize },
    /// The slot already holding this URL was overwritten
    Replaced { index: usize },
    /// The least recently used entry was evicted to make room
    Evicted { index: usize, evicted_url: String },
}

impl StoreOutcome {
    /// Index of the slot that now holds the stored entry.
    pub fn index(&self) -> usize {
        match self {
            StoreOutcome::Inserted { index }
            | StoreOutcome::Replaced { index }
            | StoreOutcome::Evicted { index, .. } => *index,
        }
    }
}

// == Entry Snapshot ==
/// Metadata of one occupied slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySnapshot {
    pub index: usize,
    pub url: String,
    pub size: usize,
    pub recency: u64,
}

// == Response Cache ==
/// Bounded, concurrency-safe map from URL to cached response bytes.
///
/// Slot contents are read through [`ResponseCache::acquire_read`] and
/// changed only by [`ResponseCache::store`]. Placement decisions are
/// serialized so that occupied URLs stay pairwise distinct.
#[derive(Debug)]
pub struct ResponseCache {
    /// Fixed slot array, never resized
    slots: Box<[CacheSlot]>,
    /// Source of recency ticks
    clock: RecencyClock,
    /// Number of occupied slots
    occupied: AtomicUsize,
    /// Held for the whole of a store, from slot choice to write
    placement: AsyncMutex<()>,
    /// Performance statistics
    stats: Mutex<CacheStats>,
    /// Largest payload accepted by `store`
    max_object_size: usize,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(CACHE_SLOTS, MAX_OBJECT_SIZE)
    }
}

impl ResponseCache {
    // == Constructor ==
    /// Creates an empty cache.
    ///
    /// # Arguments
    /// * `capacity` - Number of slots; at least one slot is always allocated
    /// * `max_object_size` - Largest payload `store` accepts, in bytes
    pub fn new(capacity: usize, max_object_size: usize) -> Self {
        let slots = (0..capacity.max(1)).map(|_| CacheSlot::new()).collect();
        Self {
            slots,
            clock: RecencyClock::new(),
            occupied: AtomicUsize::new(0),
            placement: AsyncMutex::new(()),
            stats: Mutex::new(CacheStats::new()),
            max_object_size,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn max_object_size(&self) -> usize {
        self.max_object_size
    }

    /// Returns the current number of occupied slots.
    pub fn len(&self) -> usize {
        self.occupied.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // == Find ==
    /// Returns the index of the slot holding `url`.
    ///
    /// This is a hint, not a lock: the slot may be rewritten before the
    /// caller enters it with `acquire_read`.
    pub fn find(&self, url: &str) -> Option<usize> {
        self.slots.iter().position(|slot| slot.holds(url))
    }

    // == Acquire Read ==
    /// Enters slot `index` as a reader.
    ///
    /// The returned guard snapshots the slot under read access; the slot is
    /// not rewritten until the guard is released.
    pub async fn acquire_read(&self, index: usize) -> CacheResult<ReadAccess<'_>> {
        let slot = self
            .slots
            .get(index)
            .ok_or(CacheError::SlotOutOfRange(index))?;
        slot.acquire_read(index).await
    }

    // == Release Read ==
    /// Leaves the reader group of the slot `access` was taken on.
    pub fn release_read(&self, access: ReadAccess<'_>) {
        access.release();
    }

    // == Lookup ==
    /// Finds `url`, enters its slot and confirms it still holds `url`.
    ///
    /// A confirmed hit refreshes the slot's recency. Hits and misses are
    /// counted in the statistics.
    pub async fn lookup(&self, url: &str) -> Option<ReadAccess<'_>> {
        let access = match self.find(url) {
            Some(index) => self.acquire_read(index).await.ok(),
            None => None,
        };

        match access {
            Some(access) if access.holds(url) => {
                self.slots[access.index()].touch(self.clock.tick());
                self.lock_stats().record_hit();
                Some(access)
            }
            _ => {
                self.lock_stats().record_miss();
                None
            }
        }
    }

    // == Store ==
    /// Caches `payload` under `url`.
    ///
    /// Payloads above the object size limit are rejected without touching
    /// any slot. Otherwise the slot already holding `url` is overwritten,
    /// else an empty slot is claimed, else the least recently used entry is
    /// evicted. The write waits for the chosen slot's readers to leave.
    pub async fn store(&self, url: impl Into<String>, payload: Bytes) -> CacheResult<StoreOutcome> {
        let url = url.into();

        if payload.len() > self.max_object_size {
            self.lock_stats().record_rejection();
            return Err(CacheError::ObjectTooLarge {
                size: payload.len(),
                limit: self.max_object_size,
            });
        }

        let _placement = self.placement.lock().await;

        let outcome = self.choose_slot(&url);
        let index = outcome.index();
        let size = payload.len();

        self.slots[index]
            .write(url.clone(), payload, &self.clock)
            .await?;

        if let StoreOutcome::Inserted { .. } = outcome {
            self.occupied.fetch_add(1, Ordering::AcqRel);
        }

        {
            let mut stats = self.lock_stats();
            stats.record_store();
            if let StoreOutcome::Evicted { .. } = outcome {
                stats.record_eviction();
            }
        }

        match &outcome {
            StoreOutcome::Evicted { evicted_url, .. } => {
                debug!(url = %url, evicted = %evicted_url, slot = index, size, "Cache eviction")
            }
            _ => debug!(url = %url, slot = index, size, "Cached response"),
        }

        Ok(outcome)
    }

    /// Picks the slot for `url`. Must be called with `placement` held.
    fn choose_slot(&self, url: &str) -> StoreOutcome {
        if let Some(index) = self.find(url) {
            return StoreOutcome::Replaced { index };
        }

        if let Some(index) = self.slots.iter().position(|slot| !slot.is_occupied()) {
            return StoreOutcome::Inserted { index };
        }

        // Every slot is occupied here, and only `store` changes occupancy.
        let (index, victim) = self
            .slots
            .iter()
            .enumerate()
            .min_by_key(|(_, slot)| slot.recency())
            .map(|(index, slot)| (index, slot.peek()))
            .unwrap_or_else(|| (0, self.slots[0].peek()));

        StoreOutcome::Evicted {
            index,
            evicted_url: victim.url,
        }
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.lock_stats().clone();
        stats.set_total_entries(self.len());
        stats
    }

    // == Entries ==
    /// Returns metadata of every occupied slot, most recently used first.
    pub fn entries(&self) -> Vec<EntrySnapshot> {
        let mut entries: Vec<EntrySnapshot> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                let content = slot.peek();
                content.occupied.then(|| EntrySnapshot {
                    index,
                    url: content.url,
                    size: content.payload.len(),
                    recency: slot.recency(),
                })
            })
            .collect();
        entries.sort_by(|a, b| b.recency.cmp(&a.recency));
        entries
    }

    /// Returns metadata of the entry cached under `url`.
    pub fn entry(&self, url: &str) -> CacheResult<EntrySnapshot> {
        self.entries()
            .into_iter()
            .find(|entry| entry.url == url)
            .ok_or_else(|| CacheError::NotFound(url.to_string()))
    }

    fn lock_stats(&self) -> MutexGuard<'_, CacheStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
