//! Cache Slot Module
//!
//! One fixed storage unit of the response cache, guarded by a
//! readers-preference reader/writer protocol.
//!
//! Readers register in a shared count. The first reader to arrive takes the
//! slot's write gate and the last one to leave gives it back, so a writer
//! only gets in once every reader present when it asked has left. Readers
//! arriving while a writer waits still join the active group; writers can
//! therefore be delayed indefinitely under a steady stream of readers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use bytes::Bytes;
use tokio::sync::{Mutex as AsyncMutex, OwnedSemaphorePermit, Semaphore};

use crate::cache::clock::RecencyClock;
use crate::error::{CacheError, CacheResult};

// == Slot Content ==
/// The URL/payload pair held by a slot.
#[derive(Debug, Clone, Default)]
pub(crate) struct SlotContent {
    /// Request target the payload was fetched for
    pub url: String,
    /// Raw response bytes, explicit length
    pub payload: Bytes,
    /// Whether the slot holds an entry
    pub occupied: bool,
}

// == Reader Registry ==
#[derive(Debug, Default)]
struct Readers {
    /// Number of readers currently holding the slot
    active: usize,
    /// Write gate held on behalf of the whole reader group
    gate_permit: Option<OwnedSemaphorePermit>,
}

// == Cache Slot ==
#[derive(Debug)]
pub struct CacheSlot {
    /// Stored entry; mutated only while the write gate is held
    content: RwLock<SlotContent>,
    /// Logical time of the last store or hit
    recency: AtomicU64,
    /// Reader count and the gate permit the group holds
    readers: Mutex<Readers>,
    /// Serializes reader entry while the first reader waits for the gate
    entry: AsyncMutex<()>,
    /// Exclusive write access, one permit
    gate: Arc<Semaphore>,
}

impl Default for CacheSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheSlot {
    // == Constructor ==
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self {
            content: RwLock::new(SlotContent::default()),
            recency: AtomicU64::new(0),
            readers: Mutex::new(Readers::default()),
            entry: AsyncMutex::new(()),
            gate: Arc::new(Semaphore::new(1)),
        }
    }

    // == Peek ==
    /// Reads the content outside the reader protocol.
    ///
    /// The result is a hint only: the slot may be rewritten right after.
    pub(crate) fn peek(&self) -> SlotContent {
        self.content
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns true if the slot currently holds `url`, outside the protocol.
    pub(crate) fn holds(&self, url: &str) -> bool {
        let content = self.content.read().unwrap_or_else(PoisonError::into_inner);
        content.occupied && content.url == url
    }

    /// Returns true if the slot currently holds an entry.
    pub(crate) fn is_occupied(&self) -> bool {
        self.content
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .occupied
    }

    // == Recency ==
    /// Logical time of the last store or hit.
    pub fn recency(&self) -> u64 {
        self.recency.load(Ordering::Acquire)
    }

    /// Marks the slot as accessed at `tick`.
    pub(crate) fn touch(&self, tick: u64) {
        self.recency.fetch_max(tick, Ordering::AcqRel);
    }

    /// Number of readers currently inside the slot.
    #[cfg(test)]
    pub(crate) fn active_readers(&self) -> usize {
        self.lock_readers().active
    }

    // == Acquire Read ==
    /// Enters the slot as a reader.
    ///
    /// Waits only if no reader is active and a writer holds the gate.
    pub(crate) async fn acquire_read(&self, index: usize) -> CacheResult<ReadAccess<'_>> {
        let _entry = self.entry.lock().await;

        let joined = {
            let mut readers = self.lock_readers();
            if readers.active > 0 {
                readers.active += 1;
                true
            } else {
                false
            }
        };

        if !joined {
            // Holding `entry` keeps other readers out until the group owns the gate.
            let permit = self
                .gate
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| CacheError::Closed)?;
            let mut readers = self.lock_readers();
            readers.active += 1;
            readers.gate_permit = Some(permit);
        }

        let content = self.peek();
        Ok(ReadAccess {
            slot: self,
            index,
            content,
        })
    }

    // == Release Read ==
    fn release_read(&self) {
        let mut readers = self.lock_readers();
        readers.active = readers.active.saturating_sub(1);
        if readers.active == 0 {
            readers.gate_permit.take();
        }
    }

    // == Write ==
    /// Replaces the slot content under exclusive access.
    ///
    /// Waits until no reader holds the slot. The recency tick is drawn from
    /// `clock` only once exclusive access is held, so it is newer than every
    /// hit recorded while the write was waiting.
    pub(crate) async fn write(
        &self,
        url: String,
        payload: Bytes,
        clock: &RecencyClock,
    ) -> CacheResult<u64> {
        let _permit = self.gate.acquire().await.map_err(|_| CacheError::Closed)?;
        let tick = clock.tick();

        {
            let mut content = self.content.write().unwrap_or_else(PoisonError::into_inner);
            content.url = url;
            content.payload = payload;
            content.occupied = true;
        }
        self.touch(tick);

        Ok(tick)
    }

    fn lock_readers(&self) -> MutexGuard<'_, Readers> {
        self.readers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// == Read Access ==
/// Shared access to one slot.
///
/// The slot cannot be rewritten while this guard is alive. Dropping it (or
/// calling [`ReadAccess::release`]) leaves the reader group.
#[derive(Debug)]
pub struct ReadAccess<'a> {
    slot: &'a CacheSlot,
    index: usize,
    content: SlotContent,
}

impl ReadAccess<'_> {
    /// Index of the slot within the cache.
    pub fn index(&self) -> usize {
        self.index
    }

    /// URL stored in the slot, or `None` if the slot is empty.
    pub fn url(&self) -> Option<&str> {
        self.content.occupied.then_some(self.content.url.as_str())
    }

    /// The cached response bytes.
    pub fn payload(&self) -> &Bytes {
        &self.content.payload
    }

    /// Returns true if the slot holds `url`.
    ///
    /// Callers that located the slot with `find` must check this before
    /// trusting the payload.
    pub fn holds(&self, url: &str) -> bool {
        self.url() == Some(url)
    }

    /// Leaves the reader group.
    pub fn release(self) {}
}

impl Drop for ReadAccess<'_> {
    fn drop(&mut self) {
        self.slot.release_read();
    }
}
