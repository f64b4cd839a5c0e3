//! Recency Clock Module
//!
//! Logical clock used to order cache slots by last access.

use std::sync::atomic::{AtomicU64, Ordering};

// == Recency Clock ==
/// Hands out strictly increasing logical ticks.
///
/// Tick `0` is never issued, so a slot whose recency is `0` has never been
/// stored or hit.
#[derive(Debug, Default)]
pub struct RecencyClock {
    /// Last tick handed out
    last: AtomicU64,
}

impl RecencyClock {
    // == Constructor ==
    /// Creates a clock that has not issued any tick yet.
    pub fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    // == Tick ==
    /// Returns a fresh tick, greater than every tick returned before.
    pub fn tick(&self) -> u64 {
        self.last.fetch_add(1, Ordering::Relaxed) + 1
    }

    // == Current ==
    /// Returns the most recently issued tick without advancing.
    #[cfg(test)]
    pub(crate) fn current(&self) -> u64 {
        self.last.load(Ordering::Relaxed)
    }
}
