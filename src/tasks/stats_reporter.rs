//! Cache Statistics Reporter
//!
//! Background task that periodically logs cache statistics.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use crate::cache::ResponseCache;

/// Spawns a task that logs cache statistics every `interval_secs` seconds.
///
/// Returns `None` when `interval_secs` is 0. The handle can be aborted
/// during shutdown.
pub fn spawn_stats_reporter(
    cache: Arc<ResponseCache>,
    interval_secs: u64,
) -> Option<JoinHandle<()>> {
    if interval_secs == 0 {
        return None;
    }
    let period = Duration::from_secs(interval_secs);

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let stats = cache.stats();
            info!(
                entries = stats.total_entries,
                capacity = cache.capacity(),
                hits = stats.hits,
                misses = stats.misses,
                evictions = stats.evictions,
                rejected = stats.rejected,
                hit_rate = stats.hit_rate(),
                "Cache statistics"
            );
        }
    }))
}
