//! Deferred sweep of expired cache entries.
//!
//! Runs once, a few seconds after startup, so the sweep never competes with
//! the first round of reads.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use super::store::CacheStore;

/// Delay before the startup sweep runs.
pub const DEFAULT_SWEEP_DELAY: Duration = Duration::from_secs(5);

/// Spawn a task that sleeps for `delay` and then clears expired entries.
///
/// The returned handle can be aborted during shutdown or awaited for the
/// number of removed entries.
pub fn spawn_janitor(cache: Arc<CacheStore>, delay: Duration) -> JoinHandle<usize> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let removed = cache.clear_expired();
        debug!(removed = removed, "Startup cache sweep finished");
        removed
    })
}
