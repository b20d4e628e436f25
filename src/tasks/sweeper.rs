//! Expiry Sweep Task
//!
//! Background task that periodically removes expired entries from an
//! embedded store. Reads already treat expired entries as absent; the sweep
//! only reclaims their memory.

use std::sync::Weak;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::memory::MemoryDb;

/// Spawns a task that sweeps `db` every `interval`.
///
/// The task holds only a weak reference and stops on its own once the
/// store is dropped. The returned handle can be used to abort it earlier.
///
/// # Example
/// ```ignore
/// let cache = MemoryCache::new();
/// let handle = cache.spawn_sweeper(Duration::from_secs(1));
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_expiry_sweeper(db: Weak<MemoryDb>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting expiry sweep task with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let Some(store) = db.upgrade() else {
                debug!("Store dropped, stopping expiry sweep");
                break;
            };

            let removed = store.sweep_expired();
            if removed > 0 {
                info!("Expiry sweep: removed {} expired entries", removed);
            } else {
                debug!("Expiry sweep: no expired entries found");
            }
        }
    })
}
