//! Flight Table Module
//!
//! Per-key async locks so concurrent compute-if-absent calls for the same
//! key run the compute step once.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Slot = Arc<AsyncMutex<()>>;

// == Flight Table ==
/// Lock table keyed by cache key.
///
/// A slot is removed when its last holder releases it. A waiter cancelled
/// after that release can leave an unused slot behind; `acquire` prunes those.
#[derive(Debug, Default)]
pub struct FlightTable {
    slots: Arc<Mutex<HashMap<String, Slot>>>,
}

impl FlightTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other caller holds `key`, then holds it until the
    /// returned guard is dropped.
    pub async fn acquire(&self, key: &str) -> FlightGuard {
        let slot = {
            let mut slots = self.slots.lock();
            // Held and awaited slots have clones outside the map
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            slots.entry(key.to_string()).or_default().clone()
        };

        let guard = slot.lock_owned().await;

        FlightGuard {
            key: key.to_string(),
            slots: Arc::clone(&self.slots),
            guard: Some(guard),
        }
    }

    /// Number of keys with a live slot.
    pub fn in_flight(&self) -> usize {
        self.slots.lock().len()
    }
}

// == Flight Guard ==
/// Releases its key on drop and removes the slot once nobody else wants it.
#[derive(Debug)]
pub struct FlightGuard {
    key: String,
    slots: Arc<Mutex<HashMap<String, Slot>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        // Slots are cloned only under this lock, so the count check is stable
        let mut slots = self.slots.lock();
        self.guard.take();

        let unused = slots
            .get(&self.key)
            .is_some_and(|slot| Arc::strong_count(slot) == 1);
        if unused {
            slots.remove(&self.key);
        }
    }
}
