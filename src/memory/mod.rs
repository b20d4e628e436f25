//! Embedded Backend
//!
//! In-process cache over a transactional ordered store. Entries live only
//! as long as the process.

mod entry;
mod stats;
mod store;

pub use entry::CacheEntry;
pub use stats::CacheStats;
pub use store::{MemoryDb, ReadTx, WriteTx};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::cache::{effective_ttl, CacheBackend, Payload};
use crate::config::BackendKind;
use crate::error::{CacheError, Result};
use crate::tasks::spawn_expiry_sweeper;

// == Memory Cache ==
/// Embedded backend. `set` always overwrites; expiry is enforced by the store.
#[derive(Debug, Default)]
pub struct MemoryCache {
    db: Arc<MemoryDb>,
    /// Serializes `del` / `del_all`
    delete_lock: Mutex<()>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a background sweep of expired entries. Requires a Tokio runtime.
    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        spawn_expiry_sweeper(Arc::downgrade(&self.db), interval)
    }

    /// Remaining TTL of a live entry. `None` means it never expires.
    pub fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        self.db
            .view(|tx| Ok(tx.ttl(key)))?
            .ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    pub fn stats(&self) -> CacheStats {
        self.db.stats()
    }

    /// Direct access to the underlying store.
    pub fn db(&self) -> &MemoryDb {
        &self.db
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.db.view(|tx| tx.get(key).map(<[u8]>::to_vec))
    }

    async fn set(&self, key: &str, payload: Payload, ttl: Duration) -> Result<()> {
        let ttl = effective_ttl(ttl);
        let replaced = self.db.update(|tx| Ok(tx.set(key, payload.into_bytes(), ttl)))?;
        debug!(key, replaced, ?ttl, "memory cache set");
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, payload: Payload, ttl: Duration) -> Result<bool> {
        let ttl = effective_ttl(ttl);
        self.db.update(|tx| {
            if tx.exists(key) {
                return Ok(false);
            }
            tx.set(key, payload.into_bytes(), ttl);
            Ok(true)
        })
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.db.view(|tx| Ok(tx.exists(key)))
    }

    async fn del(&self, key: &str) -> Result<()> {
        let _guard = self.delete_lock.lock();
        match self.db.update(|tx| tx.delete(key)) {
            Ok(_) | Err(CacheError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn del_all(&self) -> Result<()> {
        let _guard = self.delete_lock.lock();
        self.db.update(|tx| {
            tx.delete_all();
            Ok(())
        })?;
        debug!("memory cache cleared");
        Ok(())
    }
}
