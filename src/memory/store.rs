//! Memory Store Module
//!
//! Ordered in-process key-value store with read and write transactions.
//! Writers are exclusive, readers run concurrently, and expiry is enforced
//! on every read.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};

use crate::error::{CacheError, Result};
use crate::memory::{CacheEntry, CacheStats};

// == Memory Db ==
/// Transactional store backing the embedded cache.
#[derive(Debug, Default)]
pub struct MemoryDb {
    /// Key-value storage, ordered by key
    entries: RwLock<BTreeMap<String, CacheEntry>>,
    /// Activity counters
    stats: Mutex<CacheStats>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    // == View ==
    /// Runs `f` in a read-only transaction.
    pub fn view<T>(&self, f: impl FnOnce(&ReadTx<'_>) -> Result<T>) -> Result<T> {
        let entries = self.entries.read();
        let tx = ReadTx {
            entries: &entries,
            stats: &self.stats,
            now: Instant::now(),
        };
        f(&tx)
    }

    // == Update ==
    /// Runs `f` in a read-write transaction.
    ///
    /// Writes are buffered and applied only if `f` returns `Ok`; on error the
    /// store is left exactly as it was.
    pub fn update<T>(&self, f: impl FnOnce(&mut WriteTx<'_>) -> Result<T>) -> Result<T> {
        let mut entries = self.entries.write();
        let mut tx = WriteTx {
            base: &entries,
            cleared: false,
            pending: BTreeMap::new(),
            now: Instant::now(),
        };

        let out = f(&mut tx)?;
        let (cleared, pending) = (tx.cleared, tx.pending);

        if cleared {
            entries.clear();
        }
        let mut writes = 0;
        for (key, slot) in pending {
            match slot {
                Some(entry) => {
                    writes += 1;
                    entries.insert(key, entry);
                }
                None => {
                    entries.remove(&key);
                }
            }
        }

        let mut stats = self.stats.lock();
        stats.record_writes(writes);
        stats.set_total_entries(entries.len());

        Ok(out)
    }

    // == Sweep Expired ==
    /// Removes all expired entries. Returns the number removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();

        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        let removed = before - entries.len();

        let mut stats = self.stats.lock();
        stats.record_expired(removed as u64);
        stats.set_total_entries(entries.len());
        removed
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStats {
        let total = self.entries.read().len();
        let mut stats = self.stats.lock().clone();
        stats.set_total_entries(total);
        stats
    }

    /// Stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

// == Read Transaction ==
/// Read-only view of the store at one point in time.
pub struct ReadTx<'a> {
    entries: &'a BTreeMap<String, CacheEntry>,
    stats: &'a Mutex<CacheStats>,
    now: Instant,
}

impl ReadTx<'_> {
    /// Returns the live payload at `key`.
    pub fn get(&self, key: &str) -> Result<&[u8]> {
        match self.live(key) {
            Some(entry) => {
                self.stats.lock().record_hit();
                Ok(&entry.payload)
            }
            None => {
                self.stats.lock().record_miss();
                Err(CacheError::NotFound(key.to_string()))
            }
        }
    }

    pub fn exists(&self, key: &str) -> bool {
        self.live(key).is_some()
    }

    /// Remaining TTL of a live entry; `Some(None)` means it never expires.
    pub fn ttl(&self, key: &str) -> Option<Option<Duration>> {
        self.live(key).map(|entry| entry.ttl_remaining_at(self.now))
    }

    fn live(&self, key: &str) -> Option<&CacheEntry> {
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired_at(self.now))
    }
}

// == Write Transaction ==
/// Buffered read-write view. Reads observe the transaction's own writes.
pub struct WriteTx<'a> {
    base: &'a BTreeMap<String, CacheEntry>,
    cleared: bool,
    /// None marks a deletion
    pending: BTreeMap<String, Option<CacheEntry>>,
    now: Instant,
}

impl WriteTx<'_> {
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.live(key).map(|entry| entry.payload.as_slice())
    }

    pub fn exists(&self, key: &str) -> bool {
        self.live(key).is_some()
    }

    /// Stores `payload`, replacing any live value. Returns true if one was
    /// replaced.
    pub fn set(&mut self, key: &str, payload: Vec<u8>, ttl: Option<Duration>) -> bool {
        let replaced = self.exists(key);
        let entry = CacheEntry::at(payload, self.now, ttl);
        self.pending.insert(key.to_string(), Some(entry));
        replaced
    }

    /// Deletes `key`, failing with `NotFound` if there is no live entry.
    pub fn delete(&mut self, key: &str) -> Result<Vec<u8>> {
        let payload = self
            .get(key)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| CacheError::NotFound(key.to_string()))?;
        self.pending.insert(key.to_string(), None);
        Ok(payload)
    }

    pub fn delete_all(&mut self) {
        self.cleared = true;
        self.pending.clear();
    }

    fn live(&self, key: &str) -> Option<&CacheEntry> {
        let entry = match self.pending.get(key) {
            Some(slot) => slot.as_ref(),
            None if self.cleared => None,
            None => self.base.get(key),
        };
        entry.filter(|entry| !entry.is_expired_at(self.now))
    }
}
