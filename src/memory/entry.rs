//! Cache Entry Module
//!
//! Defines the structure for individual stored entries with TTL support.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// A single stored payload with its expiry deadline.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored payload
    pub payload: Vec<u8>,
    /// When the entry was written
    pub created_at: Instant,
    /// Expiration deadline, None = no expiration
    pub expires_at: Option<Instant>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry. `ttl` of None means the entry never expires.
    pub fn new(payload: Vec<u8>, ttl: Option<Duration>) -> Self {
        Self::at(payload, Instant::now(), ttl)
    }

    /// Creates an entry written at `now`.
    ///
    /// A TTL too large to add to `now` is stored without expiry.
    pub fn at(payload: Vec<u8>, now: Instant, ttl: Option<Duration>) -> Self {
        Self {
            payload,
            created_at: now,
            expires_at: ttl.and_then(|ttl| now.checked_add(ttl)),
        }
    }

    // == Is Expired ==
    /// An entry is expired once `now` reaches its deadline, so a fully
    /// elapsed TTL is never readable.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(deadline) => now >= deadline,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns the TTL left at `now`, or None if no expiration is set.
    ///
    /// # Returns
    /// - `Some(Duration::ZERO)` if the TTL has elapsed
    /// - `Some(remaining)` if the entry hasn't expired
    /// - `None` if the entry never expires
    pub fn ttl_remaining_at(&self, now: Instant) -> Option<Duration> {
        self.expires_at
            .map(|deadline| deadline.saturating_duration_since(now))
    }
}
