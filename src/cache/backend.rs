//! Backend Trait
//!
//! Object-safe operation set implemented by every cache backend.

use std::time::Duration;

use async_trait::async_trait;

use crate::cache::payload::{decode_int64, decode_text, Payload};
use crate::config::BackendKind;
use crate::error::Result;

/// Primitive cache operations shared by the embedded and networked backends.
///
/// A `ttl` of zero means the entry never expires. `set` always replaces the
/// current value; `set_if_absent` is the only conditional write.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Returns the stored payload, or `NotFound` if absent or expired.
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Parses the payload as a base-10 integer. Non-numeric content is a
    /// `Decode` error, never a silent zero.
    async fn get_int64(&self, key: &str) -> Result<i64> {
        let bytes = self.get(key).await?;
        decode_int64(key, &bytes)
    }

    /// Returns the payload as text. A miss is `NotFound`, not an empty string.
    async fn get_value(&self, key: &str) -> Result<String> {
        let bytes = self.get(key).await?;
        decode_text(key, bytes)
    }

    async fn set(&self, key: &str, payload: Payload, ttl: Duration) -> Result<()>;

    /// Writes only when no live entry exists. Returns whether it wrote.
    async fn set_if_absent(&self, key: &str, payload: Payload, ttl: Duration) -> Result<bool>;

    async fn exists(&self, key: &str) -> Result<bool>;

    /// Deleting an absent key succeeds.
    async fn del(&self, key: &str) -> Result<()>;

    /// Removes every key in this backend's keyspace.
    async fn del_all(&self) -> Result<()>;
}

/// `None` when `ttl` is zero, matching the "no expiration" convention.
pub(crate) fn effective_ttl(ttl: Duration) -> Option<Duration> {
    (!ttl.is_zero()).then_some(ttl)
}
