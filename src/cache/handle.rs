//! Cache Handle Module
//!
//! The value application code holds: one backend plus the typed helpers and
//! compute-if-absent built on top of it.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::cache::backend::CacheBackend;
use crate::cache::flight::FlightTable;
use crate::cache::payload::{decode_json, Payload};
use crate::config::BackendKind;
use crate::error::Result;

// == Cache ==
/// Cloneable handle to a cache backend.
///
/// Clones share the backend and the per-key compute locks, so a handle
/// built once at startup can be passed to every consumer.
#[derive(Clone)]
pub struct Cache {
    backend: Arc<dyn CacheBackend>,
    flights: Arc<FlightTable>,
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("backend", &self.backend.kind())
            .field("in_flight", &self.flights.in_flight())
            .finish()
    }
}

impl Cache {
    pub fn new(backend: impl CacheBackend + 'static) -> Self {
        Self::from_arc(Arc::new(backend))
    }

    pub fn from_arc(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend,
            flights: Arc::new(FlightTable::new()),
        }
    }

    pub fn kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// True when both handles share the same backend instance.
    pub fn same_backend(&self, other: &Cache) -> bool {
        Arc::ptr_eq(&self.backend, &other.backend)
    }

    // == Reads ==
    pub async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.backend.get(key).await
    }

    pub async fn get_int64(&self, key: &str) -> Result<i64> {
        self.backend.get_int64(key).await
    }

    pub async fn get_value(&self, key: &str) -> Result<String> {
        self.backend.get_value(key).await
    }

    /// Decodes the stored JSON payload into `T`.
    pub async fn bind<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let bytes = self.backend.get(key).await?;
        decode_json(key, &bytes)
    }

    pub async fn exists(&self, key: &str) -> Result<bool> {
        self.backend.exists(key).await
    }

    // == Writes ==
    /// Stores an already-encoded payload, replacing any existing value.
    pub async fn set(&self, key: &str, payload: impl Into<Payload>, ttl: Duration) -> Result<()> {
        self.backend.set(key, payload.into(), ttl).await
    }

    /// Stores `text` verbatim.
    pub async fn set_text(&self, key: &str, text: &str, ttl: Duration) -> Result<()> {
        self.backend.set(key, Payload::text(text), ttl).await
    }

    /// Stores `value` as JSON. Nothing is written if encoding fails.
    pub async fn set_object<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<()> {
        let payload = Payload::json(value)?;
        self.backend.set(key, payload, ttl).await
    }

    pub async fn set_if_absent(
        &self,
        key: &str,
        payload: impl Into<Payload>,
        ttl: Duration,
    ) -> Result<bool> {
        self.backend.set_if_absent(key, payload.into(), ttl).await
    }

    pub async fn set_text_if_absent(&self, key: &str, text: &str, ttl: Duration) -> Result<bool> {
        self.backend.set_if_absent(key, Payload::text(text), ttl).await
    }

    pub async fn set_object_if_absent<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<bool> {
        let payload = Payload::json(value)?;
        self.backend.set_if_absent(key, payload, ttl).await
    }

    pub async fn del(&self, key: &str) -> Result<()> {
        self.backend.del(key).await
    }

    pub async fn del_all(&self) -> Result<()> {
        self.backend.del_all().await
    }

    // == Compute If Absent ==
    /// Runs `compute` only if `key` is absent, then returns the stored payload.
    ///
    /// `compute` is expected to store `key` through this handle. Concurrent
    /// callers for the same key wait for the running computation and read
    /// its result instead of computing again. A failing `compute` is returned
    /// as `CacheError::Compute` and the next waiter gets to try.
    pub async fn remember<F, Fut>(&self, key: &str, compute: F) -> Result<Vec<u8>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        self.fill_if_absent(key, compute).await?;
        self.backend.get(key).await
    }

    /// Same as [`Cache::remember`], decoding the result as JSON.
    pub async fn remember_bind<T, F, Fut>(&self, key: &str, compute: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        self.fill_if_absent(key, compute).await?;
        self.bind(key).await
    }

    async fn fill_if_absent<F, Fut>(&self, key: &str, compute: F) -> Result<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        if self.backend.exists(key).await? {
            return Ok(());
        }

        let _flight = self.flights.acquire(key).await;

        // Another caller may have filled the key while we waited
        if self.backend.exists(key).await? {
            debug!(key, "compute skipped, filled by concurrent caller");
            return Ok(());
        }

        debug!(key, "cache miss, computing");
        compute().await?;
        Ok(())
    }
}
