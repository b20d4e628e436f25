//! Backend Registry
//!
//! Owns the two logical caches of a process: the configurable default cache
//! and the always-embedded auxiliary cache. Each is built once and shared.

use std::sync::OnceLock;

use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::cache::Cache;
use crate::config::{BackendKind, CacheConfig};
use crate::error::Result;
use crate::memory::MemoryCache;
use crate::remote::RemoteCache;

// == Cache Registry ==
/// Memoizes one backend per logical cache.
///
/// Construct it once at startup and hand it (or the caches it returns) to
/// consumers. Concurrent first calls share a single construction.
#[derive(Debug)]
pub struct CacheRegistry {
    config: CacheConfig,
    default: OnceCell<Cache>,
    auxiliary: OnceLock<Cache>,
}

impl CacheRegistry {
    /// Creates a registry without opening any backend.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            default: OnceCell::new(),
            auxiliary: OnceLock::new(),
        }
    }

    /// Creates a registry and builds the default cache immediately, so an
    /// unreachable Redis fails startup instead of the first request.
    pub async fn connect(config: CacheConfig) -> Result<Self> {
        let registry = Self::new(config);
        registry.default_cache().await?;
        Ok(registry)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The default cache, built on first use from `config.backend`.
    ///
    /// A failed construction is not memoized; the next call retries.
    pub async fn default_cache(&self) -> Result<Cache> {
        let cache = self.default.get_or_try_init(|| self.build_default()).await?;
        Ok(cache.clone())
    }

    /// The auxiliary cache: always embedded, regardless of configuration.
    pub fn auxiliary_cache(&self) -> Cache {
        self.auxiliary
            .get_or_init(|| self.build_memory("auxiliary"))
            .clone()
    }

    async fn build_default(&self) -> Result<Cache> {
        match self.config.backend {
            BackendKind::Memory => Ok(self.build_memory("default")),
            BackendKind::Redis => {
                let remote = RemoteCache::connect(&self.config.redis).await?;
                info!(namespace = remote.namespace(), "Default cache using Redis");
                Ok(Cache::new(remote))
            }
        }
    }

    fn build_memory(&self, name: &str) -> Cache {
        let memory = MemoryCache::new();

        match (self.config.sweep_interval(), tokio::runtime::Handle::try_current()) {
            (Some(interval), Ok(_)) => {
                // The sweeper exits on its own once the store is dropped
                memory.spawn_sweeper(interval);
            }
            (Some(_), Err(_)) => {
                debug!(cache = name, "No Tokio runtime, expiry sweep disabled");
            }
            (None, _) => {}
        }

        info!(cache = name, "Embedded cache initialized");
        Cache::new(memory)
    }
}
