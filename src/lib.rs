//! kvcache - A process-wide cache with embedded and Redis backends
//!
//! Application code holds a [`Cache`] handle and never needs to know whether
//! values live in the in-process store or in an external Redis service.

pub mod cache;
pub mod config;
pub mod error;
pub mod memory;
pub mod registry;
pub mod remote;
pub mod tasks;

pub use cache::{Cache, CacheBackend, Payload, NO_EXPIRY};
pub use config::{BackendKind, CacheConfig, RedisConfig};
pub use error::{CacheError, Result};
pub use memory::MemoryCache;
pub use registry::CacheRegistry;
pub use remote::RemoteCache;
