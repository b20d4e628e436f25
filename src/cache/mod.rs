//! Cache Module
//!
//! The cache contract shared by every backend, the serialization policy,
//! and the [`Cache`] handle application code depends on.

mod backend;
mod flight;
mod handle;
mod payload;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use backend::CacheBackend;
pub use flight::{FlightGuard, FlightTable};
pub use handle::Cache;
pub use payload::Payload;

pub(crate) use backend::effective_ttl;

// == Public Constants ==
/// TTL meaning "never expires"
pub const NO_EXPIRY: std::time::Duration = std::time::Duration::ZERO;
