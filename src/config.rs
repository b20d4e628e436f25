//! Configuration Module
//!
//! Handles loading cache configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// Backend used by the default cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Embedded in-process store (default)
    #[default]
    Memory,
    /// External Redis service
    Redis,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "redis" => Ok(BackendKind::Redis),
            other => Err(format!("unknown cache backend '{}'", other)),
        }
    }
}

/// Connection parameters for the Redis backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Server address as `host:port`
    pub addr: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Logical database index
    pub db: i64,
    /// Prefix owned by this application; `del_all` only touches keys under it
    pub namespace: String,
    /// Timeout for establishing the connection, in milliseconds
    pub connect_timeout_ms: u64,
    /// Timeout for a single round trip, in milliseconds
    pub response_timeout_ms: u64,
}

impl RedisConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:6379".to_string(),
            username: None,
            password: None,
            db: 0,
            namespace: "kvcache".to_string(),
            connect_timeout_ms: 2000,
            response_timeout_ms: 2000,
        }
    }
}

/// Cache configuration read once at process start.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Backend for the default cache; the auxiliary cache is always embedded
    pub backend: BackendKind,
    pub redis: RedisConfig,
    /// Expiry sweep interval for embedded stores in milliseconds, 0 disables it
    pub sweep_interval_ms: u64,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_BACKEND` - `memory` or `redis` (default: memory)
    /// - `REDIS_ADDR` - Redis address (default: 127.0.0.1:6379)
    /// - `REDIS_USERNAME`, `REDIS_PASSWORD` - Credentials (default: none)
    /// - `REDIS_DB` - Logical database index (default: 0)
    /// - `REDIS_NAMESPACE` - Key prefix (default: kvcache)
    /// - `REDIS_CONNECT_TIMEOUT_MS` - Connection timeout (default: 2000)
    /// - `REDIS_RESPONSE_TIMEOUT_MS` - Round-trip timeout (default: 2000)
    /// - `CACHE_SWEEP_INTERVAL_MS` - Expiry sweep interval (default: 1000)
    pub fn from_env() -> Self {
        let redis_defaults = RedisConfig::default();

        let backend = match env::var("CACHE_BACKEND") {
            Ok(raw) => raw.parse().unwrap_or_else(|err: String| {
                tracing::warn!("{}, falling back to memory", err);
                BackendKind::Memory
            }),
            Err(_) => BackendKind::Memory,
        };

        Self {
            backend,
            redis: RedisConfig {
                addr: env::var("REDIS_ADDR").unwrap_or(redis_defaults.addr),
                username: env::var("REDIS_USERNAME").ok().filter(|v| !v.is_empty()),
                password: env::var("REDIS_PASSWORD").ok().filter(|v| !v.is_empty()),
                db: parse_env("REDIS_DB").unwrap_or(redis_defaults.db),
                namespace: env::var("REDIS_NAMESPACE").unwrap_or(redis_defaults.namespace),
                connect_timeout_ms: parse_env("REDIS_CONNECT_TIMEOUT_MS")
                    .unwrap_or(redis_defaults.connect_timeout_ms),
                response_timeout_ms: parse_env("REDIS_RESPONSE_TIMEOUT_MS")
                    .unwrap_or(redis_defaults.response_timeout_ms),
            },
            sweep_interval_ms: parse_env("CACHE_SWEEP_INTERVAL_MS").unwrap_or(1000),
        }
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_ms > 0).then(|| Duration::from_millis(self.sweep_interval_ms))
    }
}

fn parse_env<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.backend, BackendKind::Memory);
        assert_eq!(config.redis.addr, "127.0.0.1:6379");
        assert_eq!(config.redis.db, 0);
        assert_eq!(config.redis.namespace, "kvcache");
        assert!(config.sweep_interval().is_none());
    }

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!("redis".parse::<BackendKind>().unwrap(), BackendKind::Redis);
        assert_eq!(" Memory ".parse::<BackendKind>().unwrap(), BackendKind::Memory);
        assert!("memcached".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("CACHE_BACKEND");
        env::remove_var("REDIS_ADDR");
        env::remove_var("REDIS_DB");
        env::remove_var("REDIS_NAMESPACE");
        env::remove_var("CACHE_SWEEP_INTERVAL_MS");

        let config = CacheConfig::from_env();
        assert_eq!(config.backend, BackendKind::Memory);
        assert_eq!(config.redis.addr, "127.0.0.1:6379");
        assert_eq!(config.redis.namespace, "kvcache");
        assert_eq!(config.sweep_interval(), Some(Duration::from_millis(1000)));
    }

    #[test]
    fn test_config_deserialize_partial() {
        let json = r#"{"backend": "redis", "redis": {"addr": "cache:6380", "db": 3}}"#;
        let config: CacheConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.backend, BackendKind::Redis);
        assert_eq!(config.redis.addr, "cache:6380");
        assert_eq!(config.redis.db, 3);
        assert_eq!(config.redis.namespace, "kvcache");
        assert_eq!(config.redis.response_timeout(), Duration::from_millis(2000));
    }
}
