//! Networked Backend
//!
//! Cache backed by an external Redis service. Every operation is one round
//! trip over a single multiplexed connection opened at construction.

mod keys;

pub use keys::NamespacedKeys;

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{ConnectionInfo, ErrorKind, IntoConnectionInfo, RedisError};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::{effective_ttl, CacheBackend, Payload};
use crate::config::{BackendKind, RedisConfig};
use crate::error::{CacheError, Result};

/// Keys requested per SCAN step in `del_all`
const SCAN_BATCH: usize = 500;

const DEFAULT_PORT: u16 = 6379;

/// Largest PX the server accepts without overflowing its absolute deadline
const MAX_PX_MILLIS: u64 = (i64::MAX / 2) as u64;

// == Remote Cache ==
/// Redis-backed cache scoped to one namespace.
///
/// `set` overwrites unconditionally; `set_if_absent` maps to `SET NX`. The
/// write lock only orders writes issued from this process.
pub struct RemoteCache {
    conn: MultiplexedConnection,
    keys: NamespacedKeys,
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for RemoteCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteCache")
            .field("namespace", &self.keys.namespace())
            .finish_non_exhaustive()
    }
}

impl RemoteCache {
    /// Connects and pings the server. Any failure is `BackendUnavailable`.
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let keys = NamespacedKeys::new(&config.namespace)?;
        let info = connection_info(config)?;

        info!(addr = %config.addr, db = config.db, namespace = keys.namespace(), "Connecting to Redis cache...");

        let client = redis::Client::open(info)
            .map_err(|e| unavailable("Failed to create Redis client", e))?;
        let mut conn = client
            .get_multiplexed_async_connection_with_timeouts(
                config.response_timeout(),
                config.connect_timeout(),
            )
            .await
            .map_err(|e| unavailable("Failed to connect to Redis", e))?;

        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| unavailable("Redis PING failed", e))?;
        debug!(reply = %pong, "Redis ping ok");

        info!("Redis cache connected");

        Ok(Self {
            conn,
            keys,
            write_lock: Mutex::new(()),
        })
    }

    pub fn namespace(&self) -> &str {
        self.keys.namespace()
    }

    fn conn(&self) -> MultiplexedConnection {
        self.conn.clone()
    }
}

#[async_trait]
impl CacheBackend for RemoteCache {
    fn kind(&self) -> BackendKind {
        BackendKind::Redis
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let value: Option<Vec<u8>> = redis::cmd("GET")
            .arg(self.keys.key(key))
            .query_async(&mut self.conn())
            .await
            .map_err(|e| backend_error("GET", e))?;

        value.ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    /// Uses the client's integer conversion of the stored reply.
    async fn get_int64(&self, key: &str) -> Result<i64> {
        let value: Option<i64> = redis::cmd("GET")
            .arg(self.keys.key(key))
            .query_async(&mut self.conn())
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::TypeError => CacheError::decode(key, e),
                _ => backend_error("GET", e),
            })?;

        value.ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    async fn set(&self, key: &str, payload: Payload, ttl: Duration) -> Result<()> {
        let cmd = set_command(&self.keys, key, &payload, ttl, false);

        let _guard = self.write_lock.lock().await;
        let _: () = cmd
            .query_async(&mut self.conn())
            .await
            .map_err(|e| backend_error("SET", e))?;

        debug!(key, bytes = payload.len(), ?ttl, "redis cache set");
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, payload: Payload, ttl: Duration) -> Result<bool> {
        let cmd = set_command(&self.keys, key, &payload, ttl, true);

        let _guard = self.write_lock.lock().await;
        let reply: Option<String> = cmd
            .query_async(&mut self.conn())
            .await
            .map_err(|e| backend_error("SET NX", e))?;

        Ok(reply.is_some())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let count: i64 = redis::cmd("EXISTS")
            .arg(self.keys.key(key))
            .query_async(&mut self.conn())
            .await
            .map_err(|e| backend_error("EXISTS", e))?;

        Ok(count > 0)
    }

    async fn del(&self, key: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let _: i64 = redis::cmd("DEL")
            .arg(self.keys.key(key))
            .query_async(&mut self.conn())
            .await
            .map_err(|e| backend_error("DEL", e))?;

        Ok(())
    }

    /// Deletes every key under this cache's namespace and nothing else.
    async fn del_all(&self) -> Result<()> {
        let pattern = self.keys.pattern();
        let mut conn = self.conn();
        let mut cursor: u64 = 0;
        let mut removed: i64 = 0;

        let _guard = self.write_lock.lock().await;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(|e| backend_error("SCAN", e))?;

            if !batch.is_empty() {
                let count: i64 = redis::cmd("DEL")
                    .arg(&batch)
                    .query_async(&mut conn)
                    .await
                    .map_err(|e| backend_error("DEL", e))?;
                removed += count;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        info!(namespace = self.keys.namespace(), removed, "Redis cache namespace cleared");
        Ok(())
    }
}

// == Commands ==
/// Builds `SET key value [NX] [PX ms]`.
///
/// A TTL beyond what the server can represent is stored without expiry.
fn set_command(
    keys: &NamespacedKeys,
    key: &str,
    payload: &Payload,
    ttl: Duration,
    only_if_absent: bool,
) -> redis::Cmd {
    let mut cmd = redis::cmd("SET");
    cmd.arg(keys.key(key)).arg(payload.as_bytes());
    if only_if_absent {
        cmd.arg("NX");
    }
    if let Some(millis) = effective_ttl(ttl).and_then(px_millis) {
        cmd.arg("PX").arg(millis);
    }
    cmd
}

fn px_millis(ttl: Duration) -> Option<u64> {
    // PX 0 is rejected by the server
    let millis = u64::try_from(ttl.as_millis()).ok()?.max(1);
    (millis <= MAX_PX_MILLIS).then_some(millis)
}

// == Connection Setup ==
fn connection_info(config: &RedisConfig) -> Result<ConnectionInfo> {
    let (host, port) = split_addr(&config.addr)?;

    let mut info = (host, port)
        .into_connection_info()
        .map_err(|e| CacheError::InvalidConfig(format!("invalid redis address: {}", e)))?;
    info.redis.db = config.db;
    info.redis.username = config.username.clone();
    info.redis.password = config.password.clone();

    Ok(info)
}

/// Splits `host:port`, accepting bracketed IPv6 hosts and a missing port.
fn split_addr(addr: &str) -> Result<(String, u16)> {
    let addr = addr.trim();
    let invalid = || CacheError::InvalidConfig(format!("invalid redis address '{}'", addr));

    let (host, port) = if let Some(rest) = addr.strip_prefix('[') {
        let (host, tail) = rest.split_once(']').ok_or_else(invalid)?;
        match tail.strip_prefix(':') {
            Some(port) => (host, Some(port)),
            None if tail.is_empty() => (host, None),
            None => return Err(invalid()),
        }
    } else {
        match addr.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (addr, None),
        }
    };

    if host.is_empty() {
        return Err(invalid());
    }
    let port = match port {
        Some(port) => port.parse().map_err(|_| invalid())?,
        None => DEFAULT_PORT,
    };

    Ok((host.to_string(), port))
}

fn unavailable(context: &str, e: RedisError) -> CacheError {
    warn!("{}: {}", context, e);
    CacheError::BackendUnavailable(format!("{}: {}", context, e))
}

fn backend_error(op: &str, e: RedisError) -> CacheError {
    warn!(op, error = %e, "Redis command failed");
    CacheError::Backend(format!("Redis {} failed: {}", op, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(cmd: &redis::Cmd) -> Vec<String> {
        cmd.args_iter()
            .filter_map(|arg| match arg {
                redis::Arg::Simple(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
                redis::Arg::Cursor => None,
            })
            .collect()
    }

    #[test]
    fn test_set_command_without_ttl() {
        let keys = NamespacedKeys::new("shop").unwrap();
        let cmd = set_command(&keys, "cart", &Payload::text("v"), Duration::ZERO, false);

        assert_eq!(args(&cmd), ["SET", "shop:cart", "v"]);
    }

    #[test]
    fn test_set_command_if_absent_with_ttl() {
        let keys = NamespacedKeys::new("shop").unwrap();
        let cmd = set_command(&keys, "cart", &Payload::text("v"), Duration::from_secs(2), true);

        assert_eq!(args(&cmd), ["SET", "shop:cart", "v", "NX", "PX", "2000"]);
    }

    #[test]
    fn test_set_command_rounds_sub_millisecond_ttl_up() {
        let keys = NamespacedKeys::new("shop").unwrap();
        let cmd = set_command(&keys, "cart", &Payload::text("v"), Duration::from_micros(300), false);

        assert_eq!(args(&cmd), ["SET", "shop:cart", "v", "PX", "1"]);
    }

    #[test]
    fn test_set_command_huge_ttl_never_expires() {
        let keys = NamespacedKeys::new("shop").unwrap();
        let cmd = set_command(&keys, "cart", &Payload::text("v"), Duration::MAX, false);

        assert_eq!(args(&cmd), ["SET", "shop:cart", "v"]);
        assert_eq!(px_millis(Duration::from_millis(MAX_PX_MILLIS)), Some(MAX_PX_MILLIS));
        assert_eq!(px_millis(Duration::from_millis(MAX_PX_MILLIS + 1)), None);
    }

    #[test]
    fn test_split_addr() {
        assert_eq!(split_addr("127.0.0.1:6380").unwrap(), ("127.0.0.1".to_string(), 6380));
        assert_eq!(split_addr("cache").unwrap(), ("cache".to_string(), 6379));
        assert_eq!(split_addr("[::1]:7000").unwrap(), ("::1".to_string(), 7000));
        assert_eq!(split_addr("[::1]").unwrap(), ("::1".to_string(), 6379));
    }

    #[test]
    fn test_split_addr_invalid() {
        assert!(split_addr("host:notaport").is_err());
        assert!(split_addr(":6379").is_err());
        assert!(split_addr("[::1").is_err());
    }

    #[test]
    fn test_connection_info_carries_credentials() {
        let config = RedisConfig {
            addr: "10.0.0.5:6390".to_string(),
            username: Some("app".to_string()),
            password: Some("s3cret".to_string()),
            db: 4,
            ..RedisConfig::default()
        };

        let info = connection_info(&config).unwrap();

        assert_eq!(info.redis.db, 4);
        assert_eq!(info.redis.username.as_deref(), Some("app"));
        assert_eq!(info.redis.password.as_deref(), Some("s3cret"));
        assert!(matches!(
            info.addr,
            redis::ConnectionAddr::Tcp(ref host, 6390) if host == "10.0.0.5"
        ));
    }

    #[tokio::test]
    async fn test_connect_rejects_empty_namespace() {
        let config = RedisConfig {
            namespace: String::new(),
            ..RedisConfig::default()
        };

        let err = RemoteCache::connect(&config).await.unwrap_err();
        assert!(matches!(err, CacheError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_connect_unreachable_is_unavailable() {
        let config = RedisConfig {
            addr: "127.0.0.1:1".to_string(),
            connect_timeout_ms: 200,
            response_timeout_ms: 200,
            ..RedisConfig::default()
        };

        let err = RemoteCache::connect(&config).await.unwrap_err();
        assert!(matches!(err, CacheError::BackendUnavailable(_)));
    }
}
