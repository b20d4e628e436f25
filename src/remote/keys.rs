//! Namespaced key builder for the Redis backend.

use crate::error::{CacheError, Result};

/// Maps cache keys into the namespace owned by this application.
#[derive(Debug, Clone)]
pub struct NamespacedKeys {
    prefix: String,
}

impl NamespacedKeys {
    /// Rejects empty namespaces so `del_all` can never match foreign keys.
    pub fn new(namespace: &str) -> Result<Self> {
        let namespace = namespace.trim().trim_end_matches(':');
        if namespace.is_empty() {
            return Err(CacheError::InvalidConfig(
                "redis namespace must not be empty".to_string(),
            ));
        }
        if namespace.contains(['*', '?', '[', ']']) {
            return Err(CacheError::InvalidConfig(format!(
                "redis namespace '{}' contains glob characters",
                namespace
            )));
        }
        Ok(Self {
            prefix: namespace.to_string(),
        })
    }

    /// Full key stored on the server.
    pub fn key(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }

    /// SCAN pattern matching every key in the namespace.
    pub fn pattern(&self) -> String {
        format!("{}:*", self.prefix)
    }

    pub fn namespace(&self) -> &str {
        &self.prefix
    }
}
