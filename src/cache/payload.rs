//! Payload Module
//!
//! Serialization policy: text is stored verbatim, everything else as JSON.
//! The choice is made by the caller through the constructor it picks.

use serde::Serialize;

use crate::error::{CacheError, Result};

// == Payload ==
/// Bytes as they are stored by a backend. No content-type tag is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload(Vec<u8>);

impl Payload {
    /// Stores `text` verbatim.
    pub fn text(text: impl Into<String>) -> Self {
        Self(text.into().into_bytes())
    }

    /// Marshals `value` to JSON text.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        serde_json::to_vec(value)
            .map(Self)
            .map_err(|e| CacheError::Encode(e.to_string()))
    }

    /// Wraps already-encoded bytes.
    pub fn raw(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::text(text)
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::text(text)
    }
}

impl From<i64> for Payload {
    fn from(n: i64) -> Self {
        Payload::text(n.to_string())
    }
}

// == Decoding helpers ==
pub(crate) fn decode_text(key: &str, bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|e| CacheError::decode(key, e))
}

pub(crate) fn decode_int64(key: &str, bytes: &[u8]) -> Result<i64> {
    let text = std::str::from_utf8(bytes).map_err(|e| CacheError::decode(key, e))?;
    text.trim()
        .parse::<i64>()
        .map_err(|e| CacheError::decode(key, e))
}

pub(crate) fn decode_json<T: serde::de::DeserializeOwned>(key: &str, bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| CacheError::decode(key, e))
}
