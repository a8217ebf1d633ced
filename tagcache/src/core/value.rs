use serde::Serialize;
use serde::de::DeserializeOwned;

use super::error::{CacheError, Result};

/// A typed value as seen by callers of the cache.
///
/// Exactly four variants are recognized. Strings and 32/64-bit integers get
/// dedicated wire encodings; everything else travels as `Opaque`, a
/// MessagePack value produced by the generic serializer.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheValue {
    Str(String),
    I32(i32),
    I64(i64),
    Opaque(rmpv::Value),
}

impl CacheValue {
    /// Wrap any serializable value as an opaque MessagePack value.
    pub fn opaque<T: Serialize>(value: &T) -> Result<Self> {
        let v = rmpv::ext::to_value(value)
            .map_err(|e| CacheError::Serialization(e.to_string()))?;
        Ok(CacheValue::Opaque(v))
    }

    /// Project an `Opaque` variant back into a concrete type.
    pub fn into_opaque<T: DeserializeOwned>(self) -> Result<T> {
        match self {
            CacheValue::Opaque(v) => {
                rmpv::ext::from_value(v).map_err(|e| CacheError::Deserialization(e.to_string()))
            }
            other => Err(CacheError::Deserialization(format!(
                "expected an opaque value, found {other:?}"
            ))),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CacheValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            CacheValue::I32(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CacheValue::I64(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<&str> for CacheValue {
    fn from(s: &str) -> Self {
        CacheValue::Str(s.to_string())
    }
}

impl From<String> for CacheValue {
    fn from(s: String) -> Self {
        CacheValue::Str(s)
    }
}

impl From<i32> for CacheValue {
    fn from(n: i32) -> Self {
        CacheValue::I32(n)
    }
}

impl From<i64> for CacheValue {
    fn from(n: i64) -> Self {
        CacheValue::I64(n)
    }
}

/// Conversion accepted by `put`: a value, or `None` to request an eviction
/// in its place. Implemented for bare literals so call sites read
/// `cache.put("k", "hello", ttl)`.
pub trait IntoCacheValue {
    fn into_cache_value(self) -> Option<CacheValue>;
}

impl IntoCacheValue for CacheValue {
    fn into_cache_value(self) -> Option<CacheValue> {
        Some(self)
    }
}

impl IntoCacheValue for Option<CacheValue> {
    fn into_cache_value(self) -> Option<CacheValue> {
        self
    }
}

impl IntoCacheValue for &str {
    fn into_cache_value(self) -> Option<CacheValue> {
        Some(CacheValue::from(self))
    }
}

impl IntoCacheValue for String {
    fn into_cache_value(self) -> Option<CacheValue> {
        Some(CacheValue::from(self))
    }
}

impl IntoCacheValue for i32 {
    fn into_cache_value(self) -> Option<CacheValue> {
        Some(CacheValue::from(self))
    }
}

impl IntoCacheValue for i64 {
    fn into_cache_value(self) -> Option<CacheValue> {
        Some(CacheValue::from(self))
    }
}

/// What actually crosses the backend boundary for one write: raw bytes, or
/// an integer on the store's native primitive path.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    Bytes(Vec<u8>),
    I32(i32),
    I64(i64),
}

impl WireValue {
    /// Byte rendition a backend hands back on read. Integers materialize as
    /// decimal ASCII text, matching the primitive path of memcached-style
    /// stores.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            WireValue::Bytes(b) => b,
            WireValue::I32(n) => n.to_string().into_bytes(),
            WireValue::I64(n) => n.to_string().into_bytes(),
        }
    }
}
