//! Region-scoped typed cache service.
//!
//! Orchestrates the codec and the backend: tagging on the write path, the
//! sentinel checks plus the conditional marker-key probe on the read path.
//! Everything else is a pass-through to the backend.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use super::codec::{self, Decoded};
use super::error::Result;
use super::value::{CacheValue, IntoCacheValue, WireValue};
use crate::backend::Backend;

/// Typed cache facade over a single backend region.
///
/// Cloning is cheap; clones share the backend handle and the default TTL.
pub struct RegionCache<B: Backend> {
    backend: Arc<B>,
    region: String,
    default_ttl: Arc<RwLock<Option<u64>>>,
}

impl<B: Backend> Clone for RegionCache<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            region: self.region.clone(),
            default_ttl: self.default_ttl.clone(),
        }
    }
}

impl<B: Backend> RegionCache<B> {
    /// Create a cache facade for `region`.
    pub fn new(backend: Arc<B>, region: impl Into<String>) -> Self {
        Self {
            backend,
            region: region.into(),
            default_ttl: Arc::new(RwLock::new(None)),
        }
    }

    /// Set the TTL applied when `put` is called without an explicit one.
    /// `None` falls through to the backend's own default expiry.
    pub fn with_default_ttl(self, ttl_secs: Option<u64>) -> Self {
        *self.default_ttl.write() = ttl_secs;
        self
    }

    /// Update the region default TTL.
    pub fn set_default_ttl(&self, ttl_secs: Option<u64>) {
        *self.default_ttl.write() = ttl_secs;
    }

    /// Region this facade writes to.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Store a value under `key`.
    ///
    /// An absent value (`None`) is an eviction, not an encoding of null.
    /// For 64-bit integers two writes are issued: the zero marker under the
    /// derived key, then the primary value. A failure of either fails the
    /// whole call. The two writes are not transactional; writing the marker
    /// first means a torn write leaves a stale marker and an absent primary
    /// rather than a primary that reads back as a wrong-valued i32.
    pub async fn put(
        &self,
        key: &str,
        value: impl IntoCacheValue,
        ttl_secs: Option<u64>,
    ) -> Result<()> {
        let Some(value) = value.into_cache_value() else {
            debug!("PUT region={}, key={}: absent value, evicting", self.region, key);
            return self.evict(key).await;
        };

        let ttl = ttl_secs.or(*self.default_ttl.read());
        let encoded = codec::encode(&value)?;
        debug!("PUT region={}, key={}, ttl={:?}", self.region, key, ttl);

        if encoded.long_marker {
            self.backend
                .set(
                    &self.region,
                    &codec::long_marker_key(key),
                    WireValue::I32(0),
                    ttl,
                )
                .await?;
        }

        self.backend.set(&self.region, key, encoded.primary, ttl).await
    }

    /// `put` with the region default TTL.
    pub async fn put_default(&self, key: &str, value: impl IntoCacheValue) -> Result<()> {
        self.put(key, value, None).await
    }

    /// Fetch and decode the value under `key`. `None` means absent.
    pub async fn get(&self, key: &str) -> Result<Option<CacheValue>> {
        let Some(bytes) = self.backend.get(&self.region, key).await? else {
            return Ok(None);
        };

        match codec::decode_primary(&bytes)? {
            Decoded::Value(value) => Ok(Some(value)),
            Decoded::IntPending(text) => {
                let is_long = self
                    .backend
                    .exists(&self.region, &codec::long_marker_key(key))
                    .await?;
                Ok(Some(codec::decode_int(&text, is_long)?))
            }
        }
    }

    /// Remove the value under `key`.
    pub async fn evict(&self, key: &str) -> Result<()> {
        self.backend.evict(&self.region, key).await
    }

    /// Whether a live entry exists under `key`.
    pub async fn exists(&self, key: &str) -> Result<bool> {
        self.backend.exists(&self.region, key).await
    }

    /// Increment the counter under `key`. Delegated verbatim to the backend.
    pub async fn incr(&self, key: &str, ttl_secs: Option<u64>) -> Result<i64> {
        self.backend.incr(&self.region, key, ttl_secs).await
    }

    /// Decrement the counter under `key`. Delegated verbatim to the backend.
    pub async fn decr(&self, key: &str, ttl_secs: Option<u64>) -> Result<i64> {
        self.backend.decr(&self.region, key, ttl_secs).await
    }

    /// Drop every entry in the region, best-effort. Backend failures are
    /// logged and swallowed.
    pub async fn clear(&self) {
        if let Err(err) = self.backend.clear(&self.region).await {
            warn!("CLEAR region={} failed, ignoring: {}", self.region, err);
        }
    }
}
