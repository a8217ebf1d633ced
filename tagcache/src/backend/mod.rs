//! Backend contract and bundled implementations.
//!
//! A backend is the untyped external store: byte sequences or int-like
//! primitives under string keys, grouped into named regions, with TTL expiry
//! owned by the store. The typed layer calls it at most twice per write
//! (primary + optional marker key) and at most twice per read (primary +
//! conditional marker probe).

pub mod memory;

use async_trait::async_trait;

use crate::core::error::Result;
use crate::core::value::WireValue;

pub use memory::{MemoryBackend, MemoryConfig, MemoryStats};

/// The external cache collaborator.
///
/// `ttl_secs: None` means "use the backend's default expiry". All failures
/// surface as [`crate::CacheError::Io`]; retries, timeouts and cancellation
/// are the implementation's own business.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Store a payload under `key` in `region`.
    async fn set(
        &self,
        region: &str,
        key: &str,
        value: WireValue,
        ttl_secs: Option<u64>,
    ) -> Result<()>;

    /// Fetch the raw byte rendition of a stored payload.
    async fn get(&self, region: &str, key: &str) -> Result<Option<Vec<u8>>>;

    /// Whether a live (non-expired) entry exists under `key`.
    async fn exists(&self, region: &str, key: &str) -> Result<bool>;

    /// Remove a single key.
    async fn evict(&self, region: &str, key: &str) -> Result<()>;

    /// Remove every key in the region.
    async fn clear(&self, region: &str) -> Result<()>;

    /// Atomic increment of a numeric entry, creating it at zero if absent.
    async fn incr(&self, region: &str, key: &str, ttl_secs: Option<u64>) -> Result<i64>;

    /// Atomic decrement of a numeric entry, creating it at zero if absent.
    async fn decr(&self, region: &str, key: &str, ttl_secs: Option<u64>) -> Result<i64>;
}
