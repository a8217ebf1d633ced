//! # tagcache
//!
//! Type-preserving caching layer over untyped cache backends.
//!
//! Backends in the memcached family store byte sequences (or plain int-like
//! primitives) under a key and keep no record of what was written. tagcache
//! tags values on the way in so the original type survives the round trip:
//!
//! - **Strings** carry a trailing 5-byte sentinel.
//! - **Serialized objects** (MessagePack via the generic serializer) carry a
//!   different trailing sentinel.
//! - **64-bit integers** are stored bare, with a zero marker under a derived
//!   side-key recording their width.
//! - **32-bit integers** are stored bare with no tag at all, the fallback
//!   when nothing else matches.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tagcache::{CacheValue, MemoryBackend, RegionCache};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = Arc::new(MemoryBackend::default());
//!     let cache = RegionCache::new(backend, "sessions");
//!
//!     cache.put("user:1", "John Doe", Some(3600)).await?;
//!     cache.put("hits", 42i32, None).await?;
//!     cache.put("epoch_ms", 1_700_000_000_000i64, None).await?;
//!
//!     let value = cache.get("user:1").await?;
//!     assert_eq!(value, Some(CacheValue::Str("John Doe".to_string())));
//!
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod core;

pub use backend::{Backend, MemoryBackend, MemoryConfig, MemoryStats};
pub use config::{CacheConfig, LoggingConfig, MemorySettings, RegionSettings};
pub use core::codec::{LONG_KEY_SUFFIX, OBJECT_SENTINEL, STRING_SENTINEL};
pub use core::{CacheError, CacheValue, IntoCacheValue, RegionCache, WireValue};
pub use core::error::Result;
