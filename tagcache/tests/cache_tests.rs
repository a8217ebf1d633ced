//! End-to-end tests for the typed cache layer over the memory backend.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tagcache::core::codec;
use tagcache::{Backend, CacheError, CacheValue, MemoryBackend, RegionCache, WireValue};

fn cache() -> RegionCache<MemoryBackend> {
    RegionCache::new(Arc::new(MemoryBackend::default()), "test")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct UserRecord {
    id: u64,
    name: String,
    roles: Vec<String>,
}

fn sample_user() -> UserRecord {
    UserRecord {
        id: 17,
        name: "alice".to_string(),
        roles: vec!["admin".to_string(), "ops".to_string()],
    }
}

#[tokio::test]
async fn round_trip_string() {
    let cache = cache();

    cache.put("k", "hello", Some(60)).await.unwrap();
    assert_eq!(
        cache.get("k").await.unwrap(),
        Some(CacheValue::Str("hello".to_string()))
    );
}

#[tokio::test]
async fn round_trip_i32() {
    let cache = cache();

    cache.put("k", 42i32, Some(60)).await.unwrap();
    assert_eq!(cache.get("k").await.unwrap(), Some(CacheValue::I32(42)));
}

#[tokio::test]
async fn round_trip_i64_beyond_i32_range() {
    let cache = cache();

    cache.put("k", 9_000_000_000i64, Some(60)).await.unwrap();
    assert_eq!(
        cache.get("k").await.unwrap(),
        Some(CacheValue::I64(9_000_000_000))
    );
}

#[tokio::test]
async fn round_trip_i64_within_i32_range() {
    // The marker key, not the magnitude, decides the width.
    let cache = cache();

    cache.put("k", 7i64, None).await.unwrap();
    assert_eq!(cache.get("k").await.unwrap(), Some(CacheValue::I64(7)));
}

#[tokio::test]
async fn round_trip_negative_integers() {
    let cache = cache();

    cache.put("a", -42i32, None).await.unwrap();
    cache.put("b", -9_000_000_000i64, None).await.unwrap();

    assert_eq!(cache.get("a").await.unwrap(), Some(CacheValue::I32(-42)));
    assert_eq!(
        cache.get("b").await.unwrap(),
        Some(CacheValue::I64(-9_000_000_000))
    );
}

#[tokio::test]
async fn round_trip_opaque_struct() {
    let cache = cache();
    let user = sample_user();

    cache
        .put("k", CacheValue::opaque(&user).unwrap(), Some(60))
        .await
        .unwrap();

    let fetched = cache.get("k").await.unwrap().unwrap();
    let back: UserRecord = fetched.into_opaque().unwrap();
    assert_eq!(back, user);
}

#[tokio::test]
async fn round_trip_opaque_json_value() {
    let cache = cache();
    let json = serde_json::json!({"a": 1, "b": ["x", "y"]});

    cache
        .put("k", CacheValue::opaque(&json).unwrap(), None)
        .await
        .unwrap();

    let back: serde_json::Value = cache.get("k").await.unwrap().unwrap().into_opaque().unwrap();
    assert_eq!(back, json);
}

#[tokio::test]
async fn get_absent_key() {
    let cache = cache();
    assert_eq!(cache.get("missing").await.unwrap(), None);
}

#[tokio::test]
async fn null_is_evict() {
    let cache = cache();

    cache.put("k", "value", Some(60)).await.unwrap();
    cache.put("k", None, Some(60)).await.unwrap();
    assert_eq!(cache.get("k").await.unwrap(), None);

    // Observably identical to a direct evict
    cache.put("k", "value", Some(60)).await.unwrap();
    cache.evict("k").await.unwrap();
    assert_eq!(cache.get("k").await.unwrap(), None);
}

#[tokio::test]
async fn concrete_scenario() {
    let cache = cache();
    let user = sample_user();

    cache.put("k1", "hello", Some(60)).await.unwrap();
    cache.put("k2", 42i32, Some(60)).await.unwrap();
    cache.put("k3", 9_000_000_000i64, Some(60)).await.unwrap();
    cache
        .put("k4", CacheValue::opaque(&user).unwrap(), Some(60))
        .await
        .unwrap();

    assert_eq!(
        cache.get("k1").await.unwrap(),
        Some(CacheValue::Str("hello".to_string()))
    );
    assert_eq!(cache.get("k2").await.unwrap(), Some(CacheValue::I32(42)));
    assert_eq!(
        cache.get("k3").await.unwrap(),
        Some(CacheValue::I64(9_000_000_000))
    );
    let fetched: UserRecord = cache.get("k4").await.unwrap().unwrap().into_opaque().unwrap();
    assert_eq!(fetched, user);

    cache.evict("k1").await.unwrap();
    assert_eq!(cache.get("k1").await.unwrap(), None);
}

#[tokio::test]
async fn ttl_expiry_through_backend() {
    let cache = cache();

    cache.put("k", "short-lived", Some(1)).await.unwrap();
    assert!(cache.get("k").await.unwrap().is_some());

    tokio::time::sleep(std::time::Duration::from_secs(2)).await;
    assert_eq!(cache.get("k").await.unwrap(), None);
}

#[tokio::test]
async fn incr_decr_pass_through() {
    let cache = cache();

    assert_eq!(cache.incr("counter", None).await.unwrap(), 1);
    assert_eq!(cache.incr("counter", None).await.unwrap(), 2);
    assert_eq!(cache.decr("counter", None).await.unwrap(), 1);
}

#[tokio::test]
async fn clear_drops_region() {
    let cache = cache();

    cache.put("a", "x", None).await.unwrap();
    cache.put("b", 1i32, None).await.unwrap();
    cache.clear().await;

    assert_eq!(cache.get("a").await.unwrap(), None);
    assert_eq!(cache.get("b").await.unwrap(), None);
}

#[tokio::test]
async fn corrupt_opaque_payload_is_deserialization_error() {
    let backend = Arc::new(MemoryBackend::default());
    let cache = RegionCache::new(backend.clone(), "test");

    // Valid object sentinel over bytes that are not MessagePack
    let mut bytes = vec![0xC1, 0xC1, 0xC1]; // 0xC1 is never used by MessagePack
    bytes.extend_from_slice(&tagcache::OBJECT_SENTINEL);
    backend
        .set("test", "k", WireValue::Bytes(bytes), None)
        .await
        .unwrap();

    assert!(matches!(
        cache.get("k").await,
        Err(CacheError::Deserialization(_))
    ));
}

#[tokio::test]
async fn corrupt_fallback_payload_is_format_error() {
    let backend = Arc::new(MemoryBackend::default());
    let cache = RegionCache::new(backend.clone(), "test");

    backend
        .set("test", "k", WireValue::Bytes(b"not a number".to_vec()), None)
        .await
        .unwrap();

    assert!(matches!(cache.get("k").await, Err(CacheError::Format(_))));
}

/// Delegating backend with injectable failures, for the error-path tests.
struct FlakyBackend {
    inner: MemoryBackend,
    fail_marker_sets: AtomicBool,
    fail_clear: AtomicBool,
}

impl FlakyBackend {
    fn new() -> Self {
        Self {
            inner: MemoryBackend::default(),
            fail_marker_sets: AtomicBool::new(false),
            fail_clear: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Backend for FlakyBackend {
    async fn set(
        &self,
        region: &str,
        key: &str,
        value: WireValue,
        ttl_secs: Option<u64>,
    ) -> Result<(), CacheError> {
        if self.fail_marker_sets.load(Ordering::SeqCst) && key.ends_with(codec::LONG_KEY_SUFFIX) {
            return Err(CacheError::Io("injected marker-write failure".to_string()));
        }
        self.inner.set(region, key, value, ttl_secs).await
    }

    async fn get(&self, region: &str, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.inner.get(region, key).await
    }

    async fn exists(&self, region: &str, key: &str) -> Result<bool, CacheError> {
        self.inner.exists(region, key).await
    }

    async fn evict(&self, region: &str, key: &str) -> Result<(), CacheError> {
        self.inner.evict(region, key).await
    }

    async fn clear(&self, region: &str) -> Result<(), CacheError> {
        if self.fail_clear.load(Ordering::SeqCst) {
            return Err(CacheError::Io("injected clear failure".to_string()));
        }
        self.inner.clear(region).await
    }

    async fn incr(&self, region: &str, key: &str, ttl_secs: Option<u64>) -> Result<i64, CacheError> {
        self.inner.incr(region, key, ttl_secs).await
    }

    async fn decr(&self, region: &str, key: &str, ttl_secs: Option<u64>) -> Result<i64, CacheError> {
        self.inner.decr(region, key, ttl_secs).await
    }
}

#[tokio::test]
async fn failed_marker_write_fails_whole_put() {
    let backend = Arc::new(FlakyBackend::new());
    let cache = RegionCache::new(backend.clone(), "test");

    backend.fail_marker_sets.store(true, Ordering::SeqCst);

    let result = cache.put("k", 9_000_000_000i64, Some(60)).await;
    assert!(matches!(result, Err(CacheError::Io(_))));

    // Marker goes first, so nothing reached the primary key: no partial
    // state that would decode as a wrong-valued i32.
    assert_eq!(cache.get("k").await.unwrap(), None);
}

#[tokio::test]
async fn clear_swallows_backend_failures() {
    let backend = Arc::new(FlakyBackend::new());
    let cache = RegionCache::new(backend.clone(), "test");

    cache.put("k", "v", None).await.unwrap();
    backend.fail_clear.store(true, Ordering::SeqCst);

    // Best-effort: no error surfaces, and the entry survives.
    cache.clear().await;
    assert!(cache.exists("k").await.unwrap());
}
