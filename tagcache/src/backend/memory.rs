//! In-process reference backend.
//!
//! Radix-trie keyed storage with per-entry TTL and region namespacing. This
//! is the store used by the test suite and the CLI; production deployments
//! plug a remote store in through the [`Backend`] trait instead.

use super::Backend;
use crate::core::error::{CacheError, Result};
use crate::core::value::WireValue;
use async_trait::async_trait;
use parking_lot::RwLock;
use radix_trie::{Trie, TrieCommon};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Separator between the region name and the key inside the trie. Control
/// character so it cannot collide with application keys.
const REGION_SEP: char = '\u{1}';

/// Stored entry with expiry metadata
#[derive(Debug, Clone)]
struct StoredEntry {
    data: Vec<u8>,
    expires_at: Option<Instant>,
}

impl StoredEntry {
    fn new(data: Vec<u8>, ttl_secs: Option<u64>) -> Self {
        Self {
            data,
            expires_at: ttl_secs.map(|secs| Instant::now() + Duration::from_secs(secs)),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|expires| Instant::now() >= expires)
    }
}

/// Configuration for the memory backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Maximum memory in MB
    pub max_memory_mb: usize,
    /// TTL cleanup interval in milliseconds
    pub ttl_cleanup_interval_ms: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_memory_mb: 4096,
            ttl_cleanup_interval_ms: 100,
        }
    }
}

/// Statistics for the memory backend
#[derive(Debug, Default, Clone, Serialize)]
pub struct MemoryStats {
    /// Total number of live keys
    pub total_keys: usize,
    /// Estimated memory usage in bytes
    pub total_memory_bytes: usize,
    /// Number of GET operations
    pub gets: u64,
    /// Number of SET operations
    pub sets: u64,
    /// Number of EVICT operations
    pub dels: u64,
    /// Number of hits
    pub hits: u64,
    /// Number of misses
    pub misses: u64,
}

impl MemoryStats {
    /// Calculate hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Region-aware in-memory store using a radix trie
#[derive(Clone)]
pub struct MemoryBackend {
    data: Arc<RwLock<Trie<String, StoredEntry>>>,
    stats: Arc<RwLock<MemoryStats>>,
    config: MemoryConfig,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(MemoryConfig::default())
    }
}

impl MemoryBackend {
    /// Create a new memory backend with the given configuration
    pub fn new(config: MemoryConfig) -> Self {
        info!(
            "Initializing memory backend with max_memory={}MB",
            config.max_memory_mb
        );

        Self {
            data: Arc::new(RwLock::new(Trie::new())),
            stats: Arc::new(RwLock::new(MemoryStats::default())),
            config,
        }
    }

    /// Start background TTL cleanup task
    pub fn start_ttl_cleanup(&self) -> tokio::task::JoinHandle<()> {
        let interval_ms = self.config.ttl_cleanup_interval_ms;
        info!("Starting TTL cleanup task (interval={}ms)", interval_ms);

        let store = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));

            loop {
                interval.tick().await;
                store.cleanup_expired();
            }
        })
    }

    /// Get statistics
    pub fn stats(&self) -> MemoryStats {
        self.stats.read().clone()
    }

    fn entry_key(region: &str, key: &str) -> String {
        format!("{region}{REGION_SEP}{key}")
    }

    fn store(&self, region: &str, key: &str, payload: Vec<u8>, ttl_secs: Option<u64>) -> Result<()> {
        let entry = StoredEntry::new(payload, ttl_secs);
        let entry_size = key.len() + entry.data.len() + std::mem::size_of::<StoredEntry>();

        {
            let stats = self.stats.read();
            let max_bytes = self.config.max_memory_mb * 1024 * 1024;
            if stats.total_memory_bytes + entry_size > max_bytes {
                warn!(
                    "Memory limit exceeded: {}/{}",
                    stats.total_memory_bytes, max_bytes
                );
                return Err(CacheError::Io("memory limit exceeded".to_string()));
            }
        }

        let mut data = self.data.write();
        let is_new = data.insert(Self::entry_key(region, key), entry).is_none();

        let mut stats = self.stats.write();
        stats.sets += 1;
        if is_new {
            stats.total_keys += 1;
            stats.total_memory_bytes += entry_size;
        }

        Ok(())
    }

    /// Parse-modify-write under the write lock. Absent or expired entries
    /// start from zero, matching memcached-style counter semantics.
    fn apply_delta(
        &self,
        region: &str,
        key: &str,
        delta: i64,
        ttl_secs: Option<u64>,
    ) -> Result<i64> {
        let full_key = Self::entry_key(region, key);
        let mut data = self.data.write();

        let current = match data.get(&full_key) {
            Some(entry) if !entry.is_expired() => String::from_utf8(entry.data.clone())
                .ok()
                .and_then(|s| s.parse::<i64>().ok())
                .ok_or_else(|| CacheError::Io("counter value is not an integer".to_string()))?,
            _ => 0,
        };

        let next = current + delta;
        let is_new = data
            .insert(full_key, StoredEntry::new(next.to_string().into_bytes(), ttl_secs))
            .is_none();

        let mut stats = self.stats.write();
        stats.sets += 1;
        if is_new {
            stats.total_keys += 1;
        }

        Ok(next)
    }

    fn cleanup_expired(&self) {
        let mut data = self.data.write();
        let mut stats = self.stats.write();

        let expired_keys: Vec<String> = data
            .iter()
            .filter(|(_, v)| v.is_expired())
            .map(|(k, _)| k.clone())
            .collect();

        let count = expired_keys.len();
        if count > 0 {
            debug!("Cleaning up {} expired keys", count);
            for key in expired_keys {
                data.remove(&key);
            }
            stats.total_keys = stats.total_keys.saturating_sub(count);
        }
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn set(
        &self,
        region: &str,
        key: &str,
        value: WireValue,
        ttl_secs: Option<u64>,
    ) -> Result<()> {
        debug!("SET region={}, key={}, ttl={:?}", region, key, ttl_secs);
        self.store(region, key, value.into_bytes(), ttl_secs)
    }

    async fn get(&self, region: &str, key: &str) -> Result<Option<Vec<u8>>> {
        debug!("GET region={}, key={}", region, key);

        let full_key = Self::entry_key(region, key);
        let mut data = self.data.write();
        let mut stats = self.stats.write();
        stats.gets += 1;

        if let Some(entry) = data.get(&full_key) {
            if entry.is_expired() {
                debug!("Key expired: {}", key);
                data.remove(&full_key);
                stats.misses += 1;
                stats.total_keys = stats.total_keys.saturating_sub(1);
                return Ok(None);
            }

            stats.hits += 1;
            Ok(Some(entry.data.clone()))
        } else {
            stats.misses += 1;
            Ok(None)
        }
    }

    async fn exists(&self, region: &str, key: &str) -> Result<bool> {
        let data = self.data.read();
        if let Some(entry) = data.get(&Self::entry_key(region, key)) {
            Ok(!entry.is_expired())
        } else {
            Ok(false)
        }
    }

    async fn evict(&self, region: &str, key: &str) -> Result<()> {
        debug!("EVICT region={}, key={}", region, key);

        let mut data = self.data.write();
        if data.remove(&Self::entry_key(region, key)).is_some() {
            let mut stats = self.stats.write();
            stats.dels += 1;
            stats.total_keys = stats.total_keys.saturating_sub(1);
        }
        Ok(())
    }

    async fn clear(&self, region: &str) -> Result<()> {
        debug!("CLEAR region={}", region);

        let prefix = format!("{region}{REGION_SEP}");
        let mut data = self.data.write();

        let keys: Vec<String> = data
            .get_raw_descendant(&prefix)
            .map(|subtrie| subtrie.keys().map(|k| k.to_string()).collect())
            .unwrap_or_default();

        let count = keys.len();
        for key in keys {
            data.remove(&key);
        }

        let mut stats = self.stats.write();
        stats.dels += count as u64;
        stats.total_keys = stats.total_keys.saturating_sub(count);

        Ok(())
    }

    async fn incr(&self, region: &str, key: &str, ttl_secs: Option<u64>) -> Result<i64> {
        debug!("INCR region={}, key={}", region, key);
        self.apply_delta(region, key, 1, ttl_secs)
    }

    async fn decr(&self, region: &str, key: &str, ttl_secs: Option<u64>) -> Result<i64> {
        debug!("DECR region={}, key={}", region, key);
        self.apply_delta(region, key, -1, ttl_secs)
    }
}
