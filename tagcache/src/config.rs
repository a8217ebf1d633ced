use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::backend::MemoryConfig;

/// Top-level tagcache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub region: RegionSettings,
    pub memory: MemorySettings,
    pub logging: LoggingConfig,
}

/// Defaults applied to every region facade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionSettings {
    /// TTL used when `put` is called without an explicit one; `None` defers
    /// to the backend's own default expiry.
    pub default_ttl_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySettings {
    pub max_memory_mb: usize,
    pub ttl_cleanup_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            region: RegionSettings {
                default_ttl_secs: None,
            },
            memory: MemorySettings {
                max_memory_mb: 4096,
                ttl_cleanup_interval_ms: 100,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "text".to_string(),
            },
        }
    }
}

impl CacheConfig {
    /// Load configuration from YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: CacheConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Convert to MemoryConfig
    pub fn to_memory_config(&self) -> MemoryConfig {
        MemoryConfig {
            max_memory_mb: self.memory.max_memory_mb,
            ttl_cleanup_interval_ms: self.memory.ttl_cleanup_interval_ms,
        }
    }
}
