//! In-memory storage area using moka
//!
//! Entries live as long as the owning portal instance. An optional idle
//! timeout drops entries that have not been read or written for a while,
//! which models a browser tab session ending.

use super::StorageArea;
use anyhow::Result;
use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

/// Default maximum number of entries
const DEFAULT_MAX_CAPACITY: u64 = 64;

/// In-memory storage area backed by a moka cache
pub struct MemoryStorage {
    entries: Cache<String, Arc<String>>,
    idle_timeout: Option<Duration>,
}

impl std::fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStorage")
            .field("entry_count", &self.entries.entry_count())
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}

impl MemoryStorage {
    /// Create a storage area with default settings (64 entries, no idle timeout)
    pub fn new() -> Self {
        Self::with_capacity_and_idle(DEFAULT_MAX_CAPACITY, None)
    }

    /// Create a storage area with custom capacity and optional idle timeout
    ///
    /// # Arguments
    /// * `max_capacity` - Maximum number of entries the area can hold
    /// * `idle_timeout` - Drop entries untouched for this long
    pub fn with_capacity_and_idle(max_capacity: u64, idle_timeout: Option<Duration>) -> Self {
        let mut builder = Cache::builder().max_capacity(max_capacity);
        if let Some(idle) = idle_timeout {
            builder = builder.time_to_idle(idle);
        }

        Self {
            entries: builder.build(),
            idle_timeout,
        }
    }

    /// Idle timeout, if any
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout
    }

    /// Number of live entries after pending maintenance has run
    pub async fn entry_count(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageArea for MemoryStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .entries
            .get(key)
            .await
            .map(|value| value.as_ref().clone()))
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .insert(key.to_string(), Arc::new(value.to_string()))
            .await;
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.entries.invalidate(key).await;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.invalidate_all();
        self.entries.run_pending_tasks().await;
        Ok(())
    }
}
