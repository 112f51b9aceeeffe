//! Storage layer
//!
//! Key-value persistence area backing the session store. The area is scoped
//! to one portal instance (the equivalent of a browser tab): it is not shared
//! with other instances and does not survive a restart.
//!
//! # Usage
//!
//! ```rust,ignore
//! use clinician_portal::config::StorageConfig;
//! use clinician_portal::storage::create_storage;
//!
//! let storage = create_storage(&StorageConfig::default());
//! storage.set_item("access_token", "abc").await?;
//! ```

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{StorageConfig, StorageDriver};

pub use memory::MemoryStorage;

/// String-valued storage area.
///
/// Every method may fail when the backing area is unavailable; callers
/// decide whether that is fatal.
#[async_trait]
pub trait StorageArea: Send + Sync {
    /// Read the value stored under `key`
    async fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    async fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing a missing key is a no-op.
    async fn remove_item(&self, key: &str) -> Result<()>;

    /// Remove every entry
    async fn clear(&self) -> Result<()>;
}

/// Create a storage area based on configuration
pub fn create_storage(config: &StorageConfig) -> Arc<dyn StorageArea> {
    match config.driver {
        StorageDriver::Memory => {
            let idle = config.idle_timeout_seconds.map(Duration::from_secs);
            tracing::debug!(
                max_entries = config.max_entries,
                idle_timeout = ?idle,
                "Creating in-memory storage area"
            );
            Arc::new(MemoryStorage::with_capacity_and_idle(config.max_entries, idle))
        }
    }
}
