//! Quota store adapters.
//!
//! Window counters live in a store shared by every server process, so the
//! store's own atomic increment is the only coordination mechanism. Adapters
//! implement [`QuotaStore`]; the limiter never reads, modifies, and writes a
//! counter in separate steps.

mod memory;
mod redis;

pub use memory::MemoryStore;
pub use self::redis::RedisStore;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::TollgateError;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Store operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Trait for counter store implementations.
///
/// Implementations must make `increment_and_expire` atomic with respect to
/// every other process sharing the store: concurrent increments on one key
/// must never lose an update.
#[async_trait]
pub trait QuotaStore: Send + Sync {
    /// Atomically increment the counter at `key` by one and return the new
    /// value. The increment that creates the key also sets its expiry to
    /// `ttl`; later increments leave the expiry untouched.
    async fn increment_and_expire(&self, key: &str, ttl: Duration) -> Result<u64, StoreError>;

    /// Read the current counter value, or 0 when the key is absent.
    async fn get(&self, key: &str) -> Result<u64, StoreError>;

    /// Set the expiry on an existing key. Returns false when the key is absent.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError>;

    /// Remaining time before `key` expires, or None when the key is absent
    /// or carries no expiry.
    async fn time_to_live(&self, key: &str) -> Result<Option<Duration>, StoreError>;
}

/// Configuration for the shared quota store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store connection URL
    #[serde(default = "default_url")]
    pub url: String,

    /// Namespace prefix applied to every counter key
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Per-operation timeout in milliseconds
    #[serde(default = "default_op_timeout")]
    pub op_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            key_prefix: default_key_prefix(),
            op_timeout_ms: default_op_timeout(),
        }
    }
}

fn default_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_key_prefix() -> String {
    "tollgate".to_string()
}

fn default_op_timeout() -> u64 {
    500
}

impl StoreConfig {
    /// Reject configurations the adapters cannot operate with.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.url.is_empty() {
            return Err(TollgateError::Config("store url must not be empty".into()));
        }
        if self.op_timeout_ms == 0 {
            return Err(TollgateError::Config(
                "store operation timeout must be positive".into(),
            ));
        }
        Ok(())
    }
}
