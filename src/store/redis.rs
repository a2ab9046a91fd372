//! Redis-backed quota store.
//!
//! Shares window counters across server processes. Atomicity comes from the
//! store itself: the increment and the first-creation expiry run as a single
//! Lua script, so concurrent clients can never interleave between the two.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Script};
use tokio::time::timeout;
use tracing::{debug, info};

use super::{QuotaStore, StoreConfig, StoreError};

const INCREMENT_SCRIPT: &str = r#"
local current = redis.call('INCR', KEYS[1])
if current == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return current
"#;

/// A quota store backed by a shared Redis instance.
///
/// Every operation runs under the configured timeout; a timeout surfaces as
/// [`StoreError::Timeout`] so callers can fail open.
pub struct RedisStore {
    connection: MultiplexedConnection,
    script: Script,
    key_prefix: String,
    op_timeout: Duration,
}

impl RedisStore {
    /// Connect to the store described by `config`.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        info!(url = %config.url, prefix = %config.key_prefix, "Connected to quota store");

        Ok(Self {
            connection,
            script: Script::new(INCREMENT_SCRIPT),
            key_prefix: config.key_prefix.clone(),
            op_timeout: Duration::from_millis(config.op_timeout_ms),
        })
    }

    fn prefixed(&self, key: &str) -> String {
        format!("{}:{}", self.key_prefix, key)
    }

    async fn run<T>(
        &self,
        op: impl Future<Output = redis::RedisResult<T>>,
    ) -> Result<T, StoreError> {
        match timeout(self.op_timeout, op).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(StoreError::Unavailable(e.to_string())),
            Err(_) => Err(StoreError::Timeout(self.op_timeout)),
        }
    }
}

#[async_trait]
impl QuotaStore for RedisStore {
    async fn increment_and_expire(&self, key: &str, ttl: Duration) -> Result<u64, StoreError> {
        let mut conn = self.connection.clone();
        let key = self.prefixed(key);

        let mut invocation = self.script.prepare_invoke();
        invocation.key(&key).arg(ttl.as_secs());
        let count: u64 = self.run(invocation.invoke_async(&mut conn)).await?;

        debug!(key = %key, count, "Incremented window counter");
        Ok(count)
    }

    async fn get(&self, key: &str) -> Result<u64, StoreError> {
        let mut conn = self.connection.clone();
        let key = self.prefixed(key);

        let value: Option<u64> = self.run(conn.get(&key)).await?;
        Ok(value.unwrap_or(0))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut conn = self.connection.clone();
        let key = self.prefixed(key);

        self.run(conn.expire(&key, ttl.as_secs() as i64)).await
    }

    async fn time_to_live(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        let mut conn = self.connection.clone();
        let key = self.prefixed(key);

        // TTL returns -2 for a missing key and -1 for a key with no expiry.
        let ttl: i64 = self.run(conn.ttl(&key)).await?;
        Ok(if ttl >= 0 {
            Some(Duration::from_secs(ttl as u64))
        } else {
            None
        })
    }
}
