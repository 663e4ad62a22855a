//! Redis-backed [`LockStore`]
//!
//! Acquire is a single `SET key token NX PX ttl`. Release runs a Lua
//! compare-and-delete so a lease that outlived its TTL cannot delete a lock
//! somebody else now holds.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, RedisError, Script};
use tracing::info;

use crate::application::locking::{LockStore, LockStoreError};

const RELEASE_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
else
    return 0
end
"#;

const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_millis(500);

pub struct RedisLockStore {
    conn_manager: ConnectionManager,
    release_script: Script,
    command_timeout: Duration,
}

impl RedisLockStore {
    /// Connect to `redis_url` (e.g. `redis://127.0.0.1:6379`).
    pub async fn connect(redis_url: &str) -> Result<Self, LockStoreError> {
        let client = Client::open(redis_url).map_err(classify)?;
        let conn_manager = ConnectionManager::new(client).await.map_err(classify)?;
        info!("Redis lock store connected");
        Ok(Self {
            conn_manager,
            release_script: Script::new(RELEASE_SCRIPT),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        })
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, LockStoreError>
    where
        F: Future<Output = Result<T, RedisError>>,
    {
        match tokio::time::timeout(self.command_timeout, fut).await {
            Ok(result) => result.map_err(classify),
            Err(_) => Err(LockStoreError::Unavailable(format!(
                "no reply within {}ms",
                self.command_timeout.as_millis()
            ))),
        }
    }
}

#[async_trait]
impl LockStore for RedisLockStore {
    async fn set_nx_ex(&self, key: &str, token: &str, ttl: Duration) -> Result<bool, LockStoreError> {
        let mut conn = self.conn_manager.clone();
        let ttl_ms = ttl.as_millis().max(1) as u64;
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(token).arg("NX").arg("PX").arg(ttl_ms);

        let reply: Option<String> = self.bounded(cmd.query_async(&mut conn)).await?;
        Ok(reply.is_some())
    }

    async fn release(&self, key: &str, token: &str) -> Result<bool, LockStoreError> {
        let mut conn = self.conn_manager.clone();
        let mut invocation = self.release_script.key(key);
        invocation.arg(token);

        let deleted: i64 = self.bounded(invocation.invoke_async(&mut conn)).await?;
        Ok(deleted == 1)
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

/// Connectivity failures make the caller fall back to local locks; anything
/// else is reported as a command failure.
fn classify(error: RedisError) -> LockStoreError {
    if error.is_io_error()
        || error.is_connection_dropped()
        || error.is_connection_refusal()
        || error.is_timeout()
    {
        LockStoreError::Unavailable(error.to_string())
    } else {
        LockStoreError::Command(error.to_string())
    }
}
