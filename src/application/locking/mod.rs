//! Short-lived named mutexes
//!
//! `LockManager` takes locks in a shared [`LockStore`] (Redis in production)
//! and falls back to a process-local [`LocalLockStore`] when the shared
//! store cannot be reached.

pub mod local;
pub mod manager;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use local::LocalLockStore;
pub use manager::{LockBackend, LockLease, LockManager, DEFAULT_LOCK_TTL};

/// Errors returned by a [`LockStore`]
#[derive(Debug, Error)]
pub enum LockStoreError {
    /// Connection refused/dropped, I/O error or timeout
    #[error("lock store unavailable: {0}")]
    Unavailable(String),

    #[error("lock store command failed: {0}")]
    Command(String),
}

/// Set-if-absent-with-expiry key store
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Store `token` under `key` unless the key exists. `true` when stored.
    async fn set_nx_ex(&self, key: &str, token: &str, ttl: Duration) -> Result<bool, LockStoreError>;

    /// Delete `key` only while it still holds `token`. `true` when deleted.
    async fn release(&self, key: &str, token: &str) -> Result<bool, LockStoreError>;

    /// Label used in logs and metrics
    fn backend(&self) -> &'static str;
}

/// Lock key guarding reservations of one asset
pub fn asset_lock_key(asset_id: uuid::Uuid) -> String {
    format!("reservation-lock:{asset_id}")
}
