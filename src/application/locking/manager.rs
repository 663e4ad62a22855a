//! Lock manager with transparent local fallback

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use uuid::Uuid;

use super::{LocalLockStore, LockStore, LockStoreError};

pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(15);

/// Where a lock was taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockBackend {
    Shared,
    Local,
}

impl LockBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shared => "shared",
            Self::Local => "local",
        }
    }
}

/// Proof of ownership of a lock key. Hand it back to
/// [`LockManager::release`].
#[derive(Debug)]
#[must_use = "a lease must be released"]
pub struct LockLease {
    key: String,
    token: String,
    backend: LockBackend,
}

impl LockLease {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn backend(&self) -> LockBackend {
        self.backend
    }
}

/// Named mutexes on the shared store, falling back to a local map when the
/// store is unreachable or not configured.
#[derive(Clone)]
pub struct LockManager {
    shared: Option<Arc<dyn LockStore>>,
    local: Arc<LocalLockStore>,
    default_ttl: Duration,
}

impl LockManager {
    pub fn new(shared: Option<Arc<dyn LockStore>>, local: Arc<LocalLockStore>) -> Self {
        Self {
            shared,
            local,
            default_ttl: DEFAULT_LOCK_TTL,
        }
    }

    /// Manager without a shared store, every lock is process-local.
    pub fn local_only(local: Arc<LocalLockStore>) -> Self {
        Self::new(None, local)
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn local_store(&self) -> &Arc<LocalLockStore> {
        &self.local
    }

    /// Single attempt to take `key` for `ttl`. `None` when someone else holds
    /// it or the shared store failed for a reason other than reachability.
    pub async fn acquire(&self, key: &str, ttl: Duration) -> Option<LockLease> {
        let token = Uuid::new_v4().to_string();

        if let Some(shared) = &self.shared {
            match shared.set_nx_ex(key, &token, ttl).await {
                Ok(acquired) => {
                    record_attempt(LockBackend::Shared, acquired);
                    return acquired.then(|| LockLease {
                        key: key.to_string(),
                        token,
                        backend: LockBackend::Shared,
                    });
                }
                Err(LockStoreError::Unavailable(reason)) => {
                    warn!(
                        key = %key,
                        backend = shared.backend(),
                        error = %reason,
                        "Shared lock store unreachable, using local lock"
                    );
                }
                Err(LockStoreError::Command(reason)) => {
                    warn!(key = %key, error = %reason, "Lock acquisition failed");
                    metrics::counter!(
                        "lock_acquire_total",
                        "backend" => LockBackend::Shared.as_str(),
                        "outcome" => "error"
                    )
                    .increment(1);
                    return None;
                }
            }
        }

        let acquired = self.local.try_acquire(key, &token, ttl);
        record_attempt(LockBackend::Local, acquired);
        acquired.then(|| LockLease {
            key: key.to_string(),
            token,
            backend: LockBackend::Local,
        })
    }

    pub async fn acquire_default(&self, key: &str) -> Option<LockLease> {
        self.acquire(key, self.default_ttl).await
    }

    /// Best-effort, idempotent release. Never fails.
    pub async fn release(&self, lease: LockLease) {
        let released = match (lease.backend, &self.shared) {
            (LockBackend::Shared, Some(shared)) => {
                match shared.release(&lease.key, &lease.token).await {
                    Ok(released) => released,
                    Err(e) => {
                        warn!(key = %lease.key, error = %e, "Lock release failed, TTL will expire it");
                        false
                    }
                }
            }
            _ => self.local.release_if_owner(&lease.key, &lease.token),
        };
        debug!(key = %lease.key, backend = lease.backend.as_str(), released, "Lock released");
    }
}

fn record_attempt(backend: LockBackend, acquired: bool) {
    metrics::counter!(
        "lock_acquire_total",
        "backend" => backend.as_str(),
        "outcome" => if acquired { "acquired" } else { "contended" }
    )
    .increment(1);
}
