//! Process-local lock map used when the shared store is unreachable

use std::time::Duration;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::time::Instant;
use tracing::debug;

use super::{LockStore, LockStoreError};

#[derive(Debug, Clone)]
struct LocalEntry {
    token: String,
    expires_at: Instant,
}

/// `key -> (token, expiry)` map with the same set-if-absent semantics as
/// the shared store. Expired entries are treated as absent.
#[derive(Debug, Default)]
pub struct LocalLockStore {
    entries: DashMap<String, LocalEntry>,
}

impl LocalLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop expired entries, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        let purged = before.saturating_sub(self.entries.len());
        if purged > 0 {
            debug!(purged, "Purged expired local locks");
        }
        purged
    }

    /// Number of entries currently held, expired ones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn try_acquire(&self, key: &str, token: &str, ttl: Duration) -> bool {
        let now = Instant::now();
        let fresh = LocalEntry {
            token: token.to_string(),
            expires_at: now + ttl,
        };
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().expires_at <= now {
                    occupied.insert(fresh);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(fresh);
                true
            }
        }
    }

    pub fn release_if_owner(&self, key: &str, token: &str) -> bool {
        self.entries
            .remove_if(key, |_, entry| entry.token == token)
            .is_some()
    }
}

#[async_trait]
impl LockStore for LocalLockStore {
    async fn set_nx_ex(&self, key: &str, token: &str, ttl: Duration) -> Result<bool, LockStoreError> {
        Ok(self.try_acquire(key, token, ttl))
    }

    async fn release(&self, key: &str, token: &str) -> Result<bool, LockStoreError> {
        Ok(self.release_if_owner(key, token))
    }

    fn backend(&self) -> &'static str {
        "local"
    }
}
