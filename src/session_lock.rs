//! Per-session mutual exclusion (§4.9).
//!
//! Separate from message storage: the orchestrator serializes all processing
//! for a given session through this registry before touching conversation or
//! agent state, so two concurrent requests for the same session never race.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// Holds the per-session lock for as long as it is alive.
pub struct SessionLockGuard {
    _guard: OwnedMutexGuard<()>,
}

pub struct SessionLockRegistry {
    locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
}

impl SessionLockRegistry {
    pub fn new() -> Self {
        Self { locks: RwLock::new(HashMap::new()) }
    }

    async fn entry(&self, session_id: &str) -> Arc<Mutex<()>> {
        if let Some(lock) = self.locks.read().await.get(session_id) {
            return lock.clone();
        }
        let mut map = self.locks.write().await;
        map.entry(session_id.to_owned())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Acquire the lock for `session_id`, blocking until it is free. Holding
    /// the returned guard serializes every other `lock()` call for the same
    /// session, but never blocks other sessions.
    pub async fn lock(&self, session_id: &str) -> SessionLockGuard {
        let arc = self.entry(session_id).await;
        let guard = arc.lock_owned().await;
        SessionLockGuard { _guard: guard }
    }

    /// Drop the entry for `session_id` once it is known idle, so the map does
    /// not grow unboundedly across the session's lifetime. Safe to call while
    /// a guard for a different key is held; racing with a concurrent `lock()`
    /// for the same key simply recreates the entry.
    pub async fn forget(&self, session_id: &str) {
        self.locks.write().await.remove(session_id);
    }

    pub async fn session_count(&self) -> usize {
        self.locks.read().await.len()
    }
}

impl Default for SessionLockRegistry {
    fn default() -> Self {
        Self::new()
    }
}
