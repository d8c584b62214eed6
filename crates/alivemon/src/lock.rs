//! Per-monitor-key mutual exclusion.
//!
//! Ticks and received responses for the same monitor key read, modify and
//! write the same persisted state, so both run under the key's lock. Waiting
//! is bounded: a caller that cannot get the lock in time gives up its
//! operation instead of seizing the lock from the current holder.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::trace;

use crate::error::LockError;

/// Exclusive hold on a monitor key, released when dropped
pub type KeyGuard = OwnedMutexGuard<()>;

/// Table of monitor key locks
#[derive(Debug, Default)]
pub struct MonitorKeyLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl MonitorKeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the lock for `key` unless it already exists
    pub fn register(&self, key: &str) {
        self.table().entry(key.to_string()).or_default();
    }

    /// Drop the lock for `key`; holders keep their guard until they release it
    pub fn remove(&self, key: &str) -> bool {
        self.table().remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.table().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take the lock for `key`, waiting at most `timeout`
    pub async fn acquire(&self, key: &str, timeout: Duration) -> Result<KeyGuard, LockError> {
        let lock = self
            .table()
            .get(key)
            .cloned()
            .ok_or_else(|| LockError::UnknownKey(key.to_string()))?;

        trace!(key, "Acquiring monitor key lock");
        tokio::time::timeout(timeout, lock.lock_owned())
            .await
            .map_err(|_| LockError::TimedOut(key.to_string()))
    }

    fn table(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<AsyncMutex<()>>>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
