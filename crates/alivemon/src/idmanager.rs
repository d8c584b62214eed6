//! Numeric ID allocation.
//!
//! IDs are allocated against a string key: allocating the same key twice
//! yields the same ID until the key is released.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::Mutex;

use crate::error::MonitorError;

/// ID allocator trait - owns uniqueness of monitor and profile IDs
#[async_trait]
pub trait IdAllocator: Send + Sync {
    /// Allocate (or look up) the ID bound to `key`
    async fn allocate(&self, key: &str) -> Result<u32, MonitorError>;

    /// Release the ID bound to `key`; unknown keys are ignored
    async fn release(&self, key: &str) -> Result<(), MonitorError>;
}

#[derive(Debug)]
struct PoolState {
    next: u32,
    released: BTreeSet<u32>,
    by_key: HashMap<String, u32>,
}

/// In-process ID pool over an inclusive range
#[derive(Debug)]
pub struct LocalIdPool {
    low: u32,
    high: u32,
    state: Mutex<PoolState>,
}

impl LocalIdPool {
    pub fn new(low: u32, high: u32) -> Self {
        Self {
            low,
            high,
            state: Mutex::new(PoolState { next: low, released: BTreeSet::new(), by_key: HashMap::new() }),
        }
    }
}

impl Default for LocalIdPool {
    fn default() -> Self {
        Self::new(1, 65535)
    }
}

#[async_trait]
impl IdAllocator for LocalIdPool {
    async fn allocate(&self, key: &str) -> Result<u32, MonitorError> {
        let mut state = self.state.lock().await;
        if let Some(id) = state.by_key.get(key) {
            return Ok(*id);
        }

        let id = if let Some(id) = state.released.pop_first() {
            id
        } else if state.next <= self.high {
            let id = state.next;
            state.next += 1;
            id
        } else {
            return Err(MonitorError::IdAllocation(format!(
                "ID pool [{}, {}] exhausted",
                self.low, self.high
            )));
        };

        state.by_key.insert(key.to_string(), id);
        Ok(id)
    }

    async fn release(&self, key: &str) -> Result<(), MonitorError> {
        let mut state = self.state.lock().await;
        if let Some(id) = state.by_key.remove(key) {
            state.released.insert(id);
        }
        Ok(())
    }
}
