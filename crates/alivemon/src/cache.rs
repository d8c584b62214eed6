use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::trace;

use crate::error::StoreError;
use crate::store::MonitorStore;

/// Read-through cache from monitor id to monitor key.
///
/// Spares every probe tick a store round-trip. Entries are loaded on first
/// access and only leave the cache through [`invalidate`](Self::invalidate).
pub struct MonitorIdKeyCache {
    store: Arc<dyn MonitorStore>,
    entries: RwLock<HashMap<u32, String>>,
}

impl MonitorIdKeyCache {
    pub fn new(store: Arc<dyn MonitorStore>) -> Self {
        Self { store, entries: RwLock::new(HashMap::new()) }
    }

    /// Monitor key of `monitor_id`, loading it from the store on a miss
    pub async fn get(&self, monitor_id: u32) -> Result<Option<String>, StoreError> {
        if let Some(key) = self.entries.read().await.get(&monitor_id) {
            return Ok(Some(key.clone()));
        }

        trace!(monitor_id, "Monitor key cache miss");
        let loaded = self.store.get_monitor_key(monitor_id).await?;
        if let Some(key) = &loaded {
            self.entries.write().await.insert(monitor_id, key.clone());
        }
        Ok(loaded)
    }

    /// Seed the cache with a key that was just persisted
    pub async fn insert(&self, monitor_id: u32, monitor_key: String) {
        self.entries.write().await.insert(monitor_id, monitor_key);
    }

    /// Forget `monitor_id`, returning the key it mapped to
    pub async fn invalidate(&self, monitor_id: u32) -> Option<String> {
        self.entries.write().await.remove(&monitor_id)
    }

    /// Whether `monitor_id` is currently cached, without loading it
    pub async fn contains(&self, monitor_id: u32) -> bool {
        self.entries.read().await.contains_key(&monitor_id)
    }
}
