//! Persistence seam of the engine.
//!
//! The store is the single source of truth for session durability. Each
//! operation is expected to be atomic on its own; read-modify-write sequences
//! are serialized by the engine's per-key locks, not by the store.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::types::{MonitorProfile, MonitoringInfo, MonitoringState};

/// Store trait for abstracting persistence of profiles and sessions.
///
/// All writes are upserts and all deletes tolerate absent records.
#[async_trait]
pub trait MonitorStore: Send + Sync {
    /// Get a profile by id
    async fn get_profile(&self, profile_id: u32) -> Result<Option<MonitorProfile>, StoreError>;

    /// Save a profile under `profile_id`
    async fn put_profile(&self, profile_id: u32, profile: &MonitorProfile) -> Result<(), StoreError>;

    /// Delete a profile
    async fn delete_profile(&self, profile_id: u32) -> Result<(), StoreError>;

    /// Get the immutable half of a session
    async fn get_monitoring_info(&self, monitor_id: u32) -> Result<Option<MonitoringInfo>, StoreError>;

    /// Save the immutable half of a session
    async fn put_monitoring_info(&self, info: &MonitoringInfo) -> Result<(), StoreError>;

    /// Delete the immutable half of a session
    async fn delete_monitoring_info(&self, monitor_id: u32) -> Result<(), StoreError>;

    /// Every persisted session, ordered by monitor id
    async fn list_monitoring_infos(&self) -> Result<Vec<MonitoringInfo>, StoreError>;

    /// Get the mutable half of a session by monitor key
    async fn get_monitoring_state(&self, monitor_key: &str) -> Result<Option<MonitoringState>, StoreError>;

    /// Save the mutable half of a session
    async fn put_monitoring_state(&self, state: &MonitoringState) -> Result<(), StoreError>;

    /// Delete the mutable half of a session
    async fn delete_monitoring_state(&self, monitor_key: &str) -> Result<(), StoreError>;

    /// Get the monitor key recorded for a monitor id
    async fn get_monitor_key(&self, monitor_id: u32) -> Result<Option<String>, StoreError>;

    /// Record the monitor key of a monitor id
    async fn put_monitor_key(&self, monitor_id: u32, monitor_key: &str) -> Result<(), StoreError>;

    /// Forget the monitor key of a monitor id
    async fn delete_monitor_key(&self, monitor_id: u32) -> Result<(), StoreError>;

    /// Get the monitors anchored on an interface
    async fn get_interface_monitors(&self, interface: &str) -> Result<Vec<u32>, StoreError>;

    /// Associate a monitor with an interface
    async fn add_interface_monitor(&self, interface: &str, monitor_id: u32) -> Result<(), StoreError>;

    /// Remove a monitor from an interface's association set
    async fn remove_interface_monitor(&self, interface: &str, monitor_id: u32) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
struct Tables {
    profiles: HashMap<u32, MonitorProfile>,
    infos: HashMap<u32, MonitoringInfo>,
    states: HashMap<String, MonitoringState>,
    keys: HashMap<u32, String>,
    interfaces: HashMap<String, BTreeSet<u32>>,
}

/// Store kept entirely in process memory
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of persisted session states
    pub async fn session_count(&self) -> usize {
        self.tables.read().await.states.len()
    }
}

#[async_trait]
impl MonitorStore for InMemoryStore {
    async fn get_profile(&self, profile_id: u32) -> Result<Option<MonitorProfile>, StoreError> {
        Ok(self.tables.read().await.profiles.get(&profile_id).cloned())
    }

    async fn put_profile(&self, profile_id: u32, profile: &MonitorProfile) -> Result<(), StoreError> {
        self.tables.write().await.profiles.insert(profile_id, profile.clone());
        Ok(())
    }

    async fn delete_profile(&self, profile_id: u32) -> Result<(), StoreError> {
        self.tables.write().await.profiles.remove(&profile_id);
        Ok(())
    }

    async fn get_monitoring_info(&self, monitor_id: u32) -> Result<Option<MonitoringInfo>, StoreError> {
        Ok(self.tables.read().await.infos.get(&monitor_id).cloned())
    }

    async fn put_monitoring_info(&self, info: &MonitoringInfo) -> Result<(), StoreError> {
        self.tables.write().await.infos.insert(info.id, info.clone());
        Ok(())
    }

    async fn delete_monitoring_info(&self, monitor_id: u32) -> Result<(), StoreError> {
        self.tables.write().await.infos.remove(&monitor_id);
        Ok(())
    }

    async fn list_monitoring_infos(&self) -> Result<Vec<MonitoringInfo>, StoreError> {
        let mut infos: Vec<MonitoringInfo> = self.tables.read().await.infos.values().cloned().collect();
        infos.sort_by_key(|info| info.id);
        Ok(infos)
    }

    async fn get_monitoring_state(&self, monitor_key: &str) -> Result<Option<MonitoringState>, StoreError> {
        Ok(self.tables.read().await.states.get(monitor_key).cloned())
    }

    async fn put_monitoring_state(&self, state: &MonitoringState) -> Result<(), StoreError> {
        self.tables.write().await.states.insert(state.monitor_key.clone(), state.clone());
        Ok(())
    }

    async fn delete_monitoring_state(&self, monitor_key: &str) -> Result<(), StoreError> {
        self.tables.write().await.states.remove(monitor_key);
        Ok(())
    }

    async fn get_monitor_key(&self, monitor_id: u32) -> Result<Option<String>, StoreError> {
        Ok(self.tables.read().await.keys.get(&monitor_id).cloned())
    }

    async fn put_monitor_key(&self, monitor_id: u32, monitor_key: &str) -> Result<(), StoreError> {
        self.tables.write().await.keys.insert(monitor_id, monitor_key.to_string());
        Ok(())
    }

    async fn delete_monitor_key(&self, monitor_id: u32) -> Result<(), StoreError> {
        self.tables.write().await.keys.remove(&monitor_id);
        Ok(())
    }

    async fn get_interface_monitors(&self, interface: &str) -> Result<Vec<u32>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .interfaces
            .get(interface)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn add_interface_monitor(&self, interface: &str, monitor_id: u32) -> Result<(), StoreError> {
        self.tables
            .write()
            .await
            .interfaces
            .entry(interface.to_string())
            .or_default()
            .insert(monitor_id);
        Ok(())
    }

    async fn remove_interface_monitor(&self, interface: &str, monitor_id: u32) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(ids) = tables.interfaces.get_mut(interface) {
            ids.remove(&monitor_id);
            if ids.is_empty() {
                tables.interfaces.remove(interface);
            }
        }
        Ok(())
    }
}
