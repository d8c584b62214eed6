use alivemon::{
    ID_POOL_NAME, IdAllocator, MonitorError, MonitorProfile, MonitorStore, MonitoringInfo, MonitoringState, StoreError,
};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use libsql::{Row, params, params::IntoParams};
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::Mutex;

use crate::pool::LibsqlPool;

/// LibSQL database implementation of the engine's store and ID pool
pub struct DatabaseImpl {
    pool: LibsqlPool,
    id_range: (u32, u32),
    allocation: Mutex<()>,
}

/// Text form of a unit enum, as its serde name
fn enum_to_text<T: Serialize>(value: &T) -> Result<String> {
    match serde_json::to_value(value)? {
        serde_json::Value::String(text) => Ok(text),
        other => Err(anyhow!("expected a unit variant, got {other}")),
    }
}

fn enum_from_text<T: DeserializeOwned>(text: String) -> Result<T> {
    Ok(serde_json::from_value(serde_json::Value::String(text))?)
}

fn store_error(error: anyhow::Error) -> StoreError {
    StoreError::Backend(format!("{error:#}"))
}

fn profile_from_row(row: &Row) -> Result<MonitorProfile> {
    Ok(MonitorProfile {
        failure_threshold: row.get::<i64>(0)?.try_into()?,
        probe_interval_ms: row.get::<i64>(1)?.try_into()?,
        monitor_window: row.get::<i64>(2)?.try_into()?,
        protocol_type: enum_from_text(row.get(3)?)?,
    })
}

fn info_from_row(row: &Row) -> Result<MonitoringInfo> {
    let destination: Option<String> = row.get(3)?;
    Ok(MonitoringInfo {
        id: row.get::<i64>(0)?.try_into()?,
        mode: enum_from_text(row.get(1)?)?,
        source: serde_json::from_str(&row.get::<String>(2)?)?,
        destination: destination.map(|text| serde_json::from_str(&text)).transpose()?,
        profile_id: row.get::<i64>(4)?.try_into()?,
    })
}

fn state_from_row(row: &Row) -> Result<MonitoringState> {
    Ok(MonitoringState {
        monitor_key: row.get(0)?,
        monitor_id: row.get::<i64>(1)?.try_into()?,
        status: enum_from_text(row.get(2)?)?,
        state: enum_from_text(row.get(3)?)?,
        request_count: row.get::<i64>(4)?.try_into()?,
        response_pending_count: row.get::<i64>(5)?.try_into()?,
    })
}

impl DatabaseImpl {
    /// Create a new database instance from a pool
    pub fn new_from_pool(pool: LibsqlPool) -> Self {
        Self { pool, id_range: (1, 65535), allocation: Mutex::new(()) }
    }

    /// Restrict allocated ids to `low..=high`
    pub fn with_id_range(mut self, low: u32, high: u32) -> Self {
        self.id_range = (low, high);
        self
    }

    /// Get a connection from the pool
    async fn get_conn(&self) -> Result<deadpool::managed::Object<crate::pool::LibsqlManager>> {
        Ok(self.pool.get().await?)
    }

    async fn execute(&self, sql: &str, params: impl IntoParams + Send) -> Result<(), StoreError> {
        let conn = self.get_conn().await.map_err(store_error)?;
        conn.execute(sql, params).await.map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn query_one<T>(
        &self,
        sql: &str,
        params: impl IntoParams + Send,
        decode: fn(&Row) -> Result<T>,
    ) -> Result<Option<T>> {
        let conn = self.get_conn().await?;
        let mut rows = conn.query(sql, params).await?;
        match rows.next().await? {
            Some(row) => Ok(Some(decode(&row)?)),
            None => Ok(None),
        }
    }

    async fn allocate_id(&self, key: &str) -> Result<u32> {
        let _allocation = self.allocation.lock().await;
        let conn = self.get_conn().await?;

        let mut rows = conn
            .query("SELECT id FROM id_pool WHERE pool = ? AND id_key = ?", params![ID_POOL_NAME, key])
            .await?;
        if let Some(row) = rows.next().await? {
            return Ok(row.get::<i64>(0)?.try_into()?);
        }

        // lowest id not yet taken
        let (low, high) = self.id_range;
        let mut candidate = i64::from(low);
        let mut rows = conn.query("SELECT id FROM id_pool WHERE pool = ? ORDER BY id", params![ID_POOL_NAME]).await?;
        while let Some(row) = rows.next().await? {
            let taken: i64 = row.get(0)?;
            if taken < candidate {
                continue;
            }
            if taken > candidate {
                break;
            }
            candidate += 1;
        }
        if candidate > i64::from(high) {
            return Err(anyhow!("ID pool {ID_POOL_NAME} is exhausted"));
        }

        conn.execute(
            "INSERT INTO id_pool (pool, id_key, id) VALUES (?, ?, ?)",
            params![ID_POOL_NAME, key, candidate],
        )
        .await?;
        tracing::debug!(key, id = candidate, "Allocated id");
        Ok(candidate.try_into()?)
    }
}

#[async_trait]
impl MonitorStore for DatabaseImpl {
    async fn get_profile(&self, profile_id: u32) -> Result<Option<MonitorProfile>, StoreError> {
        self.query_one(
            "SELECT failure_threshold, probe_interval_ms, monitor_window, protocol FROM monitor_profiles WHERE id = ?",
            params![i64::from(profile_id)],
            profile_from_row,
        )
        .await
        .map_err(store_error)
    }

    async fn put_profile(&self, profile_id: u32, profile: &MonitorProfile) -> Result<(), StoreError> {
        let protocol = enum_to_text(&profile.protocol_type).map_err(store_error)?;
        self.execute(
            "INSERT OR REPLACE INTO monitor_profiles (id, failure_threshold, probe_interval_ms, monitor_window, protocol) VALUES (?, ?, ?, ?, ?)",
            params![
                i64::from(profile_id),
                i64::from(profile.failure_threshold),
                profile.probe_interval_ms as i64,
                i64::from(profile.monitor_window),
                protocol
            ],
        )
        .await
    }

    async fn delete_profile(&self, profile_id: u32) -> Result<(), StoreError> {
        self.execute("DELETE FROM monitor_profiles WHERE id = ?", params![i64::from(profile_id)]).await
    }

    async fn get_monitoring_info(&self, monitor_id: u32) -> Result<Option<MonitoringInfo>, StoreError> {
        self.query_one(
            "SELECT id, mode, source, destination, profile_id FROM monitoring_info WHERE id = ?",
            params![i64::from(monitor_id)],
            info_from_row,
        )
        .await
        .map_err(store_error)
    }

    async fn put_monitoring_info(&self, info: &MonitoringInfo) -> Result<(), StoreError> {
        let codec = |e: serde_json::Error| StoreError::Codec(e.to_string());
        let mode = enum_to_text(&info.mode).map_err(store_error)?;
        let source = serde_json::to_string(&info.source).map_err(codec)?;
        let destination = info.destination.as_ref().map(serde_json::to_string).transpose().map_err(codec)?;

        self.execute(
            "INSERT OR REPLACE INTO monitoring_info (id, mode, source, destination, profile_id) VALUES (?, ?, ?, ?, ?)",
            params![i64::from(info.id), mode, source, destination, i64::from(info.profile_id)],
        )
        .await
    }

    async fn delete_monitoring_info(&self, monitor_id: u32) -> Result<(), StoreError> {
        self.execute("DELETE FROM monitoring_info WHERE id = ?", params![i64::from(monitor_id)]).await
    }

    async fn list_monitoring_infos(&self) -> Result<Vec<MonitoringInfo>, StoreError> {
        let load = async {
            let conn = self.get_conn().await?;
            let mut rows = conn
                .query("SELECT id, mode, source, destination, profile_id FROM monitoring_info ORDER BY id", ())
                .await?;

            let mut infos = Vec::new();
            while let Some(row) = rows.next().await? {
                infos.push(info_from_row(&row)?);
            }
            Ok::<_, anyhow::Error>(infos)
        };
        load.await.map_err(store_error)
    }

    async fn get_monitoring_state(&self, monitor_key: &str) -> Result<Option<MonitoringState>, StoreError> {
        self.query_one(
            "SELECT monitor_key, monitor_id, status, state, request_count, response_pending_count FROM monitoring_state WHERE monitor_key = ?",
            params![monitor_key],
            state_from_row,
        )
        .await
        .map_err(store_error)
    }

    async fn put_monitoring_state(&self, state: &MonitoringState) -> Result<(), StoreError> {
        let status = enum_to_text(&state.status).map_err(store_error)?;
        let liveness = enum_to_text(&state.state).map_err(store_error)?;
        self.execute(
            "INSERT OR REPLACE INTO monitoring_state (monitor_key, monitor_id, status, state, request_count, response_pending_count) VALUES (?, ?, ?, ?, ?, ?)",
            params![
                state.monitor_key.as_str(),
                i64::from(state.monitor_id),
                status,
                liveness,
                state.request_count as i64,
                i64::from(state.response_pending_count)
            ],
        )
        .await
    }

    async fn delete_monitoring_state(&self, monitor_key: &str) -> Result<(), StoreError> {
        self.execute("DELETE FROM monitoring_state WHERE monitor_key = ?", params![monitor_key]).await
    }

    async fn get_monitor_key(&self, monitor_id: u32) -> Result<Option<String>, StoreError> {
        self.query_one(
            "SELECT monitor_key FROM monitor_keys WHERE monitor_id = ?",
            params![i64::from(monitor_id)],
            |row| Ok(row.get::<String>(0)?),
        )
        .await
        .map_err(store_error)
    }

    async fn put_monitor_key(&self, monitor_id: u32, monitor_key: &str) -> Result<(), StoreError> {
        self.execute(
            "INSERT OR REPLACE INTO monitor_keys (monitor_id, monitor_key) VALUES (?, ?)",
            params![i64::from(monitor_id), monitor_key],
        )
        .await
    }

    async fn delete_monitor_key(&self, monitor_id: u32) -> Result<(), StoreError> {
        self.execute("DELETE FROM monitor_keys WHERE monitor_id = ?", params![i64::from(monitor_id)]).await
    }

    async fn get_interface_monitors(&self, interface: &str) -> Result<Vec<u32>, StoreError> {
        let load = async {
            let conn = self.get_conn().await?;
            let mut rows = conn
                .query(
                    "SELECT monitor_id FROM interface_monitors WHERE interface = ? ORDER BY monitor_id",
                    params![interface],
                )
                .await?;

            let mut monitors: Vec<u32> = Vec::new();
            while let Some(row) = rows.next().await? {
                monitors.push(row.get::<i64>(0)?.try_into()?);
            }
            Ok::<_, anyhow::Error>(monitors)
        };
        load.await.map_err(store_error)
    }

    async fn add_interface_monitor(&self, interface: &str, monitor_id: u32) -> Result<(), StoreError> {
        self.execute(
            "INSERT OR IGNORE INTO interface_monitors (interface, monitor_id) VALUES (?, ?)",
            params![interface, i64::from(monitor_id)],
        )
        .await
    }

    async fn remove_interface_monitor(&self, interface: &str, monitor_id: u32) -> Result<(), StoreError> {
        self.execute(
            "DELETE FROM interface_monitors WHERE interface = ? AND monitor_id = ?",
            params![interface, i64::from(monitor_id)],
        )
        .await
    }
}

#[async_trait]
impl IdAllocator for DatabaseImpl {
    async fn allocate(&self, key: &str) -> Result<u32, MonitorError> {
        self.allocate_id(key).await.map_err(|e| MonitorError::IdAllocation(format!("{e:#}")))
    }

    async fn release(&self, key: &str) -> Result<(), MonitorError> {
        self.execute("DELETE FROM id_pool WHERE pool = ? AND id_key = ?", params![ID_POOL_NAME, key])
            .await
            .map_err(|e| MonitorError::IdAllocation(e.to_string()))
    }
}
