use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{AlivenessMonitor, Registered};
use crate::error::{LockError, MonitorError};
use crate::lock::KeyGuard;
use crate::types::{
    EndpointType, MonitorProfile, MonitorStatus, MonitoringInfo, MonitoringMode, MonitoringState,
};

/// Which persisted statuses a suspend may act on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SuspendGuard {
    /// Caller-requested pause
    Started,

    /// Interface went down; anything still alive is parked
    NotStopped,
}

fn validate_profile(profile: &MonitorProfile) -> Result<(), MonitorError> {
    if profile.probe_interval_ms == 0 {
        return Err(MonitorError::InvalidProfile("probe interval must be positive".to_string()));
    }
    if profile.monitor_window == 0 {
        return Err(MonitorError::InvalidProfile("monitor window must be positive".to_string()));
    }
    if profile.failure_threshold == 0 || profile.failure_threshold > profile.monitor_window {
        return Err(MonitorError::InvalidProfile(format!(
            "failure threshold {} must be between 1 and the window {}",
            profile.failure_threshold, profile.monitor_window
        )));
    }
    Ok(())
}

impl AlivenessMonitor {
    /// Create a profile, or return the id of an identical one
    pub async fn create_profile(&self, profile: MonitorProfile) -> Result<Registered, MonitorError> {
        validate_profile(&profile)?;

        let profile_id = self.ids.allocate(&profile.id_key()).await?;
        if self.store.get_profile(profile_id).await?.is_some() {
            warn!(profile_id, "Monitor profile already exists");
            return Ok(Registered::Existing(profile_id));
        }

        self.store.put_profile(profile_id, &profile).await?;
        info!(
            profile_id,
            protocol = %profile.protocol_type,
            interval_ms = profile.probe_interval_ms,
            "Created monitor profile"
        );
        Ok(Registered::Created(profile_id))
    }

    /// Delete a profile and release its id.
    ///
    /// Monitors still referring to the profile keep running until their next
    /// tick finds it gone.
    pub async fn delete_profile(&self, profile_id: u32) -> Result<(), MonitorError> {
        let profile = self
            .store
            .get_profile(profile_id)
            .await?
            .ok_or(MonitorError::ProfileNotFound(profile_id))?;

        self.store.delete_profile(profile_id).await?;
        self.ids.release(&profile.id_key()).await?;
        info!(profile_id, "Deleted monitor profile");
        Ok(())
    }

    pub async fn profile(&self, profile_id: u32) -> Result<Option<MonitorProfile>, MonitorError> {
        Ok(self.store.get_profile(profile_id).await?)
    }

    pub async fn monitoring_info(&self, monitor_id: u32) -> Result<Option<MonitoringInfo>, MonitorError> {
        Ok(self.store.get_monitoring_info(monitor_id).await?)
    }

    /// Current state of a monitor, looked up through its monitor key
    pub async fn monitoring_state(&self, monitor_id: u32) -> Result<Option<MonitoringState>, MonitorError> {
        match self.keys.get(monitor_id).await? {
            Some(key) => Ok(self.store.get_monitoring_state(&key).await?),
            None => Ok(None),
        }
    }

    pub async fn monitor_key(&self, monitor_id: u32) -> Result<Option<String>, MonitorError> {
        Ok(self.keys.get(monitor_id).await?)
    }

    /// Start monitoring `source` (and `destination`) under a profile.
    ///
    /// Starting a session whose monitor key or endpoints are already
    /// registered is not an error: the existing id is returned.
    pub async fn start_monitor(
        self: &Arc<Self>,
        profile_id: u32,
        source: EndpointType,
        destination: Option<EndpointType>,
        mode: MonitoringMode,
    ) -> Result<Registered, MonitorError> {
        let profile = self
            .store
            .get_profile(profile_id)
            .await?
            .ok_or(MonitorError::ProfileNotFound(profile_id))?;

        if mode != MonitoringMode::OneOne {
            return Err(MonitorError::UnsupportedMode(mode));
        }
        let interface = match source.interface_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => return Err(MonitorError::MissingInterfaceName),
        };
        let handler = self
            .protocols
            .get(profile.protocol_type)
            .ok_or(MonitorError::UnsupportedProtocol(profile.protocol_type))?;

        let mut info = MonitoringInfo { id: 0, mode, source, destination, profile_id };
        let monitor_key = handler.unique_key(&info)?;

        if let Some(state) = self.store.get_monitoring_state(&monitor_key).await? {
            warn!(monitor_id = state.monitor_id, key = %monitor_key, "Monitoring session already registered");
            self.adopt_existing(state.monitor_id).await;
            return Ok(Registered::Existing(state.monitor_id));
        }

        let id_key = info.id_key(&monitor_key);
        info.id = self.ids.allocate(&id_key).await?;
        if self.store.get_monitoring_info(info.id).await?.is_some() {
            warn!(monitor_id = info.id, key = %monitor_key, "Monitoring session already registered");
            self.adopt_existing(info.id).await;
            return Ok(Registered::Existing(info.id));
        }

        if let Err(e) = self.persist_session(&info, &monitor_key, &interface).await {
            self.discard_session(&info, &monitor_key, &interface).await;
            if let Err(release) = self.ids.release(&id_key).await {
                warn!(monitor_id = info.id, "Failed to release id of abandoned session: {}", release);
            }
            return Err(e);
        }

        self.keys.insert(info.id, monitor_key.clone()).await;
        self.locks.register(&monitor_key);

        info!(
            monitor_id = info.id,
            key = %monitor_key,
            interval_ms = profile.probe_interval_ms,
            "Started monitoring session"
        );
        let monitor_id = info.id;
        self.arm(info, profile.probe_interval());
        Ok(Registered::Created(monitor_id))
    }

    async fn persist_session(
        &self,
        info: &MonitoringInfo,
        monitor_key: &str,
        interface: &str,
    ) -> Result<(), MonitorError> {
        self.store.put_monitoring_info(info).await?;
        self.store
            .put_monitoring_state(&MonitoringState::started(monitor_key.to_string(), info.id))
            .await?;
        self.store.put_monitor_key(info.id, monitor_key).await?;
        self.store.add_interface_monitor(interface, info.id).await?;
        Ok(())
    }

    /// Remove whatever a failed start managed to persist
    async fn discard_session(&self, info: &MonitoringInfo, monitor_key: &str, interface: &str) {
        let monitor_id = info.id;
        let results = [
            self.store.remove_interface_monitor(interface, monitor_id).await,
            self.store.delete_monitor_key(monitor_id).await,
            self.store.delete_monitoring_state(monitor_key).await,
            self.store.delete_monitoring_info(monitor_id).await,
        ];
        for result in results {
            if let Err(e) = result {
                warn!(monitor_id, key = %monitor_key, "Failed to discard partial session: {}", e);
            }
        }
    }

    /// Re-establish every session persisted by a previous run.
    ///
    /// Each session gets its key lock and cache entry back, and Started ones
    /// are re-armed. Returns the number of re-armed sessions.
    pub async fn restore(self: &Arc<Self>) -> Result<usize, MonitorError> {
        let infos = self.store.list_monitoring_infos().await?;
        let total = infos.len();
        let mut armed = 0;

        for info in infos {
            let monitor_id = info.id;
            match self.adopt(info).await {
                Ok(true) => armed += 1,
                Ok(false) => {}
                Err(e) => warn!(monitor_id, "Failed to restore monitoring session: {}", e),
            }
        }

        info!(sessions = total, armed, "Restored monitoring sessions");
        Ok(armed)
    }

    async fn adopt_existing(self: &Arc<Self>, monitor_id: u32) {
        let info = match self.store.get_monitoring_info(monitor_id).await {
            Ok(Some(info)) => info,
            Ok(None) => return,
            Err(e) => {
                warn!(monitor_id, "Failed to load existing session: {}", e);
                return;
            }
        };
        if let Err(e) = self.adopt(info).await {
            warn!(monitor_id, "Failed to take over existing session: {}", e);
        }
    }

    /// Bring a persisted session under this engine's control.
    ///
    /// Returns whether its probe timer was armed.
    async fn adopt(self: &Arc<Self>, info: MonitoringInfo) -> Result<bool, MonitorError> {
        let monitor_id = info.id;
        let Some(key) = self.store.get_monitor_key(monitor_id).await? else {
            warn!(monitor_id, "Stored session has no monitor key");
            return Ok(false);
        };

        self.locks.register(&key);
        let _held = self.lock_for_control(monitor_id, &key).await?;
        let Some(state) = self.store.get_monitoring_state(&key).await? else {
            warn!(monitor_id, key = %key, "Stored session has no state");
            return Ok(false);
        };

        self.keys.insert(monitor_id, key.clone()).await;
        if let Some(interface) = info.source_interface() {
            self.store.add_interface_monitor(interface, monitor_id).await?;
        }
        if state.status != MonitorStatus::Started || self.scheduler.is_scheduled(monitor_id) {
            return Ok(false);
        }

        let Some(profile) = self.store.get_profile(info.profile_id).await? else {
            warn!(monitor_id, profile_id = info.profile_id, "Profile of stored session is gone, leaving it idle");
            return Ok(false);
        };
        info!(monitor_id, key = %key, interval_ms = profile.probe_interval_ms, "Re-armed stored monitoring session");
        self.arm(info, profile.probe_interval());
        Ok(true)
    }

    /// Pause a Started monitor and cancel its probe timer
    pub async fn pause_monitor(&self, monitor_id: u32) -> Result<(), MonitorError> {
        self.suspend(monitor_id, SuspendGuard::Started).await
    }

    async fn suspend(&self, monitor_id: u32, guard: SuspendGuard) -> Result<(), MonitorError> {
        let key = self.keys.get(monitor_id).await?.ok_or(MonitorError::MonitorNotFound(monitor_id))?;
        self.locks.register(&key);
        let _held = self.lock_for_control(monitor_id, &key).await?;

        let mut state = self
            .store
            .get_monitoring_state(&key)
            .await?
            .ok_or(MonitorError::MonitorNotFound(monitor_id))?;

        let allowed = match guard {
            SuspendGuard::Started => state.status == MonitorStatus::Started,
            SuspendGuard::NotStopped => state.status != MonitorStatus::Stopped,
        };
        if !allowed {
            return Err(MonitorError::NotRunning(monitor_id));
        }

        if state.status != MonitorStatus::Paused {
            state.status = MonitorStatus::Paused;
            self.store.put_monitoring_state(&state).await?;
        }
        self.scheduler.cancel(monitor_id);
        info!(monitor_id, key = %key, "Paused monitoring session");
        Ok(())
    }

    /// Resume a paused monitor at its profile's current interval.
    ///
    /// A monitor that is already Started and scheduled is left alone.
    pub async fn unpause_monitor(self: &Arc<Self>, monitor_id: u32) -> Result<(), MonitorError> {
        let info = self
            .store
            .get_monitoring_info(monitor_id)
            .await?
            .ok_or(MonitorError::MonitorNotFound(monitor_id))?;
        let key = self.keys.get(monitor_id).await?.ok_or(MonitorError::MonitorNotFound(monitor_id))?;
        let profile = self
            .store
            .get_profile(info.profile_id)
            .await?
            .ok_or(MonitorError::ProfileNotFound(info.profile_id))?;

        // the lock table is in-memory, sessions loaded from the store need one
        self.locks.register(&key);
        let _held = self.lock_for_control(monitor_id, &key).await?;

        let mut state = self
            .store
            .get_monitoring_state(&key)
            .await?
            .ok_or(MonitorError::MonitorNotFound(monitor_id))?;

        if state.status == MonitorStatus::Started && self.scheduler.is_scheduled(monitor_id) {
            debug!(monitor_id, "Monitoring session is already running");
            return Ok(());
        }

        state.status = MonitorStatus::Started;
        self.store.put_monitoring_state(&state).await?;
        info!(monitor_id, key = %key, interval_ms = profile.probe_interval_ms, "Resumed monitoring session");
        self.arm(info, profile.probe_interval());
        Ok(())
    }

    /// Stop a monitor and drop everything the engine holds for it
    pub async fn stop_monitor(&self, monitor_id: u32) -> Result<(), MonitorError> {
        let info = self
            .store
            .get_monitoring_info(monitor_id)
            .await?
            .ok_or(MonitorError::MonitorNotFound(monitor_id))?;
        let key = self.keys.get(monitor_id).await?;

        let held = match &key {
            Some(key) => match self.lock_key(key, self.config.control_lock_timeout()).await {
                Ok(guard) => Some(guard),
                Err(LockError::UnknownKey(_)) => None,
                Err(LockError::TimedOut(key)) => return Err(MonitorError::LockTimeout(key)),
            },
            None => None,
        };
        self.scheduler.cancel(monitor_id);

        if let Some(key) = &key {
            self.store.delete_monitoring_state(key).await?;
            if let Err(e) = self.ids.release(&info.id_key(key)).await {
                warn!(monitor_id, "Failed to release monitor id: {}", e);
            }
        }
        self.store.delete_monitoring_info(monitor_id).await?;
        self.store.delete_monitor_key(monitor_id).await?;
        self.keys.invalidate(monitor_id).await;
        if let Some(interface) = info.source_interface() {
            self.store.remove_interface_monitor(interface, monitor_id).await?;
        }

        drop(held);
        if let Some(key) = &key {
            self.locks.remove(key);
        }
        info!(monitor_id, key = ?key, "Stopped monitoring session");
        Ok(())
    }

    /// Park every monitor anchored on an interface that went down
    pub async fn interface_down(&self, interface: &str) -> Result<(), MonitorError> {
        let monitors = self.store.get_interface_monitors(interface).await?;
        info!(interface, count = monitors.len(), "Interface down, pausing monitors");

        for monitor_id in monitors {
            if let Err(e) = self.suspend(monitor_id, SuspendGuard::NotStopped).await {
                warn!(monitor_id, interface, "Failed to pause monitor: {}", e);
            }
        }
        Ok(())
    }

    /// Resume every monitor anchored on an interface that came back up
    pub async fn interface_up(self: &Arc<Self>, interface: &str) -> Result<(), MonitorError> {
        let monitors = self.store.get_interface_monitors(interface).await?;
        info!(interface, count = monitors.len(), "Interface up, resuming monitors");

        for monitor_id in monitors {
            if let Err(e) = self.unpause_monitor(monitor_id).await {
                warn!(monitor_id, interface, "Failed to resume monitor: {}", e);
            }
        }
        Ok(())
    }

    async fn lock_for_control(&self, monitor_id: u32, key: &str) -> Result<KeyGuard, MonitorError> {
        self.lock_key(key, self.config.control_lock_timeout())
            .await
            .map_err(|e| match e {
                LockError::UnknownKey(_) => MonitorError::MonitorNotFound(monitor_id),
                LockError::TimedOut(key) => MonitorError::LockTimeout(key),
            })
    }
}
