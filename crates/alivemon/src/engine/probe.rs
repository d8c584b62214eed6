use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::AlivenessMonitor;
use super::state::{on_probe_sent, on_response};
use crate::error::{LockError, MonitorError};
use crate::types::{MonitorStatus, MonitoringInfo, PortContext};

impl AlivenessMonitor {
    /// Scheduler callback; failures abandon the tick, the next one retries
    pub(super) async fn tick(&self, info: &MonitoringInfo) {
        if let Err(e) = self.run_tick(info).await {
            warn!(monitor_id = info.id, "Probe tick abandoned: {}", e);
        }
    }

    /// Run one probe tick for a monitor outside its schedule
    pub async fn probe(&self, monitor_id: u32) -> Result<(), MonitorError> {
        let info = self
            .store
            .get_monitoring_info(monitor_id)
            .await?
            .ok_or(MonitorError::MonitorNotFound(monitor_id))?;
        self.run_tick(&info).await
    }

    async fn run_tick(&self, info: &MonitoringInfo) -> Result<(), MonitorError> {
        let Some(key) = self.keys.get(info.id).await? else {
            debug!(monitor_id = info.id, "No monitor key, monitor was stopped");
            return Ok(());
        };
        let Some(profile) = self.store.get_profile(info.profile_id).await? else {
            warn!(monitor_id = info.id, profile_id = info.profile_id, "Monitor profile is gone, skipping probe");
            return Ok(());
        };
        let handler = self
            .protocols
            .get(profile.protocol_type)
            .ok_or(MonitorError::UnsupportedProtocol(profile.protocol_type))?;

        let _guard = match self.lock_key(&key, self.config.lock_timeout()).await {
            Ok(guard) => guard,
            Err(LockError::UnknownKey(_)) => return Ok(()),
            Err(LockError::TimedOut(key)) => return Err(MonitorError::LockTimeout(key)),
        };

        let Some(mut state) = self.store.get_monitoring_state(&key).await? else {
            trace!(monitor_id = info.id, key = %key, "No state for monitor key");
            return Ok(());
        };
        if state.status != MonitorStatus::Started {
            trace!(monitor_id = info.id, status = %state.status, "Monitor not started, skipping probe");
            return Ok(());
        }

        let transition = on_probe_sent(&mut state, &profile);
        self.store.put_monitoring_state(&state).await?;
        debug!(
            monitor_id = info.id,
            pending = state.response_pending_count,
            requests = state.request_count,
            "Sending probe"
        );

        if let Some(liveness) = transition {
            info!(monitor_id = info.id, key = %key, "Monitor state changed to {}", liveness);
            self.notify(info.id, liveness).await;
        }

        if let Err(e) = handler.send(info).await {
            warn!(monitor_id = info.id, key = %key, "Failed to send probe: {}", e);
        }
        Ok(())
    }

    /// Correlate a received frame to its monitor and mark it responsive.
    ///
    /// Frames no handler recognizes are ignored.
    pub async fn handle_packet(&self, frame: &[u8], context: &PortContext) -> Result<(), MonitorError> {
        let Some(handler) = self.protocols.for_frame(frame) else {
            trace!(len = frame.len(), "No protocol handler for received frame");
            return Ok(());
        };
        let Some(key) = handler.on_receive(frame, context).await else {
            return Ok(());
        };

        let _guard = match self.lock_key(&key, self.config.lock_timeout()).await {
            Ok(guard) => guard,
            Err(LockError::UnknownKey(_)) => {
                trace!(key = %key, "Response for unmonitored key");
                return Ok(());
            }
            Err(LockError::TimedOut(key)) => return Err(MonitorError::LockTimeout(key)),
        };

        let Some(mut state) = self.store.get_monitoring_state(&key).await? else {
            trace!(key = %key, "No state for monitor key");
            return Ok(());
        };

        let pending = state.response_pending_count;
        let transition = on_response(&mut state);
        if transition.is_none() && pending == 0 {
            return Ok(());
        }
        self.store.put_monitoring_state(&state).await?;

        if let Some(liveness) = transition {
            info!(monitor_id = state.monitor_id, key = %key, "Monitor state changed to {}", liveness);
            self.notify(state.monitor_id, liveness).await;
        }
        Ok(())
    }

    /// Queue a received frame on the packet pool
    pub fn dispatch_packet(self: &Arc<Self>, frame: Vec<u8>, context: PortContext) -> JoinHandle<()> {
        let engine = self.clone();
        let workers = self.packet_workers.clone();

        self.runtime.spawn(async move {
            let Ok(_permit) = workers.acquire_owned().await else {
                return;
            };
            if let Err(e) = engine.handle_packet(&frame, &context).await {
                warn!(lport_tag = context.lport_tag, "Failed to process received packet: {}", e);
            }
        })
    }
}
