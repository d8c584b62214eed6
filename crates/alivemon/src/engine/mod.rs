//! Aliveness monitor engine - coordinates all components
//!
//! The engine owns the lock table, the ID/key cache and the probe scheduler,
//! and drives them from three directions:
//! - control operations (profiles, start/stop/pause/unpause monitors)
//! - scheduler ticks that send probes and count missing responses
//! - received packets that correlate to a monitor and mark it Up
//!
//! Ticks and responses for the same monitor key are serialized by the key's
//! lock; nothing is ordered across different keys.

mod control;
mod probe;
mod state;

use futures::FutureExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tracing::warn;

use crate::cache::MonitorIdKeyCache;
use crate::config::EngineConfig;
use crate::error::{LockError, MonitorError};
use crate::idmanager::{IdAllocator, LocalIdPool};
use crate::lock::{KeyGuard, MonitorKeyLocks};
use crate::notify::{BroadcastPublisher, EventPublisher};
use crate::protocol::ProtocolRegistry;
use crate::scheduler::{ProbeScheduler, ProbeTask};
use crate::store::{InMemoryStore, MonitorStore};
use crate::types::{LivenessState, MonitorEvent, MonitoringInfo};

/// Outcome of an idempotent create operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registered {
    /// A new record was created with this id
    Created(u32),

    /// An identical record already existed; its id is returned
    Existing(u32),
}

impl Registered {
    pub fn id(self) -> u32 {
        match self {
            Registered::Created(id) | Registered::Existing(id) => id,
        }
    }

    pub fn is_existing(self) -> bool {
        matches!(self, Registered::Existing(_))
    }
}

/// Liveness monitoring engine
pub struct AlivenessMonitor {
    config: EngineConfig,
    store: Arc<dyn MonitorStore>,
    ids: Arc<dyn IdAllocator>,
    publisher: Arc<dyn EventPublisher>,
    protocols: ProtocolRegistry,
    locks: MonitorKeyLocks,
    keys: MonitorIdKeyCache,
    scheduler: ProbeScheduler,
    packet_workers: Arc<Semaphore>,
    runtime: Handle,
}

impl AlivenessMonitor {
    /// Create a new engine builder
    pub fn builder() -> AlivenessMonitorBuilder {
        AlivenessMonitorBuilder::default()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn protocols(&self) -> &ProtocolRegistry {
        &self.protocols
    }

    /// Whether a probe timer is armed for the monitor
    pub fn is_scheduled(&self, monitor_id: u32) -> bool {
        self.scheduler.is_scheduled(monitor_id)
    }

    /// Whether a lock exists for the monitor key
    #[doc(hidden)]
    pub fn has_lock(&self, monitor_key: &str) -> bool {
        self.locks.contains(monitor_key)
    }

    /// Whether the monitor's key is held in the ID/key cache
    #[doc(hidden)]
    pub async fn is_key_cached(&self, monitor_id: u32) -> bool {
        self.keys.contains(monitor_id).await
    }

    /// Arm the probe timer of a monitor.
    ///
    /// The timer only holds a weak reference, so dropping the engine stops
    /// all probing.
    fn arm(self: &Arc<Self>, info: MonitoringInfo, period: Duration) {
        let monitor_id = info.id;
        let engine = Arc::downgrade(self);
        let info = Arc::new(info);

        let task: ProbeTask = Arc::new(move || {
            let engine = engine.clone();
            let info = info.clone();
            async move {
                if let Some(engine) = engine.upgrade() {
                    engine.tick(&info).await;
                }
            }
            .boxed()
        });

        self.scheduler.schedule(monitor_id, period, task);
    }

    async fn lock_key(&self, monitor_key: &str, timeout: Duration) -> Result<KeyGuard, LockError> {
        self.locks.acquire(monitor_key, timeout).await
    }

    async fn notify(&self, monitor_id: u32, state: LivenessState) {
        let event = MonitorEvent { monitor_id, state };
        if let Err(e) = self.publisher.publish(event).await {
            warn!(monitor_id, %state, "Failed to publish liveness event: {}", e);
        }
    }
}

/// Builder for AlivenessMonitor.
///
/// Unset collaborators fall back to the in-process implementations.
#[derive(Default)]
pub struct AlivenessMonitorBuilder {
    config: EngineConfig,
    store: Option<Arc<dyn MonitorStore>>,
    ids: Option<Arc<dyn IdAllocator>>,
    publisher: Option<Arc<dyn EventPublisher>>,
    protocols: ProtocolRegistry,
    runtime: Option<Handle>,
}

impl AlivenessMonitorBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(mut self, store: Arc<dyn MonitorStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn id_allocator(mut self, ids: Arc<dyn IdAllocator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn protocols(mut self, protocols: ProtocolRegistry) -> Self {
        self.protocols = protocols;
        self
    }

    /// Runtime timers and packet processing are spawned onto
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Build the engine; without an explicit runtime the current one is used
    pub fn build(self) -> Result<Arc<AlivenessMonitor>, MonitorError> {
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|e| MonitorError::Runtime(e.to_string()))?,
        };
        let config = self.config;
        let store = self.store.unwrap_or_else(|| Arc::new(InMemoryStore::new()));
        let publisher = self
            .publisher
            .unwrap_or_else(|| Arc::new(BroadcastPublisher::new(config.notification_capacity)));

        Ok(Arc::new(AlivenessMonitor {
            ids: self.ids.unwrap_or_else(|| Arc::new(LocalIdPool::default())),
            keys: MonitorIdKeyCache::new(store.clone()),
            locks: MonitorKeyLocks::new(),
            scheduler: ProbeScheduler::new(runtime.clone(), config.tick_workers),
            packet_workers: Arc::new(Semaphore::new(config.packet_workers.max(1))),
            protocols: self.protocols,
            publisher,
            store,
            runtime,
            config,
        }))
    }
}
