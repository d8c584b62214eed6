//! Alivemon - liveness monitoring engine for network endpoints
//!
//! This library periodically probes interfaces and IP neighbours with ARP
//! requests or LLDP keepalives and keeps an Up/Down/Unknown verdict per
//! monitored endpoint, publishing an event whenever the verdict changes.
//!
//! The persistent store, ID pool, notification bus, interface inventory and
//! packet egress are collaborators expressed as traits, so the engine can be
//! embedded in a controller or run against the in-memory implementations.

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod idmanager;
pub mod lock;
pub mod notify;
pub mod packet;
pub mod protocol;
pub mod scheduler;
pub mod store;
pub mod types;

// Re-export main types
pub use config::EngineConfig;
pub use engine::{AlivenessMonitor, AlivenessMonitorBuilder, Registered};
pub use error::{LockError, MonitorError, PacketError, ProbeError, PublishError, StoreError};
pub use idmanager::{IdAllocator, LocalIdPool};
pub use notify::{BroadcastPublisher, EventPublisher};
pub use protocol::{
    ArpHandler, Inventory, LldpHandler, PacketSink, ProtocolHandler, ProtocolRegistry, StaticInventory,
};
pub use store::{InMemoryStore, MonitorStore};
pub use types::{
    EndpointType, EtherTypes, LivenessState, MacAddr, MonitorEvent, MonitorProfile, MonitorStatus,
    MonitoringInfo, MonitoringMode, MonitoringState, PortContext, PortRef,
};

/// Alivemon result type
pub type Result<T, E = MonitorError> = std::result::Result<T, E>;

/// Name of the ID pool monitor and profile IDs are drawn from
pub const ID_POOL_NAME: &str = "aliveness-monitor";
