//! Engine configuration.
//!
//! Every field has a default so a partial `[engine]` table in a config file
//! deserializes cleanly.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default bound on waiting for a monitor key's lock
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 50;

/// Default classification table ARP replies are punted from
pub const DEFAULT_ARP_TABLE_ID: u8 = 81;

/// LLDP sequence numbers restart from zero once they exceed this value
pub const DEFAULT_LLDP_SEQUENCE_WRAP: u32 = 16000;

/// Default bound on waiting for a monitor key's lock in control operations
pub const DEFAULT_CONTROL_LOCK_TIMEOUT_MS: u64 = 1000;

/// Configuration options for the monitoring engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How long a tick or response waits for its monitor key's lock
    pub lock_timeout_ms: u64,

    /// How long pause, unpause and stop wait for a monitor key's lock
    pub control_lock_timeout_ms: u64,

    /// Maximum number of probe ticks executing at once
    pub tick_workers: usize,

    /// Maximum number of received packets processed at once
    pub packet_workers: usize,

    /// Table id ARP replies must arrive on to be considered
    pub arp_table_id: u8,

    /// Wrap point of the LLDP keepalive sequence number
    pub lldp_sequence_wrap: u32,

    /// Buffered notifications per subscriber
    pub notification_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
            control_lock_timeout_ms: DEFAULT_CONTROL_LOCK_TIMEOUT_MS,
            tick_workers: 16,
            packet_workers: 8,
            arp_table_id: DEFAULT_ARP_TABLE_ID,
            lldp_sequence_wrap: DEFAULT_LLDP_SEQUENCE_WRAP,
            notification_capacity: 256,
        }
    }
}

impl EngineConfig {
    /// Create a new configuration builder
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn control_lock_timeout(&self) -> Duration {
        Duration::from_millis(self.control_lock_timeout_ms)
    }
}

/// Builder for EngineConfig
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Build the configuration
    pub fn build(self) -> EngineConfig {
        self.config
    }

    /// Set the lock wait bound
    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.config.lock_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the lock wait bound of control operations
    pub fn control_lock_timeout(mut self, timeout: Duration) -> Self {
        self.config.control_lock_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the size of the tick pool
    pub fn tick_workers(mut self, workers: usize) -> Self {
        self.config.tick_workers = workers.max(1);
        self
    }

    /// Set the size of the packet pool
    pub fn packet_workers(mut self, workers: usize) -> Self {
        self.config.packet_workers = workers.max(1);
        self
    }

    /// Set the ARP reply classification table
    pub fn arp_table_id(mut self, table_id: u8) -> Self {
        self.config.arp_table_id = table_id;
        self
    }

    /// Set the LLDP sequence wrap point
    pub fn lldp_sequence_wrap(mut self, wrap: u32) -> Self {
        self.config.lldp_sequence_wrap = wrap;
        self
    }

    /// Set the per-subscriber notification buffer
    pub fn notification_capacity(mut self, capacity: usize) -> Self {
        self.config.notification_capacity = capacity.max(1);
        self
    }
}
