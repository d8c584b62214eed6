use thiserror::Error;

use crate::types::{EtherTypes, MonitoringMode};

/// Errors reported by the monitoring engine's control operations
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Monitor profile with id {0} does not exist")]
    ProfileNotFound(u32),

    #[error("Monitor with id {0} does not exist")]
    MonitorNotFound(u32),

    #[error("Unsupported monitoring mode: {0}")]
    UnsupportedMode(MonitoringMode),

    #[error("Unsupported protocol: no handler registered for {0}")]
    UnsupportedProtocol(EtherTypes),

    #[error("Interface name is required for the source endpoint")]
    MissingInterfaceName,

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Invalid monitor profile: {0}")]
    InvalidProfile(String),

    #[error("Monitor with id {0} is not running")]
    NotRunning(u32),

    #[error("ID allocation failed: {0}")]
    IdAllocation(String),

    #[error("Monitor key {0} stayed locked past the wait bound")]
    LockTimeout(String),

    #[error("No tokio runtime available: {0}")]
    Runtime(String),

    #[error("Store operation failed: {0}")]
    Store(#[from] StoreError),
}

impl MonitorError {
    /// Whether the error describes a missing profile or monitor
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ProfileNotFound(_) | Self::MonitorNotFound(_))
    }

    /// Whether the error was caused by the caller's input rather than I/O
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            Self::Store(_) | Self::IdAllocation(_) | Self::LockTimeout(_) | Self::Runtime(_)
        )
    }
}

/// Errors raised by a [`MonitorStore`](crate::store::MonitorStore) backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store backend failure: {0}")]
    Backend(String),

    #[error("Failed to encode or decode a stored record: {0}")]
    Codec(String),
}

/// Errors produced while decoding or encoding a wire frame
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    #[error("Frame truncated: needed {needed} bytes, got {got}")]
    Truncated { needed: usize, got: usize },

    #[error("Unexpected EtherType 0x{0:04x}")]
    EtherType(u16),

    #[error("Unsupported ARP hardware/protocol combination")]
    ArpFormat,

    #[error("Malformed LLDP TLV: {0}")]
    Tlv(&'static str),
}

/// Error returned by an [`EventPublisher`](crate::notify::EventPublisher)
#[derive(Debug, Error)]
#[error("Failed to publish monitor event: {0}")]
pub struct PublishError(pub String);

/// Reasons a monitor key's lock could not be taken
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LockError {
    #[error("No lock registered for monitor key {0}")]
    UnknownKey(String),

    #[error("Timed out waiting for the lock of monitor key {0}")]
    TimedOut(String),
}

/// Errors raised while resolving, building or transmitting a probe
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Inventory lookup failed: {0}")]
    Inventory(String),

    #[error("Failed to build probe frame: {0}")]
    Packet(#[from] PacketError),

    #[error("Failed to transmit probe: {0}")]
    Transmit(String),

    #[error("Invalid endpoint: {0}")]
    Endpoint(String),
}
