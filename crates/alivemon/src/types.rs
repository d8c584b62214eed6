use pnet_packet::ethernet::{self, EtherType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

/// Wire protocol a monitor profile probes with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EtherTypes {
    Arp,
    Lldp,
}

impl EtherTypes {
    /// IEEE EtherType carried by frames of this protocol
    pub fn ether_type(self) -> EtherType {
        match self {
            EtherTypes::Arp => ethernet::EtherTypes::Arp,
            EtherTypes::Lldp => ethernet::EtherTypes::Lldp,
        }
    }

    /// Map a raw EtherType back to a supported protocol
    pub fn from_ether_type(value: EtherType) -> Option<Self> {
        match value {
            ethernet::EtherTypes::Arp => Some(EtherTypes::Arp),
            ethernet::EtherTypes::Lldp => Some(EtherTypes::Lldp),
            _ => None,
        }
    }
}

impl fmt::Display for EtherTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EtherTypes::Arp => write!(f, "ARP"),
            EtherTypes::Lldp => write!(f, "LLDP"),
        }
    }
}

pub use pnet_base::MacAddr;

/// Immutable probing configuration shared by monitors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorProfile {
    /// Pending-probe count at or above which a monitor is declared Down
    pub failure_threshold: u32,

    /// Interval between two probes in milliseconds
    pub probe_interval_ms: u64,

    /// Maximum pending-probe count tracked
    pub monitor_window: u32,

    /// Protocol used to probe
    pub protocol_type: EtherTypes,
}

impl MonitorProfile {
    pub fn new(
        failure_threshold: u32,
        probe_interval_ms: u64,
        monitor_window: u32,
        protocol_type: EtherTypes,
    ) -> Self {
        Self { failure_threshold, probe_interval_ms, monitor_window, protocol_type }
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    /// Key identifying this field tuple in the ID pool
    pub fn id_key(&self) -> String {
        format!(
            "{}.{}.{}.{}",
            self.failure_threshold, self.probe_interval_ms, self.monitor_window, self.protocol_type
        )
    }
}

/// One side of a monitored link
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EndpointType {
    /// A named interface, optionally with the address it owns
    Interface { name: String, ip: Option<IpAddr> },

    /// A bare IP address
    IpAddress { ip: IpAddr },
}

impl EndpointType {
    pub fn interface(name: impl Into<String>, ip: Option<IpAddr>) -> Self {
        EndpointType::Interface { name: name.into(), ip }
    }

    pub fn ip(ip: IpAddr) -> Self {
        EndpointType::IpAddress { ip }
    }

    /// The interface name, if this is an interface endpoint
    pub fn interface_name(&self) -> Option<&str> {
        match self {
            EndpointType::Interface { name, .. } => Some(name.as_str()),
            EndpointType::IpAddress { .. } => None,
        }
    }

    /// The IP address carried by the endpoint, if any
    pub fn ip_address(&self) -> Option<IpAddr> {
        match self {
            EndpointType::Interface { ip, .. } => *ip,
            EndpointType::IpAddress { ip } => Some(*ip),
        }
    }
}

impl fmt::Display for EndpointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointType::Interface { name, ip: Some(ip) } => write!(f, "{name}/{ip}"),
            EndpointType::Interface { name, ip: None } => write!(f, "{name}"),
            EndpointType::IpAddress { ip } => write!(f, "{ip}"),
        }
    }
}

/// How many targets a monitor probes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitoringMode {
    #[default]
    OneOne,
    OneMany,
}

impl fmt::Display for MonitoringMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitoringMode::OneOne => write!(f, "one-one"),
            MonitoringMode::OneMany => write!(f, "one-many"),
        }
    }
}

/// Immutable half of a monitoring session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringInfo {
    pub id: u32,
    pub mode: MonitoringMode,
    pub source: EndpointType,
    pub destination: Option<EndpointType>,
    pub profile_id: u32,
}

impl MonitoringInfo {
    /// Interface the monitor is anchored on
    pub fn source_interface(&self) -> Option<&str> {
        self.source.interface_name()
    }

    /// Key identifying this session's endpoints in the ID pool
    pub fn id_key(&self, monitor_key: &str) -> String {
        match &self.destination {
            Some(destination) => format!("{monitor_key}.{}.{destination}", self.source),
            None => format!("{monitor_key}.{}", self.source),
        }
    }
}

/// Administrative state of a monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorStatus {
    Started,
    Paused,
    Stopped,
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorStatus::Started => write!(f, "started"),
            MonitorStatus::Paused => write!(f, "paused"),
            MonitorStatus::Stopped => write!(f, "stopped"),
        }
    }
}

/// Liveness verdict of a monitored endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LivenessState {
    Unknown,
    Up,
    Down,
}

impl fmt::Display for LivenessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LivenessState::Unknown => write!(f, "unknown"),
            LivenessState::Up => write!(f, "up"),
            LivenessState::Down => write!(f, "down"),
        }
    }
}

/// Mutable, persisted half of a monitoring session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringState {
    pub monitor_key: String,
    pub monitor_id: u32,
    pub status: MonitorStatus,
    pub state: LivenessState,

    /// Probes sent since the last Down transition
    pub request_count: u64,

    /// Probes sent without a correlated response, capped at the window
    pub response_pending_count: u32,
}

impl MonitoringState {
    /// Initial state of a freshly started monitor
    pub fn started(monitor_key: String, monitor_id: u32) -> Self {
        Self {
            monitor_key,
            monitor_id,
            status: MonitorStatus::Started,
            state: LivenessState::Unknown,
            request_count: 0,
            response_pending_count: 0,
        }
    }
}

/// Notification published on every Up/Down transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorEvent {
    pub monitor_id: u32,
    pub state: LivenessState,
}

/// Where a received packet entered the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PortContext {
    /// Classification table the packet was punted from
    pub table_id: u8,

    /// Logical port tag of the ingress interface
    pub lport_tag: u32,
}

/// Physical egress point of an interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRef {
    pub dpn_id: u64,
    pub port_no: u32,
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "openflow:{}:{}", self.dpn_id, self.port_no)
    }
}
