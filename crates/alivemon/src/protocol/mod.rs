//! Protocol handlers - one per wire protocol.
//!
//! A handler turns a monitoring session into probe frames and turns received
//! frames back into the monitor key they answer. Handlers are looked up by
//! protocol in a [`ProtocolRegistry`] populated at startup.

pub mod arp;
pub mod inventory;
pub mod lldp;

pub use arp::ArpHandler;
pub use inventory::StaticInventory;
pub use lldp::LldpHandler;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::error::{MonitorError, ProbeError};
use crate::packet;
use crate::types::{EtherTypes, MacAddr, MonitoringInfo, PortContext, PortRef};

/// Contract every liveness protocol implements
#[async_trait]
pub trait ProtocolHandler: Send + Sync {
    /// Protocol this handler probes with and decodes
    fn packet_kind(&self) -> EtherTypes;

    /// Monitor key a received frame correlates to.
    ///
    /// Returns `None` for frames that are not probe replies, including
    /// malformed ones.
    async fn on_receive(&self, frame: &[u8], context: &PortContext) -> Option<String>;

    /// Build and transmit one probe for the session.
    ///
    /// A source interface without a known MAC or port is skipped with a
    /// warning, not reported as an error.
    async fn send(&self, info: &MonitoringInfo) -> Result<(), ProbeError>;

    /// Deterministic monitor key of the session
    fn unique_key(&self, info: &MonitoringInfo) -> Result<String, MonitorError>;
}

/// Interface inventory lookups the handlers depend on
#[async_trait]
pub trait Inventory: Send + Sync {
    /// Hardware address of an interface
    async fn interface_mac(&self, interface: &str) -> Result<Option<MacAddr>, ProbeError>;

    /// Switch and port number an interface is bound to
    async fn interface_port(&self, interface: &str) -> Result<Option<PortRef>, ProbeError>;

    /// Interface owning a logical port tag
    async fn interface_for_lport(&self, lport_tag: u32) -> Result<Option<String>, ProbeError>;
}

/// Packet-out path towards the switches
#[async_trait]
pub trait PacketSink: Send + Sync {
    async fn transmit(&self, egress: PortRef, frame: Vec<u8>) -> Result<(), ProbeError>;
}

/// Handlers indexed by the protocol they serve
#[derive(Clone, Default)]
pub struct ProtocolRegistry {
    handlers: HashMap<EtherTypes, Arc<dyn ProtocolHandler>>,
}

impl ProtocolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the ARP and LLDP handlers wired to the same collaborators
    pub fn standard(config: &EngineConfig, inventory: Arc<dyn Inventory>, sink: Arc<dyn PacketSink>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ArpHandler::new(inventory.clone(), sink.clone(), config.arp_table_id)));
        registry.register(Arc::new(LldpHandler::new(inventory, sink, config.lldp_sequence_wrap)));
        registry
    }

    /// Add a handler, replacing any previous handler of the same protocol
    pub fn register(&mut self, handler: Arc<dyn ProtocolHandler>) {
        self.handlers.insert(handler.packet_kind(), handler);
    }

    pub fn get(&self, protocol: EtherTypes) -> Option<&Arc<dyn ProtocolHandler>> {
        self.handlers.get(&protocol)
    }

    /// Handler for the protocol a raw Ethernet frame carries
    pub fn for_frame(&self, frame: &[u8]) -> Option<&Arc<dyn ProtocolHandler>> {
        let protocol = EtherTypes::from_ether_type(packet::ether_type_of(frame)?)?;
        self.get(protocol)
    }

    pub fn protocols(&self) -> impl Iterator<Item = EtherTypes> + '_ {
        self.handlers.keys().copied()
    }
}

impl std::fmt::Debug for ProtocolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}
