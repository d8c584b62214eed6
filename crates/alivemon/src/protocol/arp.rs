use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use tracing::{debug, trace, warn};

use super::{Inventory, PacketSink, ProtocolHandler};
use crate::error::{MonitorError, ProbeError};
use crate::packet::{ArpOperations, ArpPacket};
use crate::types::{EndpointType, EtherTypes, MonitoringInfo, PortContext};

/// Monitor key of an ARP session
pub fn arp_monitor_key(interface: &str, source_ip: Ipv4Addr, target_ip: Ipv4Addr) -> String {
    format!("{interface}.{source_ip}.{target_ip}.{}", EtherTypes::Arp)
}

/// Probes an IPv4 neighbour with ARP requests from one of our interfaces.
///
/// Replies are only considered when punted from the ARP classification table.
pub struct ArpHandler {
    inventory: Arc<dyn Inventory>,
    sink: Arc<dyn PacketSink>,
    table_id: u8,
}

impl ArpHandler {
    pub fn new(inventory: Arc<dyn Inventory>, sink: Arc<dyn PacketSink>, table_id: u8) -> Self {
        Self { inventory, sink, table_id }
    }

    /// Source interface, source address and target address of a session
    fn endpoints<'a>(&self, info: &'a MonitoringInfo) -> Result<(&'a str, Ipv4Addr, Ipv4Addr), String> {
        let (interface, source_ip) = match &info.source {
            EndpointType::Interface { name, ip } if !name.is_empty() => match ip {
                Some(IpAddr::V4(ip)) => (name.as_str(), *ip),
                Some(IpAddr::V6(_)) => return Err(format!("ARP source {name} has an IPv6 address")),
                None => return Err(format!("ARP source {name} has no IP address")),
            },
            other => return Err(format!("ARP source must be a named interface, got {other}")),
        };

        let target_ip = match info.destination.as_ref().and_then(EndpointType::ip_address) {
            Some(IpAddr::V4(ip)) => ip,
            Some(IpAddr::V6(ip)) => return Err(format!("ARP target {ip} is not IPv4")),
            None => return Err("ARP monitor requires a destination IP address".to_string()),
        };

        Ok((interface, source_ip, target_ip))
    }
}

#[async_trait]
impl ProtocolHandler for ArpHandler {
    fn packet_kind(&self) -> EtherTypes {
        EtherTypes::Arp
    }

    async fn on_receive(&self, frame: &[u8], context: &PortContext) -> Option<String> {
        if context.table_id != self.table_id {
            trace!(table_id = context.table_id, "Ignoring ARP packet from non-ARP table");
            return None;
        }

        let reply = match ArpPacket::decode_frame(frame) {
            Ok(packet) => packet,
            Err(e) => {
                debug!("Failed to decode ARP packet: {}", e);
                return None;
            }
        };
        if reply.operation != ArpOperations::Reply {
            trace!(operation = ?reply.operation, "Ignoring ARP packet that is not a reply");
            return None;
        }

        let interface = match self.inventory.interface_for_lport(context.lport_tag).await {
            Ok(Some(interface)) => interface,
            Ok(None) => {
                debug!(lport_tag = context.lport_tag, "No interface for ARP reply ingress port");
                return None;
            }
            Err(e) => {
                warn!(lport_tag = context.lport_tag, "Interface lookup for ARP reply failed: {}", e);
                return None;
            }
        };

        // the reply's target is our source, its sender the monitored neighbour
        Some(arp_monitor_key(&interface, reply.target_ip, reply.sender_ip))
    }

    async fn send(&self, info: &MonitoringInfo) -> Result<(), ProbeError> {
        let (interface, source_ip, target_ip) = self.endpoints(info).map_err(ProbeError::Endpoint)?;

        let Some(mac) = self.inventory.interface_mac(interface).await? else {
            warn!(monitor_id = info.id, interface, "No MAC address for interface, skipping ARP probe");
            return Ok(());
        };
        let Some(port) = self.inventory.interface_port(interface).await? else {
            warn!(monitor_id = info.id, interface, "No port for interface, skipping ARP probe");
            return Ok(());
        };

        let frame = ArpPacket::request(mac, source_ip, target_ip).to_frame()?;
        trace!(monitor_id = info.id, %port, %target_ip, "Sending ARP probe");
        self.sink.transmit(port, frame).await
    }

    fn unique_key(&self, info: &MonitoringInfo) -> Result<String, MonitorError> {
        let (interface, source_ip, target_ip) = self.endpoints(info).map_err(MonitorError::InvalidEndpoint)?;
        Ok(arp_monitor_key(interface, source_ip, target_ip))
    }
}
