use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, trace, warn};

use super::{Inventory, PacketSink, ProtocolHandler};
use crate::error::{MonitorError, ProbeError};
use crate::packet::LldpFrame;
use crate::types::{EtherTypes, MonitoringInfo, PortContext};

/// Separator between interface name and sequence number in the keepalive TLV
pub const KEEPALIVE_SEPARATOR: char = '#';

/// Monitor key of an LLDP session; one session per interface
pub fn lldp_monitor_key(interface: &str) -> String {
    format!("{interface}.{}", EtherTypes::Lldp)
}

/// Sends LLDP keepalives out of an interface and expects them looped back.
///
/// The keepalive names only the interface, so replies cannot tell apart
/// several sessions on the same interface.
pub struct LldpHandler {
    inventory: Arc<dyn Inventory>,
    sink: Arc<dyn PacketSink>,
    sequence: AtomicU32,
    wrap: u32,
}

impl LldpHandler {
    pub fn new(inventory: Arc<dyn Inventory>, sink: Arc<dyn PacketSink>, wrap: u32) -> Self {
        Self { inventory, sink, sequence: AtomicU32::new(0), wrap }
    }

    /// Next keepalive sequence number, restarting at zero past the wrap point
    fn next_sequence(&self) -> u32 {
        let wrap = self.wrap;
        let previous = self
            .sequence
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                Some(if current >= wrap { 0 } else { current + 1 })
            })
            .unwrap_or_default();
        if previous >= wrap { 0 } else { previous + 1 }
    }
}

#[async_trait]
impl ProtocolHandler for LldpHandler {
    fn packet_kind(&self) -> EtherTypes {
        EtherTypes::Lldp
    }

    async fn on_receive(&self, frame: &[u8], _context: &PortContext) -> Option<String> {
        let lldp = match LldpFrame::decode_frame(frame) {
            Ok(lldp) => lldp,
            Err(e) => {
                debug!("Failed to decode LLDP packet: {}", e);
                return None;
            }
        };

        let Some(keepalive) = lldp.keepalive_string() else {
            trace!("LLDP packet carries no keepalive TLV");
            return None;
        };
        match keepalive.split_once(KEEPALIVE_SEPARATOR) {
            Some((interface, _sequence)) if !interface.is_empty() => Some(lldp_monitor_key(interface)),
            _ => {
                debug!(keepalive = %keepalive, "Malformed LLDP keepalive payload");
                None
            }
        }
    }

    async fn send(&self, info: &MonitoringInfo) -> Result<(), ProbeError> {
        let interface = info
            .source_interface()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ProbeError::Endpoint("LLDP source must be a named interface".to_string()))?;

        let Some(mac) = self.inventory.interface_mac(interface).await? else {
            warn!(monitor_id = info.id, interface, "No MAC address for interface, skipping LLDP probe");
            return Ok(());
        };
        let Some(port) = self.inventory.interface_port(interface).await? else {
            warn!(monitor_id = info.id, interface, "No port for interface, skipping LLDP probe");
            return Ok(());
        };

        let sequence = self.next_sequence();
        let node = format!("openflow:{}", port.dpn_id);
        let payload = format!("{interface}{KEEPALIVE_SEPARATOR}{sequence}");
        let frame = LldpFrame::keepalive(&node, &format!("{:x}", port.port_no), &node, &payload).to_frame(mac)?;

        trace!(monitor_id = info.id, %port, sequence, "Sending LLDP probe");
        self.sink.transmit(port, frame).await
    }

    fn unique_key(&self, info: &MonitoringInfo) -> Result<String, MonitorError> {
        match info.source_interface() {
            Some(interface) if !interface.is_empty() => Ok(lldp_monitor_key(interface)),
            _ => Err(MonitorError::MissingInterfaceName),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::StaticInventory;
    use crate::types::{EndpointType, MacAddr, MonitoringMode, PortRef};
    use std::net::{IpAddr, Ipv4Addr};
    use tokio::sync::Mutex;

    const PORT: PortRef = PortRef { dpn_id: 1, port_no: 12 };

    #[derive(Default)]
    struct RecordingSink {
        frames: Mutex<Vec<Vec<u8>>>,
    }

    #[async_trait]
    impl PacketSink for RecordingSink {
        async fn transmit(&self, _egress: PortRef, frame: Vec<u8>) -> Result<(), ProbeError> {
            self.frames.lock().await.push(frame);
            Ok(())
        }
    }

    fn session(destination: Option<EndpointType>) -> MonitoringInfo {
        MonitoringInfo {
            id: 1,
            mode: MonitoringMode::OneOne,
            source: EndpointType::interface("tap0", None),
            destination,
            profile_id: 1,
        }
    }

    fn handler(sink: Arc<RecordingSink>, wrap: u32) -> LldpHandler {
        let inventory = StaticInventory::new().with_interface("tap0", Some(MacAddr(2, 0, 0, 0, 0, 1)), Some(PORT), None);
        LldpHandler::new(Arc::new(inventory), sink, wrap)
    }

    #[test]
    fn test_key_ignores_destination() {
        let handler = handler(Arc::default(), 16000);
        let a = session(Some(EndpointType::ip(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)))));
        let b = session(Some(EndpointType::ip(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 3)))));
        assert_eq!(handler.unique_key(&a).unwrap(), "tap0.LLDP");
        assert_eq!(handler.unique_key(&a).unwrap(), handler.unique_key(&b).unwrap());
    }

    #[test]
    fn test_sequence_wraps() {
        let handler = handler(Arc::default(), 3);
        let sequence: Vec<u32> = (0..6).map(|_| handler.next_sequence()).collect();
        assert_eq!(sequence, vec![1, 2, 3, 0, 1, 2]);
    }

    #[tokio::test]
    async fn test_sent_keepalive_correlates() {
        let sink = Arc::new(RecordingSink::default());
        let handler = handler(sink.clone(), 16000);
        let info = session(None);

        handler.send(&info).await.unwrap();
        handler.send(&info).await.unwrap();

        let frames = sink.frames.lock().await;
        assert_eq!(frames.len(), 2);
        let decoded = LldpFrame::decode_frame(&frames[1]).unwrap();
        assert_eq!(decoded.keepalive_string().as_deref(), Some("tap0#2"));

        let key = handler.on_receive(&frames[0], &PortContext::default()).await;
        assert_eq!(key.as_deref(), Some("tap0.LLDP"));
    }

    #[tokio::test]
    async fn test_send_without_port_or_mac_is_noop() {
        let sink = Arc::new(RecordingSink::default());
        let inventory = StaticInventory::new()
            .with_interface("tap0", Some(MacAddr(2, 0, 0, 0, 0, 1)), None, None)
            .with_interface("tap1", None, Some(PORT), None);
        let handler = LldpHandler::new(Arc::new(inventory), sink.clone(), 16000);

        handler.send(&session(None)).await.unwrap();
        let mut on_tap1 = session(None);
        on_tap1.source = EndpointType::interface("tap1", None);
        handler.send(&on_tap1).await.unwrap();

        assert!(sink.frames.lock().await.is_empty());
        // skipped sends do not consume sequence numbers
        assert_eq!(handler.next_sequence(), 1);
    }

    #[tokio::test]
    async fn test_rejects_payload_without_separator() {
        let handler = handler(Arc::default(), 16000);
        let frame = LldpFrame::keepalive("c", "p", "s", "tap0").to_frame(MacAddr::zero()).unwrap();
        assert_eq!(handler.on_receive(&frame, &PortContext::default()).await, None);

        let frame = LldpFrame::keepalive("c", "p", "s", "#5").to_frame(MacAddr::zero()).unwrap();
        assert_eq!(handler.on_receive(&frame, &PortContext::default()).await, None);
    }
}
