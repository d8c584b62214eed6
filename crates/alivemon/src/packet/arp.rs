use std::net::Ipv4Addr;

use pnet_packet::arp::{self, ArpHardwareTypes, ArpOperation, ArpOperations, MutableArpPacket};
use pnet_packet::ethernet::{EtherTypes, MutableEthernetPacket};
use pnet_packet::{MutablePacket, Packet};

use super::{ETH_LEN, EthernetFrame};
use crate::error::PacketError;
use crate::types::MacAddr;

/// Length of an Ethernet/IPv4 ARP body
pub const ARP_LEN: usize = 28;

/// Ethernet/IPv4 ARP message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArpPacket {
    pub operation: ArpOperation,
    pub sender_mac: MacAddr,
    pub sender_ip: Ipv4Addr,
    pub target_mac: MacAddr,
    pub target_ip: Ipv4Addr,
}

impl ArpPacket {
    /// Who-has `target_ip`, tell `sender_ip`
    pub fn request(sender_mac: MacAddr, sender_ip: Ipv4Addr, target_ip: Ipv4Addr) -> Self {
        Self {
            operation: ArpOperations::Request,
            sender_mac,
            sender_ip,
            target_mac: MacAddr::zero(),
            target_ip,
        }
    }

    /// Answer to `request`, sent by the owner of its target address
    pub fn reply_to(request: &ArpPacket, responder_mac: MacAddr) -> Self {
        Self {
            operation: ArpOperations::Reply,
            sender_mac: responder_mac,
            sender_ip: request.target_ip,
            target_mac: request.sender_mac,
            target_ip: request.sender_ip,
        }
    }

    /// Decode an ARP body (the bytes after the Ethernet header)
    pub fn decode(body: &[u8]) -> Result<Self, PacketError> {
        let arp = arp::ArpPacket::new(body).ok_or(PacketError::Truncated { needed: ARP_LEN, got: body.len() })?;
        if arp.get_hardware_type() != ArpHardwareTypes::Ethernet
            || arp.get_protocol_type() != EtherTypes::Ipv4
            || arp.get_hw_addr_len() != 6
            || arp.get_proto_addr_len() != 4
        {
            return Err(PacketError::ArpFormat);
        }

        Ok(Self {
            operation: arp.get_operation(),
            sender_mac: arp.get_sender_hw_addr(),
            sender_ip: arp.get_sender_proto_addr(),
            target_mac: arp.get_target_hw_addr(),
            target_ip: arp.get_target_proto_addr(),
        })
    }

    /// Decode a whole Ethernet frame carrying ARP
    pub fn decode_frame(frame: &[u8]) -> Result<Self, PacketError> {
        let ethernet = EthernetFrame::parse(frame)?;
        if ethernet.ether_type != EtherTypes::Arp {
            return Err(PacketError::EtherType(ethernet.ether_type.0));
        }
        Self::decode(ethernet.payload)
    }

    fn fill(&self, arp: &mut MutableArpPacket<'_>) {
        arp.set_hardware_type(ArpHardwareTypes::Ethernet);
        arp.set_protocol_type(EtherTypes::Ipv4);
        arp.set_hw_addr_len(6);
        arp.set_proto_addr_len(4);
        arp.set_operation(self.operation);
        arp.set_sender_hw_addr(self.sender_mac);
        arp.set_sender_proto_addr(self.sender_ip);
        arp.set_target_hw_addr(self.target_mac);
        arp.set_target_proto_addr(self.target_ip);
    }

    /// The 28-byte ARP body
    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        let mut body = vec![0u8; ARP_LEN];
        let mut arp = MutableArpPacket::new(&mut body).ok_or(PacketError::Truncated { needed: ARP_LEN, got: 0 })?;
        self.fill(&mut arp);
        Ok(arp.packet().to_vec())
    }

    /// Wrap the message in an Ethernet frame; requests are broadcast
    pub fn to_frame(&self) -> Result<Vec<u8>, PacketError> {
        let destination = if self.operation == ArpOperations::Request {
            MacAddr::broadcast()
        } else {
            self.target_mac
        };

        let mut buffer = vec![0u8; ETH_LEN + ARP_LEN];
        {
            let mut ethernet = MutableEthernetPacket::new(&mut buffer)
                .ok_or(PacketError::Truncated { needed: ETH_LEN, got: 0 })?;
            ethernet.set_destination(destination);
            ethernet.set_source(self.sender_mac);
            ethernet.set_ethertype(EtherTypes::Arp);

            let mut arp = MutableArpPacket::new(ethernet.payload_mut())
                .ok_or(PacketError::Truncated { needed: ARP_LEN, got: 0 })?;
            self.fill(&mut arp);
        }
        Ok(buffer)
    }
}
