//! Wire formats of the liveness probes.
//!
//! Ethernet and ARP framing goes through `pnet_packet`; LLDP TLVs are encoded
//! here. Decoding never panics and reports malformed input as [`PacketError`].

pub mod arp;
pub mod lldp;

pub use arp::ArpPacket;
pub use lldp::{LldpFrame, Tlv};
pub use pnet_packet::arp::{ArpOperation, ArpOperations};

use pnet_packet::Packet;
use pnet_packet::ethernet::{EtherType, EtherTypes, EthernetPacket, MutableEthernetPacket};
use pnet_packet::vlan::VlanPacket;

use crate::error::PacketError;
use crate::types::MacAddr;

/// The length of the Ethernet header.
pub const ETH_LEN: usize = 14;

const VLAN_TAG_LEN: usize = 4;

/// Decoded Ethernet header and the payload that follows it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetFrame<'a> {
    pub destination: MacAddr,
    pub source: MacAddr,
    pub ether_type: EtherType,
    pub payload: &'a [u8],
}

impl<'a> EthernetFrame<'a> {
    /// Parse the header of `frame`.
    ///
    /// A single 802.1Q tag is skipped; the returned EtherType is the inner one.
    pub fn parse(frame: &'a [u8]) -> Result<Self, PacketError> {
        let ethernet = EthernetPacket::new(frame).ok_or(PacketError::Truncated { needed: ETH_LEN, got: frame.len() })?;
        let mut ether_type = ethernet.get_ethertype();
        let mut offset = ETH_LEN;

        if ether_type == EtherTypes::Vlan {
            let tag = VlanPacket::new(ethernet.payload()).ok_or(PacketError::Truncated {
                needed: ETH_LEN + VLAN_TAG_LEN,
                got: frame.len(),
            })?;
            ether_type = tag.get_ethertype();
            offset += VLAN_TAG_LEN;
        }

        Ok(Self {
            destination: ethernet.get_destination(),
            source: ethernet.get_source(),
            ether_type,
            payload: &frame[offset..],
        })
    }
}

/// Build an Ethernet frame carrying `payload`
pub fn build_frame(
    destination: MacAddr,
    source: MacAddr,
    ether_type: EtherType,
    payload: &[u8],
) -> Result<Vec<u8>, PacketError> {
    let mut buffer = vec![0u8; ETH_LEN + payload.len()];
    {
        let mut ethernet = MutableEthernetPacket::new(&mut buffer)
            .ok_or(PacketError::Truncated { needed: ETH_LEN, got: 0 })?;
        ethernet.set_destination(destination);
        ethernet.set_source(source);
        ethernet.set_ethertype(ether_type);
        ethernet.set_payload(payload);
    }
    Ok(buffer)
}

/// EtherType of a frame, or `None` if it is too short to carry one
pub fn ether_type_of(frame: &[u8]) -> Option<EtherType> {
    EthernetFrame::parse(frame).ok().map(|ethernet| ethernet.ether_type)
}

pub(crate) fn ensure_len(buf: &[u8], needed: usize) -> Result<(), PacketError> {
    if buf.len() < needed {
        return Err(PacketError::Truncated { needed, got: buf.len() });
    }
    Ok(())
}
