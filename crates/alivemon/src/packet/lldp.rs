use pnet_packet::ethernet::EtherTypes;

use super::{EthernetFrame, build_frame, ensure_len};
use crate::error::PacketError;
use crate::types::MacAddr;

/// Nearest-bridge multicast address LLDP frames are sent to
pub const LLDP_MULTICAST: MacAddr = MacAddr(0x01, 0x80, 0xc2, 0x00, 0x00, 0x0e);

/// Organisationally unique identifier of the keepalive TLV
pub const OPENFLOW_OUI: [u8; 3] = [0x00, 0x26, 0xe1];

/// Subtype of the keepalive TLV under [`OPENFLOW_OUI`]
pub const KEEPALIVE_SUBTYPE: u8 = 0x00;

pub const TLV_END: u8 = 0;
pub const TLV_CHASSIS_ID: u8 = 1;
pub const TLV_PORT_ID: u8 = 2;
pub const TLV_TTL: u8 = 3;
pub const TLV_SYSTEM_NAME: u8 = 5;
pub const TLV_CUSTOM: u8 = 127;

const CHASSIS_ID_LOCAL: u8 = 7;
const PORT_ID_INTERFACE_NAME: u8 = 5;
const DEFAULT_TTL_SECS: u16 = 120;
const MAX_TLV_LEN: usize = 511;

/// Type-length-value element of an LLDP data unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tlv {
    pub tlv_type: u8,
    pub value: Vec<u8>,
}

impl Tlv {
    pub fn new(tlv_type: u8, value: Vec<u8>) -> Self {
        Self { tlv_type, value }
    }

    /// Organisationally specific TLV carrying a keepalive string
    pub fn keepalive(payload: &str) -> Self {
        let mut value = Vec::with_capacity(4 + payload.len());
        value.extend_from_slice(&OPENFLOW_OUI);
        value.push(KEEPALIVE_SUBTYPE);
        value.extend_from_slice(payload.as_bytes());
        Self::new(TLV_CUSTOM, value)
    }

    /// The keepalive string, if this is a keepalive TLV
    pub fn keepalive_string(&self) -> Option<String> {
        if self.tlv_type != TLV_CUSTOM || self.value.len() < 4 {
            return None;
        }
        if self.value[..3] != OPENFLOW_OUI || self.value[3] != KEEPALIVE_SUBTYPE {
            return None;
        }
        String::from_utf8(self.value[4..].to_vec()).ok()
    }

    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), PacketError> {
        if self.value.len() > MAX_TLV_LEN {
            return Err(PacketError::Tlv("value longer than 511 bytes"));
        }
        let header = (u16::from(self.tlv_type) << 9) | self.value.len() as u16;
        buf.extend_from_slice(&header.to_be_bytes());
        buf.extend_from_slice(&self.value);
        Ok(())
    }
}

/// LLDP data unit as a list of TLVs, excluding the End TLV
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LldpFrame {
    pub tlvs: Vec<Tlv>,
}

impl LldpFrame {
    /// Keepalive LLDPDU: chassis, port, TTL, system name and keepalive TLVs
    pub fn keepalive(chassis_id: &str, port_id: &str, system_name: &str, payload: &str) -> Self {
        let mut chassis = vec![CHASSIS_ID_LOCAL];
        chassis.extend_from_slice(chassis_id.as_bytes());
        let mut port = vec![PORT_ID_INTERFACE_NAME];
        port.extend_from_slice(port_id.as_bytes());

        Self {
            tlvs: vec![
                Tlv::new(TLV_CHASSIS_ID, chassis),
                Tlv::new(TLV_PORT_ID, port),
                Tlv::new(TLV_TTL, DEFAULT_TTL_SECS.to_be_bytes().to_vec()),
                Tlv::new(TLV_SYSTEM_NAME, system_name.as_bytes().to_vec()),
                Tlv::keepalive(payload),
            ],
        }
    }

    /// Keepalive string of the first keepalive TLV
    pub fn keepalive_string(&self) -> Option<String> {
        self.tlvs.iter().find_map(Tlv::keepalive_string)
    }

    /// Decode an LLDPDU (the bytes after the Ethernet header)
    pub fn decode(mut body: &[u8]) -> Result<Self, PacketError> {
        let mut tlvs = Vec::new();
        while !body.is_empty() {
            ensure_len(body, 2)?;
            let header = u16::from_be_bytes([body[0], body[1]]);
            let tlv_type = (header >> 9) as u8;
            let len = usize::from(header & 0x01ff);
            body = &body[2..];
            if body.len() < len {
                return Err(PacketError::Tlv("length overruns frame"));
            }
            if tlv_type == TLV_END {
                break;
            }
            tlvs.push(Tlv::new(tlv_type, body[..len].to_vec()));
            body = &body[len..];
        }
        Ok(Self { tlvs })
    }

    /// Decode a whole Ethernet frame carrying LLDP
    pub fn decode_frame(frame: &[u8]) -> Result<Self, PacketError> {
        let ethernet = EthernetFrame::parse(frame)?;
        if ethernet.ether_type != EtherTypes::Lldp {
            return Err(PacketError::EtherType(ethernet.ether_type.0));
        }
        Self::decode(ethernet.payload)
    }

    /// Ethernet frame sent from `source` to the LLDP multicast group
    pub fn to_frame(&self, source: MacAddr) -> Result<Vec<u8>, PacketError> {
        let mut body = Vec::with_capacity(64);
        for tlv in &self.tlvs {
            tlv.encode(&mut body)?;
        }
        Tlv::new(TLV_END, Vec::new()).encode(&mut body)?;
        build_frame(LLDP_MULTICAST, source, EtherTypes::Lldp, &body)
    }
}
