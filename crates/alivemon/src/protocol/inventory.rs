use async_trait::async_trait;
use std::collections::HashMap;

use super::Inventory;
use crate::error::ProbeError;
use crate::types::{MacAddr, PortRef};

#[derive(Debug, Clone)]
struct InterfaceEntry {
    mac: Option<MacAddr>,
    port: Option<PortRef>,
    lport_tag: Option<u32>,
}

/// Inventory backed by a fixed table of interfaces
#[derive(Debug, Clone, Default)]
pub struct StaticInventory {
    interfaces: HashMap<String, InterfaceEntry>,
    lports: HashMap<u32, String>,
}

impl StaticInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an interface; missing MAC or port make probes on it no-ops
    pub fn with_interface(
        mut self,
        name: impl Into<String>,
        mac: Option<MacAddr>,
        port: Option<PortRef>,
        lport_tag: Option<u32>,
    ) -> Self {
        let name = name.into();
        if let Some(tag) = lport_tag {
            self.lports.insert(tag, name.clone());
        }
        self.interfaces.insert(name, InterfaceEntry { mac, port, lport_tag });
        self
    }

    pub fn lport_tag(&self, interface: &str) -> Option<u32> {
        self.interfaces.get(interface).and_then(|entry| entry.lport_tag)
    }
}

#[async_trait]
impl Inventory for StaticInventory {
    async fn interface_mac(&self, interface: &str) -> Result<Option<MacAddr>, ProbeError> {
        Ok(self.interfaces.get(interface).and_then(|entry| entry.mac))
    }

    async fn interface_port(&self, interface: &str) -> Result<Option<PortRef>, ProbeError> {
        Ok(self.interfaces.get(interface).and_then(|entry| entry.port))
    }

    async fn interface_for_lport(&self, lport_tag: u32) -> Result<Option<String>, ProbeError> {
        Ok(self.lports.get(&lport_tag).cloned())
    }
}
