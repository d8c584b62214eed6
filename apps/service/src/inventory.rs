use alivemon::StaticInventory;
use tracing::warn;

use crate::config::InterfaceConfig;

/// Build the interface inventory from the `[[interfaces]]` config entries
pub fn from_config(interfaces: &[InterfaceConfig]) -> StaticInventory {
    interfaces.iter().fold(StaticInventory::new(), |inventory, interface| {
        if interface.mac.is_none() || interface.port().is_none() {
            warn!(interface = %interface.name, "Interface lacks a MAC or port, probes on it are skipped");
        }
        inventory.with_interface(interface.name.clone(), interface.mac, interface.port(), interface.lport_tag)
    })
}
