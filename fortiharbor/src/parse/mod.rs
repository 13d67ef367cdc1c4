//! Best-effort extraction of structured entities from one export.
//!
//! Every extractor works on whatever the text offers: an entry that cannot
//! be read becomes a logged skip, never an error for the whole file. Partial
//! results are expected for hand-edited or truncated exports.

mod admins;
mod interfaces;
mod policies;
mod system;

use serde::Serialize;

use crate::model::{AdminAccount, DeviceMetadata, FirewallRule, NetworkInterface};

pub use system::SystemInfo;

/// Everything extracted from one configuration export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedConfig {
    pub system: SystemInfo,
    pub firewall_rules: Vec<FirewallRule>,
    pub interfaces: Vec<NetworkInterface>,
    pub admins: Vec<AdminAccount>,
}

impl ParsedConfig {
    /// Total number of extracted entities across all kinds.
    pub fn entity_count(&self) -> usize {
        self.firewall_rules.len() + self.interfaces.len() + self.admins.len()
    }

    /// Device fields to persist, under the resolved canonical serial.
    pub fn metadata(&self, serial: &str) -> DeviceMetadata {
        DeviceMetadata {
            serial: serial.to_string(),
            hostname: self.system.hostname.clone(),
            model: self.system.model.clone(),
            vdom_enabled: self.system.vdom_enabled,
            primary_vdom: self.system.primary_vdom.clone(),
        }
    }
}

/// Parse one export into system metadata and entity lists.
pub fn parse_config(text: &str) -> ParsedConfig {
    ParsedConfig {
        system: system::parse_system(text),
        firewall_rules: policies::parse_policies(text),
        interfaces: interfaces::parse_interfaces(text),
        admins: admins::parse_admins(text),
    }
}

/// Convert an `<ip> <netmask>` pair into CIDR notation.
///
/// The prefix length is the number of set bits in the dotted-quad netmask. A
/// mask that does not parse is preserved raw after the slash rather than
/// dropped, so the original information survives.
pub(crate) fn pair_to_cidr(ip: &str, mask: &str) -> String {
    match mask_prefix(mask) {
        Some(prefix) => format!("{ip}/{prefix}"),
        None => format!("{ip}/{mask}"),
    }
}

pub(crate) fn mask_prefix(mask: &str) -> Option<u32> {
    let addr: std::net::Ipv4Addr = mask.parse().ok()?;
    Some(addr.octets().iter().map(|o| o.count_ones()).sum())
}
