use conftext_core::{fields, scanner};
use tracing::debug;

use crate::model::NetworkInterface;

use super::pair_to_cidr;

/// Extract every system interface entry from the export.
pub fn parse_interfaces(text: &str) -> Vec<NetworkInterface> {
    let mut interfaces = Vec::new();
    for block in scanner::blocks(text, "system interface") {
        for entry in scanner::entries(block.body) {
            match parse_interface(entry.id, entry.body) {
                Some(intf) => interfaces.push(intf),
                None => debug!("skipping interface entry without a name"),
            }
        }
    }
    interfaces
}

fn parse_interface(name: &str, body: &str) -> Option<NetworkInterface> {
    if name.is_empty() {
        return None;
    }
    Some(NetworkInterface {
        name: name.to_string(),
        ip_cidr: fields::list(body, "ip").map(|parts| interface_cidr(&parts)),
        mode: fields::value(body, "mode").map(str::to_string),
        vlan: fields::number(body, "vlanid"),
        zone: fields::value(body, "zone").map(str::to_string),
        status: fields::value(body, "status").map(str::to_string),
        allow_access: fields::list(body, "allowaccess").unwrap_or_default(),
        vdom: fields::value(body, "vdom").unwrap_or("root").to_string(),
    })
}

fn interface_cidr(parts: &[String]) -> String {
    match parts {
        [ip, mask] => pair_to_cidr(ip, mask),
        _ => parts.join(" "),
    }
}

#[cfg(test)]
mod tests {
    use super::parse_interfaces;

    const TABLE: &str = "\
config system interface
    edit \"wan1\"
        set vdom \"root\"
        set mode static
        set ip 203.0.113.10 255.255.255.248
        set allowaccess ping https ssh
        set status up
    next
    edit \"vlan120\"
        set vdom \"dmz\"
        set ip 10.12.0.1 255.255.255.0
        set vlanid 120
        set zone \"internal\"
    next
    edit \"mgmt\"
        set mode dhcp
    next
end
";

    #[test]
    fn address_pair_becomes_cidr() {
        let interfaces = parse_interfaces(TABLE);
        assert_eq!(interfaces.len(), 3);
        assert_eq!(interfaces[0].ip_cidr.as_deref(), Some("203.0.113.10/29"));
        assert_eq!(interfaces[1].ip_cidr.as_deref(), Some("10.12.0.1/24"));
        assert_eq!(interfaces[2].ip_cidr, None);
    }

    #[test]
    fn vlan_zone_and_vdom_are_read() {
        let interfaces = parse_interfaces(TABLE);
        assert_eq!(interfaces[1].vlan, Some(120));
        assert_eq!(interfaces[1].zone.as_deref(), Some("internal"));
        assert_eq!(interfaces[1].vdom, "dmz");
        assert_eq!(interfaces[2].vdom, "root");
    }

    #[test]
    fn allow_access_list_defaults_empty() {
        let interfaces = parse_interfaces(TABLE);
        assert_eq!(interfaces[0].allow_access, vec!["ping", "https", "ssh"]);
        assert!(interfaces[2].allow_access.is_empty());
    }
}
