use conftext_core::{fields, scanner};
use tracing::debug;

use crate::model::AdminAccount;

use super::pair_to_cidr;

/// Extract every admin account entry from the export.
pub fn parse_admins(text: &str) -> Vec<AdminAccount> {
    let mut admins = Vec::new();
    for block in scanner::blocks(text, "system admin") {
        for entry in scanner::entries(block.body) {
            match parse_admin(entry.id, entry.body) {
                Some(admin) => admins.push(admin),
                None => debug!("skipping admin entry without a username"),
            }
        }
    }
    admins
}

fn parse_admin(username: &str, body: &str) -> Option<AdminAccount> {
    if username.is_empty() {
        return None;
    }
    Some(AdminAccount {
        username: username.to_string(),
        profile: fields::value(body, "accprofile").map(str::to_string),
        trusted_hosts: trusted_hosts(body),
        two_factor: fields::value(body, "two-factor") == Some("enable"),
        public_key_set: body.contains("ssh-public-key"),
        vdom_scope: fields::value(body, "vdom").unwrap_or("root").to_string(),
    })
}

/// Collect `set trusthostN <ip> <netmask>` statements in order, converting
/// each to CIDR. A bare address with no mask is kept as-is.
fn trusted_hosts(body: &str) -> Vec<String> {
    let mut hosts = Vec::new();
    for (key, raw) in fields::statements(body) {
        let Some(n) = key.strip_prefix("trusthost") else {
            continue;
        };
        if n.is_empty() || !n.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        let mut parts = raw.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some(ip), Some(mask)) => hosts.push(pair_to_cidr(ip, mask)),
            (Some(ip), None) => hosts.push(ip.to_string()),
            _ => {}
        }
    }
    hosts
}
