use conftext_core::{fields, scanner};
use tracing::debug;

use crate::model::FirewallRule;

/// Extract every firewall policy entry from the export.
pub fn parse_policies(text: &str) -> Vec<FirewallRule> {
    let mut rules = Vec::new();
    for block in scanner::blocks(text, "firewall policy") {
        for entry in scanner::entries(block.body) {
            match parse_policy(entry.id, entry.body) {
                Some(rule) => rules.push(rule),
                None => debug!(id = entry.id, "skipping firewall policy entry without numeric id"),
            }
        }
    }
    rules
}

fn parse_policy(id: &str, body: &str) -> Option<FirewallRule> {
    let seq = id.parse().ok()?;
    Some(FirewallRule {
        seq,
        uuid: fields::value(body, "uuid").map(str::to_string),
        src_intf: fields::list(body, "srcintf").unwrap_or_default(),
        dst_intf: fields::list(body, "dstintf").unwrap_or_default(),
        src_addr: fields::list(body, "srcaddr").unwrap_or_default(),
        dst_addr: fields::list(body, "dstaddr").unwrap_or_default(),
        service: fields::list(body, "service").unwrap_or_default(),
        action: fields::value(body, "action").map(str::to_string),
        schedule: fields::value(body, "schedule").map(str::to_string),
        nat: fields::value(body, "nat") == Some("enable"),
        // Logging is on by default; only an explicit disable turns it off.
        log: fields::value(body, "logtraffic") != Some("disable"),
        inspection_mode: fields::value(body, "inspection-mode").map(str::to_string),
        vdom: fields::value(body, "vdom").unwrap_or("root").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::parse_policies;

    const TABLE: &str = "\
config firewall policy
    edit 4
        set uuid 8a7b6c5d-4e3f-2a1b-0c9d-8e7f6a5b4c3d
        set srcintf \"lan\"
        set dstintf \"wan1\"
        set srcaddr \"all\"
        set dstaddr \"web servers\" \"dns\"
        set action accept
        set schedule \"always\"
        set service \"HTTPS\" \"DNS\"
        set nat enable
    next
    edit 9
        set srcintf \"guest\"
        set dstintf \"wan1\"
        set action deny
        set logtraffic disable
    next
    edit \"broken\"
        set action accept
    next
end
";

    #[test]
    fn fields_map_onto_rule() {
        let rules = parse_policies(TABLE);
        assert_eq!(rules.len(), 2);

        let first = &rules[0];
        assert_eq!(first.seq, 4);
        assert_eq!(first.uuid.as_deref(), Some("8a7b6c5d-4e3f-2a1b-0c9d-8e7f6a5b4c3d"));
        assert_eq!(first.dst_addr, vec!["web servers", "dns"]);
        assert_eq!(first.action.as_deref(), Some("accept"));
        assert!(first.nat);
        assert!(first.log);
        assert_eq!(first.vdom, "root");
    }

    #[test]
    fn explicit_logtraffic_disable_turns_log_off() {
        let rules = parse_policies(TABLE);
        assert!(!rules[1].nat);
        assert!(!rules[1].log);
    }

    #[test]
    fn non_numeric_entry_is_skipped() {
        assert!(parse_policies(TABLE).iter().all(|r| r.seq != 0));
    }
}
