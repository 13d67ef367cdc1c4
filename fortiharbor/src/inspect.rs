//! Offline inspection of a single export file.
//!
//! Answers "what would ingestion make of this file" without a store: the
//! resolved identity, system metadata, entity counts, and a handful of
//! store-free sanity signals mirroring what the compliance rules look at.

use serde::Serialize;

use crate::comply;
use crate::identity;
use crate::parse::{self, ParsedConfig, SystemInfo};

/// What ingestion would extract from one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InspectReport {
    pub identity: Option<String>,
    pub system: SystemInfo,
    pub firewall_rules: usize,
    pub interfaces: usize,
    pub admins: usize,
    pub signals: Vec<SanitySignal>,
}

/// One warning signal derived from the parsed entities alone. Rule
/// exemptions need the stored rule set, so signals examine everything.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SanitySignal {
    pub name: String,
    pub passing: bool,
    pub detail: String,
}

pub fn build_inspect_report(text: &str) -> InspectReport {
    let parsed = parse::parse_config(text);
    let signals = sanity_signals(&parsed);
    InspectReport {
        identity: identity::resolve(text),
        firewall_rules: parsed.firewall_rules.len(),
        interfaces: parsed.interfaces.len(),
        admins: parsed.admins.len(),
        system: parsed.system,
        signals,
    }
}

fn sanity_signals(parsed: &ParsedConfig) -> Vec<SanitySignal> {
    let mut signals = Vec::new();

    let admin_total = parsed.admins.len();
    let without_hosts = parsed
        .admins
        .iter()
        .filter(|a| a.trusted_hosts.is_empty())
        .count();
    signals.push(SanitySignal {
        name: "admins-without-trusted-hosts".to_string(),
        passing: without_hosts == 0,
        detail: format!("{without_hosts} of {admin_total} admin accounts list no trusted hosts"),
    });

    let weak_auth = parsed
        .admins
        .iter()
        .filter(|a| !a.two_factor && !a.public_key_set)
        .count();
    signals.push(SanitySignal {
        name: "admins-without-strong-auth".to_string(),
        passing: weak_auth == 0,
        detail: format!(
            "{weak_auth} of {admin_total} admin accounts have neither two-factor nor a public key"
        ),
    });

    let dirty_access = parsed
        .interfaces
        .iter()
        .filter(|i| !comply::access_is_clean(&i.allow_access))
        .count();
    signals.push(SanitySignal {
        name: "interfaces-with-unclean-access".to_string(),
        passing: dirty_access == 0,
        detail: format!(
            "{dirty_access} of {} interfaces expose management access that is not HTTPS-only",
            parsed.interfaces.len()
        ),
    });

    signals
}

#[cfg(test)]
mod tests {
    use super::build_inspect_report;

    const EXPORT: &str = "\
#config-version=FGT60F-7.2.5-FW-build1517-230608:opmode=0:vdom=0:user=admin
config system global
    set hostname \"fw1\"
end
config system central-management
    set serial-number \"FGT1234567890AB\"
end
config system interface
    edit \"wan1\"
        set allowaccess ping https ssh
    next
    edit \"lan\"
        set allowaccess ping https http
    next
end
config system admin
    edit \"admin\"
        set trusthost1 198.51.100.0 255.255.255.0
        set two-factor enable
    next
end
";

    #[test]
    fn report_carries_identity_and_counts() {
        let report = build_inspect_report(EXPORT);
        assert_eq!(report.identity.as_deref(), Some("FGT1234567890AB"));
        assert_eq!(report.system.hostname.as_deref(), Some("fw1"));
        assert_eq!(report.interfaces, 2);
        assert_eq!(report.admins, 1);
        assert_eq!(report.firewall_rules, 0);
    }

    #[test]
    fn signals_flag_plain_http_but_not_strong_admin() {
        let report = build_inspect_report(EXPORT);
        let by_name = |name: &str| {
            report
                .signals
                .iter()
                .find(|s| s.name == name)
                .expect("signal present")
        };
        assert!(by_name("admins-without-trusted-hosts").passing);
        assert!(by_name("admins-without-strong-auth").passing);
        assert!(!by_name("interfaces-with-unclean-access").passing);
    }
}
