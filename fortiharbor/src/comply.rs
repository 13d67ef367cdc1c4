//! Compliance evaluation over persisted snapshots.
//!
//! Every run starts from a clean slate: prior evidence is cleared, then each
//! enabled rule is checked against every snapshot that carries parsed
//! entities. One evidence record per (snapshot, rule) pair; the per-entity
//! detail that justifies the verdict lives in the record's JSON payload.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::model::{
    AdminAccount, ComplianceRule, Evidence, EvidenceStatus, RuleShape, Severity, Snapshot,
};
use crate::store::{Store, StoreError};

/// Summary of one evaluation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvaluationReport {
    /// Rules whose evidence was evaluated and persisted.
    pub rules_checked: usize,
    /// Failing evidence records written across all rules.
    pub violations: usize,
    pub rule_results: Vec<RuleOutcome>,
}

/// Per-rule aggregate within one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleOutcome {
    pub rule: String,
    pub severity: Severity,
    pub evidence_count: usize,
    pub failing: usize,
}

type Verdict = Result<Option<(EvidenceStatus, Value)>, StoreError>;

/// Re-evaluate every enabled rule against every snapshot with entities.
///
/// A failure in one (rule, snapshot) check skips that pair; a failure
/// persisting one rule's evidence skips that rule. Neither aborts the run.
pub fn evaluate(store: &dyn Store) -> Result<EvaluationReport, StoreError> {
    store.clear_evidence()?;
    let rules = store.list_enabled_rules()?;
    let snapshots = store.list_snapshots_with_entities()?;
    let now = Utc::now();

    let mut report = EvaluationReport::default();
    for rule in rules {
        let evidence = evaluate_rule(store, &rule, &snapshots, now);
        if let Err(err) = store.insert_evidence(&evidence) {
            warn!(
                rule = rule.name.as_str(),
                error = %err,
                "failed to persist evidence, rule not counted"
            );
            continue;
        }
        let failing = evidence
            .iter()
            .filter(|e| e.status == EvidenceStatus::Fail)
            .count();
        report.rules_checked += 1;
        report.violations += failing;
        report.rule_results.push(RuleOutcome {
            rule: rule.name.clone(),
            severity: rule.severity,
            evidence_count: evidence.len(),
            failing,
        });
    }
    Ok(report)
}

fn evaluate_rule(
    store: &dyn Store,
    rule: &ComplianceRule,
    snapshots: &[Snapshot],
    now: DateTime<Utc>,
) -> Vec<Evidence> {
    let mut evidence = Vec::new();
    for snapshot in snapshots {
        let verdict = match &rule.shape {
            RuleShape::ConfigRecency {
                status,
                window_hours,
            } => check_recency(store, snapshot, status, *window_hours, now),
            RuleShape::AdminTrustedHosts { exempt_username } => {
                check_trusted_hosts(store, snapshot, exempt_username)
            }
            RuleShape::AdminStrongAuth => check_strong_auth(store, snapshot),
            RuleShape::InterfaceAccessHygiene { exempt_interface } => {
                check_interface_access(store, snapshot, exempt_interface)
            }
        };
        match verdict {
            Ok(Some((status, payload))) => evidence.push(Evidence {
                snapshot_id: snapshot.id,
                rule: rule.name.clone(),
                status,
                payload,
                measured_at: now,
            }),
            Ok(None) => {}
            Err(err) => {
                warn!(
                    rule = rule.name.as_str(),
                    snapshot = snapshot.id,
                    error = %err,
                    "check failed for snapshot, skipping"
                );
            }
        }
    }
    evidence
}

#[derive(Serialize)]
struct RecencyPayload<'a> {
    serial: &'a str,
    hostname: Option<&'a str>,
    status: &'a str,
    captured_at: DateTime<Utc>,
    model: Option<&'a str>,
    age_hours: i64,
}

/// Applies only to devices carrying the configured external status; other
/// snapshots produce no evidence.
fn check_recency(
    store: &dyn Store,
    snapshot: &Snapshot,
    wanted_status: &str,
    window_hours: i64,
    now: DateTime<Utc>,
) -> Verdict {
    let Some(device) = store.device(&snapshot.device_serial)? else {
        return Ok(None);
    };
    if device.status.as_deref() != Some(wanted_status) {
        return Ok(None);
    }

    let age_hours = now.signed_duration_since(snapshot.captured_at).num_hours();
    let verdict = if age_hours < window_hours {
        EvidenceStatus::Pass
    } else {
        EvidenceStatus::Fail
    };
    let payload = RecencyPayload {
        serial: &device.serial,
        hostname: device.hostname.as_deref(),
        status: wanted_status,
        captured_at: snapshot.captured_at,
        model: device.model.as_deref(),
        age_hours,
    };
    Ok(Some((verdict, payload_value(&payload))))
}

#[derive(Serialize)]
struct AdminHostsRow<'a> {
    username: &'a str,
    trusted_hosts: &'a [String],
    profile: Option<&'a str>,
    has_trusted_hosts: bool,
}

#[derive(Serialize)]
struct AdminHostsPayload<'a> {
    device_serial: &'a str,
    admins: Vec<AdminHostsRow<'a>>,
    violation_count: usize,
}

/// The exempt username is excluded from examination entirely; a snapshot
/// whose only admins are exempt produces no evidence.
fn check_trusted_hosts(store: &dyn Store, snapshot: &Snapshot, exempt_username: &str) -> Verdict {
    let admins = store.admins_for(snapshot.id)?;
    let examined: Vec<&AdminAccount> = admins
        .iter()
        .filter(|a| a.username != exempt_username)
        .collect();
    if examined.is_empty() {
        return Ok(None);
    }

    let rows: Vec<AdminHostsRow> = examined
        .iter()
        .map(|a| AdminHostsRow {
            username: &a.username,
            trusted_hosts: &a.trusted_hosts,
            profile: a.profile.as_deref(),
            has_trusted_hosts: !a.trusted_hosts.is_empty(),
        })
        .collect();
    let violation_count = rows.iter().filter(|r| !r.has_trusted_hosts).count();
    let payload = AdminHostsPayload {
        device_serial: &snapshot.device_serial,
        admins: rows,
        violation_count,
    };
    Ok(Some((verdict_from(violation_count), payload_value(&payload))))
}

#[derive(Serialize)]
struct AdminAuthRow<'a> {
    username: &'a str,
    two_factor: bool,
    public_key_set: bool,
    profile: Option<&'a str>,
    passes_rule: bool,
}

#[derive(Serialize)]
struct AdminAuthPayload<'a> {
    device_serial: &'a str,
    admins: Vec<AdminAuthRow<'a>>,
    violation_count: usize,
}

fn check_strong_auth(store: &dyn Store, snapshot: &Snapshot) -> Verdict {
    let admins = store.admins_for(snapshot.id)?;
    if admins.is_empty() {
        return Ok(None);
    }

    let rows: Vec<AdminAuthRow> = admins
        .iter()
        .map(|a| AdminAuthRow {
            username: &a.username,
            two_factor: a.two_factor,
            public_key_set: a.public_key_set,
            profile: a.profile.as_deref(),
            passes_rule: a.two_factor || a.public_key_set,
        })
        .collect();
    let violation_count = rows.iter().filter(|r| !r.passes_rule).count();
    let payload = AdminAuthPayload {
        device_serial: &snapshot.device_serial,
        admins: rows,
        violation_count,
    };
    Ok(Some((verdict_from(violation_count), payload_value(&payload))))
}

#[derive(Serialize)]
struct InterfaceRow<'a> {
    name: &'a str,
    allow_access: &'a [String],
    zone: Option<&'a str>,
    ip_cidr: Option<&'a str>,
    passes_rule: bool,
}

#[derive(Serialize)]
struct InterfacePayload<'a> {
    device_serial: &'a str,
    interfaces: Vec<InterfaceRow<'a>>,
    violation_count: usize,
}

fn check_interface_access(
    store: &dyn Store,
    snapshot: &Snapshot,
    exempt_interface: &str,
) -> Verdict {
    let interfaces = store.interfaces_for(snapshot.id)?;
    let rows: Vec<InterfaceRow> = interfaces
        .iter()
        .filter(|i| i.name != exempt_interface)
        .map(|i| InterfaceRow {
            name: &i.name,
            allow_access: &i.allow_access,
            zone: i.zone.as_deref(),
            ip_cidr: i.ip_cidr.as_deref(),
            passes_rule: access_is_clean(&i.allow_access),
        })
        .collect();
    if rows.is_empty() {
        return Ok(None);
    }

    let violation_count = rows.iter().filter(|r| !r.passes_rule).count();
    let payload = InterfacePayload {
        device_serial: &snapshot.device_serial,
        interfaces: rows,
        violation_count,
    };
    Ok(Some((verdict_from(violation_count), payload_value(&payload))))
}

/// Empty access list means management is disabled; otherwise the list must
/// offer `https` and must not offer plain `http`.
pub(crate) fn access_is_clean(allow_access: &[String]) -> bool {
    allow_access.is_empty()
        || (allow_access.iter().any(|p| p == "https") && !allow_access.iter().any(|p| p == "http"))
}

fn verdict_from(violation_count: usize) -> EvidenceStatus {
    if violation_count == 0 {
        EvidenceStatus::Pass
    } else {
        EvidenceStatus::Fail
    }
}

fn payload_value<T: Serialize>(payload: &T) -> Value {
    serde_json::to_value(payload).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::{access_is_clean, evaluate};
    use crate::model::{
        AdminAccount, ComplianceRule, DeviceMetadata, EvidenceStatus, NetworkInterface,
        NewSnapshot, RuleShape, Severity,
    };
    use crate::store::{MemoryStore, Store};

    const SERIAL: &str = "FGT1234567890AB";

    fn store_with_snapshot(age: Duration) -> (MemoryStore, i64) {
        let store = MemoryStore::new();
        store
            .upsert_device(
                &DeviceMetadata {
                    serial: SERIAL.to_string(),
                    hostname: Some("fw1".to_string()),
                    model: Some("FortiGate-60F".to_string()),
                    vdom_enabled: false,
                    primary_vdom: "root".to_string(),
                },
                Utc::now(),
            )
            .expect("device");
        let snapshot = store
            .create_snapshot(NewSnapshot {
                device_serial: SERIAL.to_string(),
                firmware_version: Some("7.2.5".to_string()),
                build: Some("1517".to_string()),
                captured_at: Utc::now() - age,
                file_hash: "hash-1".to_string(),
                archive_path: "archive/unknown".to_string(),
            })
            .expect("snapshot");
        (store, snapshot.id)
    }

    fn admin(username: &str, hosts: &[&str], two_factor: bool, public_key: bool) -> AdminAccount {
        AdminAccount {
            username: username.to_string(),
            profile: Some("super_admin".to_string()),
            trusted_hosts: hosts.iter().map(|h| h.to_string()).collect(),
            two_factor,
            public_key_set: public_key,
            vdom_scope: "root".to_string(),
        }
    }

    fn interface(name: &str, access: &[&str]) -> NetworkInterface {
        NetworkInterface {
            name: name.to_string(),
            ip_cidr: Some("192.0.2.1/24".to_string()),
            mode: Some("static".to_string()),
            vlan: None,
            zone: None,
            status: None,
            allow_access: access.iter().map(|p| p.to_string()).collect(),
            vdom: "root".to_string(),
        }
    }

    fn seed(store: &MemoryStore, name: &str, shape: RuleShape) {
        store
            .create_rule_if_missing(&ComplianceRule {
                name: name.to_string(),
                severity: Severity::High,
                description: String::new(),
                enabled: true,
                shape,
            })
            .expect("seed rule");
    }

    #[test]
    fn trusted_hosts_exempts_configured_username() {
        let (store, snapshot_id) = store_with_snapshot(Duration::hours(1));
        store
            .insert_admins(
                snapshot_id,
                &[
                    admin("admin", &["10.0.0.0 255.255.255.0"], true, false),
                    admin("backup-operator", &[], false, false),
                    admin("maintenance", &[], false, false),
                ],
            )
            .expect("admins");
        seed(
            &store,
            "trusted hosts",
            RuleShape::AdminTrustedHosts {
                exempt_username: "maintenance".to_string(),
            },
        );

        let report = evaluate(&store).expect("evaluate");
        assert_eq!(report.rules_checked, 1);
        assert_eq!(report.violations, 1);

        let evidence = store.evidence().expect("evidence");
        assert_eq!(evidence.len(), 1);
        assert_eq!(evidence[0].status, EvidenceStatus::Fail);

        let admins = evidence[0].payload["admins"].as_array().expect("admins");
        assert_eq!(admins.len(), 2);
        assert!(admins.iter().all(|a| a["username"] != "maintenance"));
        assert_eq!(evidence[0].payload["violation_count"], 1);
    }

    #[test]
    fn recency_applies_only_to_matching_status() {
        let (store, snapshot_id) = store_with_snapshot(Duration::hours(72));
        // Recency only considers snapshots that parsed into something.
        store
            .insert_admins(snapshot_id, &[admin("admin", &[], true, false)])
            .expect("admins");
        seed(
            &store,
            "recency",
            RuleShape::ConfigRecency {
                status: "leased".to_string(),
                window_hours: 48,
            },
        );

        let report = evaluate(&store).expect("first evaluate");
        assert_eq!(report.violations, 0);
        assert!(store.evidence().expect("evidence").is_empty());

        store
            .set_device_status(SERIAL, Some("leased".to_string()))
            .expect("status");
        let report = evaluate(&store).expect("second evaluate");
        assert_eq!(report.violations, 1);

        let evidence = store.evidence().expect("evidence");
        assert_eq!(evidence.len(), 1);
        assert_eq!(evidence[0].status, EvidenceStatus::Fail);
        assert_eq!(evidence[0].payload["age_hours"], 72);
    }

    #[test]
    fn fresh_capture_passes_recency() {
        let (store, snapshot_id) = store_with_snapshot(Duration::hours(1));
        store
            .insert_admins(snapshot_id, &[admin("admin", &[], true, false)])
            .expect("admins");
        store
            .set_device_status(SERIAL, Some("leased".to_string()))
            .expect("status");
        seed(
            &store,
            "recency",
            RuleShape::ConfigRecency {
                status: "leased".to_string(),
                window_hours: 48,
            },
        );

        let report = evaluate(&store).expect("evaluate");
        assert_eq!(report.violations, 0);
        let evidence = store.evidence().expect("evidence");
        assert_eq!(evidence.len(), 1);
        assert_eq!(evidence[0].status, EvidenceStatus::Pass);
    }

    #[test]
    fn strong_auth_accepts_either_factor() {
        let (store, snapshot_id) = store_with_snapshot(Duration::hours(1));
        store
            .insert_admins(
                snapshot_id,
                &[
                    admin("totp-admin", &[], true, false),
                    admin("key-admin", &[], false, true),
                    admin("weak-admin", &[], false, false),
                ],
            )
            .expect("admins");
        seed(&store, "strong auth", RuleShape::AdminStrongAuth);

        let report = evaluate(&store).expect("evaluate");
        assert_eq!(report.violations, 1);

        let evidence = store.evidence().expect("evidence");
        assert_eq!(evidence[0].payload["violation_count"], 1);
        let rows = evidence[0].payload["admins"].as_array().expect("admins");
        assert_eq!(rows.len(), 3);
        // Each row carries the account's profile alongside the auth flags.
        assert!(rows.iter().all(|r| r["profile"] == "super_admin"));
    }

    #[test]
    fn interface_hygiene_flags_plain_http() {
        let (store, snapshot_id) = store_with_snapshot(Duration::hours(1));
        store
            .insert_interfaces(
                snapshot_id,
                &[
                    interface("wan1", &["ping", "https", "ssh"]),
                    interface("lan", &["ping", "https", "ssh", "http"]),
                    interface("lo", &["ping", "https", "http"]),
                ],
            )
            .expect("interfaces");
        seed(
            &store,
            "hygiene",
            RuleShape::InterfaceAccessHygiene {
                exempt_interface: "lo".to_string(),
            },
        );

        let report = evaluate(&store).expect("evaluate");
        assert_eq!(report.violations, 1);

        let evidence = store.evidence().expect("evidence");
        let rows = evidence[0].payload["interfaces"].as_array().expect("rows");
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r["name"] != "lo"));
        assert_eq!(evidence[0].payload["violation_count"], 1);
    }

    #[test]
    fn evaluation_replaces_previous_evidence() {
        let (store, snapshot_id) = store_with_snapshot(Duration::hours(1));
        store
            .insert_admins(snapshot_id, &[admin("weak-admin", &[], false, false)])
            .expect("admins");
        seed(&store, "strong auth", RuleShape::AdminStrongAuth);

        evaluate(&store).expect("first evaluate");
        evaluate(&store).expect("second evaluate");
        assert_eq!(store.evidence().expect("evidence").len(), 1);
    }

    #[test]
    fn snapshot_without_entities_is_not_evaluated() {
        let (store, _) = store_with_snapshot(Duration::hours(1));
        seed(&store, "strong auth", RuleShape::AdminStrongAuth);

        let report = evaluate(&store).expect("evaluate");
        assert_eq!(report.rules_checked, 1);
        assert_eq!(report.violations, 0);
        assert!(store.evidence().expect("evidence").is_empty());
    }

    #[test]
    fn disabled_management_access_is_clean() {
        assert!(access_is_clean(&[]));
        assert!(access_is_clean(&["https".to_string()]));
        assert!(!access_is_clean(&["https".to_string(), "http".to_string()]));
        assert!(!access_is_clean(&["ping".to_string()]));
    }
}
