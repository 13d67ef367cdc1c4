//! Domain types shared by parsing, persistence, and compliance evaluation.

use std::fmt::{self, Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A managed firewall appliance, keyed by canonical serial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub serial: String,
    pub hostname: Option<String>,
    pub model: Option<String>,
    pub vdom_enabled: bool,
    pub primary_vdom: String,
    /// External inventory annotation. Ingestion never writes this; it is set
    /// out of band and consumed by recency checks.
    pub status: Option<String>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// Device fields refreshed on every successful ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceMetadata {
    pub serial: String,
    pub hostname: Option<String>,
    pub model: Option<String>,
    pub vdom_enabled: bool,
    pub primary_vdom: String,
}

/// One archived configuration capture of a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: i64,
    pub device_serial: String,
    pub firmware_version: Option<String>,
    pub build: Option<String>,
    pub captured_at: DateTime<Utc>,
    pub file_hash: String,
    pub archive_path: String,
}

/// Snapshot fields known before the store assigns an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSnapshot {
    pub device_serial: String,
    pub firmware_version: Option<String>,
    pub build: Option<String>,
    pub captured_at: DateTime<Utc>,
    pub file_hash: String,
    pub archive_path: String,
}

/// One `config firewall policy` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirewallRule {
    pub seq: i64,
    pub uuid: Option<String>,
    pub src_intf: Vec<String>,
    pub dst_intf: Vec<String>,
    pub src_addr: Vec<String>,
    pub dst_addr: Vec<String>,
    pub service: Vec<String>,
    pub action: Option<String>,
    pub schedule: Option<String>,
    pub nat: bool,
    pub log: bool,
    pub inspection_mode: Option<String>,
    pub vdom: String,
}

/// One `config system interface` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkInterface {
    pub name: String,
    pub ip_cidr: Option<String>,
    pub mode: Option<String>,
    pub vlan: Option<i64>,
    pub zone: Option<String>,
    pub status: Option<String>,
    pub allow_access: Vec<String>,
    pub vdom: String,
}

/// One `config system admin` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminAccount {
    pub username: String,
    pub profile: Option<String>,
    pub trusted_hosts: Vec<String>,
    pub two_factor: bool,
    pub public_key_set: bool,
    pub vdom_scope: String,
}

/// Severity grading for compliance rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let word = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        f.write_str(word)
    }
}

/// Typed rule configuration evaluated by the compliance engine.
///
/// Each variant carries its own parameters; there is no string DSL to parse
/// at evaluation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RuleShape {
    /// Devices carrying the given external status must have a capture newer
    /// than the window.
    ConfigRecency { status: String, window_hours: i64 },
    /// Every admin account except the exempt one must list trusted hosts.
    AdminTrustedHosts { exempt_username: String },
    /// Every admin account needs two-factor auth or an SSH public key.
    AdminStrongAuth,
    /// Management access outside the exempt interface must be HTTPS-only or
    /// disabled.
    InterfaceAccessHygiene { exempt_interface: String },
}

/// A stored compliance rule definition, unique by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceRule {
    pub name: String,
    pub severity: Severity,
    pub description: String,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    pub shape: RuleShape,
}

fn enabled_default() -> bool {
    true
}

/// Verdict attached to one (snapshot, rule) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceStatus {
    Pass,
    Fail,
}

/// One evaluation result with its explanatory payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub snapshot_id: i64,
    pub rule: String,
    pub status: EvidenceStatus,
    pub payload: serde_json::Value,
    pub measured_at: DateTime<Utc>,
}

/// Record of a file that could not be processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarantineRecord {
    pub path: String,
    pub file_hash: Option<String>,
    pub reason: String,
    pub quarantined_path: String,
    pub created_at: DateTime<Utc>,
}
