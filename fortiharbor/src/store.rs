//! Persistence boundary for devices, snapshots, entities, and evidence.
//!
//! The pipeline and the compliance engine only ever talk to the [`Store`]
//! trait. [`MemoryStore`] is the reference implementation backing the CLI
//! and the test suite; it can serialize its whole state to a JSON file so
//! separate CLI invocations compose.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{
    AdminAccount, ComplianceRule, Device, DeviceMetadata, Evidence, FirewallRule, NetworkInterface,
    NewSnapshot, QuarantineRecord, Snapshot,
};

/// Errors surfaced by persistence implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A snapshot with the same content hash already exists.
    #[error("snapshot with content hash {0} already exists")]
    DuplicateHash(String),
    /// An operation referenced a snapshot id the store does not know.
    #[error("unknown snapshot id {0}")]
    UnknownSnapshot(i64),
    /// An operation referenced a device serial the store does not know.
    #[error("unknown device serial {0}")]
    UnknownDevice(String),
    /// Failed to read or write the backing file.
    #[error("failed to access store file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    /// The backing file held something other than a store snapshot.
    #[error("failed to decode store file {path}: {source}")]
    Decode {
        path: String,
        source: serde_json::Error,
    },
    /// Store state could not be serialized for saving.
    #[error("failed to encode store state: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Persistence operations consumed by ingestion and evaluation.
///
/// Implementations must be shareable across threads; read operations may run
/// concurrently with an active ingestion or evaluation run.
pub trait Store: Send + Sync {
    fn find_snapshot_by_hash(&self, file_hash: &str) -> Result<Option<Snapshot>, StoreError>;
    fn device(&self, serial: &str) -> Result<Option<Device>, StoreError>;
    fn devices(&self) -> Result<Vec<Device>, StoreError>;
    /// Insert or refresh a device. `first_seen` and `status` survive the
    /// refresh; everything else tracks the latest export.
    fn upsert_device(
        &self,
        meta: &DeviceMetadata,
        seen_at: DateTime<Utc>,
    ) -> Result<Device, StoreError>;
    /// Record the external inventory status of a device.
    fn set_device_status(&self, serial: &str, status: Option<String>) -> Result<(), StoreError>;
    fn create_snapshot(&self, new: NewSnapshot) -> Result<Snapshot, StoreError>;
    fn snapshots_for_device(&self, serial: &str) -> Result<Vec<Snapshot>, StoreError>;
    fn insert_firewall_rules(
        &self,
        snapshot_id: i64,
        rules: &[FirewallRule],
    ) -> Result<(), StoreError>;
    fn insert_interfaces(
        &self,
        snapshot_id: i64,
        interfaces: &[NetworkInterface],
    ) -> Result<(), StoreError>;
    fn insert_admins(&self, snapshot_id: i64, admins: &[AdminAccount]) -> Result<(), StoreError>;
    fn firewall_rules_for(&self, snapshot_id: i64) -> Result<Vec<FirewallRule>, StoreError>;
    fn interfaces_for(&self, snapshot_id: i64) -> Result<Vec<NetworkInterface>, StoreError>;
    fn admins_for(&self, snapshot_id: i64) -> Result<Vec<AdminAccount>, StoreError>;
    /// Snapshots that carry at least one parsed entity, in id order.
    fn list_snapshots_with_entities(&self) -> Result<Vec<Snapshot>, StoreError>;
    fn log_quarantine(&self, record: QuarantineRecord) -> Result<(), StoreError>;
    fn quarantine_log(&self) -> Result<Vec<QuarantineRecord>, StoreError>;
    /// Insert a rule unless one with the same name exists. Returns whether
    /// the rule was created.
    fn create_rule_if_missing(&self, rule: &ComplianceRule) -> Result<bool, StoreError>;
    fn list_enabled_rules(&self) -> Result<Vec<ComplianceRule>, StoreError>;
    fn clear_evidence(&self) -> Result<(), StoreError>;
    fn insert_evidence(&self, records: &[Evidence]) -> Result<(), StoreError>;
    fn evidence(&self) -> Result<Vec<Evidence>, StoreError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct State {
    devices: BTreeMap<String, Device>,
    snapshots: BTreeMap<i64, Snapshot>,
    next_snapshot_id: i64,
    firewall_rules: BTreeMap<i64, Vec<FirewallRule>>,
    interfaces: BTreeMap<i64, Vec<NetworkInterface>>,
    admins: BTreeMap<i64, Vec<AdminAccount>>,
    rules: Vec<ComplianceRule>,
    evidence: Vec<Evidence>,
    quarantine: Vec<QuarantineRecord>,
}

impl State {
    fn has_entities(&self, snapshot_id: i64) -> bool {
        self.firewall_rules
            .get(&snapshot_id)
            .is_some_and(|v| !v.is_empty())
            || self
                .interfaces
                .get(&snapshot_id)
                .is_some_and(|v| !v.is_empty())
            || self.admins.get(&snapshot_id).is_some_and(|v| !v.is_empty())
    }

    fn require_snapshot(&self, snapshot_id: i64) -> Result<(), StoreError> {
        if self.snapshots.contains_key(&snapshot_id) {
            Ok(())
        } else {
            Err(StoreError::UnknownSnapshot(snapshot_id))
        }
    }
}

/// In-memory store with optional JSON file persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a previously saved store file. A missing file yields an empty
    /// store, so first runs need no setup.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let raw = fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let state: State = serde_json::from_str(&raw).map_err(|source| StoreError::Decode {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self {
            state: Mutex::new(state),
        })
    }

    /// Write the whole store state to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let state = self.state.lock();
        let raw = serde_json::to_string_pretty(&*state).map_err(StoreError::Encode)?;
        fs::write(path, raw).map_err(|source| StoreError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}

impl Store for MemoryStore {
    fn find_snapshot_by_hash(&self, file_hash: &str) -> Result<Option<Snapshot>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .snapshots
            .values()
            .find(|s| s.file_hash == file_hash)
            .cloned())
    }

    fn device(&self, serial: &str) -> Result<Option<Device>, StoreError> {
        Ok(self.state.lock().devices.get(serial).cloned())
    }

    fn devices(&self) -> Result<Vec<Device>, StoreError> {
        Ok(self.state.lock().devices.values().cloned().collect())
    }

    fn upsert_device(
        &self,
        meta: &DeviceMetadata,
        seen_at: DateTime<Utc>,
    ) -> Result<Device, StoreError> {
        let mut state = self.state.lock();
        let device = state
            .devices
            .entry(meta.serial.clone())
            .and_modify(|existing| {
                existing.hostname = meta.hostname.clone();
                existing.model = meta.model.clone();
                existing.vdom_enabled = meta.vdom_enabled;
                existing.primary_vdom = meta.primary_vdom.clone();
                existing.last_seen = seen_at;
            })
            .or_insert_with(|| Device {
                serial: meta.serial.clone(),
                hostname: meta.hostname.clone(),
                model: meta.model.clone(),
                vdom_enabled: meta.vdom_enabled,
                primary_vdom: meta.primary_vdom.clone(),
                status: None,
                first_seen: seen_at,
                last_seen: seen_at,
            });
        Ok(device.clone())
    }

    fn set_device_status(&self, serial: &str, status: Option<String>) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        let device = state
            .devices
            .get_mut(serial)
            .ok_or_else(|| StoreError::UnknownDevice(serial.to_string()))?;
        device.status = status;
        Ok(())
    }

    fn create_snapshot(&self, new: NewSnapshot) -> Result<Snapshot, StoreError> {
        let mut state = self.state.lock();
        if !state.devices.contains_key(&new.device_serial) {
            return Err(StoreError::UnknownDevice(new.device_serial));
        }
        if state
            .snapshots
            .values()
            .any(|s| s.file_hash == new.file_hash)
        {
            return Err(StoreError::DuplicateHash(new.file_hash));
        }
        state.next_snapshot_id += 1;
        let snapshot = Snapshot {
            id: state.next_snapshot_id,
            device_serial: new.device_serial,
            firmware_version: new.firmware_version,
            build: new.build,
            captured_at: new.captured_at,
            file_hash: new.file_hash,
            archive_path: new.archive_path,
        };
        state.snapshots.insert(snapshot.id, snapshot.clone());
        Ok(snapshot)
    }

    fn snapshots_for_device(&self, serial: &str) -> Result<Vec<Snapshot>, StoreError> {
        Ok(self
            .state
            .lock()
            .snapshots
            .values()
            .filter(|s| s.device_serial == serial)
            .cloned()
            .collect())
    }

    fn insert_firewall_rules(
        &self,
        snapshot_id: i64,
        rules: &[FirewallRule],
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.require_snapshot(snapshot_id)?;
        state
            .firewall_rules
            .entry(snapshot_id)
            .or_default()
            .extend_from_slice(rules);
        Ok(())
    }

    fn insert_interfaces(
        &self,
        snapshot_id: i64,
        interfaces: &[NetworkInterface],
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.require_snapshot(snapshot_id)?;
        state
            .interfaces
            .entry(snapshot_id)
            .or_default()
            .extend_from_slice(interfaces);
        Ok(())
    }

    fn insert_admins(&self, snapshot_id: i64, admins: &[AdminAccount]) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.require_snapshot(snapshot_id)?;
        state
            .admins
            .entry(snapshot_id)
            .or_default()
            .extend_from_slice(admins);
        Ok(())
    }

    fn firewall_rules_for(&self, snapshot_id: i64) -> Result<Vec<FirewallRule>, StoreError> {
        Ok(self
            .state
            .lock()
            .firewall_rules
            .get(&snapshot_id)
            .cloned()
            .unwrap_or_default())
    }

    fn interfaces_for(&self, snapshot_id: i64) -> Result<Vec<NetworkInterface>, StoreError> {
        Ok(self
            .state
            .lock()
            .interfaces
            .get(&snapshot_id)
            .cloned()
            .unwrap_or_default())
    }

    fn admins_for(&self, snapshot_id: i64) -> Result<Vec<AdminAccount>, StoreError> {
        Ok(self
            .state
            .lock()
            .admins
            .get(&snapshot_id)
            .cloned()
            .unwrap_or_default())
    }

    fn list_snapshots_with_entities(&self) -> Result<Vec<Snapshot>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .snapshots
            .values()
            .filter(|s| state.has_entities(s.id))
            .cloned()
            .collect())
    }

    fn log_quarantine(&self, record: QuarantineRecord) -> Result<(), StoreError> {
        self.state.lock().quarantine.push(record);
        Ok(())
    }

    fn quarantine_log(&self) -> Result<Vec<QuarantineRecord>, StoreError> {
        Ok(self.state.lock().quarantine.clone())
    }

    fn create_rule_if_missing(&self, rule: &ComplianceRule) -> Result<bool, StoreError> {
        let mut state = self.state.lock();
        if state.rules.iter().any(|r| r.name == rule.name) {
            return Ok(false);
        }
        state.rules.push(rule.clone());
        Ok(true)
    }

    fn list_enabled_rules(&self) -> Result<Vec<ComplianceRule>, StoreError> {
        Ok(self
            .state
            .lock()
            .rules
            .iter()
            .filter(|r| r.enabled)
            .cloned()
            .collect())
    }

    fn clear_evidence(&self) -> Result<(), StoreError> {
        self.state.lock().evidence.clear();
        Ok(())
    }

    fn insert_evidence(&self, records: &[Evidence]) -> Result<(), StoreError> {
        self.state.lock().evidence.extend_from_slice(records);
        Ok(())
    }

    fn evidence(&self) -> Result<Vec<Evidence>, StoreError> {
        Ok(self.state.lock().evidence.clone())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{MemoryStore, Store, StoreError};
    use crate::model::{AdminAccount, DeviceMetadata, NewSnapshot};

    fn meta(serial: &str) -> DeviceMetadata {
        DeviceMetadata {
            serial: serial.to_string(),
            hostname: Some("fw1".to_string()),
            model: Some("FortiGate-60F".to_string()),
            vdom_enabled: false,
            primary_vdom: "root".to_string(),
        }
    }

    fn snapshot(serial: &str, hash: &str) -> NewSnapshot {
        NewSnapshot {
            device_serial: serial.to_string(),
            firmware_version: Some("7.2.5".to_string()),
            build: Some("1517".to_string()),
            captured_at: Utc::now(),
            file_hash: hash.to_string(),
            archive_path: "archive/unknown".to_string(),
        }
    }

    fn admin(username: &str) -> AdminAccount {
        AdminAccount {
            username: username.to_string(),
            profile: None,
            trusted_hosts: Vec::new(),
            two_factor: false,
            public_key_set: false,
            vdom_scope: "root".to_string(),
        }
    }

    #[test]
    fn duplicate_hash_is_rejected() {
        let store = MemoryStore::new();
        store.upsert_device(&meta("FGT1234567890AB"), Utc::now()).expect("device");
        store.create_snapshot(snapshot("FGT1234567890AB", "abc")).expect("first");
        let err = store
            .create_snapshot(snapshot("FGT1234567890AB", "abc"))
            .expect_err("second insert with same hash");
        assert!(matches!(err, StoreError::DuplicateHash(_)));
    }

    #[test]
    fn upsert_preserves_status_and_first_seen() {
        let store = MemoryStore::new();
        let created = store.upsert_device(&meta("FGT1234567890AB"), Utc::now()).expect("create");
        store
            .set_device_status("FGT1234567890AB", Some("leased".to_string()))
            .expect("status");

        let mut refreshed = meta("FGT1234567890AB");
        refreshed.hostname = Some("fw1-renamed".to_string());
        let updated = store.upsert_device(&refreshed, Utc::now()).expect("update");

        assert_eq!(updated.status.as_deref(), Some("leased"));
        assert_eq!(updated.first_seen, created.first_seen);
        assert_eq!(updated.hostname.as_deref(), Some("fw1-renamed"));
        assert!(updated.last_seen >= created.last_seen);
    }

    #[test]
    fn snapshots_without_entities_are_not_listed() {
        let store = MemoryStore::new();
        store.upsert_device(&meta("FGT1234567890AB"), Utc::now()).expect("device");
        let bare = store.create_snapshot(snapshot("FGT1234567890AB", "a")).expect("bare");
        let full = store.create_snapshot(snapshot("FGT1234567890AB", "b")).expect("full");
        store.insert_admins(full.id, &[admin("admin")]).expect("admins");

        let listed = store.list_snapshots_with_entities().expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, full.id);
        assert_ne!(listed[0].id, bare.id);
    }

    #[test]
    fn entity_insert_requires_known_snapshot() {
        let store = MemoryStore::new();
        let err = store.insert_admins(99, &[admin("admin")]).expect_err("unknown snapshot");
        assert!(matches!(err, StoreError::UnknownSnapshot(99)));
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("store.json");

        let store = MemoryStore::new();
        store.upsert_device(&meta("FGT1234567890AB"), Utc::now()).expect("device");
        let snap = store.create_snapshot(snapshot("FGT1234567890AB", "abc")).expect("snapshot");
        store.insert_admins(snap.id, &[admin("admin")]).expect("admins");
        store.save(&path).expect("save");

        let reloaded = MemoryStore::load(&path).expect("load");
        assert_eq!(reloaded.devices().expect("devices").len(), 1);
        assert_eq!(reloaded.admins_for(snap.id).expect("admins").len(), 1);
        assert!(reloaded
            .find_snapshot_by_hash("abc")
            .expect("lookup")
            .is_some());
    }

    #[test]
    fn missing_store_file_loads_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = MemoryStore::load(&dir.path().join("absent.json")).expect("load");
        assert!(store.devices().expect("devices").is_empty());
    }
}
