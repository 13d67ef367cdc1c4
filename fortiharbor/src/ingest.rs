//! Inbox ingestion pipeline.
//!
//! Each file dropped into the inbox ends in exactly one of three states:
//! processed (file archived, device upserted, snapshot and entities stored),
//! duplicate (content hash already known, file dropped), or quarantined
//! (file copied aside with a logged reason). The source file is removed from
//! the inbox in every state except a failed quarantine copy, so a crash can
//! be recovered by rerunning.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::identity;
use crate::model::{NewSnapshot, QuarantineRecord};
use crate::parse;
use crate::store::{Store, StoreError};

/// Directory layout and tenant assignment for one ingestion pipeline.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Directory watched for dropped export files.
    pub inbox: PathBuf,
    /// Root of the per-tenant archive tree.
    pub archive: PathBuf,
    /// Flat directory receiving rejected files.
    pub quarantine: PathBuf,
    /// Tenant name for archive pathing; `None` files under `unknown`.
    pub tenant: Option<String>,
}

/// Counters from one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub processed: usize,
    pub duplicates: usize,
    pub quarantined: usize,
}

/// Errors that abort an ingestion run.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Another run holds the pipeline; overlapping runs are refused rather
    /// than queued.
    #[error("ingestion already in progress")]
    AlreadyRunning,
    #[error("failed to access {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

enum FileOutcome {
    Processed,
    Duplicate,
    Quarantined,
}

/// Single-flight ingestion pipeline over one inbox.
pub struct Ingestor {
    config: IngestConfig,
    running: AtomicBool,
}

/// Releases the run flag even when a run errors out mid-file.
struct RunGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

impl Ingestor {
    pub fn new(config: IngestConfig) -> Self {
        Self {
            config,
            running: AtomicBool::new(false),
        }
    }

    /// Process every eligible file currently in the inbox.
    ///
    /// Returns [`IngestError::AlreadyRunning`] when a run is in flight on
    /// this ingestor. Hidden files, `.part` files, and non-files are skipped
    /// so in-progress uploads are left alone.
    pub fn run(&self, store: &dyn Store) -> Result<IngestReport, IngestError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(IngestError::AlreadyRunning);
        }
        let _guard = RunGuard {
            flag: &self.running,
        };
        self.run_locked(store)
    }

    fn run_locked(&self, store: &dyn Store) -> Result<IngestReport, IngestError> {
        for dir in [
            &self.config.inbox,
            &self.config.archive,
            &self.config.quarantine,
        ] {
            fs::create_dir_all(dir).map_err(|source| IngestError::Io {
                path: dir.display().to_string(),
                source,
            })?;
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(&self.config.inbox)
            .map_err(|source| IngestError::Io {
                path: self.config.inbox.display().to_string(),
                source,
            })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .collect();
        paths.sort();

        let mut report = IngestReport::default();
        for path in paths {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.starts_with('.') || name.ends_with(".part") || !path.is_file() {
                debug!(file = name, "skipping ineligible inbox entry");
                continue;
            }
            match self.process_file(store, &path, name)? {
                FileOutcome::Processed => report.processed += 1,
                FileOutcome::Duplicate => report.duplicates += 1,
                FileOutcome::Quarantined => report.quarantined += 1,
            }
        }

        info!(
            processed = report.processed,
            duplicates = report.duplicates,
            quarantined = report.quarantined,
            "ingestion run complete"
        );
        Ok(report)
    }

    fn process_file(
        &self,
        store: &dyn Store,
        path: &Path,
        name: &str,
    ) -> Result<FileOutcome, StoreError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                return self.quarantine(store, path, name, None, &format!("unreadable file: {err}"))
            }
        };
        let file_hash = sha256_hex(&bytes);

        if store.find_snapshot_by_hash(&file_hash)?.is_some() {
            debug!(file = name, "content already ingested, dropping duplicate");
            remove_source(path);
            return Ok(FileOutcome::Duplicate);
        }

        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(_) => {
                return self.quarantine(store, path, name, Some(file_hash), "not valid UTF-8 text")
            }
        };

        let Some(serial) = identity::resolve(&text) else {
            return self.quarantine(store, path, name, Some(file_hash), "no usable device identity");
        };

        let parsed = parse::parse_config(&text);
        if parsed.entity_count() == 0 {
            warn!(file = name, "no entities extracted, evaluation will skip this snapshot");
        }
        let now = Utc::now();

        let archive_path = match self.archive_file(path, name, &serial, now) {
            Ok(dest) => dest,
            Err(err) => {
                return self.quarantine(
                    store,
                    path,
                    name,
                    Some(file_hash),
                    &format!("archive copy failed: {err}"),
                )
            }
        };

        // Upsert only after the archive copy succeeds: a device must never
        // exist with zero snapshots.
        store.upsert_device(&parsed.metadata(&serial), now)?;
        let snapshot = store.create_snapshot(NewSnapshot {
            device_serial: serial.clone(),
            firmware_version: parsed.system.firmware_version.clone(),
            build: parsed.system.build.clone(),
            captured_at: now,
            file_hash,
            archive_path,
        })?;
        store.insert_firewall_rules(snapshot.id, &parsed.firewall_rules)?;
        store.insert_interfaces(snapshot.id, &parsed.interfaces)?;
        store.insert_admins(snapshot.id, &parsed.admins)?;

        info!(
            file = name,
            serial = serial.as_str(),
            snapshot = snapshot.id,
            rules = parsed.firewall_rules.len(),
            interfaces = parsed.interfaces.len(),
            admins = parsed.admins.len(),
            "snapshot stored"
        );
        remove_source(path);
        Ok(FileOutcome::Processed)
    }

    /// Copy a rejected file into quarantine and record why.
    ///
    /// The record is written even when the copy itself fails; in that case
    /// the source is left in the inbox for a later manual look.
    fn quarantine(
        &self,
        store: &dyn Store,
        path: &Path,
        name: &str,
        file_hash: Option<String>,
        reason: &str,
    ) -> Result<FileOutcome, StoreError> {
        warn!(file = name, reason = reason, "quarantining file");
        let dest = self.config.quarantine.join(name);
        match fs::copy(path, &dest) {
            Ok(_) => remove_source(path),
            Err(err) => {
                warn!(file = name, error = %err, "quarantine copy failed, leaving source in place");
            }
        }
        store.log_quarantine(QuarantineRecord {
            path: path.display().to_string(),
            file_hash,
            reason: reason.to_string(),
            quarantined_path: dest.display().to_string(),
            created_at: Utc::now(),
        })?;
        Ok(FileOutcome::Quarantined)
    }

    /// Copy into `archive/<tenant>/<serial>/<yyyy>/<mm>/<dd>/<name>`.
    fn archive_file(
        &self,
        source: &Path,
        name: &str,
        serial: &str,
        now: DateTime<Utc>,
    ) -> std::io::Result<String> {
        let tenant = self.config.tenant.as_deref().unwrap_or("unknown");
        let dir = self
            .config
            .archive
            .join(tenant)
            .join(serial)
            .join(format!("{:04}", now.year()))
            .join(format!("{:02}", now.month()))
            .join(format!("{:02}", now.day()));
        fs::create_dir_all(&dir)?;
        let dest = dir.join(name);
        fs::copy(source, &dest)?;
        Ok(dest.display().to_string())
    }
}

fn remove_source(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        warn!(path = %path.display(), error = %err, "failed to remove source file");
    }
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
