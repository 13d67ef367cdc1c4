//! FortiGate configuration ingestion and compliance evidence.
//!
//! This library turns raw FortiOS CLI exports dropped into an inbox into a
//! queryable inventory: devices keyed by canonical serial, content-addressed
//! configuration snapshots, parsed entities (firewall policies, interfaces,
//! admin accounts), and pass/fail compliance evidence with explanatory
//! payloads.
//!
//! # Architecture
//!
//! The library is organized into a small number of functional areas:
//!
//! ## Ingestion
//!
//! - [`identity`] — Resolve the canonical device serial from an export
//! - [`parse`] — Best-effort extraction of system metadata and entities
//! - [`ingest`] — Inbox pipeline: dedupe, quarantine, archive, persist
//!
//! ## Compliance
//!
//! - [`rules`] — Rule definitions: embedded TOML seed set plus overrides
//! - [`comply`] — Evaluate typed rule shapes and write evidence records
//!
//! ## Persistence & Surfaces
//!
//! - [`store`] — The `Store` trait and the JSON-backed `MemoryStore`
//! - [`model`] — Domain types shared across the crate
//! - [`inspect`] — Offline single-file inspection
//! - [`report`] — Terminal-friendly colored rendering
//!
//! # Workflow
//!
//! The typical operator workflow:
//!
//! 1. **Ingest** export files from the inbox into the archive and store
//! 2. **Annotate** devices with their external inventory status
//! 3. **Evaluate** every enabled rule over all snapshots with entities
//! 4. **Report** per-rule outcomes; drill into evidence payloads as needed
//!
//! # Examples
//!
//! ```ignore
//! use fortiharbor::comply::evaluate;
//! use fortiharbor::ingest::{IngestConfig, Ingestor};
//! use fortiharbor::store::MemoryStore;
//!
//! let store = MemoryStore::load(Path::new("fortiharbor.json"))?;
//! let ingestor = Ingestor::new(IngestConfig {
//!     inbox: "data".into(),
//!     archive: "archive".into(),
//!     quarantine: "archive/_quarantine".into(),
//!     tenant: None,
//! });
//! let counters = ingestor.run(&store)?;
//! println!("processed {}", counters.processed);
//!
//! let report = evaluate(&store)?;
//! println!("{} violations", report.violations);
//! ```
//!
//! # Built on conftext-core
//!
//! This library uses `conftext-core` for generic balanced-block scanning and
//! field reading over FortiOS-style configuration text. All firewall-domain
//! logic is contained in this crate.

pub mod comply;
pub mod identity;
pub mod ingest;
pub mod inspect;
pub mod model;
pub mod parse;
pub mod report;
pub mod rules;
pub mod store;
