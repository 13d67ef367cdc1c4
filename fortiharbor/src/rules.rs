//! Compliance rule definitions.
//!
//! Rules are data, not code: a TOML file names each rule and selects a typed
//! shape with its parameters. An embedded seed set ships with the binary so
//! evaluation works out of the box; a `rules.toml` in an override directory
//! replaces it wholesale.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::model::{ComplianceRule, RuleShape, Severity};
use crate::store::{Store, StoreError};

#[derive(Debug, Deserialize)]
struct RuleFile {
    rule: Vec<ComplianceRule>,
}

/// Errors returned when loading rule definition files.
#[derive(Debug, Error)]
pub enum RuleLoadError {
    #[error("failed to read rules file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse rules file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

/// Load rule definitions from a TOML file.
pub fn load_rules(path: &Path) -> Result<Vec<ComplianceRule>, RuleLoadError> {
    let raw = fs::read_to_string(path).map_err(|source| RuleLoadError::Io {
        path: path.display().to_string(),
        source,
    })?;

    parse_rules(&raw, path.display().to_string())
}

/// Built-in seed rules.
pub fn default_rules() -> Vec<ComplianceRule> {
    let embedded = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/rules/default.toml"));
    match parse_rules(embedded, "embedded rules".to_string()) {
        Ok(rules) if !rules.is_empty() => rules,
        _ => fallback_rules(),
    }
}

/// Resolve the active rule set and say where it came from.
///
/// A non-empty `rules.toml` inside `rules_dir` wins; a missing, broken, or
/// empty override logs a warning and falls back to the embedded set.
pub fn load_rules_with_source(rules_dir: Option<&Path>) -> (Vec<ComplianceRule>, String) {
    if let Some(dir) = rules_dir {
        let path = dir.join("rules.toml");
        match load_rules(&path) {
            Ok(rules) if !rules.is_empty() => {
                return (rules, format!("file:{}", path.display()));
            }
            Ok(_) => {
                warn!(path = %path.display(), "rules file is empty, using embedded set");
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to load rules file, using embedded set");
            }
        }
    }
    (default_rules(), "embedded".to_string())
}

/// Insert every rule the store does not already hold, keyed by name.
/// Returns how many were created.
pub fn seed_rules(store: &dyn Store, rules: &[ComplianceRule]) -> Result<usize, StoreError> {
    let mut created = 0;
    for rule in rules {
        if store.create_rule_if_missing(rule)? {
            info!(rule = rule.name.as_str(), "seeded compliance rule");
            created += 1;
        }
    }
    Ok(created)
}

fn parse_rules(raw: &str, path: String) -> Result<Vec<ComplianceRule>, RuleLoadError> {
    let parsed: RuleFile =
        toml::from_str(raw).map_err(|source| RuleLoadError::Parse { path, source })?;
    Ok(parsed.rule)
}

fn fallback_rules() -> Vec<ComplianceRule> {
    vec![
        ComplianceRule {
            name: "Configuration freshness for leased devices".to_string(),
            severity: Severity::High,
            description: "Devices marked leased in the inventory must have a configuration \
                          capture newer than 48 hours."
                .to_string(),
            enabled: true,
            shape: RuleShape::ConfigRecency {
                status: "leased".to_string(),
                window_hours: 48,
            },
        },
        ComplianceRule {
            name: "Admin accounts restricted to trusted hosts".to_string(),
            severity: Severity::Critical,
            description: "Every administrator account except the maintenance account must \
                          restrict logins to trusted hosts."
                .to_string(),
            enabled: true,
            shape: RuleShape::AdminTrustedHosts {
                exempt_username: "maintenance".to_string(),
            },
        },
        ComplianceRule {
            name: "Admin accounts require strong authentication".to_string(),
            severity: Severity::High,
            description: "Every administrator account must enable two-factor authentication or \
                          carry an SSH public key."
                .to_string(),
            enabled: true,
            shape: RuleShape::AdminStrongAuth,
        },
        ComplianceRule {
            name: "Interface management access hygiene".to_string(),
            severity: Severity::Medium,
            description: "Management access on non-loopback interfaces must be HTTPS-only or \
                          disabled entirely."
                .to_string(),
            enabled: true,
            shape: RuleShape::InterfaceAccessHygiene {
                exempt_interface: "lo".to_string(),
            },
        },
    ]
}
