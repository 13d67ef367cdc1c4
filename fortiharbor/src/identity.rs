//! Canonical device identity derivation.
//!
//! Exports do not reliably carry their own serial in one place, so identity
//! is resolved through a strategy chain: the central-management declaration,
//! then alternate identity settings, then a header comment hint, and finally
//! a deterministic fingerprint of the device description. Every strategy
//! validates its candidate the same way; a manager or analyzer serial is
//! never accepted as a device identity.

use conftext_core::{fields, scanner};
use sha2::{Digest, Sha256};

/// Prefixes of foreign-appliance serials that must never identify a device.
const EXCLUDED_PREFIXES: [&str; 2] = ["FMG", "FAZ"];

/// Alternate identity settings scanned anywhere in the text, in order.
const ALTERNATE_KEYS: [&str; 3] = ["serial-number", "serialno", "serial-no"];

/// Leading comment lines considered when looking for a serial hint.
const HEADER_SCAN_LINES: usize = 20;

/// Derive the canonical serial for one export.
///
/// Returns `None` only for text with no recognizable configuration content
/// at all; anything else yields at least the deterministic
/// `FGT-UNKNOWN-<hex>` fallback.
pub fn resolve(text: &str) -> Option<String> {
    central_management_serial(text)
        .or_else(|| alternate_setting_serial(text))
        .or_else(|| header_serial(text))
        .or_else(|| fallback_identity(text))
}

/// Strategy 1: the serial declared under `config system central-management`.
fn central_management_serial(text: &str) -> Option<String> {
    scanner::blocks(text, "system central-management")
        .iter()
        .find_map(|block| fields::value(block.body, "serial-number"))
        .and_then(validate)
}

/// Strategy 2: alternate identity settings anywhere in the text.
fn alternate_setting_serial(text: &str) -> Option<String> {
    ALTERNATE_KEYS
        .iter()
        .find_map(|key| fields::value(text, key).and_then(validate))
}

/// Strategy 3: a serial hint in the leading comment header.
fn header_serial(text: &str) -> Option<String> {
    for line in text.lines().take(HEADER_SCAN_LINES) {
        let Some(comment) = line.trim_start().strip_prefix('#') else {
            continue;
        };
        let lowered = comment.to_ascii_lowercase();
        for marker in ["serial-number", "serialnumber"] {
            let Some(pos) = lowered.find(marker) else {
                continue;
            };
            let after = comment[pos + marker.len()..].trim_start_matches([':', '=', ' ', '\t']);
            let Some(candidate) = after.split_whitespace().next() else {
                continue;
            };
            if let Some(serial) = validate(candidate) {
                return Some(serial);
            }
        }
    }
    None
}

/// Strategy 4: deterministic fingerprint of {alias, hostname, first two
/// interface addresses}, truncated to twelve hex digits.
fn fallback_identity(text: &str) -> Option<String> {
    if !has_config_content(text) {
        return None;
    }

    let mut hasher = Sha256::new();
    hasher.update(fields::value(text, "alias").unwrap_or("").as_bytes());
    hasher.update(b"|");
    hasher.update(fields::value(text, "hostname").unwrap_or("").as_bytes());
    for addr in first_interface_addresses(text, 2) {
        hasher.update(b"|");
        hasher.update(addr.as_bytes());
    }
    let digest = format!("{:x}", hasher.finalize());
    Some(format!("FGT-UNKNOWN-{}", digest[..12].to_ascii_uppercase()))
}

/// Uppercase-normalize and validate a serial candidate.
///
/// FMG/FAZ prefixes are rejected outright; what remains must look like a
/// FortiGate serial: `FG` followed by 8 to 17 uppercase alphanumerics.
fn validate(raw: &str) -> Option<String> {
    let candidate = raw.trim().to_ascii_uppercase();
    if EXCLUDED_PREFIXES
        .iter()
        .any(|prefix| candidate.starts_with(prefix))
    {
        return None;
    }
    let rest = candidate.strip_prefix("FG")?;
    if !(8..=17).contains(&rest.len()) {
        return None;
    }
    if !rest
        .bytes()
        .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
    {
        return None;
    }
    Some(candidate)
}

/// Whether the text carries any configuration structure worth identifying.
fn has_config_content(text: &str) -> bool {
    text.lines().any(|line| {
        let trimmed = line.trim_start();
        trimmed.starts_with("#config-version")
            || scanner::keyword_rest(trimmed, "config").is_some_and(|rest| !rest.is_empty())
            || scanner::keyword_rest(trimmed, "set").is_some_and(|rest| !rest.is_empty())
    })
}

fn first_interface_addresses(text: &str, limit: usize) -> Vec<String> {
    let mut addrs = Vec::new();
    for block in scanner::blocks(text, "system interface") {
        for entry in scanner::entries(block.body) {
            let Some(parts) = fields::list(entry.body, "ip") else {
                continue;
            };
            let Some(first) = parts.first() else {
                continue;
            };
            if first.parse::<std::net::Ipv4Addr>().is_ok() {
                addrs.push(first.clone());
                if addrs.len() == limit {
                    return addrs;
                }
            }
        }
    }
    addrs
}
