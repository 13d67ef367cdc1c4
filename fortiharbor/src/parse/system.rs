use conftext_core::{fields, scanner};
use serde::Serialize;

/// Device-level metadata extracted from headers and `config system global`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemInfo {
    pub hostname: Option<String>,
    pub model: Option<String>,
    pub firmware_version: Option<String>,
    pub build: Option<String>,
    pub vdom_enabled: bool,
    pub primary_vdom: String,
}

/// Extract system metadata from one export.
///
/// The `#config-version=` header line is the preferred source for model,
/// firmware version, and build; `set alias` and `#buildno=` fill the gaps on
/// exports that lack it.
pub fn parse_system(text: &str) -> SystemInfo {
    let header = config_version_header(text);

    let model = header
        .and_then(model_from_header)
        .or_else(|| fields::value(text, "alias").map(str::to_string));
    let firmware_version = header.and_then(version_from_header);
    let build = header
        .and_then(build_from_header)
        .or_else(|| buildno_header(text));

    SystemInfo {
        hostname: hostname(text).map(str::to_string),
        model,
        firmware_version,
        build,
        vdom_enabled: text.contains("config vdom") || text.contains("set vdom-mode"),
        primary_vdom: fields::value(text, "vdom").unwrap_or("root").to_string(),
    }
}

/// `set hostname` is read from `config system global`; other sections are
/// not consulted. Only an export with no global block at all falls back to
/// a whole-text scan.
fn hostname(text: &str) -> Option<&str> {
    let globals = scanner::blocks(text, "system global");
    if globals.is_empty() {
        return fields::value(text, "hostname");
    }
    globals
        .iter()
        .find_map(|block| fields::value(block.body, "hostname"))
}

/// Value of the leading `#config-version=` header, if present.
fn config_version_header(text: &str) -> Option<&str> {
    text.lines()
        .find_map(|line| line.trim_start().strip_prefix("#config-version="))
}

/// `FGT60F-7.2.5-FW-build1517-...` carries the model suffix in its first
/// dash-separated segment.
fn model_from_header(header: &str) -> Option<String> {
    let first = header.split('-').next()?;
    let suffix = first.strip_prefix("FGT")?;
    if suffix.is_empty() {
        return None;
    }
    Some(format!("FortiGate-{suffix}"))
}

fn version_from_header(header: &str) -> Option<String> {
    let mut segments = header.split('-');
    let first = segments.next()?;
    if !first.starts_with("FGT") {
        return None;
    }
    let version = segments.next()?;
    if !is_dotted_triple(version) {
        return None;
    }
    Some(version.to_string())
}

fn build_from_header(header: &str) -> Option<String> {
    header.split('-').find_map(|segment| {
        let digits = segment.strip_prefix("build")?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(digits.to_string())
    })
}

fn buildno_header(text: &str) -> Option<String> {
    text.lines().find_map(|line| {
        let digits = line.trim_start().strip_prefix("#buildno=")?.trim();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(digits.to_string())
    })
}

fn is_dotted_triple(s: &str) -> bool {
    let mut parts = 0;
    for part in s.split('.') {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        parts += 1;
    }
    parts == 3
}
