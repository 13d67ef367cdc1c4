use colored::Colorize;

use crate::comply::EvaluationReport;
use crate::ingest::IngestReport;
use crate::inspect::InspectReport;
use crate::model::ComplianceRule;

/// Render ingestion counters for terminal output.
pub fn render_ingest_text(report: &IngestReport) -> String {
    let mut out = Vec::new();
    out.push("ingestion".to_string());
    out.push(format!("- processed: {}", report.processed));
    out.push(format!("- duplicates: {}", report.duplicates));
    let quarantined = if report.quarantined > 0 {
        report.quarantined.to_string().red().to_string()
    } else {
        report.quarantined.to_string()
    };
    out.push(format!("- quarantined: {quarantined}"));
    out.join("\n")
}

/// Render per-rule outcomes and the run summary.
pub fn render_evaluation_text(report: &EvaluationReport) -> String {
    let mut out = Vec::new();
    out.push("rules".to_string());
    if report.rule_results.is_empty() {
        out.push("- none".to_string());
    }
    for outcome in &report.rule_results {
        let verdict = if outcome.failing == 0 {
            "PASS".green().to_string()
        } else {
            "FAIL".red().to_string()
        };
        out.push(format!(
            "- {} [{}] {}: {} of {} snapshots failing",
            verdict, outcome.severity, outcome.rule, outcome.failing, outcome.evidence_count
        ));
    }
    out.push(String::new());
    out.push(
        format!(
            "{} rules checked, {} violations",
            report.rules_checked, report.violations
        )
        .cyan()
        .to_string(),
    );
    out.join("\n")
}

/// Render the effective rule definitions and where they came from.
pub fn render_rules_text(rules: &[ComplianceRule], source: &str) -> String {
    let mut out = Vec::new();
    out.push(format!("rule definitions (source: {source})"));
    if rules.is_empty() {
        out.push("- none".to_string());
    }
    for rule in rules {
        let state = if rule.enabled {
            "enabled".green().to_string()
        } else {
            "disabled".yellow().to_string()
        };
        out.push(format!("- [{}] {} ({state})", rule.severity, rule.name));
        out.push(format!("  {}", rule.description));
    }
    out.join("\n")
}

/// Render an offline inspection report.
pub fn render_inspect_text(report: &InspectReport) -> String {
    let mut out = Vec::new();
    out.push("identity".to_string());
    match &report.identity {
        Some(serial) => out.push(format!("- {}", serial.cyan())),
        None => out.push(format!("- {}", "none resolved".red())),
    }
    out.push(String::new());
    out.push("system".to_string());
    out.push(format!("- hostname: {}", opt(&report.system.hostname)));
    out.push(format!("- model: {}", opt(&report.system.model)));
    out.push(format!(
        "- firmware: {} build {}",
        opt(&report.system.firmware_version),
        opt(&report.system.build)
    ));
    out.push(format!(
        "- vdom: enabled={} primary={}",
        report.system.vdom_enabled, report.system.primary_vdom
    ));
    out.push(String::new());
    out.push("entities".to_string());
    out.push(format!("- firewall rules: {}", report.firewall_rules));
    out.push(format!("- interfaces: {}", report.interfaces));
    out.push(format!("- admins: {}", report.admins));
    out.push(String::new());
    out.push("signals".to_string());
    for signal in &report.signals {
        let verdict = if signal.passing {
            "PASS".green().to_string()
        } else {
            "WARN".yellow().to_string()
        };
        out.push(format!("- {} {}: {}", verdict, signal.name, signal.detail));
    }
    out.join("\n")
}

fn opt(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("unknown")
}
