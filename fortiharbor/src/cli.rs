use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "fortiharbor")]
#[command(about = "Ingest FortiGate configuration exports and evaluate compliance evidence")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Process export files from the inbox into the archive and store.
    Ingest(IngestArgs),
    /// Seed missing default rules and evaluate every enabled rule.
    Evaluate(EvaluateArgs),
    /// Parse a single export offline and show what would be extracted.
    Inspect(InspectArgs),
    /// Show the effective compliance rule definitions.
    Rules(RulesArgs),
    /// Set or clear the external inventory status of a device.
    Annotate(AnnotateArgs),
}

#[derive(Parser, Debug)]
pub struct IngestArgs {
    /// Directory scanned for dropped export files.
    #[arg(long, default_value = "./data")]
    pub inbox: PathBuf,
    /// Root of the per-tenant archive tree.
    #[arg(long, default_value = "./archive")]
    pub archive: PathBuf,
    /// Directory receiving rejected files.
    #[arg(long, default_value = "./archive/_quarantine")]
    pub quarantine: PathBuf,
    /// Store file backing devices, snapshots, and evidence.
    #[arg(long, default_value = "./fortiharbor.json")]
    pub store: PathBuf,
    /// Tenant name used in archive paths.
    #[arg(long)]
    pub tenant: Option<String>,
    /// Keep running, rescanning the inbox at a fixed interval.
    #[arg(long)]
    pub watch: bool,
    /// Seconds between scans in watch mode.
    #[arg(long, default_value_t = 300)]
    pub interval: u64,
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct EvaluateArgs {
    /// Store file backing devices, snapshots, and evidence.
    #[arg(long, default_value = "./fortiharbor.json")]
    pub store: PathBuf,
    /// Optional rules directory (expects rules.toml).
    #[arg(long)]
    pub rules_dir: Option<PathBuf>,
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Export file to inspect.
    pub file: PathBuf,
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct RulesArgs {
    /// Optional rules directory (expects rules.toml).
    #[arg(long)]
    pub rules_dir: Option<PathBuf>,
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct AnnotateArgs {
    /// Device serial to annotate.
    pub serial: String,
    /// Inventory status value to set (for example `leased`).
    #[arg(long, conflicts_with = "clear")]
    pub status: Option<String>,
    /// Clear the inventory status.
    #[arg(long)]
    pub clear: bool,
    /// Store file backing devices, snapshots, and evidence.
    #[arg(long, default_value = "./fortiharbor.json")]
    pub store: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
