use anyhow::{bail, Context, Result};
use clap::Parser;
use fortiharbor::model::ComplianceRule;
use fortiharbor::report::render_rules_text;
use fortiharbor::rules::load_rules_with_source;
use fortiharbor::store::{MemoryStore, Store};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod evaluate_cmd;
mod ingest_cmd;
mod inspect_cmd;

use cli::{AnnotateArgs, Cli, Command, OutputFormat, RulesArgs};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Ingest(args) => ingest_cmd::run_ingest(args),
        Command::Evaluate(args) => evaluate_cmd::run_evaluate(args),
        Command::Inspect(args) => inspect_cmd::run_inspect(args),
        Command::Rules(args) => run_rules(args),
        Command::Annotate(args) => run_annotate(args),
    }
}

fn run_rules(args: RulesArgs) -> Result<()> {
    let (rules, source) = load_rules_with_source(args.rules_dir.as_deref());

    match args.format {
        OutputFormat::Text => println!("{}", render_rules_text(&rules, &source)),
        OutputFormat::Json => {
            let report = RulesReport { source, rules };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn run_annotate(args: AnnotateArgs) -> Result<()> {
    if args.status.is_none() && !args.clear {
        bail!("pass --status VALUE or --clear");
    }

    let store = MemoryStore::load(&args.store)
        .with_context(|| format!("failed to load store {}", args.store.display()))?;
    store
        .set_device_status(&args.serial, args.status.clone())
        .with_context(|| format!("failed to update device {}", args.serial))?;
    store
        .save(&args.store)
        .with_context(|| format!("failed to save store {}", args.store.display()))?;

    match args.status {
        Some(status) => println!("{} status set to {status}", args.serial),
        None => println!("{} status cleared", args.serial),
    }

    Ok(())
}

#[derive(Debug, serde::Serialize)]
struct RulesReport {
    source: String,
    rules: Vec<ComplianceRule>,
}
