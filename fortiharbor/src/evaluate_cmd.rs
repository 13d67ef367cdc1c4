use anyhow::{Context, Result};
use fortiharbor::comply::evaluate;
use fortiharbor::report::render_evaluation_text;
use fortiharbor::rules::{load_rules_with_source, seed_rules};
use fortiharbor::store::MemoryStore;
use tracing::info;

use crate::cli::{EvaluateArgs, OutputFormat};

pub fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    let store = MemoryStore::load(&args.store)
        .with_context(|| format!("failed to load store {}", args.store.display()))?;

    let (rules, source) = load_rules_with_source(args.rules_dir.as_deref());
    let seeded = seed_rules(&store, &rules)?;
    info!(seeded, source = source.as_str(), "rule set ready");

    let report = evaluate(&store)?;
    store
        .save(&args.store)
        .with_context(|| format!("failed to save store {}", args.store.display()))?;

    match args.format {
        OutputFormat::Text => println!("{}", render_evaluation_text(&report)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(())
}
