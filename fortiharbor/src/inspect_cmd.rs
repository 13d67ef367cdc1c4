use std::fs;

use anyhow::{Context, Result};
use fortiharbor::inspect::build_inspect_report;
use fortiharbor::report::render_inspect_text;

use crate::cli::{InspectArgs, OutputFormat};

pub fn run_inspect(args: InspectArgs) -> Result<()> {
    let text = fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let report = build_inspect_report(&text);

    match args.format {
        OutputFormat::Text => println!("{}", render_inspect_text(&report)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(())
}
