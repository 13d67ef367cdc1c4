use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use fortiharbor::ingest::{IngestConfig, Ingestor};
use fortiharbor::report::render_ingest_text;
use fortiharbor::store::MemoryStore;

use crate::cli::{IngestArgs, OutputFormat};

pub fn run_ingest(args: IngestArgs) -> Result<()> {
    let store = MemoryStore::load(&args.store)
        .with_context(|| format!("failed to load store {}", args.store.display()))?;
    let ingestor = Ingestor::new(IngestConfig {
        inbox: args.inbox.clone(),
        archive: args.archive.clone(),
        quarantine: args.quarantine.clone(),
        tenant: args.tenant.clone(),
    });

    loop {
        let report = ingestor.run(&store)?;
        store
            .save(&args.store)
            .with_context(|| format!("failed to save store {}", args.store.display()))?;

        match args.format {
            OutputFormat::Text => println!("{}", render_ingest_text(&report)),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        }

        if !args.watch {
            break;
        }
        thread::sleep(Duration::from_secs(args.interval));
    }

    Ok(())
}
