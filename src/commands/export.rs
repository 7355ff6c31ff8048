//! `export-failed`: write failed DOIs to a fresh ledger.

use std::path::Path;

use anyhow::{Context, Result};
use paperdownload_core::Ledger;
use paperdownload_core::config::ConfigOverrides;

use crate::cli::ExportArgs;

pub fn run_export_failed_command(args: &ExportArgs, config_path: Option<&Path>) -> Result<()> {
    let config = super::load_app_config(
        config_path,
        &ConfigOverrides {
            ledger: args.ledger.ledger.clone(),
            ..ConfigOverrides::default()
        },
    )?;
    let ledger = Ledger::open(&config.ledger)
        .with_context(|| format!("cannot open ledger {}", config.ledger.display()))?;

    let count = ledger
        .export_failed(&args.output)
        .with_context(|| format!("cannot write {}", args.output.display()))?;
    println!("exported {count} failed DOIs to {}", args.output.display());
    Ok(())
}
