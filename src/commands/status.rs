//! `status`: ledger counts per status.

use std::path::Path;

use anyhow::{Context, Result};
use paperdownload_core::config::ConfigOverrides;
use paperdownload_core::{ArtifactKind, Ledger};

use crate::cli::LedgerArgs;

pub fn run_status_command(args: &LedgerArgs, config_path: Option<&Path>) -> Result<()> {
    let config = super::load_app_config(
        config_path,
        &ConfigOverrides {
            ledger: args.ledger.clone(),
            ..ConfigOverrides::default()
        },
    )?;
    let ledger = Ledger::open(&config.ledger)
        .with_context(|| format!("cannot open ledger {}", config.ledger.display()))?;

    println!("ledger = {}", ledger.path().display());
    println!("records = {}", ledger.records().len());
    for kind in [ArtifactKind::Paper, ArtifactKind::Supplementary] {
        for (status, count) in ledger.count_by_status(kind) {
            println!("{kind}.{status} = {count}");
        }
    }
    Ok(())
}
