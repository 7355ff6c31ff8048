//! `run` and `supplementary`: acquisition passes over the ledger.

use std::io::{self, IsTerminal};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use paperdownload_core::config::ConfigOverrides;
use paperdownload_core::{
    AcquisitionOrchestrator, ArtifactKind, Ledger, PageArchive, ResumeFilter, RuleBook,
};
use tracing::{info, warn};

use crate::ProcessExit;
use crate::app::{exit_handler, terminal};
use crate::cli::RunArgs;

pub async fn run_acquisition_command(
    kind: ArtifactKind,
    args: &RunArgs,
    config_path: Option<&Path>,
    quiet: bool,
) -> Result<ProcessExit> {
    let config = super::load_app_config(
        config_path,
        &ConfigOverrides {
            ledger: args.ledger.ledger.clone(),
            rules_dir: args.rules_dir.clone(),
            delay_between_papers_secs: args.delay,
            resume_filter: args.resume_filter.map(ResumeFilter::from),
        },
    )?;

    let agents = config
        .agents(kind)
        .context("cannot set up browser helpers")?;
    let rules = RuleBook::load(&config.rules_dir);
    let mut ledger = Ledger::open(&config.ledger)
        .with_context(|| format!("cannot open ledger {}", config.ledger.display()))?;

    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_signal = Arc::clone(&interrupted);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupted_signal.store(true, Ordering::SeqCst);
        }
    });

    let use_progress = terminal::should_use_progress(
        io::stderr().is_terminal(),
        quiet,
        terminal::is_dumb_terminal(),
    );

    let mut orchestrator = AcquisitionOrchestrator::new(
        kind,
        rules,
        agents,
        PageArchive::new(&config.html_dir),
        config.orchestrator_settings(),
    )
    .with_interrupt_flag(Arc::clone(&interrupted))
    .with_progress(terminal::progress_bar(use_progress, 0));
    if kind == ArtifactKind::Supplementary {
        orchestrator = orchestrator.with_document_extensions(&config.supplementary_extensions);
    }

    info!(kind = %kind, ledger = %config.ledger.display(), "starting acquisition");
    let summary = orchestrator.run(&mut ledger).await;

    if !quiet {
        println!(
            "{kind}: {} of {} succeeded ({} failed, {} without document, {} skipped)",
            summary.succeeded, summary.total, summary.failed, summary.no_document, summary.skipped
        );
    }
    if summary.interrupted {
        warn!(
            processed = summary.processed,
            total = summary.total,
            "Interrupted. Run again to resume."
        );
    }

    Ok(exit_handler::determine_exit_outcome(&summary))
}
