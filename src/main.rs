//! CLI entry point for the paperdownload tool.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::debug;

mod app;
mod cli;
mod commands;

use app::{command_dispatcher, terminal};
use cli::Cli;

/// Process exit outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    /// Every processed item succeeded, or nothing was pending.
    Success,
    /// Some items succeeded and some failed.
    Partial,
    /// Every processed item failed, or the run was interrupted.
    Failure,
}

impl From<ProcessExit> for ExitCode {
    fn from(exit: ProcessExit) -> Self {
        match exit {
            ProcessExit::Success => Self::SUCCESS,
            ProcessExit::Partial => Self::from(2),
            ProcessExit::Failure => Self::FAILURE,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let no_color = terminal::no_color_env_requested() || terminal::is_dumb_terminal();
    terminal::init_tracing(terminal::default_level(cli.verbose, cli.quiet), no_color);

    debug!(?cli, "CLI arguments parsed");

    let exit = command_dispatcher::dispatch(&cli).await?;
    Ok(exit.into())
}
