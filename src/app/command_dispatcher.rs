//! CLI command routing.
//!
//! Without a subcommand the primary paper pass runs with defaults.

use anyhow::Result;
use paperdownload_core::ArtifactKind;

use crate::cli::{Cli, Command, RulesCommand, RunArgs};
use crate::{ProcessExit, commands};

/// Runs the command selected by `cli` and returns the exit outcome.
pub(crate) async fn dispatch(cli: &Cli) -> Result<ProcessExit> {
    let config_path = cli.config.as_deref();

    match &cli.command {
        None => {
            commands::run_acquisition_command(
                ArtifactKind::Paper,
                &RunArgs::default(),
                config_path,
                cli.quiet,
            )
            .await
        }
        Some(Command::Run(args)) => {
            commands::run_acquisition_command(ArtifactKind::Paper, args, config_path, cli.quiet)
                .await
        }
        Some(Command::Supplementary(args)) => {
            commands::run_acquisition_command(
                ArtifactKind::Supplementary,
                args,
                config_path,
                cli.quiet,
            )
            .await
        }
        Some(Command::Rules { command }) => match command {
            RulesCommand::Init(args) => {
                commands::run_rules_init_command(args, config_path)?;
                Ok(ProcessExit::Success)
            }
        },
        Some(Command::Status(args)) => {
            commands::run_status_command(args, config_path)?;
            Ok(ProcessExit::Success)
        }
        Some(Command::ExportFailed(args)) => {
            commands::run_export_failed_command(args, config_path)?;
            Ok(ProcessExit::Success)
        }
    }
}
