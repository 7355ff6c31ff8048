//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use paperdownload_core::ResumeFilter;

/// Resumable paper and supplementary-material acquisition from a DOI ledger.
///
/// Each DOI in the ledger is resolved in a browser, its landing page is
/// captured, a document link is synthesized or extracted, and the download is
/// confirmed by watching the download folder. Progress is written back to the
/// ledger after every step, so an interrupted run resumes where it stopped.
#[derive(Parser, Debug)]
#[command(name = "paperdownload")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/paperdownload/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Acquire primary papers for every pending ledger row
    Run(RunArgs),
    /// Acquire supplementary material for rows with a captured page
    Supplementary(RunArgs),
    /// Manage rule stores
    Rules {
        #[command(subcommand)]
        command: RulesCommand,
    },
    /// Print ledger counts per status
    Status(LedgerArgs),
    /// Write the DOIs of failed rows to a new CSV
    ExportFailed(ExportArgs),
}

/// Rule store subcommands.
#[derive(Subcommand, Debug)]
pub enum RulesCommand {
    /// Write the shipped defaults for every missing rule store
    Init(RulesArgs),
}

/// Ledger selection shared by several commands.
#[derive(Args, Debug, Clone, Default)]
pub struct LedgerArgs {
    /// Ledger CSV (overrides the config file)
    #[arg(short, long, value_name = "CSV")]
    pub ledger: Option<PathBuf>,
}

/// Options for acquisition passes.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub ledger: LedgerArgs,

    /// Rule store directory (overrides the config file)
    #[arg(long, value_name = "DIR")]
    pub rules_dir: Option<PathBuf>,

    /// Seconds to wait between DOIs (0-86400)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(0..=86_400))]
    pub delay: Option<u64>,

    /// Which rows after the resume point are processed
    #[arg(long, value_enum)]
    pub resume_filter: Option<ResumeFilterArg>,
}

/// Options for `rules init`.
#[derive(Args, Debug, Clone, Default)]
pub struct RulesArgs {
    /// Rule store directory (overrides the config file)
    #[arg(long, value_name = "DIR")]
    pub rules_dir: Option<PathBuf>,
}

/// Options for `export-failed`.
#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    #[command(flatten)]
    pub ledger: LedgerArgs,

    /// Output CSV
    #[arg(short, long, value_name = "CSV")]
    pub output: PathBuf,
}

/// CLI spelling of [`ResumeFilter`].
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeFilterArg {
    /// Skip rows already marked Success
    SkipCompleted,
    /// Return every row after the resume point
    Legacy,
}

impl From<ResumeFilterArg> for ResumeFilter {
    fn from(value: ResumeFilterArg) -> Self {
        match value {
            ResumeFilterArg::SkipCompleted => Self::SkipCompleted,
            ResumeFilterArg::Legacy => Self::Legacy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_no_command_parses_successfully() {
        let cli = Cli::try_parse_from(["paperdownload"]).unwrap();
        assert_eq!(cli.verbose, 0);
        assert!(!cli.quiet);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let cli = Cli::try_parse_from(["paperdownload", "-vv", "status"]).unwrap();
        assert_eq!(cli.verbose, 2);

        let cli = Cli::try_parse_from(["paperdownload", "status", "--verbose"]).unwrap();
        assert_eq!(cli.verbose, 1);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let result = Cli::try_parse_from(["paperdownload", "--help"]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let result = Cli::try_parse_from(["paperdownload", "--version"]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_cli_run_options() {
        let cli = Cli::try_parse_from([
            "paperdownload",
            "run",
            "--ledger",
            "papers.csv",
            "--delay",
            "5",
            "--resume-filter",
            "legacy",
        ])
        .unwrap();
        let Some(Command::Run(args)) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.ledger.ledger, Some(PathBuf::from("papers.csv")));
        assert_eq!(args.delay, Some(5));
        assert_eq!(args.resume_filter, Some(ResumeFilterArg::Legacy));
        assert_eq!(
            ResumeFilter::from(ResumeFilterArg::Legacy),
            ResumeFilter::Legacy
        );
    }

    #[test]
    fn test_cli_delay_out_of_range_rejected() {
        let result = Cli::try_parse_from(["paperdownload", "run", "--delay", "100000"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_rules_init() {
        let cli = Cli::try_parse_from(["paperdownload", "rules", "init", "--rules-dir", "r"])
            .unwrap();
        let Some(Command::Rules {
            command: RulesCommand::Init(args),
        }) = cli.command
        else {
            panic!("expected rules init");
        };
        assert_eq!(args.rules_dir, Some(PathBuf::from("r")));
    }

    #[test]
    fn test_cli_export_failed_requires_output() {
        assert!(Cli::try_parse_from(["paperdownload", "export-failed"]).is_err());
        let cli =
            Cli::try_parse_from(["paperdownload", "export-failed", "-o", "failed.csv"]).unwrap();
        assert!(matches!(cli.command, Some(Command::ExportFailed(_))));
    }
}
