//! Exit code logic for the paperdownload process.
//!
//! Single responsibility: map run counters to the process exit outcome.

use paperdownload_core::RunSummary;

use crate::ProcessExit;

/// Determines the process exit outcome from a finished run.
pub(crate) fn determine_exit_outcome(summary: &RunSummary) -> ProcessExit {
    if summary.interrupted {
        ProcessExit::Failure
    } else if summary.failed == 0 {
        ProcessExit::Success
    } else if summary.succeeded > 0 {
        ProcessExit::Partial
    } else {
        ProcessExit::Failure
    }
}
