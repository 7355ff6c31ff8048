//! Per-item outcomes, failure taxonomy, and run counters.

use std::fmt;

/// Classification of what went wrong for one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// A rule store was missing or unreadable.
    ConfigMissing,
    /// No rule applied where one was required.
    RuleNotFound,
    /// The DOI did not resolve to a landing page, or the page was not captured.
    UrlResolutionFailure,
    /// No document link exists.
    NoDocumentFound,
    /// One download attempt failed.
    TransientDownloadFailure,
    /// Every download attempt failed.
    PersistentDownloadFailure,
    /// The ledger had no row for the DOI.
    LedgerUpdateMiss,
    /// The ledger could not be written.
    LedgerWriteFailure,
}

impl FailureKind {
    /// Returns a stable label for logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigMissing => "config_missing",
            Self::RuleNotFound => "rule_not_found",
            Self::UrlResolutionFailure => "url_resolution_failure",
            Self::NoDocumentFound => "no_document_found",
            Self::TransientDownloadFailure => "transient_download_failure",
            Self::PersistentDownloadFailure => "persistent_download_failure",
            Self::LedgerUpdateMiss => "ledger_update_miss",
            Self::LedgerWriteFailure => "ledger_write_failure",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Terminal result of processing one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// A new file was saved.
    Succeeded {
        /// Saved file name.
        filename: String,
    },
    /// Acquisition failed.
    Failed(FailureKind),
    /// No document link exists.
    NoDocument,
    /// The record was already complete.
    Skipped,
}

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Records selected for the run.
    pub total: usize,
    /// Records processed before the run ended.
    pub processed: usize,
    /// Records that ended in `Success`.
    pub succeeded: usize,
    /// Records that ended in `Failed`.
    pub failed: usize,
    /// Records that ended in `NoDocument`.
    pub no_document: usize,
    /// Records skipped as already complete.
    pub skipped: usize,
    /// The run stopped early on interrupt.
    pub interrupted: bool,
}

impl RunSummary {
    /// Creates counters for a run over `total` records.
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    /// Adds one outcome.
    pub fn record(&mut self, outcome: &ItemOutcome) {
        self.processed += 1;
        match outcome {
            ItemOutcome::Succeeded { .. } => self.succeeded += 1,
            ItemOutcome::Failed(_) => self.failed += 1,
            ItemOutcome::NoDocument => self.no_document += 1,
            ItemOutcome::Skipped => self.skipped += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kind_labels() {
        assert_eq!(
            FailureKind::PersistentDownloadFailure.to_string(),
            "persistent_download_failure"
        );
        assert_eq!(FailureKind::LedgerUpdateMiss.as_str(), "ledger_update_miss");
    }

    #[test]
    fn test_run_summary_counts_outcomes() {
        let mut summary = RunSummary::new(4);
        summary.record(&ItemOutcome::Succeeded {
            filename: "a.pdf".to_string(),
        });
        summary.record(&ItemOutcome::Failed(FailureKind::UrlResolutionFailure));
        summary.record(&ItemOutcome::NoDocument);
        summary.record(&ItemOutcome::Skipped);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.processed, 4);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.no_document, 1);
        assert_eq!(summary.skipped, 1);
        assert!(!summary.interrupted);
    }
}
