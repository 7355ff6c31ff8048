//! Error types for ledger operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading or persisting the ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Ledger file could not be read.
    #[error(
        "failed to read ledger '{}': {source}\n  Suggestion: Check that the ledger path exists and is readable",
        .path.display()
    )]
    Read {
        /// Ledger path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Ledger content is not valid CSV.
    #[error(
        "failed to parse ledger '{}': {source}\n  Suggestion: Check the file is UTF-8 CSV with a header row",
        .path.display()
    )]
    Parse {
        /// Ledger path.
        path: PathBuf,
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },

    /// Ledger (or an archive file) could not be written.
    #[error(
        "failed to write '{}': {source}\n  Suggestion: Check free disk space and directory permissions",
        .path.display()
    )]
    Write {
        /// Target path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Rows could not be encoded as CSV.
    #[error("failed to encode ledger rows: {message}")]
    Encode {
        /// Encoder error text.
        message: String,
    },
}

impl LedgerError {
    /// Returns true when the ledger file does not exist.
    #[must_use]
    pub fn is_missing_file(&self) -> bool {
        matches!(self, Self::Read { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_error_read_message() {
        let err = LedgerError::Read {
            path: PathBuf::from("papers.csv"),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        let msg = err.to_string();
        assert!(msg.contains("papers.csv"));
        assert!(msg.contains("Suggestion"));
        assert!(err.is_missing_file());
    }

    #[test]
    fn test_ledger_error_encode_message() {
        let err = LedgerError::Encode {
            message: "boom".to_string(),
        };
        assert!(err.to_string().contains("boom"));
        assert!(!err.is_missing_file());
    }
}
