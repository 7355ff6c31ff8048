//! Ledger record types and status definitions.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Column names of the standard ledger header.
pub mod columns {
    /// Record key.
    pub const DOI: &str = "DOI";
    /// Terminal status of the primary document.
    pub const DOWNLOAD_STATUS: &str = "DownloadStatus";
    /// File name of the downloaded primary document.
    pub const FILENAME: &str = "Filename";
    /// Landing URL the DOI resolved to.
    pub const URL: &str = "URL";
    /// Document link that was downloaded (or attempted).
    pub const DOWNLOAD_URL: &str = "DownloadURL";
    /// Terminal status of the supplementary material.
    pub const SI_STATUS: &str = "SIDownloadStatus";
    /// File name of the downloaded supplementary material.
    pub const SI_FILENAME: &str = "SIFilename";
    /// Path of the archived captured page.
    pub const HTML_FILE: &str = "HTMLFile";

    /// Header written for a new ledger.
    pub const STANDARD: [&str; 8] = [
        DOI,
        DOWNLOAD_STATUS,
        FILENAME,
        URL,
        DOWNLOAD_URL,
        SI_STATUS,
        SI_FILENAME,
        HTML_FILE,
    ];
}

/// Acquisition status of one artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaperStatus {
    /// Nothing recorded yet.
    Pending,
    /// Landing page captured and archived.
    HtmlCaptured,
    /// Document link found but not yet downloaded.
    LinkExtracted,
    /// Document downloaded.
    Success,
    /// Acquisition failed.
    Failed,
    /// No document link exists for this record.
    NoDocument,
}

impl PaperStatus {
    /// Returns the log/display label.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::HtmlCaptured => "html_captured",
            Self::LinkExtracted => "link_extracted",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::NoDocument => "no_document",
        }
    }

    /// Returns the value stored in a status column.
    ///
    /// Only terminal states are persisted; the others are derived from the
    /// columns that are filled in.
    #[must_use]
    pub fn ledger_value(&self) -> &'static str {
        match self {
            Self::Pending | Self::HtmlCaptured | Self::LinkExtracted => "",
            Self::Success => "Success",
            Self::Failed => "Failed",
            Self::NoDocument => "NoDocument",
        }
    }

    /// Returns true for `Success`, `Failed`, and `NoDocument`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed | Self::NoDocument)
    }

    /// Parses a status column value.
    ///
    /// Empty means `Pending`; unrecognized values fall back to `Pending`.
    #[must_use]
    pub fn from_ledger_value(value: &str) -> Self {
        value.trim().parse().unwrap_or(Self::Pending)
    }

    fn derive(status: &str, download_url: &str, html_file: &str) -> Self {
        if !status.trim().is_empty() {
            return Self::from_ledger_value(status);
        }
        if !download_url.trim().is_empty() {
            Self::LinkExtracted
        } else if !html_file.trim().is_empty() {
            Self::HtmlCaptured
        } else {
            Self::Pending
        }
    }
}

impl fmt::Display for PaperStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaperStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "pending" => Ok(Self::Pending),
            "html_captured" => Ok(Self::HtmlCaptured),
            "link_extracted" => Ok(Self::LinkExtracted),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            "nodocument" | "no_document" | "nosi" => Ok(Self::NoDocument),
            _ => Err(format!("invalid paper status: {s}")),
        }
    }
}

/// Which artifact a pass acquires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// The primary paper PDF.
    Paper,
    /// Supplementary material.
    Supplementary,
}

impl ArtifactKind {
    /// Returns a stable label.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paper => "paper",
            Self::Supplementary => "supplementary",
        }
    }

    /// Status column written for this artifact.
    #[must_use]
    pub fn status_column(&self) -> &'static str {
        match self {
            Self::Paper => columns::DOWNLOAD_STATUS,
            Self::Supplementary => columns::SI_STATUS,
        }
    }

    /// File name column written for this artifact.
    #[must_use]
    pub fn filename_column(&self) -> &'static str {
        match self {
            Self::Paper => columns::FILENAME,
            Self::Supplementary => columns::SI_FILENAME,
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One ledger row, keyed by DOI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperRecord {
    /// Trimmed DOI.
    pub doi: String,
    /// Primary document status.
    pub status: PaperStatus,
    /// Landing URL, once resolved.
    pub final_url: Option<String>,
    /// Archived page path, once captured.
    pub html_reference: Option<PathBuf>,
    /// Document link, once extracted or attempted.
    pub download_url: Option<String>,
    /// Downloaded file name.
    pub filename: Option<String>,
    /// Supplementary-material status.
    pub supplementary_status: PaperStatus,
    /// Downloaded supplementary file name.
    pub supplementary_filename: Option<String>,
    /// Non-standard columns in header order.
    pub extra: Vec<(String, String)>,
}

impl PaperRecord {
    /// Creates a pending record.
    #[must_use]
    pub fn new(doi: impl Into<String>) -> Self {
        Self {
            doi: doi.into().trim().to_string(),
            status: PaperStatus::Pending,
            final_url: None,
            html_reference: None,
            download_url: None,
            filename: None,
            supplementary_status: PaperStatus::Pending,
            supplementary_filename: None,
            extra: Vec::new(),
        }
    }

    /// Builds a record from a row aligned with `header`.
    ///
    /// Returns `None` when the row has no DOI.
    #[must_use]
    pub fn from_row(header: &[String], row: &[String]) -> Option<Self> {
        let cell = |name: &str| -> &str {
            header
                .iter()
                .position(|column| column == name)
                .and_then(|index| row.get(index))
                .map_or("", String::as_str)
        };
        let non_empty = |name: &str| -> Option<String> {
            let value = cell(name).trim();
            (!value.is_empty()).then(|| value.to_string())
        };

        let doi = cell(columns::DOI).trim();
        if doi.is_empty() {
            return None;
        }

        let extra = header
            .iter()
            .zip(row.iter())
            .filter(|(column, _)| !columns::STANDARD.contains(&column.as_str()))
            .map(|(column, value)| (column.clone(), value.clone()))
            .collect();

        Some(Self {
            doi: doi.to_string(),
            status: PaperStatus::derive(
                cell(columns::DOWNLOAD_STATUS),
                cell(columns::DOWNLOAD_URL),
                cell(columns::HTML_FILE),
            ),
            final_url: non_empty(columns::URL),
            html_reference: non_empty(columns::HTML_FILE).map(PathBuf::from),
            download_url: non_empty(columns::DOWNLOAD_URL),
            filename: non_empty(columns::FILENAME),
            supplementary_status: PaperStatus::from_ledger_value(cell(columns::SI_STATUS)),
            supplementary_filename: non_empty(columns::SI_FILENAME),
            extra,
        })
    }

    /// Returns the status of `kind` for this record.
    #[must_use]
    pub fn status_of(&self, kind: ArtifactKind) -> PaperStatus {
        match kind {
            ArtifactKind::Paper => self.status,
            ArtifactKind::Supplementary => self.supplementary_status,
        }
    }
}

/// Ordered column updates for [`super::Ledger::update`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerFields {
    entries: Vec<(String, String)>,
}

impl LedgerFields {
    /// Creates an empty update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `column` to `value`, replacing an earlier value for the same column.
    #[must_use]
    pub fn set(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        let column = column.into();
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(name, _)| *name == column) {
            entry.1 = value;
        } else {
            self.entries.push((column, value));
        }
        self
    }

    /// Sets the status column of `kind`.
    #[must_use]
    pub fn status(self, kind: ArtifactKind, status: PaperStatus) -> Self {
        self.set(kind.status_column(), status.ledger_value())
    }

    /// Returns the value set for `column`.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// Iterates over updates in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Returns true when there is nothing to update.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn header() -> Vec<String> {
        columns::STANDARD
            .iter()
            .map(|column| (*column).to_string())
            .chain(std::iter::once("Notes".to_string()))
            .collect()
    }

    fn row(values: [&str; 9]) -> Vec<String> {
        values.iter().map(|value| (*value).to_string()).collect()
    }

    #[test]
    fn test_status_as_str() {
        assert_eq!(PaperStatus::Pending.as_str(), "pending");
        assert_eq!(PaperStatus::NoDocument.as_str(), "no_document");
    }

    #[test]
    fn test_status_parses_legacy_values() {
        assert_eq!("Success".parse::<PaperStatus>().unwrap(), PaperStatus::Success);
        assert_eq!("SUCCESS".parse::<PaperStatus>().unwrap(), PaperStatus::Success);
        assert_eq!("NOSI".parse::<PaperStatus>().unwrap(), PaperStatus::NoDocument);
        assert_eq!("Failed".parse::<PaperStatus>().unwrap(), PaperStatus::Failed);
        assert_eq!("".parse::<PaperStatus>().unwrap(), PaperStatus::Pending);
        assert!("weird".parse::<PaperStatus>().is_err());
        assert_eq!(PaperStatus::from_ledger_value("weird"), PaperStatus::Pending);
    }

    #[test]
    fn test_status_ledger_value_only_for_terminal_states() {
        assert_eq!(PaperStatus::Success.ledger_value(), "Success");
        assert_eq!(PaperStatus::NoDocument.ledger_value(), "NoDocument");
        assert_eq!(PaperStatus::HtmlCaptured.ledger_value(), "");
        assert!(PaperStatus::Failed.is_terminal());
        assert!(!PaperStatus::LinkExtracted.is_terminal());
    }

    #[test]
    fn test_record_from_row_derives_intermediate_status() {
        let header = header();
        let captured = PaperRecord::from_row(
            &header,
            &row(["10.1/a", "", "", "https://x.org/a", "", "", "", "html/x.txt", "note"]),
        )
        .unwrap();
        assert_eq!(captured.status, PaperStatus::HtmlCaptured);
        assert_eq!(captured.final_url.as_deref(), Some("https://x.org/a"));
        assert_eq!(captured.extra, vec![("Notes".to_string(), "note".to_string())]);

        let extracted = PaperRecord::from_row(
            &header,
            &row(["10.1/b", "", "", "", "https://x.org/b.pdf", "", "", "h.txt", ""]),
        )
        .unwrap();
        assert_eq!(extracted.status, PaperStatus::LinkExtracted);

        let done = PaperRecord::from_row(
            &header,
            &row(["10.1/c", "Success", "c.pdf", "", "u", "NOSI", "", "h.txt", ""]),
        )
        .unwrap();
        assert_eq!(done.status, PaperStatus::Success);
        assert_eq!(done.supplementary_status, PaperStatus::NoDocument);
    }

    #[test]
    fn test_record_from_row_requires_doi() {
        let header = header();
        assert!(PaperRecord::from_row(&header, &row([" ", "", "", "", "", "", "", "", ""])).is_none());
    }

    #[test]
    fn test_fields_set_replaces_and_keeps_order() {
        let fields = LedgerFields::new()
            .set("A", "1")
            .status(ArtifactKind::Paper, PaperStatus::Failed)
            .set("A", "2");
        let collected: Vec<_> = fields.iter().collect();
        assert_eq!(collected, vec![("A", "2"), ("DownloadStatus", "Failed")]);
        assert_eq!(fields.get("DownloadStatus"), Some("Failed"));
        assert!(!fields.is_empty());
    }
}
