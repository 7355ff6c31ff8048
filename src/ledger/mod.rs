//! Per-DOI acquisition ledger backed by a CSV file.
//!
//! The ledger is the single durable record of progress. Every
//! [`Ledger::update`] rewrites the whole file (through a temporary sibling
//! and a rename), so a crash between updates never corrupts committed rows.
//!
//! # Overview
//!
//! - [`Ledger::load`] returns the records to work on, starting at the resume
//!   cursor (the first row with an empty `DownloadStatus`).
//! - [`Ledger::update`] merges columns into the row for one DOI, appending
//!   new columns to the header when needed.
//! - Updates are idempotent: applying the same fields twice leaves the file
//!   byte-identical.
//!
//! # Example
//!
//! ```no_run
//! use paperdownload_core::ledger::{ArtifactKind, Ledger, LedgerFields, PaperStatus, ResumeFilter};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut ledger = Ledger::open("papers.csv")?;
//! for record in ledger.load(ResumeFilter::SkipCompleted) {
//!     println!("{} is {}", record.doi, record.status);
//! }
//! ledger.update(
//!     "10.1000/xyz",
//!     &LedgerFields::new().status(ArtifactKind::Paper, PaperStatus::Failed),
//! )?;
//! # Ok(())
//! # }
//! ```

mod error;
mod pages;
mod record;

pub use error::LedgerError;
pub use pages::PageArchive;
pub use record::{ArtifactKind, LedgerFields, PaperRecord, PaperStatus, columns};

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const UTF8_BOM: &str = "\u{feff}";

/// Which records after the resume cursor [`Ledger::load`] returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeFilter {
    /// Drop records already marked `Success`.
    #[default]
    SkipCompleted,
    /// Return every record from the cursor on, whatever its status.
    ///
    /// Matches ledgers processed by the older tooling, whose completion
    /// filter never excluded anything.
    Legacy,
}

impl ResumeFilter {
    /// Returns the config/CLI label.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SkipCompleted => "skip_completed",
            Self::Legacy => "legacy",
        }
    }
}

impl fmt::Display for ResumeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ResumeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skip_completed" => Ok(Self::SkipCompleted),
            "legacy" => Ok(Self::Legacy),
            _ => Err(format!(
                "invalid resume filter: {s} (expected skip_completed or legacy)"
            )),
        }
    }
}

/// Result of [`Ledger::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Fields were merged and the file rewritten.
    Applied {
        /// Columns appended to the header by this update.
        added_columns: Vec<String>,
    },
    /// No row has this DOI; nothing changed.
    DoiNotFound,
    /// The update would have overwritten a `Success` status; nothing changed.
    RejectedRegression,
}

/// In-memory copy of the ledger table plus its backing path.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Ledger {
    /// Opens an existing ledger.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Read`] if the file cannot be read and
    /// [`LedgerError::Parse`] if it is not valid CSV.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let path = path.as_ref().to_path_buf();
        let raw = fs::read_to_string(&path).map_err(|source| LedgerError::Read {
            path: path.clone(),
            source,
        })?;
        let raw = raw.strip_prefix(UTF8_BOM).unwrap_or(&raw);

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(raw.as_bytes());
        let header: Vec<String> = reader
            .headers()
            .map_err(|source| LedgerError::Parse {
                path: path.clone(),
                source,
            })?
            .iter()
            .map(|column| column.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|source| LedgerError::Parse {
                path: path.clone(),
                source,
            })?;
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            row.resize(header.len(), String::new());
            rows.push(row);
        }

        let ledger = Self { path, header, rows };
        ledger.warn_on_duplicate_dois();
        debug!(path = %ledger.path.display(), rows = ledger.rows.len(), "ledger opened");
        Ok(ledger)
    }

    /// Opens the ledger at `path`, creating it with the standard header if missing.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the file cannot be created or read.
    pub fn open_or_create(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let path = path.as_ref();
        if path.exists() {
            return Self::open(path);
        }
        let ledger = Self {
            path: path.to_path_buf(),
            header: columns::STANDARD
                .iter()
                .map(|column| (*column).to_string())
                .collect(),
            rows: Vec::new(),
        };
        ledger.persist()?;
        info!(path = %path.display(), "created new ledger");
        Ok(ledger)
    }

    /// Backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Header columns in file order.
    #[must_use]
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Every record with a DOI, in file order.
    #[must_use]
    pub fn records(&self) -> Vec<PaperRecord> {
        self.rows
            .iter()
            .filter_map(|row| PaperRecord::from_row(&self.header, row))
            .collect()
    }

    /// Looks up one record by DOI.
    #[must_use]
    pub fn record(&self, doi: &str) -> Option<PaperRecord> {
        self.find_row(doi.trim())
            .and_then(|index| PaperRecord::from_row(&self.header, &self.rows[index]))
    }

    /// Returns the records to acquire, starting at the resume cursor.
    ///
    /// The cursor is the first record whose `DownloadStatus` is empty, or
    /// the first record when every status is filled in.
    #[must_use]
    pub fn load(&self, filter: ResumeFilter) -> Vec<PaperRecord> {
        let records = self.records();
        let status_index = self.column_index(columns::DOWNLOAD_STATUS);
        let statuses: Vec<&str> = self
            .rows
            .iter()
            .filter(|row| self.doi_of(row).is_some())
            .map(|row| {
                status_index
                    .and_then(|index| row.get(index))
                    .map_or("", String::as_str)
            })
            .collect();
        let cursor = statuses
            .iter()
            .position(|status| status.trim().is_empty())
            .unwrap_or(0);

        let selected: Vec<PaperRecord> = records
            .into_iter()
            .skip(cursor)
            .filter(|record| match filter {
                ResumeFilter::SkipCompleted => record.status != PaperStatus::Success,
                ResumeFilter::Legacy => true,
            })
            .collect();

        info!(
            cursor,
            selected = selected.len(),
            filter = %filter,
            "ledger loaded"
        );
        selected
    }

    /// Returns records with a captured page whose supplementary material is unresolved.
    #[must_use]
    pub fn load_supplementary(&self) -> Vec<PaperRecord> {
        let selected: Vec<PaperRecord> = self
            .records()
            .into_iter()
            .filter(|record| record.html_reference.is_some())
            .filter(|record| {
                !matches!(
                    record.supplementary_status,
                    PaperStatus::Success | PaperStatus::NoDocument
                )
            })
            .collect();
        info!(selected = selected.len(), "ledger loaded for supplementary pass");
        selected
    }

    /// Counts records per `kind` status.
    #[must_use]
    pub fn count_by_status(&self, kind: ArtifactKind) -> Vec<(PaperStatus, usize)> {
        let records = self.records();
        [
            PaperStatus::Pending,
            PaperStatus::HtmlCaptured,
            PaperStatus::LinkExtracted,
            PaperStatus::Success,
            PaperStatus::Failed,
            PaperStatus::NoDocument,
        ]
        .into_iter()
        .map(|status| {
            let count = records
                .iter()
                .filter(|record| record.status_of(kind) == status)
                .count();
            (status, count)
        })
        .collect()
    }

    /// Merges `fields` into the row for `doi` and persists the table.
    ///
    /// A missing DOI is logged and reported as [`UpdateOutcome::DoiNotFound`].
    /// Overwriting a `Success` download status is refused.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the table cannot be written.
    #[tracing::instrument(skip(self, fields), fields(path = %self.path.display()))]
    pub fn update(
        &mut self,
        doi: &str,
        fields: &LedgerFields,
    ) -> Result<UpdateOutcome, LedgerError> {
        let doi = doi.trim();
        let Some(row_index) = self.find_row(doi) else {
            warn!(doi, "DOI not found in ledger; update skipped");
            return Ok(UpdateOutcome::DoiNotFound);
        };

        if let Some(requested) = fields.get(columns::DOWNLOAD_STATUS)
            && self.cell(row_index, columns::DOWNLOAD_STATUS).is_some_and(|current| {
                PaperStatus::from_ledger_value(current) == PaperStatus::Success
            })
            && PaperStatus::from_ledger_value(requested) != PaperStatus::Success
        {
            warn!(doi, requested, "refusing to overwrite Success status");
            return Ok(UpdateOutcome::RejectedRegression);
        }

        let mut added_columns = Vec::new();
        for (column, _) in fields.iter() {
            if self.column_index(column).is_none() {
                self.header.push(column.to_string());
                for row in &mut self.rows {
                    row.push(String::new());
                }
                added_columns.push(column.to_string());
            }
        }
        if !added_columns.is_empty() {
            info!(columns = ?added_columns, "ledger schema extended");
        }

        for (column, value) in fields.iter() {
            if let Some(index) = self.column_index(column) {
                self.rows[row_index][index] = value.to_string();
            }
        }

        self.persist()?;
        debug!(doi, "ledger row updated");
        Ok(UpdateOutcome::Applied { added_columns })
    }

    /// Writes a ledger containing only the DOIs of `Failed` records.
    ///
    /// The output keeps the full header; every other column is left empty.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the output cannot be written.
    pub fn export_failed(&self, output: &Path) -> Result<usize, LedgerError> {
        let doi_index = self.column_index(columns::DOI);
        let failed: Vec<Vec<String>> = self
            .rows
            .iter()
            .filter(|row| {
                PaperRecord::from_row(&self.header, row)
                    .is_some_and(|record| record.status == PaperStatus::Failed)
            })
            .map(|row| {
                self.header
                    .iter()
                    .enumerate()
                    .map(|(index, _)| {
                        if Some(index) == doi_index {
                            row[index].trim().to_string()
                        } else {
                            String::new()
                        }
                    })
                    .collect()
            })
            .collect();

        write_table(output, &self.header, &failed)?;
        info!(output = %output.display(), count = failed.len(), "exported failed DOIs");
        Ok(failed.len())
    }

    fn persist(&self) -> Result<(), LedgerError> {
        write_table(&self.path, &self.header, &self.rows)
    }

    fn column_index(&self, column: &str) -> Option<usize> {
        self.header.iter().position(|name| name == column)
    }

    fn cell(&self, row_index: usize, column: &str) -> Option<&str> {
        let index = self.column_index(column)?;
        self.rows
            .get(row_index)
            .and_then(|row| row.get(index))
            .map(String::as_str)
    }

    fn doi_of<'a>(&self, row: &'a [String]) -> Option<&'a str> {
        let index = self.column_index(columns::DOI)?;
        row.get(index)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    fn find_row(&self, doi: &str) -> Option<usize> {
        if doi.is_empty() {
            return None;
        }
        self.rows
            .iter()
            .position(|row| self.doi_of(row) == Some(doi))
    }

    fn warn_on_duplicate_dois(&self) {
        let mut seen = std::collections::HashSet::new();
        for row in &self.rows {
            if let Some(doi) = self.doi_of(row)
                && !seen.insert(doi)
            {
                warn!(doi, "duplicate DOI in ledger; updates apply to the first row");
            }
        }
    }
}

fn write_table(path: &Path, header: &[String], rows: &[Vec<String>]) -> Result<(), LedgerError> {
    let mut writer = csv::Writer::from_writer(UTF8_BOM.as_bytes().to_vec());
    let encode = |error: csv::Error| LedgerError::Encode {
        message: error.to_string(),
    };
    writer.write_record(header).map_err(encode)?;
    for row in rows {
        writer.write_record(row).map_err(encode)?;
    }
    let bytes = writer.into_inner().map_err(|error| LedgerError::Encode {
        message: error.to_string(),
    })?;

    let file_name = path
        .file_name()
        .map_or_else(|| "ledger.csv".into(), |name| name.to_string_lossy());
    let temp_path = path.with_file_name(format!(".{file_name}.tmp"));
    let write_error = |source| LedgerError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    fs::write(&temp_path, &bytes).map_err(write_error)?;
    fs::rename(&temp_path, path).map_err(write_error)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HEADER: &str = "DOI,DownloadStatus,Filename,URL,DownloadURL,SIDownloadStatus,SIFilename,HTMLFile";

    fn ledger_with(rows: &[&str]) -> (Ledger, TempDir) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("papers.csv");
        let mut content = String::from(HEADER);
        for row in rows {
            content.push('\n');
            content.push_str(row);
        }
        content.push('\n');
        fs::write(&path, content).unwrap();
        (Ledger::open(&path).unwrap(), dir)
    }

    fn dois(records: &[PaperRecord]) -> Vec<&str> {
        records.iter().map(|record| record.doi.as_str()).collect()
    }

    #[test]
    fn test_resume_filter_parse_and_display() {
        assert_eq!("legacy".parse::<ResumeFilter>().unwrap(), ResumeFilter::Legacy);
        assert_eq!(ResumeFilter::default(), ResumeFilter::SkipCompleted);
        assert_eq!(ResumeFilter::SkipCompleted.to_string(), "skip_completed");
        assert!("other".parse::<ResumeFilter>().is_err());
    }

    #[test]
    fn test_load_starts_at_first_empty_status() {
        let (ledger, _dir) = ledger_with(&[
            "10.1/a,Success,a.pdf,,,,,",
            "10.1/b,Failed,,,,,,",
            "10.1/c,,,,,,,",
            "10.1/d,,,,,,,",
        ]);
        let records = ledger.load(ResumeFilter::SkipCompleted);
        assert_eq!(dois(&records), vec!["10.1/c", "10.1/d"]);
    }

    #[test]
    fn test_load_cursor_defaults_to_first_row_when_all_filled() {
        let (ledger, _dir) = ledger_with(&["10.1/a,Failed,,,,,,", "10.1/b,Success,,,,,,"]);
        let skip = ledger.load(ResumeFilter::SkipCompleted);
        assert_eq!(dois(&skip), vec!["10.1/a"]);
        let legacy = ledger.load(ResumeFilter::Legacy);
        assert_eq!(dois(&legacy), vec!["10.1/a", "10.1/b"]);
    }

    #[test]
    fn test_load_skips_rows_without_doi() {
        let (ledger, _dir) = ledger_with(&[" ,,,,,,,", "10.1/a,,,,,,,"]);
        assert_eq!(dois(&ledger.load(ResumeFilter::Legacy)), vec!["10.1/a"]);
    }

    #[test]
    fn test_update_adds_columns_and_backfills() {
        let (mut ledger, _dir) = ledger_with(&["10.1/a,,,,,,,", "10.1/b,,,,,,,"]);
        let outcome = ledger
            .update("10.1/a", &LedgerFields::new().set("Attempts", "3"))
            .unwrap();
        assert_eq!(
            outcome,
            UpdateOutcome::Applied {
                added_columns: vec!["Attempts".to_string()]
            }
        );

        let reopened = Ledger::open(ledger.path()).unwrap();
        assert_eq!(reopened.header().last().map(String::as_str), Some("Attempts"));
        let b = reopened.record("10.1/b").unwrap();
        assert_eq!(b.extra, vec![("Attempts".to_string(), String::new())]);
    }

    #[test]
    fn test_update_trims_doi_and_reports_miss() {
        let (mut ledger, _dir) = ledger_with(&["10.1/a,,,,,,,"]);
        let before = fs::read(ledger.path()).unwrap();
        let outcome = ledger
            .update("10.1/zzz", &LedgerFields::new().set("Filename", "x"))
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::DoiNotFound);
        assert_eq!(fs::read(ledger.path()).unwrap(), before);

        let outcome = ledger
            .update("  10.1/a ", &LedgerFields::new().set("Filename", "x.pdf"))
            .unwrap();
        assert!(matches!(outcome, UpdateOutcome::Applied { .. }));
        assert_eq!(ledger.record("10.1/a").unwrap().filename.as_deref(), Some("x.pdf"));
    }

    #[test]
    fn test_update_refuses_to_regress_success() {
        let (mut ledger, _dir) = ledger_with(&["10.1/a,Success,a.pdf,,,,,"]);
        let outcome = ledger
            .update(
                "10.1/a",
                &LedgerFields::new().status(ArtifactKind::Paper, PaperStatus::Failed),
            )
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::RejectedRegression);
        assert_eq!(ledger.record("10.1/a").unwrap().status, PaperStatus::Success);
    }

    #[test]
    fn test_open_or_create_writes_standard_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("new.csv");
        let ledger = Ledger::open_or_create(&path).unwrap();
        assert_eq!(ledger.header().len(), columns::STANDARD.len());
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with(UTF8_BOM));
        assert!(raw.contains(HEADER));
    }

    #[test]
    fn test_open_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let err = Ledger::open(dir.path().join("absent.csv")).unwrap_err();
        assert!(err.is_missing_file());
    }

    #[test]
    fn test_count_by_status() {
        let (ledger, _dir) = ledger_with(&[
            "10.1/a,Success,,,,SUCCESS,,h",
            "10.1/b,Failed,,,,,,",
            "10.1/c,,,,,,,h",
        ]);
        let counts = ledger.count_by_status(ArtifactKind::Paper);
        assert!(counts.contains(&(PaperStatus::Success, 1)));
        assert!(counts.contains(&(PaperStatus::Failed, 1)));
        assert!(counts.contains(&(PaperStatus::HtmlCaptured, 1)));
        let si = ledger.count_by_status(ArtifactKind::Supplementary);
        assert!(si.contains(&(PaperStatus::Success, 1)));
        assert!(si.contains(&(PaperStatus::Pending, 2)));
    }
}
