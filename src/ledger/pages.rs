//! Archive of captured landing pages.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::LedgerError;

/// Directory of captured page text, one file per DOI.
#[derive(Debug, Clone)]
pub struct PageArchive {
    dir: PathBuf,
}

impl PageArchive {
    /// Creates an archive rooted at `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Archive directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name used for the page of `doi` captured on `domain`.
    #[must_use]
    pub fn file_name_for(domain: &str, doi: &str) -> String {
        let sanitized: String = format!("{domain}_{doi}")
            .chars()
            .map(|c| match c {
                '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|' => '_',
                other => other,
            })
            .collect();
        format!("{sanitized}.txt")
    }

    /// Writes `html` and returns the path recorded in the ledger.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Write`] if the file cannot be written.
    pub fn save(&self, domain: &str, doi: &str, html: &str) -> Result<PathBuf, LedgerError> {
        let path = self.dir.join(Self::file_name_for(domain, doi));
        let write_error = |source| LedgerError::Write {
            path: path.clone(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(write_error)?;
        fs::write(&path, html).map_err(write_error)?;
        debug!(path = %path.display(), bytes = html.len(), "archived captured page");
        Ok(path)
    }

    /// Reads back an archived page.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Read`] if the file cannot be read.
    pub fn load(&self, path: &Path) -> Result<String, LedgerError> {
        fs::read_to_string(path).map_err(|source| LedgerError::Read {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_name_sanitizes_doi() {
        assert_eq!(
            PageArchive::file_name_for("pubs.acs.org", "10.1021/acs:x?y"),
            "pubs.acs.org_10.1021_acs_x_y.txt"
        );
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let archive = PageArchive::new(dir.path().join("html"));
        let path = archive.save("nature.com", "10.1038/x", "<html>ok</html>").unwrap();
        assert!(path.starts_with(archive.dir()));
        assert_eq!(archive.load(&path).unwrap(), "<html>ok</html>");
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let archive = PageArchive::new(dir.path());
        let err = archive.load(&dir.path().join("nope.txt")).unwrap_err();
        assert!(err.is_missing_file());
    }
}
