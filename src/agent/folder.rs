//! Download folder snapshots and new-file detection.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

/// File names present in a folder at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderSnapshot {
    names: BTreeSet<String>,
}

impl FolderSnapshot {
    /// Builds a snapshot from file names.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true when `name` was present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Number of files recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true when the folder was empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A download destination that only counts files with accepted extensions.
#[derive(Debug, Clone)]
pub struct DownloadFolder {
    dir: PathBuf,
    extensions: Vec<String>,
}

impl DownloadFolder {
    /// Creates a watcher for `dir` accepting `extensions` (case-insensitive, no dot).
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, extensions: &[String]) -> Self {
        Self {
            dir: dir.into(),
            extensions: extensions
                .iter()
                .map(|extension| extension.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    /// Watched directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns true when `name` has an accepted extension.
    #[must_use]
    pub fn accepts(&self, name: &str) -> bool {
        Path::new(name)
            .extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| {
                let extension = extension.to_ascii_lowercase();
                self.extensions.iter().any(|accepted| *accepted == extension)
            })
    }

    /// Lists regular files in the folder, creating it if missing.
    ///
    /// # Errors
    ///
    /// Returns the IO error if the folder cannot be created or listed.
    pub async fn snapshot(&self) -> io::Result<FolderSnapshot> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let mut names = BTreeSet::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                names.insert(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Ok(FolderSnapshot { names })
    }

    /// Returns the first (by name) accepted file not present in `before`.
    ///
    /// # Errors
    ///
    /// Returns the IO error if the folder cannot be listed.
    pub async fn new_file_since(&self, before: &FolderSnapshot) -> io::Result<Option<String>> {
        let now = self.snapshot().await?;
        let found = now
            .names
            .into_iter()
            .find(|name| !before.contains(name) && self.accepts(name));
        if let Some(name) = &found {
            debug!(dir = %self.dir.display(), file = %name, "new download detected");
        }
        Ok(found)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn pdf_only() -> Vec<String> {
        vec!["pdf".to_string()]
    }

    #[test]
    fn test_accepts_extension_case_insensitive() {
        let folder = DownloadFolder::new("/tmp", &[".PDF".to_string(), "zip".to_string()]);
        assert!(folder.accepts("paper.pdf"));
        assert!(folder.accepts("paper.Pdf"));
        assert!(folder.accepts("si.zip"));
        assert!(!folder.accepts("paper.pdf.crdownload"));
        assert!(!folder.accepts("README"));
    }

    #[tokio::test]
    async fn test_snapshot_creates_missing_folder() {
        let dir = TempDir::new().unwrap();
        let folder = DownloadFolder::new(dir.path().join("downloads"), &pdf_only());
        let snapshot = folder.snapshot().await.unwrap();
        assert!(snapshot.is_empty());
        assert!(folder.dir().is_dir());
    }

    #[tokio::test]
    async fn test_new_file_since_ignores_old_and_unaccepted_files() {
        let dir = TempDir::new().unwrap();
        let folder = DownloadFolder::new(dir.path(), &pdf_only());
        std::fs::write(dir.path().join("old.pdf"), b"x").unwrap();
        let before = folder.snapshot().await.unwrap();
        assert_eq!(before.len(), 1);

        std::fs::write(dir.path().join("partial.crdownload"), b"x").unwrap();
        assert_eq!(folder.new_file_since(&before).await.unwrap(), None);

        std::fs::write(dir.path().join("new.pdf"), b"x").unwrap();
        assert_eq!(
            folder.new_file_since(&before).await.unwrap().as_deref(),
            Some("new.pdf")
        );
    }
}
