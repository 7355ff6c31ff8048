//! JSON persistence for rule tables.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// A rule table persisted as one JSON file.
///
/// [`Default`] is the empty table used when an existing file is unusable;
/// [`RuleStore::builtin`] is the payload written when the file is missing.
pub trait RuleStore: Serialize + DeserializeOwned + Default {
    /// Human-readable category name for logs.
    const CATEGORY: &'static str;

    /// Returns the shipped default rules.
    fn builtin() -> Self;
}

/// Errors from reading or writing rule stores.
#[derive(Debug, Error)]
pub enum RuleStoreError {
    /// Store file exists but could not be read.
    #[error(
        "failed to read rule store '{}': {source}\n  Suggestion: Check file permissions",
        .path.display()
    )]
    Read {
        /// Store path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Store file is not valid JSON for its category.
    #[error(
        "invalid rule store '{}': {source}\n  Suggestion: Fix the JSON or delete the file to regenerate defaults",
        .path.display()
    )]
    Parse {
        /// Store path.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Default payload could not be written.
    #[error(
        "failed to write rule store '{}': {source}\n  Suggestion: Check that the rules directory is writable",
        .path.display()
    )]
    Write {
        /// Store path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Default payload could not be encoded.
    #[error("failed to encode {category} defaults: {source}")]
    Encode {
        /// Rule category.
        category: &'static str,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Result of [`materialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterializeOutcome {
    /// Defaults were written to a new file.
    Created,
    /// A file already existed and was left untouched.
    AlreadyPresent,
}

impl MaterializeOutcome {
    /// Returns a stable label for display output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::AlreadyPresent => "already present",
        }
    }
}

/// Writes the shipped defaults for `S` to `path` unless a file already exists.
///
/// # Errors
///
/// Returns [`RuleStoreError`] if the defaults cannot be encoded or written.
pub fn materialize<S: RuleStore>(path: &Path) -> Result<MaterializeOutcome, RuleStoreError> {
    if path.exists() {
        return Ok(MaterializeOutcome::AlreadyPresent);
    }

    let payload = serde_json::to_string_pretty(&S::builtin()).map_err(|source| {
        RuleStoreError::Encode {
            category: S::CATEGORY,
            source,
        }
    })?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| RuleStoreError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, payload).map_err(|source| RuleStoreError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    info!(category = S::CATEGORY, path = %path.display(), "wrote default rule store");
    Ok(MaterializeOutcome::Created)
}

/// Loads `S` from `path`, materializing the shipped defaults first if missing.
///
/// # Errors
///
/// Returns [`RuleStoreError`] if the file cannot be written, read, or parsed.
pub fn load_or_materialize<S: RuleStore>(path: &Path) -> Result<S, RuleStoreError> {
    materialize::<S>(path)?;

    let raw = fs::read_to_string(path).map_err(|source| RuleStoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = raw.trim_start_matches('\u{feff}');
    serde_json::from_str(raw).map_err(|source| RuleStoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Like [`load_or_materialize`], but logs failures and returns the empty table.
#[must_use]
pub fn load_or_default<S: RuleStore>(path: &Path) -> S {
    match load_or_materialize(path) {
        Ok(store) => store,
        Err(error) => {
            warn!(
                category = S::CATEGORY,
                error = %error,
                kind = "config_missing",
                "rule store unavailable; using category default"
            );
            S::default()
        }
    }
}

/// A persisted on/off flag.
///
/// Stores written by older tooling use `"1"`/`"0"` strings; booleans and
/// integers are accepted too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum FlagValue {
    Bool(bool),
    Number(i64),
    Text(String),
}

impl FlagValue {
    pub(crate) fn from_bool(value: bool) -> Self {
        Self::Text(if value { "1" } else { "0" }.to_string())
    }

    pub(crate) fn is_set(&self) -> bool {
        match self {
            Self::Bool(value) => *value,
            Self::Number(value) => *value == 1,
            Self::Text(value) => value.trim() == "1",
        }
    }
}
