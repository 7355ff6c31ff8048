//! External collaborators that render pages, save documents, and log in.
//!
//! The acquisition core never drives a browser itself. It talks to three
//! async traits, each returning [`AgentError`] on failure:
//!
//! - [`RenderAgent`] - resolves a DOI to its landing page and captures it
//! - [`DownloadAgent`] - opens document links and watches the download folder
//! - [`LoginAgent`] - establishes a session for a publisher domain
//!
//! Shipped implementations shell out to configured helper programs
//! ([`HelperRenderAgent`], [`HelperDownloadAgent`]) and dispatch logins
//! through a [`LoginRegistry`].

mod folder;
mod helper;
mod login;

pub use folder::{DownloadFolder, FolderSnapshot};
pub use helper::{HelperCommand, HelperDownloadAgent, HelperRenderAgent};
pub use login::{LoginRegistry, LoginStrategy};

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::rules::ClickTarget;

/// Errors reported by collaborators.
#[derive(Debug, Clone, Error)]
pub enum AgentError {
    /// The call did not finish within its bound.
    #[error(
        "{operation} timed out after {}s\n  Suggestion: Increase agent_timeout_secs or check the helper program",
        .timeout.as_secs()
    )]
    Timeout {
        /// Collaborator operation.
        operation: &'static str,
        /// Bound that was exceeded.
        timeout: Duration,
    },

    /// The collaborator ran and reported failure.
    #[error("{operation} failed: {message}")]
    Failed {
        /// Collaborator operation.
        operation: &'static str,
        /// Failure details.
        message: String,
    },

    /// The collaborator returned nothing usable.
    #[error("{operation} returned no data")]
    Empty {
        /// Collaborator operation.
        operation: &'static str,
    },

    /// No helper program is configured for this operation.
    #[error(
        "no helper configured for {operation}\n  Suggestion: Set the matching command under [helpers] in the config file"
    )]
    NotConfigured {
        /// Collaborator operation.
        operation: &'static str,
    },
}

impl AgentError {
    /// Creates a `Failed` error.
    #[must_use]
    pub fn failed(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Failed {
            operation,
            message: message.into(),
        }
    }

    /// Operation the error came from.
    #[must_use]
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Timeout { operation, .. }
            | Self::Failed { operation, .. }
            | Self::Empty { operation }
            | Self::NotConfigured { operation } => operation,
        }
    }

    /// Returns true when the call ran out of time.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Landing page text plus the URL it was served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// Captured page text.
    pub html: String,
    /// URL the render surface ended on.
    pub final_url: String,
}

/// Parameters for the manual-save interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveHint {
    /// Suggested file stem for the saved document.
    pub filename: String,
    /// Where to click before saving.
    pub click_target: ClickTarget,
}

impl SaveHint {
    /// Builds the hint for `doi`, tagging the stem with `suffix`.
    #[must_use]
    pub fn for_doi(doi: &str, suffix: &str, click_target: ClickTarget) -> Self {
        Self {
            filename: format!("{}_{suffix}", doi.replace('/', "_")),
            click_target,
        }
    }
}

/// Resolves DOIs and captures landing pages.
#[async_trait]
pub trait RenderAgent: Send + Sync {
    /// Navigates the render surface to the DOI resolver for `doi`.
    async fn open_doi(&self, doi: &str) -> Result<(), AgentError>;

    /// URL the render surface currently shows.
    async fn current_url(&self) -> Result<String, AgentError>;

    /// Navigates to `doi` and returns the page text and final URL.
    async fn resolve_page(&self, doi: &str) -> Result<RenderedPage, AgentError>;
}

/// Opens document links and detects saved files.
#[async_trait]
pub trait DownloadAgent: Send + Sync {
    /// Records the files currently in the download folder.
    async fn snapshot(&self) -> Result<FolderSnapshot, AgentError>;

    /// Opens `url` on the download surface.
    async fn open(&self, url: &str) -> Result<(), AgentError>;

    /// Triggers the manual-save interaction.
    async fn trigger_save_interaction(&self, hint: &SaveHint) -> Result<(), AgentError>;

    /// Returns one accepted file that appeared since `snapshot`, if any.
    async fn list_new_file_since(
        &self,
        snapshot: &FolderSnapshot,
    ) -> Result<Option<String>, AgentError>;

    /// Closes tabs and helper processes so the next item starts clean.
    async fn reset_surface(&self) -> Result<(), AgentError>;
}

/// Performs publisher logins.
#[async_trait]
pub trait LoginAgent: Send + Sync {
    /// Logs in to `domain`.
    async fn perform_login(&self, domain: &str) -> Result<(), AgentError>;
}

/// Runs `call` with an upper bound of `timeout`.
///
/// # Errors
///
/// Returns [`AgentError::Timeout`] when the bound is exceeded, otherwise
/// whatever `call` returns.
pub async fn bounded<T, F>(operation: &'static str, timeout: Duration, call: F) -> Result<T, AgentError>
where
    F: Future<Output = Result<T, AgentError>>,
{
    tokio::time::timeout(timeout, call)
        .await
        .map_err(|_| AgentError::Timeout { operation, timeout })?
}
