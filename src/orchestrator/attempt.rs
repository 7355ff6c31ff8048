//! Bounded download attempt loop.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::FailureKind;
use crate::agent::{DownloadAgent, SaveHint, bounded};
use crate::rules::DownloadSettings;

/// Inputs for one download loop.
#[derive(Debug, Clone)]
pub struct AttemptPlan<'a> {
    /// Document link to open.
    pub url: &'a str,
    /// Resolved retry policy.
    pub settings: DownloadSettings,
    /// Trigger the manual-save interaction after opening.
    pub use_save_interaction: bool,
    /// Save interaction parameters.
    pub hint: SaveHint,
    /// Wait after opening, before the save interaction.
    pub pre_wait: Duration,
    /// Wait for the download when no save interaction runs.
    pub settle: Duration,
    /// Bound for each collaborator call.
    pub call_timeout: Duration,
}

/// Result of [`run_attempts`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// A new accepted file appeared.
    Downloaded {
        /// Saved file name.
        filename: String,
        /// Attempts used, including the successful one.
        attempts: u32,
    },
    /// Every attempt ended without a new file.
    Exhausted {
        /// Attempts made.
        attempts: u32,
    },
}

/// Runs up to `settings.max_retries` download attempts, stopping at the first new file.
///
/// The folder snapshot is taken once, before the first attempt. With
/// `max_retries` of zero nothing is opened and the result is
/// `Exhausted { attempts: 0 }`.
///
/// After opening, each attempt waits `pre_wait`, then either runs the save
/// interaction and waits `manualSaveDelay`, or waits `settle`.
pub async fn run_attempts(agent: &dyn DownloadAgent, plan: &AttemptPlan<'_>) -> DownloadOutcome {
    let snapshot = match bounded("snapshot", plan.call_timeout, agent.snapshot()).await {
        Ok(snapshot) => snapshot,
        Err(error) => {
            warn!(error = %error, kind = %FailureKind::PersistentDownloadFailure, "cannot snapshot download folder");
            return DownloadOutcome::Exhausted { attempts: 0 };
        }
    };

    let max_attempts = plan.settings.max_retries;
    for attempt in 1..=max_attempts {
        info!(attempt, max_attempts, url = plan.url, "download attempt");

        match bounded("open", plan.call_timeout, agent.open(plan.url)).await {
            Ok(()) => {
                tokio::time::sleep(plan.pre_wait).await;
                let wait = if plan.use_save_interaction {
                    if let Err(error) = bounded(
                        "save_interaction",
                        plan.call_timeout,
                        agent.trigger_save_interaction(&plan.hint),
                    )
                    .await
                    {
                        warn!(attempt, error = %error, "manual-save interaction failed");
                    }
                    plan.settings.manual_save_wait()
                } else {
                    plan.settle
                };
                tokio::time::sleep(wait).await;

                match bounded(
                    "list_new_file",
                    plan.call_timeout,
                    agent.list_new_file_since(&snapshot),
                )
                .await
                {
                    Ok(Some(filename)) => {
                        info!(attempt, file = %filename, "download detected");
                        return DownloadOutcome::Downloaded {
                            filename,
                            attempts: attempt,
                        };
                    }
                    Ok(None) => debug!(attempt, "no new file yet"),
                    Err(error) => warn!(attempt, error = %error, "cannot check download folder"),
                }
            }
            Err(error) => {
                warn!(
                    attempt,
                    error = %error,
                    kind = %FailureKind::TransientDownloadFailure,
                    "cannot open download URL"
                );
            }
        }

        if attempt < max_attempts {
            debug!(attempt, delay_secs = plan.settings.retry_delay, "waiting before retry");
            tokio::time::sleep(plan.settings.retry_wait()).await;
        }
    }

    warn!(
        attempts = max_attempts,
        url = plan.url,
        kind = %FailureKind::PersistentDownloadFailure,
        "download attempts exhausted"
    );
    DownloadOutcome::Exhausted {
        attempts: max_attempts,
    }
}
