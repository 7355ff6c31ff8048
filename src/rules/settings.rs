//! Per-domain retry policy for the download attempt loop.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{RuleStore, resolve};

/// Default for [`DownloadSettings::use_manual_save`].
pub const DEFAULT_USE_MANUAL_SAVE: bool = true;
/// Default seconds to wait after the manual-save interaction.
pub const DEFAULT_MANUAL_SAVE_DELAY_SECS: u64 = 5;
/// Default number of download attempts.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default seconds between download attempts.
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 10;

/// Retry policy for one publisher.
///
/// Missing fields in a stored entry fall back to the literal defaults above,
/// not to the table's `default` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DownloadSettings {
    /// Trigger the manual-save interaction on each attempt.
    #[serde(alias = "use_ctrl_s")]
    pub use_manual_save: bool,
    /// Seconds to wait after the manual-save interaction.
    #[serde(alias = "ctrl_s_delay")]
    pub manual_save_delay: u64,
    /// Number of download attempts.
    #[serde(alias = "max_retries")]
    pub max_retries: u32,
    /// Seconds between attempts.
    #[serde(alias = "retry_delay")]
    pub retry_delay: u64,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            use_manual_save: DEFAULT_USE_MANUAL_SAVE,
            manual_save_delay: DEFAULT_MANUAL_SAVE_DELAY_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY_SECS,
        }
    }
}

impl DownloadSettings {
    /// Wait after the manual-save interaction.
    #[must_use]
    pub fn manual_save_wait(&self) -> Duration {
        Duration::from_secs(self.manual_save_delay)
    }

    /// Wait between attempts.
    #[must_use]
    pub fn retry_wait(&self) -> Duration {
        Duration::from_secs(self.retry_delay)
    }
}

/// `DownloadSettings.json`: a default policy plus per-domain overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadSettingsTable {
    /// Policy for domains without an entry.
    #[serde(default)]
    pub default: DownloadSettings,
    /// Per-domain policies.
    #[serde(default)]
    pub domains: BTreeMap<String, DownloadSettings>,
}

impl DownloadSettingsTable {
    /// Resolves the policy for `domain`.
    #[must_use]
    pub fn for_domain(&self, domain: &str) -> DownloadSettings {
        *resolve(domain, &self.domains, &self.default)
    }
}

impl RuleStore for DownloadSettingsTable {
    const CATEGORY: &'static str = "download settings";

    fn builtin() -> Self {
        let mut domains = BTreeMap::new();
        domains.insert(
            "pubs.acs.org".to_string(),
            DownloadSettings {
                use_manual_save: false,
                manual_save_delay: 0,
                max_retries: 2,
                retry_delay: 5,
            },
        );
        domains.insert(
            "sciencedirect.com".to_string(),
            DownloadSettings {
                use_manual_save: true,
                manual_save_delay: 10,
                max_retries: 3,
                retry_delay: 15,
            },
        );
        Self {
            default: DownloadSettings::default(),
            domains,
        }
    }
}
