//! Per-publisher rule tables and the domain cascade that selects from them.
//!
//! Every rule category (retry policy, branch flag, download template, login
//! requirement, extraction keywords, click target) is an independent table
//! with its own default. All of them are resolved through the same
//! [`resolve`] cascade:
//!
//! 1. the full host string, exactly;
//! 2. the base domain (last two dot-separated labels);
//! 3. the category default.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use paperdownload_core::rules::resolve;
//!
//! let mut retries = BTreeMap::new();
//! retries.insert("sciencedirect.com".to_string(), 5_u32);
//!
//! assert_eq!(*resolve("articles.sciencedirect.com", &retries, &3), 5);
//! assert_eq!(*resolve("example.org", &retries, &3), 3);
//! ```

mod branch;
mod click;
mod keywords;
mod login;
mod settings;
mod store;
mod template;

pub use branch::BranchRules;
pub use click::{ClickTarget, ClickTargets};
pub use keywords::{KeywordEntry, KeywordRules};
pub use login::LoginDomains;
pub use settings::{DownloadSettings, DownloadSettingsTable};
pub use store::{MaterializeOutcome, RuleStore, RuleStoreError, load_or_default, materialize};
pub use template::{DownloadTemplates, TemplateTransform};

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use tracing::debug;

/// File name of the retry policy store.
pub const SETTINGS_FILE: &str = "DownloadSettings.json";
/// File name of the template/extraction branch store.
pub const BRANCH_FILE: &str = "DomainBranch.json";
/// File name of the download template store.
pub const TEMPLATES_FILE: &str = "DownloadTemplates.json";
/// File name of the login requirement store.
pub const LOGIN_FILE: &str = "LoginConfig.json";
/// File name of the paper extraction keyword store.
pub const PAPER_KEYWORDS_FILE: &str = "Paperkeyword.json";
/// File name of the supplementary-material keyword store.
pub const SUPPLEMENTARY_KEYWORDS_FILE: &str = "SIkeyword.json";
/// File name of the click target store.
pub const CLICK_FILE: &str = "ClickTargets.json";

/// Keyed lookup used by the domain cascade.
///
/// Map-backed tables compare keys exactly. Tables with a different persisted
/// matching predicate (see [`KeywordRules`]) implement it here while reusing
/// the cascade unchanged.
pub trait RuleLookup<T> {
    /// Returns the rule stored under `key`, if any.
    fn lookup(&self, key: &str) -> Option<&T>;
}

impl<T> RuleLookup<T> for BTreeMap<String, T> {
    fn lookup(&self, key: &str) -> Option<&T> {
        self.get(key)
    }
}

impl<T> RuleLookup<T> for HashMap<String, T> {
    fn lookup(&self, key: &str) -> Option<&T> {
        self.get(key)
    }
}

impl RuleLookup<()> for BTreeSet<String> {
    fn lookup(&self, key: &str) -> Option<&()> {
        self.contains(key).then_some(&())
    }
}

/// Returns the last two dot-separated labels of `host`.
///
/// Hosts with fewer than two labels are returned unchanged.
#[must_use]
pub fn base_domain(host: &str) -> &str {
    let mut dots = host.rmatch_indices('.').map(|(index, _)| index);
    match (dots.next(), dots.next()) {
        (Some(_), Some(second)) => &host[second + 1..],
        _ => host,
    }
}

/// Runs the cascade without a default: exact host, then base domain.
#[must_use]
pub fn resolve_optional<'a, T, R>(domain: &str, rules: &'a R) -> Option<&'a T>
where
    R: RuleLookup<T> + ?Sized,
{
    let domain = domain.trim();
    if domain.is_empty() {
        return None;
    }
    if let Some(rule) = rules.lookup(domain) {
        return Some(rule);
    }
    let base = base_domain(domain);
    if base != domain
        && let Some(rule) = rules.lookup(base)
    {
        debug!(domain, base, "rule matched on base domain");
        return Some(rule);
    }
    None
}

/// Resolves the rule for `domain`: exact host, then base domain, then `default`.
///
/// Resolution never fails.
#[must_use]
pub fn resolve<'a, T, R>(domain: &str, rules: &'a R, default: &'a T) -> &'a T
where
    R: RuleLookup<T> + ?Sized,
{
    resolve_optional(domain, rules).unwrap_or(default)
}

/// All rule categories loaded from one rules directory.
#[derive(Debug, Clone, Default)]
pub struct RuleBook {
    /// Retry policy per domain.
    pub settings: DownloadSettingsTable,
    /// Template/extraction branch flag per domain.
    pub branches: BranchRules,
    /// Download URL templates per domain.
    pub templates: DownloadTemplates,
    /// Domains that need a login before capture.
    pub logins: LoginDomains,
    /// Extraction keywords for primary documents.
    pub paper_keywords: KeywordRules,
    /// Extraction keywords for supplementary material.
    pub supplementary_keywords: KeywordRules,
    /// Manual-save click targets per domain.
    pub clicks: ClickTargets,
}

impl RuleBook {
    /// Returns the shipped defaults for every category.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            settings: DownloadSettingsTable::builtin(),
            branches: BranchRules::builtin(),
            templates: DownloadTemplates::builtin(),
            logins: LoginDomains::builtin(),
            paper_keywords: KeywordRules::builtin(),
            supplementary_keywords: KeywordRules::builtin(),
            clicks: ClickTargets::builtin(),
        }
    }

    /// Loads every store from `dir`.
    ///
    /// Missing stores are written with their shipped defaults. A store that
    /// cannot be read or parsed is logged and replaced by its empty default,
    /// so loading never fails.
    #[must_use]
    pub fn load(dir: &Path) -> Self {
        Self {
            settings: load_or_default(&dir.join(SETTINGS_FILE)),
            branches: load_or_default(&dir.join(BRANCH_FILE)),
            templates: load_or_default(&dir.join(TEMPLATES_FILE)),
            logins: load_or_default(&dir.join(LOGIN_FILE)),
            paper_keywords: load_or_default(&dir.join(PAPER_KEYWORDS_FILE)),
            supplementary_keywords: load_or_default(&dir.join(SUPPLEMENTARY_KEYWORDS_FILE)),
            clicks: load_or_default(&dir.join(CLICK_FILE)),
        }
    }

    /// Writes the shipped defaults for every store missing from `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleStoreError`] if a store file cannot be written.
    pub fn materialize_defaults(
        dir: &Path,
    ) -> Result<Vec<(&'static str, MaterializeOutcome)>, RuleStoreError> {
        Ok(vec![
            (
                SETTINGS_FILE,
                materialize::<DownloadSettingsTable>(&dir.join(SETTINGS_FILE))?,
            ),
            (BRANCH_FILE, materialize::<BranchRules>(&dir.join(BRANCH_FILE))?),
            (
                TEMPLATES_FILE,
                materialize::<DownloadTemplates>(&dir.join(TEMPLATES_FILE))?,
            ),
            (LOGIN_FILE, materialize::<LoginDomains>(&dir.join(LOGIN_FILE))?),
            (
                PAPER_KEYWORDS_FILE,
                materialize::<KeywordRules>(&dir.join(PAPER_KEYWORDS_FILE))?,
            ),
            (
                SUPPLEMENTARY_KEYWORDS_FILE,
                materialize::<KeywordRules>(&dir.join(SUPPLEMENTARY_KEYWORDS_FILE))?,
            ),
            (CLICK_FILE, materialize::<ClickTargets>(&dir.join(CLICK_FILE))?),
        ])
    }
}
