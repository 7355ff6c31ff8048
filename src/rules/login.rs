//! Domains that require an authenticated session before page capture.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{RuleStore, resolve_optional};

/// `LoginConfig.json`: list of domains requiring login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoginDomains {
    domains: BTreeSet<String>,
}

impl LoginDomains {
    /// Returns true when `domain` (or its base domain) requires login.
    #[must_use]
    pub fn requires_login(&self, domain: &str) -> bool {
        resolve_optional(domain, &self.domains).is_some()
    }

    /// Adds a domain.
    pub fn insert(&mut self, domain: impl Into<String>) {
        self.domains.insert(domain.into());
    }
}

impl RuleStore for LoginDomains {
    const CATEGORY: &'static str = "login domains";

    fn builtin() -> Self {
        let mut logins = Self::default();
        for domain in [
            "pubs.acs.org",
            "link.springer.com",
            "tandfonline.com",
            "advanced.onlinelibrary.wiley.com",
            "aiche.onlinelibrary.wiley.com",
            "iopscience.iop.org",
            "ieeexplore.ieee.org",
            "karger.com",
            "pubs.rsc.org",
            "analyticalsciencejournals.onlinelibrary.wiley.com",
        ] {
            logins.insert(domain);
        }
        logins
    }
}
