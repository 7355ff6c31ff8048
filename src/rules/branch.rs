//! Template-vs-extraction branch flags.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::store::FlagValue;
use super::{RuleStore, resolve};

/// One persisted branch row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchEntry {
    domain: String,
    direct: FlagValue,
}

/// `DomainBranch.json`: domains whose documents come from a URL template.
///
/// Everything else goes through link extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<BranchEntry>", into = "Vec<BranchEntry>")]
pub struct BranchRules {
    flags: BTreeMap<String, bool>,
}

impl From<Vec<BranchEntry>> for BranchRules {
    fn from(entries: Vec<BranchEntry>) -> Self {
        let flags = entries
            .into_iter()
            .map(|entry| (entry.domain.trim().to_string(), entry.direct.is_set()))
            .collect();
        Self { flags }
    }
}

impl From<BranchRules> for Vec<BranchEntry> {
    fn from(rules: BranchRules) -> Self {
        rules
            .flags
            .into_iter()
            .map(|(domain, direct)| BranchEntry {
                domain,
                direct: FlagValue::from_bool(direct),
            })
            .collect()
    }
}

impl BranchRules {
    /// Returns true when `domain` takes the template path.
    #[must_use]
    pub fn is_direct(&self, domain: &str) -> bool {
        *resolve(domain, &self.flags, &false)
    }

    /// Sets the flag for one domain.
    pub fn set(&mut self, domain: impl Into<String>, direct: bool) {
        self.flags.insert(domain.into(), direct);
    }
}

impl RuleStore for BranchRules {
    const CATEGORY: &'static str = "domain branch";

    fn builtin() -> Self {
        let mut rules = Self::default();
        rules.set("pubs.acs.org", true);
        rules.set("sciencedirect.com", true);
        rules.set("pubs.rsc.org", true);
        rules.set("example.com", false);
        rules
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_parses_string_flags() {
        let raw = r#"[
            {"domain": "pubs.acs.org", "direct": "1"},
            {"domain": "example.com", "direct": "0"},
            {"domain": "nature.com", "direct": "yes"}
        ]"#;
        let rules: BranchRules = serde_json::from_str(raw).unwrap();
        assert!(rules.is_direct("pubs.acs.org"));
        assert!(!rules.is_direct("example.com"));
        assert!(!rules.is_direct("nature.com"));
    }

    #[test]
    fn test_branch_default_is_extraction() {
        let rules = BranchRules::builtin();
        assert!(!rules.is_direct("onlinelibrary.wiley.com"));
        assert!(rules.is_direct("www.sciencedirect.com"));
    }

    #[test]
    fn test_branch_serializes_as_legacy_list() {
        let json = serde_json::to_string(&BranchRules::builtin()).unwrap();
        assert!(json.contains(r#"{"domain":"pubs.acs.org","direct":"1"}"#));
        assert!(json.contains(r#"{"domain":"example.com","direct":"0"}"#));
    }
}
