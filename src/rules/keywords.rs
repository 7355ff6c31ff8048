//! Extraction keyword tables.
//!
//! Entries are matched by substring containment: an entry applies to a
//! domain when its `url` string contains that domain. The domain cascade
//! still runs first on the full host, then on the base domain.

use serde::{Deserialize, Serialize};

use super::store::FlagValue;
use super::{RuleLookup, RuleStore, resolve_optional};

/// One keyword entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordEntry {
    /// Publisher URL or host the entry applies to.
    pub url: String,
    /// Ordered keywords; some select a dedicated extraction strategy.
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    download: Option<FlagValue>,
}

impl KeywordEntry {
    /// Creates an entry without a download flag.
    #[must_use]
    pub fn new(url: impl Into<String>, keywords: Vec<String>) -> Self {
        Self {
            url: url.into(),
            keywords,
            download: None,
        }
    }

    /// Sets the supplementary-material download flag.
    #[must_use]
    pub fn with_download(mut self, download: bool) -> Self {
        self.download = Some(FlagValue::from_bool(download));
        self
    }

    /// Whether the manual-save interaction should be triggered for this entry.
    #[must_use]
    pub fn wants_download(&self) -> bool {
        self.download.as_ref().is_some_and(FlagValue::is_set)
    }
}

/// `Paperkeyword.json` / `SIkeyword.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeywordRules {
    entries: Vec<KeywordEntry>,
}

impl RuleLookup<KeywordEntry> for KeywordRules {
    fn lookup(&self, key: &str) -> Option<&KeywordEntry> {
        self.entries.iter().find(|entry| entry.url.contains(key))
    }
}

impl KeywordRules {
    /// Builds a table from entries, keeping their order.
    #[must_use]
    pub fn new(entries: Vec<KeywordEntry>) -> Self {
        Self { entries }
    }

    /// Returns the entry resolved for `domain`.
    #[must_use]
    pub fn entry_for(&self, domain: &str) -> Option<&KeywordEntry> {
        resolve_optional(domain, self)
    }

    /// Returns the keyword list resolved for `domain`.
    #[must_use]
    pub fn keywords_for(&self, domain: &str) -> Option<&[String]> {
        self.entry_for(domain)
            .map(|entry| entry.keywords.as_slice())
            .filter(|keywords| !keywords.is_empty())
    }
}

impl RuleStore for KeywordRules {
    const CATEGORY: &'static str = "extraction keywords";

    fn builtin() -> Self {
        Self::default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn rules() -> KeywordRules {
        serde_json::from_str(
            r#"[
                {"url": "https://www.sciencedirect.com", "keywords": ["md5"]},
                {"url": "https://onlinelibrary.wiley.com", "keywords": ["doi"], "download": "1"},
                {"url": "https://empty.example.org", "keywords": []}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_keywords_matched_by_containment() {
        let rules = rules();
        assert_eq!(
            rules.keywords_for("www.sciencedirect.com").unwrap(),
            ["md5".to_string()]
        );
        assert!(rules.keywords_for("sciencedirect.com").is_some());
    }

    #[test]
    fn test_keywords_cascade_to_base_domain() {
        let rules = rules();
        assert_eq!(
            rules.keywords_for("aiche.onlinelibrary.wiley.com").unwrap(),
            ["doi".to_string()]
        );
        let rules = KeywordRules::new(vec![KeywordEntry::new(
            "https://pubs.acs.org",
            vec!["pdf".to_string(), "pdf-link".to_string()],
        )]);
        assert!(rules.keywords_for("www.rsc.org").is_none());
    }

    #[test]
    fn test_keywords_absent_or_empty() {
        let rules = rules();
        assert!(rules.keywords_for("nature.com").is_none());
        assert!(rules.keywords_for("empty.example.org").is_none());
    }

    #[test]
    fn test_download_flag() {
        let rules = rules();
        assert!(rules.entry_for("onlinelibrary.wiley.com").unwrap().wants_download());
        assert!(!rules.entry_for("www.sciencedirect.com").unwrap().wants_download());
        assert!(KeywordEntry::new("x", vec![]).with_download(true).wants_download());
    }
}
