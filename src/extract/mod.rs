//! Keyword-driven extraction of document links from captured pages.
//!
//! # Overview
//!
//! The keyword list resolved for a domain selects a [`Strategy`]; the
//! strategy scans the page text and yields at most one candidate, which is
//! then normalized to an absolute `https` URL. No strategy retries.
//!
//! Primary papers match the first keyword case-sensitively and take the
//! first candidate in document order. Supplementary material matches any
//! keyword case-insensitively, keeps only document-type links (outside the
//! `doi` and `full#supplementary-material` modes), and prefers a candidate
//! ending in `.pdf`.
//!
//! # Example
//!
//! ```
//! use paperdownload_core::extract::{Extraction, LinkExtractor};
//! use paperdownload_core::ledger::ArtifactKind;
//! use paperdownload_core::rules::{KeywordEntry, KeywordRules};
//!
//! let rules = KeywordRules::new(vec![KeywordEntry::new(
//!     "https://www.sciencedirect.com",
//!     vec!["eid".to_string()],
//! )]);
//! let extractor = LinkExtractor::new(rules, ArtifactKind::Supplementary);
//! let page = r#"{"eid":"1-s2.0-S0001234"}"#;
//!
//! match extractor.extract(page, "www.sciencedirect.com", "10.1016/x") {
//!     Extraction::Found { url, .. } => {
//!         assert_eq!(url, "https://ars.els-cdn.com/content/image/1-s2.0-S0001234-mmc1.pdf");
//!     }
//!     Extraction::NoDocument(reason) => panic!("unexpected: {reason}"),
//! }
//! ```

mod strategy;

pub use strategy::{MAIN_DOCUMENT_MARKER, Strategy};

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument};

use crate::ledger::ArtifactKind;
use crate::rules::KeywordRules;

/// Compiles a regex at static init; panics on invalid pattern.
pub(crate) fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

static DOCUMENT_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(?i)\.(pdf|docx|doc)(\?|$|/)"));

/// Default document extensions accepted for supplementary links.
pub const DEFAULT_DOCUMENT_EXTENSIONS: [&str; 4] = ["pdf", "docx", "doc", "zip"];

/// Why no link was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoDocumentReason {
    /// No keyword entry applies to the domain.
    NoKeywords,
    /// The strategy found no matching candidate.
    NoMatch(Strategy),
}

impl fmt::Display for NoDocumentReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoKeywords => write!(f, "no extraction keywords for domain"),
            Self::NoMatch(strategy) => write!(f, "no candidate found by {strategy} strategy"),
        }
    }
}

/// Outcome of [`LinkExtractor::extract`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// A normalized absolute link.
    Found {
        /// Document URL.
        url: String,
        /// Strategy that produced it.
        strategy: Strategy,
    },
    /// No link exists; not retryable.
    NoDocument(NoDocumentReason),
}

impl Extraction {
    /// Returns the URL when one was found.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Found { url, .. } => Some(url),
            Self::NoDocument(_) => None,
        }
    }
}

/// Extracts document links using a keyword table.
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    rules: KeywordRules,
    kind: ArtifactKind,
    document_extensions: Vec<String>,
}

impl LinkExtractor {
    /// Creates an extractor for `kind` using `rules`.
    #[must_use]
    pub fn new(rules: KeywordRules, kind: ArtifactKind) -> Self {
        Self {
            rules,
            kind,
            document_extensions: DEFAULT_DOCUMENT_EXTENSIONS
                .iter()
                .map(|extension| (*extension).to_string())
                .collect(),
        }
    }

    /// Replaces the extensions that mark a supplementary document link.
    #[must_use]
    pub fn with_document_extensions(mut self, extensions: &[String]) -> Self {
        self.document_extensions = extensions
            .iter()
            .map(|extension| extension.trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    /// Keyword table in use.
    #[must_use]
    pub fn rules(&self) -> &KeywordRules {
        &self.rules
    }

    /// Extracts the document link for `doi` from `page`, captured on `domain`.
    #[instrument(skip(self, page), fields(kind = %self.kind, page_len = page.len()))]
    pub fn extract(&self, page: &str, domain: &str, doi: &str) -> Extraction {
        let Some(keywords) = self.rules.keywords_for(domain) else {
            debug!("no keywords configured");
            return Extraction::NoDocument(NoDocumentReason::NoKeywords);
        };

        let strategy = Strategy::select(keywords);
        debug!(strategy = %strategy, keywords = ?keywords, "strategy selected");

        let candidate = match strategy {
            Strategy::PairedAttribute => keywords
                .iter()
                .find(|keyword| keyword.as_str() != "pdf")
                .and_then(|term| strategy::paired_attribute(page, term)),
            Strategy::StructuredTriple => strategy::structured_triple(page),
            Strategy::ElsevierEid => strategy::elsevier_eid(page),
            Strategy::DoiSuffix => {
                let terms = [format!("{doi}/s")];
                self.pick(strategy::href_values(page), &terms, false)
            }
            Strategy::SupplementarySection => {
                self.pick(strategy::href_values(page), keywords, false)
            }
            Strategy::ContentAttribute => {
                self.pick(strategy::content_values(page), keywords, true)
            }
            Strategy::Href => self.pick(strategy::href_values(page), keywords, true),
        };

        match candidate {
            Some(raw) => {
                let url = normalize_link(&raw, domain);
                debug!(url = %url, "document link extracted");
                Extraction::Found { url, strategy }
            }
            None => Extraction::NoDocument(NoDocumentReason::NoMatch(strategy)),
        }
    }

    fn pick(&self, candidates: Vec<&str>, terms: &[String], documents_only: bool) -> Option<String> {
        match self.kind {
            ArtifactKind::Paper => {
                let term = terms.first()?;
                candidates
                    .into_iter()
                    .find(|candidate| candidate.contains(term.as_str()))
                    .map(str::to_string)
            }
            ArtifactKind::Supplementary => {
                let terms: Vec<String> = terms.iter().map(|term| term.to_lowercase()).collect();
                let matching: Vec<&str> = candidates
                    .into_iter()
                    .filter(|candidate| {
                        let lower = candidate.to_lowercase();
                        terms.iter().any(|term| lower.contains(term.as_str()))
                    })
                    .filter(|candidate| !documents_only || self.is_document_link(candidate))
                    .collect();
                matching
                    .iter()
                    .find(|candidate| candidate.to_lowercase().ends_with(".pdf"))
                    .or_else(|| matching.first())
                    .map(|candidate| (*candidate).to_string())
            }
        }
    }

    fn is_document_link(&self, link: &str) -> bool {
        let path = link.split(['?', '#']).next().unwrap_or(link).to_lowercase();
        self.document_extensions
            .iter()
            .any(|extension| path.ends_with(&format!(".{extension}")))
            || DOCUMENT_LINK_RE.is_match(link)
    }
}

/// Makes an extracted link absolute.
///
/// Absolute links are kept, protocol-relative links to `domain` get
/// `https:`, and anything else is joined onto `https://{domain}/`.
#[must_use]
pub fn normalize_link(raw: &str, domain: &str) -> String {
    let raw = raw.trim();
    if raw.starts_with("http") {
        raw.to_string()
    } else if raw.starts_with(&format!("//{domain}")) {
        format!("https://{}", raw.trim_start_matches('/'))
    } else {
        format!("https://{domain}/{}", raw.trim_start_matches('/'))
    }
}
