//! Extraction strategies and the page scans behind them.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use super::compile_static_regex;

/// Marker a `ScienceDirect` `pid` must contain to name the main article PDF.
pub const MAIN_DOCUMENT_MARKER: &str = "mainext";

/// Tags carrying a `class` attribute followed later by an `href`.
static PAIRED_ATTRIBUTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"class\s*=\s*["']([^"']*)["'][^>]*?href\s*=\s*["']([^"']*)["']"#)
});

/// `{"md5":"…","pid":"…"},"pii":"…"` triples embedded in page scripts.
static STRUCTURED_TRIPLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"\{"md5":"([a-f0-9]{32})","pid":"([^"]+)"\},"pii":"([A-Z0-9]{10,})""#)
});

static EID_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r#""eid":"([^"]+)""#));

static CONTENT_ATTRIBUTE_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r#"content=['"]?([^'" >]+)"#));

static HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r#"href=['"]?([^'" >]+)"#));

/// Extraction strategy selected from a keyword list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Keywords are exactly `["doi"]`: find links containing `{doi}/s`.
    DoiSuffix,
    /// Keywords are exactly `["full#supplementary-material"]`.
    SupplementarySection,
    /// Keywords contain `pdf`: class/href attribute pairs.
    PairedAttribute,
    /// Keywords contain `md5`: md5/pid/pii triples.
    StructuredTriple,
    /// Keywords contain `eid`: Elsevier asset identifier.
    ElsevierEid,
    /// Keywords contain `downloadpdf`: `content=` attribute values.
    ContentAttribute,
    /// Plain `href=` scan.
    Href,
}

impl Strategy {
    /// Keyword that selects [`Strategy::SupplementarySection`].
    pub const SUPPLEMENTARY_SECTION_KEYWORD: &'static str = "full#supplementary-material";

    /// Picks the strategy for `keywords`, in priority order.
    #[must_use]
    pub fn select(keywords: &[String]) -> Self {
        let has = |needle: &str| keywords.iter().any(|keyword| keyword == needle);
        match keywords {
            [only] if only.eq_ignore_ascii_case("doi") => Self::DoiSuffix,
            [only] if only.eq_ignore_ascii_case(Self::SUPPLEMENTARY_SECTION_KEYWORD) => {
                Self::SupplementarySection
            }
            _ if has("pdf") => Self::PairedAttribute,
            _ if has("md5") => Self::StructuredTriple,
            _ if has("eid") => Self::ElsevierEid,
            _ if has("downloadpdf") => Self::ContentAttribute,
            _ => Self::Href,
        }
    }

    /// Returns a stable label for logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DoiSuffix => "doi_suffix",
            Self::SupplementarySection => "supplementary_section",
            Self::PairedAttribute => "paired_attribute",
            Self::StructuredTriple => "structured_triple",
            Self::ElsevierEid => "elsevier_eid",
            Self::ContentAttribute => "content_attribute",
            Self::Href => "href",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `href` of the first tag whose class contains `term`.
pub(super) fn paired_attribute(page: &str, term: &str) -> Option<String> {
    PAIRED_ATTRIBUTE_RE
        .captures_iter(page)
        .find(|captures| captures[1].contains(term))
        .map(|captures| captures[2].to_string())
}

/// Direct PDF URL from the first triple whose `pid` names the main document.
pub(super) fn structured_triple(page: &str) -> Option<String> {
    STRUCTURED_TRIPLE_RE
        .captures_iter(page)
        .find(|captures| captures[2].contains(MAIN_DOCUMENT_MARKER))
        .map(|captures| {
            let (md5, pid, pii) = (&captures[1], &captures[2], &captures[3]);
            format!(
                "https://www.sciencedirect.com/science/article/pii/{pii}/pdfft?md5={md5}&pid={pid}.pdf"
            )
        })
}

/// Supplementary asset URL derived from the first `eid` value.
pub(super) fn elsevier_eid(page: &str) -> Option<String> {
    EID_RE
        .captures(page)
        .map(|captures| format!("https://ars.els-cdn.com/content/image/{}-mmc1.pdf", &captures[1]))
}

/// Values of every `content=` attribute, in document order.
pub(super) fn content_values(page: &str) -> Vec<&str> {
    CONTENT_ATTRIBUTE_RE
        .captures_iter(page)
        .filter_map(|captures| captures.get(1).map(|value| value.as_str()))
        .collect()
}

/// Values of every `href=` attribute, in document order.
pub(super) fn href_values(page: &str) -> Vec<&str> {
    HREF_RE
        .captures_iter(page)
        .filter_map(|captures| captures.get(1).map(|value| value.as_str()))
        .collect()
}
