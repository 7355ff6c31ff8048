//! Download URL synthesis for template-path publishers.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{RuleStore, resolve, resolve_optional};

/// How a template is turned into a download URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateTransform {
    /// Replace `{doi}` with the DOI.
    Substitute,
    /// Replace `{doi}`/`{arnumber}` with the last `.`-separated DOI segment.
    NumericSuffix,
    /// Ignore the template and rewrite the landing URL into its PDF URL.
    LandingRewrite,
}

impl TemplateTransform {
    /// Returns a stable label for logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Substitute => "substitute",
            Self::NumericSuffix => "numeric_suffix",
            Self::LandingRewrite => "landing_rewrite",
        }
    }
}

static TRANSFORMS: LazyLock<BTreeMap<String, TemplateTransform>> = LazyLock::new(|| {
    BTreeMap::from([
        (
            "ieeexplore.ieee.org".to_string(),
            TemplateTransform::NumericSuffix,
        ),
        ("pubs.rsc.org".to_string(), TemplateTransform::LandingRewrite),
    ])
});

/// `DownloadTemplates.json`: domain to URL template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DownloadTemplates {
    templates: BTreeMap<String, String>,
}

impl DownloadTemplates {
    /// Returns the template resolved for `domain`, if any.
    #[must_use]
    pub fn template_for(&self, domain: &str) -> Option<&str> {
        resolve_optional(domain, &self.templates).map(String::as_str)
    }

    /// Returns the transform applied for `domain`.
    #[must_use]
    pub fn transform_for(domain: &str) -> TemplateTransform {
        *resolve(domain, &*TRANSFORMS, &TemplateTransform::Substitute)
    }

    /// Adds or replaces one template.
    pub fn insert(&mut self, domain: impl Into<String>, template: impl Into<String>) {
        self.templates.insert(domain.into(), template.into());
    }

    /// Builds the download URL for `doi` on `domain`.
    ///
    /// `final_url` is the landing page the DOI resolved to. Returns `None`
    /// when no template applies.
    #[must_use]
    pub fn synthesize(&self, domain: &str, doi: &str, final_url: &str) -> Option<String> {
        let transform = Self::transform_for(domain);
        if transform == TemplateTransform::LandingRewrite {
            let url = final_url
                .to_lowercase()
                .replace("articlelanding", "articlepdf");
            debug!(domain, url = %url, "rewrote landing URL");
            return Some(url);
        }

        let Some(template) = self.template_for(domain) else {
            warn!(domain, "no download template configured");
            return None;
        };

        let url = match transform {
            TemplateTransform::NumericSuffix => {
                let arnumber = numeric_suffix(doi);
                template
                    .replace("{doi}", arnumber)
                    .replace("{arnumber}", arnumber)
            }
            TemplateTransform::Substitute | TemplateTransform::LandingRewrite => {
                template.replace("{doi}", doi)
            }
        };
        debug!(domain, transform = transform.as_str(), url = %url, "synthesized download URL");
        Some(url)
    }
}

fn numeric_suffix(doi: &str) -> &str {
    match doi.rsplit('.').next() {
        Some(suffix) if !suffix.is_empty() => suffix,
        _ => doi,
    }
}

impl RuleStore for DownloadTemplates {
    const CATEGORY: &'static str = "download templates";

    fn builtin() -> Self {
        let mut templates = Self::default();
        templates.insert("pubs.acs.org", "https://pubs.acs.org/doi/pdf/{doi}");
        templates.insert("nature.com", "https://www.nature.com/articles/{doi}.pdf");
        templates.insert("springer.com", "https://link.springer.com/content/pdf/{doi}.pdf");
        templates.insert("wiley.com", "https://onlinelibrary.wiley.com/doi/pdfdirect/{doi}");
        templates.insert(
            "ieeexplore.ieee.org",
            "https://ieeexplore.ieee.org/stampPDF/getPDF.jsp?tp=&arnumber={arnumber}",
        );
        templates
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesize_substitutes_doi() {
        let templates = DownloadTemplates::builtin();
        let url = templates
            .synthesize("pubs.acs.org", "10.1021/acs.jpcc.1c00001", "https://pubs.acs.org/doi/x")
            .unwrap();
        assert_eq!(url, "https://pubs.acs.org/doi/pdf/10.1021/acs.jpcc.1c00001");
    }

    #[test]
    fn test_synthesize_uses_base_domain_template() {
        let templates = DownloadTemplates::builtin();
        let url = templates
            .synthesize("www.nature.com", "10.1038/s41586-020-0001", "")
            .unwrap();
        assert_eq!(url, "https://www.nature.com/articles/10.1038/s41586-020-0001.pdf");
    }

    #[test]
    fn test_synthesize_numeric_suffix_for_ieee() {
        let templates = DownloadTemplates::builtin();
        let url = templates
            .synthesize("ieeexplore.ieee.org", "10.1109/TPAMI.2020.9123456", "")
            .unwrap();
        assert_eq!(
            url,
            "https://ieeexplore.ieee.org/stampPDF/getPDF.jsp?tp=&arnumber=9123456"
        );
    }

    #[test]
    fn test_numeric_suffix_falls_back_to_full_doi() {
        assert_eq!(numeric_suffix("10.1109/abc."), "10.1109/abc.");
        assert_eq!(numeric_suffix("noseparator"), "noseparator");
    }

    #[test]
    fn test_synthesize_landing_rewrite_without_template() {
        let templates = DownloadTemplates::default();
        let url = templates
            .synthesize(
                "pubs.rsc.org",
                "10.1039/d0cc00001a",
                "https://pubs.rsc.org/en/content/ArticleLanding/2020/CC/D0CC00001A",
            )
            .unwrap();
        assert_eq!(
            url,
            "https://pubs.rsc.org/en/content/articlepdf/2020/cc/d0cc00001a"
        );
    }

    #[test]
    fn test_synthesize_without_template_returns_none() {
        let templates = DownloadTemplates::builtin();
        assert!(templates.synthesize("example.org", "10.1/x", "").is_none());
    }
}
