//! Integration tests for rule stores on disk.

use std::fs;

use paperdownload_core::rules::{
    BRANCH_FILE, ClickTarget, KeywordRules, MaterializeOutcome, PAPER_KEYWORDS_FILE,
    SETTINGS_FILE, SUPPLEMENTARY_KEYWORDS_FILE,
};
use paperdownload_core::{RuleBook, resolve};
use std::collections::BTreeMap;
use tempfile::TempDir;

#[test]
fn test_cascade_matches_base_domain_rule() {
    let mut rules = BTreeMap::new();
    rules.insert("sciencedirect.com".to_string(), "elsevier");
    rules.insert("www.nature.com".to_string(), "nature");

    assert_eq!(
        *resolve("articles.sciencedirect.com", &rules, &"default"),
        "elsevier"
    );
    assert_eq!(*resolve("www.nature.com", &rules, &"default"), "nature");
    assert_eq!(*resolve("nature.com", &rules, &"default"), "default");
}

#[test]
fn test_materialize_defaults_is_idempotent() {
    let dir = TempDir::new().expect("Failed to create temp dir");

    let first = RuleBook::materialize_defaults(dir.path()).unwrap();
    assert_eq!(first.len(), 7);
    assert!(
        first
            .iter()
            .all(|(_, outcome)| *outcome == MaterializeOutcome::Created)
    );
    let written = fs::read(dir.path().join(SETTINGS_FILE)).unwrap();

    let second = RuleBook::materialize_defaults(dir.path()).unwrap();
    assert!(
        second
            .iter()
            .all(|(_, outcome)| *outcome == MaterializeOutcome::AlreadyPresent)
    );
    assert_eq!(fs::read(dir.path().join(SETTINGS_FILE)).unwrap(), written);
}

#[test]
fn test_load_reads_legacy_store_formats() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    fs::write(
        dir.path().join(SETTINGS_FILE),
        "\u{feff}{\"default\":{\"use_ctrl_s\":false,\"max_retries\":1},\"domains\":{\"sciencedirect.com\":{\"maxRetries\":4}}}",
    )
    .unwrap();
    fs::write(
        dir.path().join(BRANCH_FILE),
        r#"[{"domain":"sciencedirect.com","direct":"1"}]"#,
    )
    .unwrap();
    fs::write(
        dir.path().join(PAPER_KEYWORDS_FILE),
        r#"[{"url":"sciencedirect.com","keywords":["md5"]}]"#,
    )
    .unwrap();
    fs::write(
        dir.path().join(SUPPLEMENTARY_KEYWORDS_FILE),
        r#"[{"url":"sciencedirect.com","keywords":["eid"],"download":"1"}]"#,
    )
    .unwrap();

    let rules = RuleBook::load(dir.path());

    let default = rules.settings.for_domain("example.org");
    assert!(!default.use_manual_save);
    assert_eq!(default.max_retries, 1);
    assert_eq!(rules.settings.for_domain("www.sciencedirect.com").max_retries, 4);
    assert!(rules.branches.is_direct("articles.sciencedirect.com"));
    assert_eq!(
        rules.paper_keywords.keywords_for("www.sciencedirect.com"),
        Some(["md5".to_string()].as_slice())
    );
    assert!(
        rules
            .supplementary_keywords
            .entry_for("www.sciencedirect.com")
            .unwrap()
            .wants_download()
    );

    assert!(dir.path().join("ClickTargets.json").exists(), "missing stores are materialized");
    assert_eq!(rules.clicks.target_for("ieeexplore.ieee.org"), ClickTarget::ScreenCenter);
}

#[test]
fn test_unreadable_store_falls_back_to_empty_default() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    fs::write(dir.path().join(PAPER_KEYWORDS_FILE), "{ not json").unwrap();

    let rules = RuleBook::load(dir.path());
    assert_eq!(rules.paper_keywords, KeywordRules::default());
    assert!(rules.paper_keywords.keywords_for("pubs.acs.org").is_none());
}
