//! `rules init`: materialize the shipped rule stores.

use std::path::Path;

use anyhow::{Context, Result};
use paperdownload_core::RuleBook;
use paperdownload_core::config::ConfigOverrides;

use crate::cli::RulesArgs;

pub fn run_rules_init_command(args: &RulesArgs, config_path: Option<&Path>) -> Result<()> {
    let config = super::load_app_config(
        config_path,
        &ConfigOverrides {
            rules_dir: args.rules_dir.clone(),
            ..ConfigOverrides::default()
        },
    )?;

    let outcomes = RuleBook::materialize_defaults(&config.rules_dir).with_context(|| {
        format!(
            "cannot write rule stores to {}",
            config.rules_dir.display()
        )
    })?;

    println!("rules_dir = {}", config.rules_dir.display());
    for (file, outcome) in outcomes {
        println!("{file} = {}", outcome.as_str());
    }
    Ok(())
}
