//! CLI command handlers.

mod export;
mod rules;
mod run;
mod status;

use std::path::Path;

use anyhow::{Context, Result};
use paperdownload_core::config::{AppConfig, ConfigOverrides, load_config};
use tracing::debug;

pub use export::run_export_failed_command;
pub use rules::run_rules_init_command;
pub use run::run_acquisition_command;
pub use status::run_status_command;

/// Loads the config file and layers `overrides` over it.
fn load_app_config(config_path: Option<&Path>, overrides: &ConfigOverrides) -> Result<AppConfig> {
    let loaded = load_config(config_path).context("cannot load configuration")?;
    debug!(
        path = ?loaded.path,
        from_file = loaded.loaded_from_file(),
        "configuration loaded"
    );
    Ok(AppConfig::resolve(loaded.config, overrides))
}
