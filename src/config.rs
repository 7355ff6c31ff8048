//! Application configuration.
//!
//! # Overview
//!
//! [`AppConfig`] is assembled once at startup and never mutated:
//!
//! 1. built-in defaults,
//! 2. an optional TOML file (`--config`, else the XDG default path),
//! 3. command-line overrides.
//!
//! # Example
//!
//! ```toml
//! ledger = "papers.csv"
//! delay_between_papers_secs = 30
//! resume_filter = "skip_completed"
//!
//! [helpers]
//! open = ["browser-helper", "open", "{url}"]
//! current_url = ["browser-helper", "current-url"]
//! capture = ["browser-helper", "capture", "{url}"]
//! save = ["browser-helper", "save", "--click", "{click}", "--name", "{filename}"]
//! reset = ["browser-helper", "reset"]
//!
//! [login]
//! "pubs.acs.org" = ["login-helper", "{domain}"]
//! ```

use std::collections::BTreeMap;
use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::agent::{
    DownloadFolder, HelperCommand, HelperDownloadAgent, HelperRenderAgent, LoginRegistry,
    LoginStrategy,
};
use crate::extract::DEFAULT_DOCUMENT_EXTENSIONS;
use crate::ledger::{ArtifactKind, ResumeFilter};
use crate::orchestrator::{Agents, OrchestratorSettings};

/// Directory name used under the XDG config home.
pub const APP_CONFIG_DIR: &str = "paperdownload";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("cannot read config file {}: {source}\n  Suggestion: Check the --config path and file permissions", .path.display())]
    Read {
        /// Config file path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this application.
    #[error("invalid config file {}: {source}\n  Suggestion: Compare the file against the documented keys", .path.display())]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// Underlying error.
        source: toml::de::Error,
    },

    /// A value is outside its accepted range.
    #[error("Invalid config value for `{field}`: {value}. Expected {expected}")]
    Invalid {
        /// Config key.
        field: &'static str,
        /// Offending value.
        value: String,
        /// Accepted values.
        expected: &'static str,
    },

    /// A helper program needed by the requested pass is not configured.
    #[error("helper `{name}` is not configured\n  Suggestion: Add `{name} = [\"program\", \"args\"]` under [helpers] in the config file")]
    MissingHelper {
        /// Helper key under `[helpers]`.
        name: &'static str,
    },
}

/// Helper program argv per browser operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HelperConfig {
    /// Navigates to `{url}`.
    pub open: Option<Vec<String>>,
    /// Prints the URL the browser is on.
    pub current_url: Option<Vec<String>>,
    /// Prints the final URL, then the rendered page.
    pub capture: Option<Vec<String>>,
    /// Performs the manual-save interaction.
    pub save: Option<Vec<String>>,
    /// Closes tabs and browser processes.
    pub reset: Option<Vec<String>>,
}

/// TOML-backed file configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Ledger CSV path.
    pub ledger: Option<PathBuf>,
    /// Directory for captured page text.
    pub html_dir: Option<PathBuf>,
    /// Download folder for papers.
    pub paper_dir: Option<PathBuf>,
    /// Download folder for supplementary material.
    pub supplementary_dir: Option<PathBuf>,
    /// Directory holding the rule stores.
    pub rules_dir: Option<PathBuf>,
    /// Pause between DOIs in seconds.
    pub delay_between_papers_secs: Option<u64>,
    /// Bound for each browser call in seconds.
    pub agent_timeout_secs: Option<u64>,
    /// Wait after opening an extracted link in seconds.
    pub download_settle_secs: Option<u64>,
    /// Wait after opening a template link in seconds.
    pub template_settle_secs: Option<u64>,
    /// Extensions accepted as a downloaded paper.
    pub paper_extensions: Option<Vec<String>>,
    /// Extensions accepted as downloaded supplementary material.
    pub supplementary_extensions: Option<Vec<String>>,
    /// Which records after the resume cursor are processed.
    pub resume_filter: Option<ResumeFilter>,
    /// Browser helper programs.
    pub helpers: HelperConfig,
    /// Login helper argv per domain.
    pub login: BTreeMap<String, Vec<String>>,
}

impl FileConfig {
    /// Parses and validates TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_toml_str(path: &Path, text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(path, &text)
    }

    /// Validates values against runtime constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_secs(
            "delay_between_papers_secs",
            self.delay_between_papers_secs,
            0..=86_400,
            "a range of 0..=86400",
        )?;
        validate_secs(
            "agent_timeout_secs",
            self.agent_timeout_secs,
            1..=3_600,
            "a range of 1..=3600",
        )?;
        validate_secs(
            "download_settle_secs",
            self.download_settle_secs,
            0..=3_600,
            "a range of 0..=3600",
        )?;
        validate_secs(
            "template_settle_secs",
            self.template_settle_secs,
            0..=3_600,
            "a range of 0..=3600",
        )?;
        validate_extensions("paper_extensions", self.paper_extensions.as_deref())?;
        validate_extensions(
            "supplementary_extensions",
            self.supplementary_extensions.as_deref(),
        )?;

        let helpers = [
            ("helpers.open", &self.helpers.open),
            ("helpers.current_url", &self.helpers.current_url),
            ("helpers.capture", &self.helpers.capture),
            ("helpers.save", &self.helpers.save),
            ("helpers.reset", &self.helpers.reset),
        ];
        for (field, argv) in helpers {
            if let Some(argv) = argv
                && HelperCommand::from_argv(argv).is_none()
            {
                return Err(ConfigError::Invalid {
                    field,
                    value: format!("{argv:?}"),
                    expected: "a non-empty argv",
                });
            }
        }
        for (domain, argv) in &self.login {
            if HelperCommand::from_argv(argv).is_none() {
                return Err(ConfigError::Invalid {
                    field: "login",
                    value: domain.clone(),
                    expected: "a non-empty argv for every domain",
                });
            }
        }
        Ok(())
    }
}

fn validate_secs(
    field: &'static str,
    value: Option<u64>,
    range: std::ops::RangeInclusive<u64>,
    expected: &'static str,
) -> Result<(), ConfigError> {
    let Some(value) = value else {
        return Ok(());
    };
    if !range.contains(&value) {
        return Err(ConfigError::Invalid {
            field,
            value: value.to_string(),
            expected,
        });
    }
    Ok(())
}

fn validate_extensions(field: &'static str, value: Option<&[String]>) -> Result<(), ConfigError> {
    let Some(extensions) = value else {
        return Ok(());
    };
    if extensions.is_empty() || extensions.iter().any(|ext| ext.trim().is_empty()) {
        return Err(ConfigError::Invalid {
            field,
            value: format!("{extensions:?}"),
            expected: "a non-empty list of extensions",
        });
    }
    Ok(())
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Ledger CSV path.
    pub ledger: Option<PathBuf>,
    /// Rule store directory.
    pub rules_dir: Option<PathBuf>,
    /// Pause between DOIs in seconds.
    pub delay_between_papers_secs: Option<u64>,
    /// Resume filter.
    pub resume_filter: Option<ResumeFilter>,
}

/// Effective, immutable configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Ledger CSV path.
    pub ledger: PathBuf,
    /// Directory for captured page text.
    pub html_dir: PathBuf,
    /// Download folder for papers.
    pub paper_dir: PathBuf,
    /// Download folder for supplementary material.
    pub supplementary_dir: PathBuf,
    /// Directory holding the rule stores.
    pub rules_dir: PathBuf,
    /// Pause between DOIs.
    pub delay_between_papers: Duration,
    /// Bound for each browser call.
    pub agent_timeout: Duration,
    /// Wait after opening an extracted link.
    pub download_settle: Duration,
    /// Wait after opening a template link.
    pub template_settle: Duration,
    /// Extensions accepted as a downloaded paper.
    pub paper_extensions: Vec<String>,
    /// Extensions accepted as downloaded supplementary material.
    pub supplementary_extensions: Vec<String>,
    /// Which records after the resume cursor are processed.
    pub resume_filter: ResumeFilter,
    /// Browser helper programs.
    pub helpers: HelperConfig,
    /// Login helper argv per domain.
    pub login: BTreeMap<String, Vec<String>>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let defaults = OrchestratorSettings::default();
        Self {
            ledger: PathBuf::from("papers.csv"),
            html_dir: PathBuf::from("html"),
            paper_dir: PathBuf::from("downloads"),
            supplementary_dir: PathBuf::from("downloads/si"),
            rules_dir: PathBuf::from("rules"),
            delay_between_papers: defaults.delay_between_items,
            agent_timeout: defaults.agent_timeout,
            download_settle: defaults.download_settle,
            template_settle: defaults.template_settle,
            paper_extensions: vec!["pdf".to_string()],
            supplementary_extensions: DEFAULT_DOCUMENT_EXTENSIONS
                .iter()
                .map(|ext| (*ext).to_string())
                .collect(),
            resume_filter: defaults.resume_filter,
            helpers: HelperConfig::default(),
            login: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    /// Layers `file` and `overrides` over the defaults.
    #[must_use]
    pub fn resolve(file: Option<FileConfig>, overrides: &ConfigOverrides) -> Self {
        let mut config = Self::default();
        if let Some(file) = file {
            config.apply_file(file);
        }
        if let Some(ledger) = &overrides.ledger {
            config.ledger.clone_from(ledger);
        }
        if let Some(rules_dir) = &overrides.rules_dir {
            config.rules_dir.clone_from(rules_dir);
        }
        if let Some(secs) = overrides.delay_between_papers_secs {
            config.delay_between_papers = Duration::from_secs(secs);
        }
        if let Some(filter) = overrides.resume_filter {
            config.resume_filter = filter;
        }
        config
    }

    fn apply_file(&mut self, file: FileConfig) {
        let FileConfig {
            ledger,
            html_dir,
            paper_dir,
            supplementary_dir,
            rules_dir,
            delay_between_papers_secs,
            agent_timeout_secs,
            download_settle_secs,
            template_settle_secs,
            paper_extensions,
            supplementary_extensions,
            resume_filter,
            helpers,
            login,
        } = file;

        if let Some(value) = ledger {
            self.ledger = value;
        }
        if let Some(value) = html_dir {
            self.html_dir = value;
        }
        if let Some(value) = paper_dir {
            self.paper_dir = value;
        }
        if let Some(value) = supplementary_dir {
            self.supplementary_dir = value;
        }
        if let Some(value) = rules_dir {
            self.rules_dir = value;
        }
        if let Some(secs) = delay_between_papers_secs {
            self.delay_between_papers = Duration::from_secs(secs);
        }
        if let Some(secs) = agent_timeout_secs {
            self.agent_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = download_settle_secs {
            self.download_settle = Duration::from_secs(secs);
        }
        if let Some(secs) = template_settle_secs {
            self.template_settle = Duration::from_secs(secs);
        }
        if let Some(value) = paper_extensions {
            self.paper_extensions = value;
        }
        if let Some(value) = supplementary_extensions {
            self.supplementary_extensions = value;
        }
        if let Some(value) = resume_filter {
            self.resume_filter = value;
        }
        self.helpers = helpers;
        self.login = login;
    }

    /// Orchestrator timing derived from this config.
    #[must_use]
    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            delay_between_items: self.delay_between_papers,
            agent_timeout: self.agent_timeout,
            download_settle: self.download_settle,
            template_settle: self.template_settle,
            resume_filter: self.resume_filter,
        }
    }

    /// Download folder and accepted extensions for `kind`.
    #[must_use]
    pub fn download_folder(&self, kind: ArtifactKind) -> DownloadFolder {
        match kind {
            ArtifactKind::Paper => DownloadFolder::new(&self.paper_dir, &self.paper_extensions),
            ArtifactKind::Supplementary => {
                DownloadFolder::new(&self.supplementary_dir, &self.supplementary_extensions)
            }
        }
    }

    /// Login registry built from the `[login]` table.
    #[must_use]
    pub fn login_registry(&self) -> LoginRegistry {
        let mut registry = LoginRegistry::new(self.agent_timeout);
        for (domain, argv) in &self.login {
            if let Some(command) = HelperCommand::from_argv(argv) {
                registry.register(domain.clone(), LoginStrategy::Command(command));
            }
        }
        registry
    }

    /// Builds the helper-backed agents for an acquisition pass over `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingHelper`] if a required helper is absent.
    pub fn agents(&self, kind: ArtifactKind) -> Result<Agents, ConfigError> {
        let open = required_helper("open", self.helpers.open.as_deref())?;
        let download = HelperDownloadAgent::new(
            open.clone(),
            self.download_folder(kind),
            self.agent_timeout,
        )
        .with_save(optional_helper(self.helpers.save.as_deref()))
        .with_reset(optional_helper(self.helpers.reset.as_deref()));

        let render = HelperRenderAgent::new(
            open,
            required_helper("current_url", self.helpers.current_url.as_deref())?,
            required_helper("capture", self.helpers.capture.as_deref())?,
            self.agent_timeout,
        );

        Ok(Agents {
            render: Arc::new(render),
            download: Arc::new(download),
            login: Arc::new(self.login_registry()),
        })
    }
}

fn required_helper(
    name: &'static str,
    argv: Option<&[String]>,
) -> Result<HelperCommand, ConfigError> {
    argv.and_then(HelperCommand::from_argv)
        .ok_or(ConfigError::MissingHelper { name })
}

fn optional_helper(argv: Option<&[String]>) -> Option<HelperCommand> {
    argv.and_then(HelperCommand::from_argv)
}

/// Config file contents and where they came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path, if any base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a file was found.
    pub config: Option<FileConfig>,
}

impl LoadedConfig {
    /// Returns true when a file was read.
    #[must_use]
    pub fn loaded_from_file(&self) -> bool {
        self.config.is_some()
    }
}

/// Loads the config file.
///
/// An `explicit` path must exist. Without one, the default path is used when
/// present and silently skipped otherwise.
///
/// # Errors
///
/// Returns [`ConfigError`] if a file is present but cannot be read or is invalid.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    if let Some(path) = explicit {
        return Ok(LoadedConfig {
            path: Some(path.to_path_buf()),
            config: Some(FileConfig::load(path)?),
        });
    }

    let path = resolve_default_config_path();
    let config = match path.as_deref() {
        Some(path) if path.exists() => Some(FileConfig::load(path)?),
        Some(path) => {
            debug!(path = %path.display(), "no config file; using defaults");
            None
        }
        None => None,
    };
    Ok(LoadedConfig { path, config })
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/paperdownload/config.toml`
/// 2. `$HOME/.config/paperdownload/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join(APP_CONFIG_DIR)
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(APP_CONFIG_DIR)
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(text: &str) -> Result<FileConfig, ConfigError> {
        FileConfig::from_toml_str(Path::new("config.toml"), text)
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.ledger, PathBuf::from("papers.csv"));
        assert_eq!(config.delay_between_papers, Duration::from_secs(60));
        assert_eq!(config.agent_timeout, Duration::from_secs(40));
        assert_eq!(config.paper_extensions, vec!["pdf".to_string()]);
        assert_eq!(config.supplementary_extensions.len(), 4);
        assert_eq!(config.resume_filter, ResumeFilter::SkipCompleted);
    }

    #[test]
    fn test_file_values_and_overrides_layer_in_order() {
        let file = parse(
            r#"
            ledger = "from-file.csv"
            delay_between_papers_secs = 30
            template_settle_secs = 2
            resume_filter = "legacy"

            [helpers]
            open = ["browser", "{url}"]

            [login]
            "pubs.acs.org" = ["login", "{domain}"]
            "#,
        )
        .unwrap();
        let overrides = ConfigOverrides {
            ledger: Some(PathBuf::from("from-cli.csv")),
            ..ConfigOverrides::default()
        };

        let config = AppConfig::resolve(Some(file), &overrides);
        assert_eq!(config.ledger, PathBuf::from("from-cli.csv"));
        assert_eq!(config.delay_between_papers, Duration::from_secs(30));
        assert_eq!(config.template_settle, Duration::from_secs(2));
        assert_eq!(config.download_settle, Duration::from_secs(40));
        assert_eq!(config.resume_filter, ResumeFilter::Legacy);
        assert_eq!(config.login_registry().len(), 1);
        assert_eq!(
            config.orchestrator_settings().delay_between_items,
            Duration::from_secs(30)
        );
    }

    #[test]
    fn test_validate_rejects_out_of_range_timeout() {
        let err = parse("agent_timeout_secs = 0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "agent_timeout_secs",
                ..
            }
        ));
    }

    #[test]
    fn test_validate_rejects_empty_helper_argv() {
        let err = parse("[helpers]\nopen = []").unwrap_err();
        assert!(err.to_string().contains("helpers.open"));
    }

    #[test]
    fn test_unknown_key_is_parse_error() {
        let err = parse("concurrency = 4").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_agents_require_render_helpers() {
        let config = AppConfig::default();
        let err = config.agents(ArtifactKind::Paper).err().unwrap();
        assert!(matches!(err, ConfigError::MissingHelper { name: "open" }));
    }

    #[test]
    fn test_agents_build_from_helpers() {
        let file = parse(
            r#"
            [helpers]
            open = ["browser", "{url}"]
            current_url = ["browser", "url"]
            capture = ["browser", "capture"]
            "#,
        )
        .unwrap();
        let config = AppConfig::resolve(Some(file), &ConfigOverrides::default());
        assert!(config.agents(ArtifactKind::Supplementary).is_ok());
    }

    #[test]
    fn test_load_config_explicit_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "rules_dir = \"my-rules\"\n").unwrap();

        let loaded = load_config(Some(&path)).unwrap();
        assert!(loaded.loaded_from_file());
        assert_eq!(
            loaded.config.unwrap().rules_dir,
            Some(PathBuf::from("my-rules"))
        );

        let missing = load_config(Some(&dir.path().join("absent.toml")));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }
}
