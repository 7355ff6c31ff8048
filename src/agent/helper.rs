//! Agents backed by external helper programs.
//!
//! Each operation maps to a configured argv. Placeholders in the arguments
//! (`{doi}`, `{url}`, `{domain}`, `{filename}`, `{click}`, `{dir}`) are
//! substituted per call. Helpers report through their exit status and stdout.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument};

use super::{
    AgentError, DownloadAgent, DownloadFolder, FolderSnapshot, RenderAgent, RenderedPage,
    SaveHint, bounded,
};

/// Base URL used to resolve DOIs.
pub const DOI_RESOLVER: &str = "https://doi.org/";

/// One helper program invocation template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperCommand {
    program: String,
    args: Vec<String>,
}

impl HelperCommand {
    /// Builds a command from a configured argv; `None` when it is empty.
    #[must_use]
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        if program.trim().is_empty() {
            return None;
        }
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    /// Program name.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    fn render_args(&self, substitutions: &[(&str, &str)]) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                substitutions
                    .iter()
                    .fold(arg.clone(), |acc, (placeholder, value)| {
                        acc.replace(placeholder, value)
                    })
            })
            .collect()
    }

    /// Runs the helper and returns its stdout.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Failed`] if the program cannot be spawned or
    /// exits unsuccessfully.
    pub async fn run(
        &self,
        operation: &'static str,
        substitutions: &[(&str, &str)],
    ) -> Result<String, AgentError> {
        let args = self.render_args(substitutions);
        debug!(operation, program = %self.program, ?args, "running helper");
        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|error| AgentError::failed(operation, format!("{}: {error}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AgentError::failed(
                operation,
                format!("{} exited with {}: {}", self.program, output.status, stderr.trim()),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// [`RenderAgent`] that drives a browser through helper programs.
///
/// `capture` must print the final URL on its first line and the page text
/// after it.
#[derive(Debug, Clone)]
pub struct HelperRenderAgent {
    open: HelperCommand,
    current_url: HelperCommand,
    capture: HelperCommand,
    timeout: Duration,
}

impl HelperRenderAgent {
    /// Creates the agent; every call is bounded by `timeout`.
    #[must_use]
    pub fn new(
        open: HelperCommand,
        current_url: HelperCommand,
        capture: HelperCommand,
        timeout: Duration,
    ) -> Self {
        Self {
            open,
            current_url,
            capture,
            timeout,
        }
    }
}

#[async_trait]
impl RenderAgent for HelperRenderAgent {
    #[instrument(skip(self))]
    async fn open_doi(&self, doi: &str) -> Result<(), AgentError> {
        let url = format!("{DOI_RESOLVER}{doi}");
        bounded(
            "open_doi",
            self.timeout,
            self.open.run("open_doi", &[("{doi}", doi), ("{url}", url.as_str())]),
        )
        .await
        .map(|_| ())
    }

    async fn current_url(&self) -> Result<String, AgentError> {
        let stdout = bounded(
            "current_url",
            self.timeout,
            self.current_url.run("current_url", &[]),
        )
        .await?;
        let url = stdout.lines().next().unwrap_or_default().trim();
        if url.is_empty() {
            return Err(AgentError::Empty {
                operation: "current_url",
            });
        }
        Ok(url.to_string())
    }

    #[instrument(skip(self))]
    async fn resolve_page(&self, doi: &str) -> Result<RenderedPage, AgentError> {
        let url = format!("{DOI_RESOLVER}{doi}");
        let stdout = bounded(
            "resolve_page",
            self.timeout,
            self.capture.run("resolve_page", &[("{doi}", doi), ("{url}", url.as_str())]),
        )
        .await?;
        parse_capture(&stdout)
    }
}

fn parse_capture(stdout: &str) -> Result<RenderedPage, AgentError> {
    let (first, rest) = stdout.split_once('\n').unwrap_or((stdout, ""));
    let final_url = first.trim();
    if final_url.is_empty() || rest.trim().is_empty() {
        return Err(AgentError::Empty {
            operation: "resolve_page",
        });
    }
    Ok(RenderedPage {
        html: rest.to_string(),
        final_url: final_url.to_string(),
    })
}

/// [`DownloadAgent`] that opens links through a helper and watches a folder.
#[derive(Debug, Clone)]
pub struct HelperDownloadAgent {
    open: HelperCommand,
    save: Option<HelperCommand>,
    reset: Option<HelperCommand>,
    folder: DownloadFolder,
    timeout: Duration,
}

impl HelperDownloadAgent {
    /// Creates the agent; every helper call is bounded by `timeout`.
    #[must_use]
    pub fn new(open: HelperCommand, folder: DownloadFolder, timeout: Duration) -> Self {
        Self {
            open,
            save: None,
            reset: None,
            folder,
            timeout,
        }
    }

    /// Sets the helper that performs the manual-save interaction.
    #[must_use]
    pub fn with_save(mut self, save: Option<HelperCommand>) -> Self {
        self.save = save;
        self
    }

    /// Sets the helper that closes tabs and browser processes.
    #[must_use]
    pub fn with_reset(mut self, reset: Option<HelperCommand>) -> Self {
        self.reset = reset;
        self
    }

    /// Watched download folder.
    #[must_use]
    pub fn folder(&self) -> &DownloadFolder {
        &self.folder
    }
}

#[async_trait]
impl DownloadAgent for HelperDownloadAgent {
    async fn snapshot(&self) -> Result<FolderSnapshot, AgentError> {
        self.folder
            .snapshot()
            .await
            .map_err(|error| AgentError::failed("snapshot", error.to_string()))
    }

    #[instrument(skip(self))]
    async fn open(&self, url: &str) -> Result<(), AgentError> {
        bounded(
            "open",
            self.timeout,
            self.open.run("open", &[("{url}", url)]),
        )
        .await
        .map(|_| ())
    }

    async fn trigger_save_interaction(&self, hint: &SaveHint) -> Result<(), AgentError> {
        let Some(save) = &self.save else {
            return Err(AgentError::NotConfigured {
                operation: "save_interaction",
            });
        };
        let click = hint.click_target.to_string();
        let dir = self.folder.dir().display().to_string();
        bounded(
            "save_interaction",
            self.timeout,
            save.run(
                "save_interaction",
                &[
                    ("{filename}", hint.filename.as_str()),
                    ("{click}", click.as_str()),
                    ("{dir}", dir.as_str()),
                ],
            ),
        )
        .await
        .map(|_| ())
    }

    async fn list_new_file_since(
        &self,
        snapshot: &FolderSnapshot,
    ) -> Result<Option<String>, AgentError> {
        self.folder
            .new_file_since(snapshot)
            .await
            .map_err(|error| AgentError::failed("list_new_file", error.to_string()))
    }

    async fn reset_surface(&self) -> Result<(), AgentError> {
        let Some(reset) = &self.reset else {
            return Ok(());
        };
        bounded("reset_surface", self.timeout, reset.run("reset_surface", &[]))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn argv(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| (*value).to_string()).collect()
    }

    #[test]
    fn test_from_argv_rejects_empty() {
        assert!(HelperCommand::from_argv(&[]).is_none());
        assert!(HelperCommand::from_argv(&argv(&[" "])).is_none());
        assert_eq!(
            HelperCommand::from_argv(&argv(&["browser", "{url}"])).unwrap().program(),
            "browser"
        );
    }

    #[test]
    fn test_render_args_substitutes_placeholders() {
        let command = HelperCommand::from_argv(&argv(&["x", "--doi={doi}", "{url}", "plain"])).unwrap();
        let args = command.render_args(&[("{doi}", "10.1/a"), ("{url}", "https://doi.org/10.1/a")]);
        assert_eq!(args, argv(&["--doi=10.1/a", "https://doi.org/10.1/a", "plain"]));
    }

    #[test]
    fn test_parse_capture_splits_url_and_page() {
        let page = parse_capture("https://x.org/a\n<html>body</html>\n").unwrap();
        assert_eq!(page.final_url, "https://x.org/a");
        assert_eq!(page.html, "<html>body</html>\n");
        assert!(parse_capture("https://x.org/a").is_err());
        assert!(parse_capture("\n<html>").is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_helper_run_reports_exit_status() {
        let ok = HelperCommand::from_argv(&argv(&["sh", "-c", "printf '%s' \"$0\"", "{doi}"])).unwrap();
        assert_eq!(ok.run("echo", &[("{doi}", "10.1/a")]).await.unwrap(), "10.1/a");

        let failing = HelperCommand::from_argv(&argv(&["sh", "-c", "echo nope >&2; exit 3"])).unwrap();
        let err = failing.run("fail", &[]).await.unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_helper_render_agent_current_url() {
        let echo = |text: &str| HelperCommand::from_argv(&argv(&["echo", text])).unwrap();
        let agent = HelperRenderAgent::new(
            echo("opened"),
            echo("https://pubs.acs.org/doi/10.1/a"),
            echo("unused"),
            Duration::from_secs(5),
        );
        agent.open_doi("10.1/a").await.unwrap();
        assert_eq!(
            agent.current_url().await.unwrap(),
            "https://pubs.acs.org/doi/10.1/a"
        );
        assert!(agent.resolve_page("10.1/a").await.is_err());
    }
}
