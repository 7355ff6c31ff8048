//! In-memory collaborators shared by the integration tests.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use paperdownload_core::ledger::columns;
use paperdownload_core::{
    AgentError, Agents, DownloadAgent, FolderSnapshot, LoginAgent, RenderAgent, RenderedPage,
    SaveHint,
};

/// Render agent that always lands on one URL with one page.
pub struct FakeRender {
    pub final_url: String,
    pub captured_url: Option<String>,
    pub html: String,
    pub fail_open: bool,
    pub opened: Mutex<Vec<String>>,
}

impl FakeRender {
    pub fn new(final_url: &str, html: &str) -> Self {
        Self {
            final_url: final_url.to_string(),
            captured_url: None,
            html: html.to_string(),
            fail_open: false,
            opened: Mutex::new(Vec::new()),
        }
    }

    /// Capture reports a different URL than the address bar did.
    pub fn with_captured_url(mut self, url: &str) -> Self {
        self.captured_url = Some(url.to_string());
        self
    }

    pub fn failing() -> Self {
        Self {
            fail_open: true,
            ..Self::new("", "")
        }
    }
}

#[async_trait]
impl RenderAgent for FakeRender {
    async fn open_doi(&self, doi: &str) -> Result<(), AgentError> {
        if self.fail_open {
            return Err(AgentError::failed("open_doi", "resolver unreachable"));
        }
        self.opened.lock().unwrap().push(doi.to_string());
        Ok(())
    }

    async fn current_url(&self) -> Result<String, AgentError> {
        Ok(self.final_url.clone())
    }

    async fn resolve_page(&self, _doi: &str) -> Result<RenderedPage, AgentError> {
        Ok(RenderedPage {
            html: self.html.clone(),
            final_url: self
                .captured_url
                .clone()
                .unwrap_or_else(|| self.final_url.clone()),
        })
    }
}

/// Download agent whose folder gains `file_name` on the given open call.
pub struct FakeDownload {
    pub file_name: String,
    pub produce_on_open: Option<u32>,
    pub files: Mutex<BTreeSet<String>>,
    pub opens: AtomicU32,
    pub saves: AtomicU32,
    pub resets: AtomicU32,
    pub opened_urls: Mutex<Vec<String>>,
    pub hints: Mutex<Vec<SaveHint>>,
}

impl FakeDownload {
    pub fn producing_on(attempt: u32, file_name: &str) -> Self {
        Self {
            file_name: file_name.to_string(),
            produce_on_open: Some(attempt),
            ..Self::never()
        }
    }

    pub fn never() -> Self {
        Self {
            file_name: String::new(),
            produce_on_open: None,
            files: Mutex::new(BTreeSet::from(["already-there.pdf".to_string()])),
            opens: AtomicU32::new(0),
            saves: AtomicU32::new(0),
            resets: AtomicU32::new(0),
            opened_urls: Mutex::new(Vec::new()),
            hints: Mutex::new(Vec::new()),
        }
    }

    pub fn opens(&self) -> u32 {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn saves(&self) -> u32 {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn resets(&self) -> u32 {
        self.resets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DownloadAgent for FakeDownload {
    async fn snapshot(&self) -> Result<FolderSnapshot, AgentError> {
        Ok(FolderSnapshot::from_names(self.files.lock().unwrap().iter().cloned()))
    }

    async fn open(&self, url: &str) -> Result<(), AgentError> {
        let count = self.opens.fetch_add(1, Ordering::SeqCst) + 1;
        self.opened_urls.lock().unwrap().push(url.to_string());
        if self.produce_on_open == Some(count) {
            self.files.lock().unwrap().insert(self.file_name.clone());
        }
        Ok(())
    }

    async fn trigger_save_interaction(&self, hint: &SaveHint) -> Result<(), AgentError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.hints.lock().unwrap().push(hint.clone());
        Ok(())
    }

    async fn list_new_file_since(
        &self,
        snapshot: &FolderSnapshot,
    ) -> Result<Option<String>, AgentError> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .iter()
            .find(|name| !snapshot.contains(name))
            .cloned())
    }

    async fn reset_surface(&self) -> Result<(), AgentError> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Login agent that records the domains it was asked for.
#[derive(Default)]
pub struct FakeLogin {
    pub domains: Mutex<Vec<String>>,
    pub fail: bool,
}

#[async_trait]
impl LoginAgent for FakeLogin {
    async fn perform_login(&self, domain: &str) -> Result<(), AgentError> {
        self.domains.lock().unwrap().push(domain.to_string());
        if self.fail {
            return Err(AgentError::failed("login", "bad credentials"));
        }
        Ok(())
    }
}

pub fn agents(
    render: &Arc<FakeRender>,
    download: &Arc<FakeDownload>,
    login: &Arc<FakeLogin>,
) -> Agents {
    Agents {
        render: Arc::clone(render) as Arc<dyn RenderAgent>,
        download: Arc::clone(download) as Arc<dyn DownloadAgent>,
        login: Arc::clone(login) as Arc<dyn LoginAgent>,
    }
}

/// Writes a ledger with the standard header and one row per `(doi, status)`.
pub fn write_ledger(path: &Path, rows: &[(&str, &str)]) {
    let mut text = columns::STANDARD.join(",");
    text.push('\n');
    for (doi, status) in rows {
        let mut cells = vec![String::new(); columns::STANDARD.len()];
        cells[0] = (*doi).to_string();
        cells[1] = (*status).to_string();
        text.push_str(&cells.join(","));
        text.push('\n');
    }
    std::fs::write(path, text).unwrap();
}
