//! Per-DOI acquisition state machine.
//!
//! # Overview
//!
//! For each pending ledger record the orchestrator walks:
//!
//! `Pending → UrlResolved → (login) → HtmlCaptured → branch →
//! {template | extraction} → LinkExtracted → Success | Failed | NoDocument`
//!
//! - The captured page and landing URL are committed to the ledger before
//!   branching, so an interrupted item resumes at the branch.
//! - The extracted link is committed before downloading, so an interrupted
//!   item resumes at the download loop.
//! - Every terminal state is written exactly once.
//! - The download surface is reset after every item, whatever the outcome.
//!
//! Items are processed strictly one at a time with a fixed delay between
//! them. Per-item failures never abort the run.

mod attempt;
mod outcome;

pub use attempt::{AttemptPlan, DownloadOutcome, run_attempts};
pub use outcome::{FailureKind, ItemOutcome, RunSummary};

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use indicatif::ProgressBar;
use tracing::{debug, info, warn};
use url::Url;

use crate::agent::{DownloadAgent, LoginAgent, RenderAgent, SaveHint, bounded};
use crate::extract::{Extraction, LinkExtractor, Strategy};
use crate::ledger::{
    ArtifactKind, Ledger, LedgerFields, PageArchive, PaperRecord, PaperStatus, ResumeFilter,
    UpdateOutcome, columns,
};
use crate::rules::{KeywordEntry, RuleBook};

/// Default delay between consecutive DOIs.
pub const DEFAULT_DELAY_BETWEEN_ITEMS: Duration = Duration::from_secs(60);
/// Default upper bound for one collaborator call.
pub const DEFAULT_AGENT_TIMEOUT: Duration = Duration::from_secs(40);
/// Interrupt polling interval during the inter-item delay.
const INTERRUPT_POLL: Duration = Duration::from_millis(250);
/// Default wait for an extracted link's download when no save interaction runs.
pub const DEFAULT_DOWNLOAD_SETTLE: Duration = Duration::from_secs(40);
/// Default wait after opening a template link, before any save interaction.
pub const DEFAULT_TEMPLATE_SETTLE: Duration = Duration::from_secs(5);

/// Timing and selection knobs for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorSettings {
    /// Pause between consecutive items.
    pub delay_between_items: Duration,
    /// Upper bound for each collaborator call.
    pub agent_timeout: Duration,
    /// Wait for an extracted link's download when no save interaction runs.
    pub download_settle: Duration,
    /// Wait after opening a template link, before any save interaction.
    pub template_settle: Duration,
    /// Which records after the resume cursor are processed.
    pub resume_filter: ResumeFilter,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            delay_between_items: DEFAULT_DELAY_BETWEEN_ITEMS,
            agent_timeout: DEFAULT_AGENT_TIMEOUT,
            download_settle: DEFAULT_DOWNLOAD_SETTLE,
            template_settle: DEFAULT_TEMPLATE_SETTLE,
            resume_filter: ResumeFilter::default(),
        }
    }
}

/// External collaborators used by the orchestrator.
#[derive(Clone)]
pub struct Agents {
    /// Resolves DOIs and captures pages.
    pub render: Arc<dyn RenderAgent>,
    /// Opens links and watches the download folder.
    pub download: Arc<dyn DownloadAgent>,
    /// Performs publisher logins.
    pub login: Arc<dyn LoginAgent>,
}

struct CapturedPage {
    final_url: String,
    domain: String,
    html: String,
}

/// Drives acquisition of one artifact kind over a ledger.
pub struct AcquisitionOrchestrator {
    kind: ArtifactKind,
    rules: RuleBook,
    extractor: LinkExtractor,
    agents: Agents,
    archive: PageArchive,
    settings: OrchestratorSettings,
    interrupted: Arc<AtomicBool>,
    progress: ProgressBar,
}

impl AcquisitionOrchestrator {
    /// Creates an orchestrator for `kind`.
    #[must_use]
    pub fn new(
        kind: ArtifactKind,
        rules: RuleBook,
        agents: Agents,
        archive: PageArchive,
        settings: OrchestratorSettings,
    ) -> Self {
        let keywords = match kind {
            ArtifactKind::Paper => rules.paper_keywords.clone(),
            ArtifactKind::Supplementary => rules.supplementary_keywords.clone(),
        };
        Self {
            kind,
            extractor: LinkExtractor::new(keywords, kind),
            rules,
            agents,
            archive,
            settings,
            interrupted: Arc::new(AtomicBool::new(false)),
            progress: ProgressBar::hidden(),
        }
    }

    /// Sets the extensions that mark supplementary document links.
    #[must_use]
    pub fn with_document_extensions(mut self, extensions: &[String]) -> Self {
        self.extractor = self.extractor.with_document_extensions(extensions);
        self
    }

    /// Shares an interrupt flag checked between items.
    #[must_use]
    pub fn with_interrupt_flag(mut self, interrupted: Arc<AtomicBool>) -> Self {
        self.interrupted = interrupted;
        self
    }

    /// Reports progress on `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Processes every selected record in `ledger`.
    pub async fn run(&self, ledger: &mut Ledger) -> RunSummary {
        let records = match self.kind {
            ArtifactKind::Paper => ledger.load(self.settings.resume_filter),
            ArtifactKind::Supplementary => ledger.load_supplementary(),
        };
        let mut summary = RunSummary::new(records.len());
        self.progress
            .set_length(u64::try_from(records.len()).unwrap_or(u64::MAX));
        info!(kind = %self.kind, total = records.len(), "acquisition run starting");

        for (index, record) in records.iter().enumerate() {
            if self.interrupted.load(Ordering::SeqCst) {
                warn!(
                    processed = summary.processed,
                    "interrupt received; stopping after the last committed item"
                );
                summary.interrupted = true;
                break;
            }

            self.progress.set_message(record.doi.clone());
            let outcome = self.process(ledger, record).await;
            summary.record(&outcome);
            self.progress.inc(1);

            if index + 1 < records.len() && outcome != ItemOutcome::Skipped {
                debug!(
                    delay_secs = self.settings.delay_between_items.as_secs(),
                    "waiting before next DOI"
                );
                if self.wait_unless_interrupted(self.settings.delay_between_items).await {
                    warn!(
                        processed = summary.processed,
                        "interrupt received during delay; stopping"
                    );
                    summary.interrupted = true;
                    break;
                }
            }
        }

        self.progress.finish_and_clear();
        info!(
            kind = %self.kind,
            succeeded = summary.succeeded,
            total = summary.total,
            failed = summary.failed,
            no_document = summary.no_document,
            skipped = summary.skipped,
            "acquisition run complete: {} of {} succeeded",
            summary.succeeded,
            summary.total
        );
        summary
    }

    /// Processes one record and resets the download surface afterwards.
    pub async fn process(&self, ledger: &mut Ledger, record: &PaperRecord) -> ItemOutcome {
        let doi = record.doi.as_str();
        let status = record.status_of(self.kind);
        let complete = match self.kind {
            ArtifactKind::Paper => status == PaperStatus::Success,
            ArtifactKind::Supplementary => {
                matches!(status, PaperStatus::Success | PaperStatus::NoDocument)
            }
        };
        if complete {
            info!(doi, kind = %self.kind, status = %status, "already complete; skipping");
            return ItemOutcome::Skipped;
        }

        info!(doi, kind = %self.kind, status = %status, "processing");
        let outcome = match self.kind {
            ArtifactKind::Paper => self.acquire_paper(ledger, record).await,
            ArtifactKind::Supplementary => self.acquire_supplementary(ledger, record).await,
        };

        if let Err(error) = bounded(
            "reset_surface",
            self.settings.agent_timeout,
            self.agents.download.reset_surface(),
        )
        .await
        {
            warn!(doi, error = %error, "download surface reset failed");
        }
        outcome
    }

    async fn acquire_paper(&self, ledger: &mut Ledger, record: &PaperRecord) -> ItemOutcome {
        let doi = record.doi.as_str();

        if record.status == PaperStatus::LinkExtracted
            && let (Some(link), Some(final_url)) = (&record.download_url, &record.final_url)
            && let Some(domain) = host_of(final_url)
        {
            info!(doi, link = %link, "resuming from extracted link");
            let direct = self.rules.branches.is_direct(&domain);
            return self.download_paper(ledger, doi, &domain, link, direct).await;
        }

        let captured = match self.resume_capture(record) {
            Some(captured) => captured,
            None => match self.capture(ledger, doi).await {
                Ok(captured) => captured,
                Err(kind) => {
                    self.commit(
                        ledger,
                        doi,
                        &LedgerFields::new().status(ArtifactKind::Paper, PaperStatus::Failed),
                    );
                    return ItemOutcome::Failed(kind);
                }
            },
        };
        let CapturedPage {
            final_url,
            domain,
            html,
        } = captured;

        let direct = self.rules.branches.is_direct(&domain);
        let branch = if direct { "template" } else { "extraction" };
        let link = if direct {
            self.rules.templates.synthesize(&domain, doi, &final_url)
        } else {
            match self.extractor.extract(&html, &domain, doi) {
                Extraction::Found { url, .. } => Some(url),
                Extraction::NoDocument(reason) => {
                    info!(doi, domain = %domain, reason = %reason, "extraction found no link");
                    None
                }
            }
        };

        let Some(link) = link else {
            warn!(
                doi,
                domain = %domain,
                branch,
                kind = %FailureKind::NoDocumentFound,
                "no document link"
            );
            self.commit(
                ledger,
                doi,
                &LedgerFields::new().status(ArtifactKind::Paper, PaperStatus::NoDocument),
            );
            return ItemOutcome::NoDocument;
        };

        info!(doi, branch, link = %link, "document link ready");
        self.commit(
            ledger,
            doi,
            &LedgerFields::new().set(columns::DOWNLOAD_URL, link.as_str()),
        );
        self.download_paper(ledger, doi, &domain, &link, direct).await
    }

    async fn capture(&self, ledger: &mut Ledger, doi: &str) -> Result<CapturedPage, FailureKind> {
        let timeout = self.settings.agent_timeout;
        let render = self.agents.render.as_ref();

        let final_url = match bounded("open_doi", timeout, render.open_doi(doi)).await {
            Ok(()) => bounded("current_url", timeout, render.current_url()).await,
            Err(error) => Err(error),
        }
        .map_err(|error| {
            warn!(
                doi,
                error = %error,
                kind = %FailureKind::UrlResolutionFailure,
                "cannot resolve DOI"
            );
            FailureKind::UrlResolutionFailure
        })?;

        let Some(domain) = host_of(&final_url) else {
            warn!(
                doi,
                final_url = %final_url,
                kind = %FailureKind::UrlResolutionFailure,
                "landing URL has no host"
            );
            return Err(FailureKind::UrlResolutionFailure);
        };
        info!(doi, final_url = %final_url, domain = %domain, "landing page resolved");

        if self.rules.logins.requires_login(&domain) {
            match bounded("login", timeout, self.agents.login.perform_login(&domain)).await {
                Ok(()) => info!(doi, domain = %domain, "login performed"),
                Err(error) => {
                    warn!(doi, domain = %domain, error = %error, "login failed; continuing");
                }
            }
        }

        let page = bounded("resolve_page", timeout, render.resolve_page(doi))
            .await
            .map_err(|error| {
                warn!(
                    doi,
                    error = %error,
                    kind = %FailureKind::UrlResolutionFailure,
                    "cannot capture landing page"
                );
                FailureKind::UrlResolutionFailure
            })?;

        let final_url = if page.final_url.is_empty() {
            final_url
        } else {
            page.final_url
        };
        let mut fields = LedgerFields::new().set(columns::URL, final_url.as_str());
        match self.archive.save(&domain, doi, &page.html) {
            Ok(path) => fields = fields.set(columns::HTML_FILE, path.display().to_string()),
            Err(error) => warn!(
                doi,
                error = %error,
                kind = %FailureKind::LedgerWriteFailure,
                "cannot archive captured page"
            ),
        }
        self.commit(ledger, doi, &fields);
        info!(doi, bytes = page.html.len(), "page captured");

        Ok(CapturedPage {
            final_url,
            domain,
            html: page.html,
        })
    }

    fn resume_capture(&self, record: &PaperRecord) -> Option<CapturedPage> {
        if record.status != PaperStatus::HtmlCaptured {
            return None;
        }
        let final_url = record.final_url.clone()?;
        let domain = host_of(&final_url)?;
        let path = record.html_reference.as_deref()?;
        match self.archive.load(path) {
            Ok(html) => {
                info!(doi = %record.doi, path = %path.display(), "resuming from captured page");
                Some(CapturedPage {
                    final_url,
                    domain,
                    html,
                })
            }
            Err(error) => {
                warn!(doi = %record.doi, error = %error, "captured page unavailable; recapturing");
                None
            }
        }
    }

    async fn download_paper(
        &self,
        ledger: &mut Ledger,
        doi: &str,
        domain: &str,
        link: &str,
        direct: bool,
    ) -> ItemOutcome {
        let settings = self.rules.settings.for_domain(domain);
        let plan = AttemptPlan {
            url: link,
            settings,
            use_save_interaction: settings.use_manual_save,
            hint: SaveHint::for_doi(doi, "pdf", self.rules.clicks.target_for(domain)),
            pre_wait: if direct {
                self.settings.template_settle
            } else {
                Duration::ZERO
            },
            settle: if direct {
                Duration::ZERO
            } else {
                self.settings.download_settle
            },
            call_timeout: self.settings.agent_timeout,
        };

        match run_attempts(self.agents.download.as_ref(), &plan).await {
            DownloadOutcome::Downloaded { filename, attempts } => {
                info!(doi, file = %filename, attempts, "paper downloaded");
                self.commit(
                    ledger,
                    doi,
                    &LedgerFields::new()
                        .status(ArtifactKind::Paper, PaperStatus::Success)
                        .set(columns::FILENAME, filename.as_str())
                        .set(columns::DOWNLOAD_URL, link),
                );
                ItemOutcome::Succeeded { filename }
            }
            DownloadOutcome::Exhausted { attempts } => {
                warn!(doi, attempts, link, "paper download failed");
                self.commit(
                    ledger,
                    doi,
                    &LedgerFields::new()
                        .status(ArtifactKind::Paper, PaperStatus::Failed)
                        .set(columns::DOWNLOAD_URL, link),
                );
                ItemOutcome::Failed(FailureKind::PersistentDownloadFailure)
            }
        }
    }

    async fn acquire_supplementary(
        &self,
        ledger: &mut Ledger,
        record: &PaperRecord,
    ) -> ItemOutcome {
        let doi = record.doi.as_str();
        let kind = ArtifactKind::Supplementary;

        let Some(path) = record.html_reference.as_deref() else {
            warn!(doi, "no captured page for supplementary pass");
            return ItemOutcome::Skipped;
        };
        let page = match self.archive.load(path) {
            Ok(page) => page,
            Err(error) => {
                warn!(
                    doi,
                    error = %error,
                    kind = %FailureKind::UrlResolutionFailure,
                    "captured page unreadable"
                );
                self.commit(
                    ledger,
                    doi,
                    &LedgerFields::new().status(kind, PaperStatus::Failed),
                );
                return ItemOutcome::Failed(FailureKind::UrlResolutionFailure);
            }
        };

        let Some(domain) = record
            .final_url
            .as_deref()
            .and_then(host_of)
            .or_else(|| domain_from_archive_name(path))
        else {
            warn!(doi, kind = %FailureKind::RuleNotFound, "cannot determine publisher domain");
            self.commit(
                ledger,
                doi,
                &LedgerFields::new().status(kind, PaperStatus::Failed),
            );
            return ItemOutcome::Failed(FailureKind::RuleNotFound);
        };

        let (link, strategy) = match self.extractor.extract(&page, &domain, doi) {
            Extraction::Found { url, strategy } => (url, strategy),
            Extraction::NoDocument(reason) => {
                info!(doi, domain = %domain, reason = %reason, "no supplementary material");
                self.commit(
                    ledger,
                    doi,
                    &LedgerFields::new().status(kind, PaperStatus::NoDocument),
                );
                return ItemOutcome::NoDocument;
            }
        };

        let settings = self.rules.settings.for_domain(&domain);
        let plan = AttemptPlan {
            url: &link,
            settings,
            use_save_interaction: self
                .extractor
                .rules()
                .entry_for(&domain)
                .is_some_and(KeywordEntry::wants_download),
            hint: SaveHint::for_doi(doi, "si", self.rules.clicks.target_for(&domain)),
            pre_wait: Duration::ZERO,
            settle: self.settings.download_settle,
            call_timeout: self.settings.agent_timeout,
        };

        match run_attempts(self.agents.download.as_ref(), &plan).await {
            DownloadOutcome::Downloaded { filename, attempts } => {
                info!(doi, file = %filename, attempts, "supplementary material downloaded");
                self.commit(
                    ledger,
                    doi,
                    &LedgerFields::new()
                        .status(kind, PaperStatus::Success)
                        .set(columns::SI_FILENAME, filename.as_str()),
                );
                ItemOutcome::Succeeded { filename }
            }
            DownloadOutcome::Exhausted { attempts } if strategy == Strategy::ElsevierEid => {
                info!(doi, attempts, link = %link, "derived asset link not served; recording no document");
                self.commit(
                    ledger,
                    doi,
                    &LedgerFields::new().status(kind, PaperStatus::NoDocument),
                );
                ItemOutcome::NoDocument
            }
            DownloadOutcome::Exhausted { attempts } => {
                warn!(doi, attempts, link = %link, "supplementary download failed");
                self.commit(
                    ledger,
                    doi,
                    &LedgerFields::new().status(kind, PaperStatus::Failed),
                );
                ItemOutcome::Failed(FailureKind::PersistentDownloadFailure)
            }
        }
    }

    /// Sleeps for `total`, returning early with `true` once the interrupt flag is set.
    async fn wait_unless_interrupted(&self, total: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + total;
        loop {
            if self.interrupted.load(Ordering::SeqCst) {
                return true;
            }
            let now = tokio::time::Instant::now();
            if now >= deadline {
                return false;
            }
            tokio::time::sleep((deadline - now).min(INTERRUPT_POLL)).await;
        }
    }

    fn commit(&self, ledger: &mut Ledger, doi: &str, fields: &LedgerFields) {
        match ledger.update(doi, fields) {
            Ok(UpdateOutcome::Applied { .. }) => {}
            Ok(UpdateOutcome::DoiNotFound) => warn!(
                doi,
                kind = %FailureKind::LedgerUpdateMiss,
                "ledger row missing; state not recorded"
            ),
            Ok(UpdateOutcome::RejectedRegression) => {
                warn!(doi, kind = %self.kind, "ledger kept its Success status");
            }
            Err(error) => warn!(
                doi,
                error = %error,
                kind = %FailureKind::LedgerWriteFailure,
                "ledger write failed; continuing"
            ),
        }
    }
}

fn host_of(url: &str) -> Option<String> {
    Url::parse(url.trim())
        .ok()?
        .host_str()
        .filter(|host| !host.is_empty())
        .map(str::to_string)
}

fn domain_from_archive_name(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let (domain, _) = stem.split_once('_')?;
    (!domain.is_empty()).then(|| domain.to_string())
}
