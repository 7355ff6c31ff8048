//! Paper Download Core Library
//!
//! Resumable acquisition of scholarly papers and their supplementary material
//! from a CSV ledger of DOIs, driven through an external browser.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`rules`] - Per-domain rule stores and the exact/base-domain cascade
//! - [`ledger`] - CSV ledger of per-DOI state and the captured-page archive
//! - [`extract`] - Keyword-driven document link extraction
//! - [`agent`] - Browser collaborator traits and helper-program adapters
//! - [`orchestrator`] - Per-DOI acquisition state machine
//! - [`config`] - Layered application configuration

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod agent;
pub mod config;
pub mod extract;
pub mod ledger;
pub mod orchestrator;
pub mod rules;

// Re-export commonly used types
pub use agent::{
    AgentError, DownloadAgent, DownloadFolder, FolderSnapshot, LoginAgent, RenderAgent,
    RenderedPage, SaveHint,
};
pub use config::{AppConfig, ConfigError, ConfigOverrides, FileConfig};
pub use extract::{Extraction, LinkExtractor, Strategy};
pub use ledger::{
    ArtifactKind, Ledger, LedgerError, LedgerFields, PageArchive, PaperRecord, PaperStatus,
    ResumeFilter, UpdateOutcome,
};
pub use orchestrator::{
    AcquisitionOrchestrator, Agents, FailureKind, ItemOutcome, OrchestratorSettings, RunSummary,
};
pub use rules::{RuleBook, resolve, resolve_optional};
