//! services/portal/src/app/intake.rs
//!
//! This module contains the asynchronous "worker" that turns a bulk file selection
//! into stored documents.
//!
//! Files are parsed and stored with bounded parallelism. Each file gets exactly one
//! outcome, in the order the files were given, and one bad file never stops the
//! batch. Progress is published on a `watch` channel and the whole job can be
//! cancelled through a `CancellationToken`; files not yet started when the token
//! fires are reported as `Cancelled`.

use bytes::Bytes;
use docuhub_core::domain::NewDocument;
use docuhub_core::filename::parse_filename;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::app::documents::DocumentRepository;
use crate::error::PortalError;

/// One selected file: its name and raw bytes.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub filename: String,
    pub content: Bytes,
}

impl IncomingFile {
    pub fn new(filename: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IntakeOutcome {
    Stored { document_id: Uuid, owner_id: String },
    ParseFailed { reason: String },
    DuplicateSkipped,
    Failed { reason: String },
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntakeItem {
    pub filename: String,
    pub outcome: IntakeOutcome,
}

/// Running totals for a job. `completed` counts every outcome, whatever its kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IntakeProgress {
    pub total: usize,
    pub completed: usize,
    pub stored: usize,
    pub duplicates: usize,
    pub rejected: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl IntakeProgress {
    fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    fn record(&mut self, outcome: &IntakeOutcome) {
        self.completed += 1;
        match outcome {
            IntakeOutcome::Stored { .. } => self.stored += 1,
            IntakeOutcome::ParseFailed { .. } => self.rejected += 1,
            IntakeOutcome::DuplicateSkipped => self.duplicates += 1,
            IntakeOutcome::Failed { .. } => self.failed += 1,
            IntakeOutcome::Cancelled => self.cancelled += 1,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.completed == self.total
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntakeReport {
    pub items: Vec<IntakeItem>,
}

impl IntakeReport {
    pub fn stored_ids(&self) -> Vec<Uuid> {
        self.items
            .iter()
            .filter_map(|item| match item.outcome {
                IntakeOutcome::Stored { document_id, .. } => Some(document_id),
                _ => None,
            })
            .collect()
    }

    pub fn summary(&self) -> IntakeProgress {
        let mut progress = IntakeProgress::new(self.items.len());
        for item in &self.items {
            progress.record(&item.outcome);
        }
        progress
    }
}

/// A running intake job.
pub struct IntakeJob {
    progress: watch::Receiver<IntakeProgress>,
    cancel: CancellationToken,
    handle: JoinHandle<IntakeReport>,
}

impl IntakeJob {
    /// Stops starting new files. Files already being stored finish normally.
    pub fn cancel(&self) {
        info!("Intake cancellation requested");
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn progress(&self) -> watch::Receiver<IntakeProgress> {
        self.progress.clone()
    }

    pub fn snapshot(&self) -> IntakeProgress {
        *self.progress.borrow()
    }

    pub async fn wait(self) -> Result<IntakeReport, PortalError> {
        self.handle
            .await
            .map_err(|e| PortalError::Internal(format!("Intake task failed: {}", e)))
    }
}

#[derive(Clone)]
pub struct FileIntake {
    documents: DocumentRepository,
    concurrency: usize,
}

impl FileIntake {
    pub fn new(documents: DocumentRepository, concurrency: usize) -> Self {
        Self {
            documents,
            concurrency: concurrency.max(1),
        }
    }

    /// Spawns the job on the current tokio runtime and returns immediately.
    pub fn start(&self, files: Vec<IncomingFile>) -> IntakeJob {
        let total = files.len();
        let (progress_tx, progress_rx) = watch::channel(IntakeProgress::new(total));
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let documents = self.documents.clone();
        let concurrency = self.concurrency;
        info!("Intake of {} file(s) started (concurrency {})", total, concurrency);

        let handle = tokio::spawn(async move {
            let items: Vec<IntakeItem> = stream::iter(files)
                .map(|file| {
                    let documents = documents.clone();
                    let token = token.clone();
                    async move { intake_file(&documents, file, &token).await }
                })
                .buffered(concurrency)
                .inspect(|item| progress_tx.send_modify(|p| p.record(&item.outcome)))
                .collect()
                .await;

            let report = IntakeReport { items };
            let summary = report.summary();
            info!(
                "Intake finished: {} stored, {} duplicate(s), {} rejected, {} failed, {} cancelled",
                summary.stored, summary.duplicates, summary.rejected, summary.failed, summary.cancelled
            );
            report
        });

        IntakeJob {
            progress: progress_rx,
            cancel,
            handle,
        }
    }

    /// Starts a job and waits for its report.
    pub async fn run(&self, files: Vec<IncomingFile>) -> Result<IntakeReport, PortalError> {
        self.start(files).wait().await
    }
}

async fn intake_file(
    documents: &DocumentRepository,
    file: IncomingFile,
    token: &CancellationToken,
) -> IntakeItem {
    if token.is_cancelled() {
        return IntakeItem {
            filename: file.filename,
            outcome: IntakeOutcome::Cancelled,
        };
    }

    let outcome = match parse_filename(&file.filename) {
        Err(e) => {
            warn!("Rejected '{}': {}", file.filename, e);
            IntakeOutcome::ParseFailed {
                reason: e.to_string(),
            }
        }
        Ok(parsed) => {
            let candidate = NewDocument {
                owner_id: parsed.owner_id,
                category: parsed.category,
                period: parsed.period,
                original_filename: file.filename.clone(),
                content: file.content,
            };
            match documents.ingest_one(candidate).await {
                Ok(Some(document)) => IntakeOutcome::Stored {
                    document_id: document.id,
                    owner_id: document.owner_id,
                },
                Ok(None) => IntakeOutcome::DuplicateSkipped,
                Err(e) => {
                    error!("Failed to store '{}': {:?}", file.filename, e);
                    IntakeOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            }
        }
    };

    IntakeItem {
        filename: file.filename,
        outcome,
    }
}
