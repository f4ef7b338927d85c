//! Ingestion Tracker: per-file upload records with independent lifecycles.
//!
//! ```text
//! Queued -> Uploading -> Processing -> Completed
//!               \             \
//!                `-> Failed    `-> Failed
//! ```
//!
//! Files are validated before they get a record. Each admitted file runs in
//! its own spawned flow ([`UploadService`]); events come back tagged with the
//! record id and are applied on the event loop via [`IngestionTracker::apply`].

mod pipeline;
mod validation;


use std::collections::HashMap;
use std::fmt;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::constants::{PROCESSING_PROGRESS, UPLOADING_PROGRESS};

pub use pipeline::{SettleMode, UploadEvent, UploadEventReceiver, UploadService};
pub use validation::{format_file_size, AcceptPolicy, AllowedTypes, PendingFile, Rejection};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UploadId(String);

impl UploadId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UploadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UploadId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadStatus {
    Queued,
    Uploading,
    Processing,
    Completed,
    Failed,
}

impl UploadStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, UploadStatus::Completed | UploadStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UploadStatus::Queued => "queued",
            UploadStatus::Uploading => "uploading",
            UploadStatus::Processing => "processing",
            UploadStatus::Completed => "completed",
            UploadStatus::Failed => "failed",
        }
    }

    fn can_move_to(self, next: UploadStatus) -> bool {
        use UploadStatus::*;
        matches!(
            (self, next),
            (Queued, Uploading)
                | (Uploading, Processing)
                | (Processing, Completed)
                | (Uploading, Failed)
                | (Processing, Failed)
        )
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    Illegal {
        from: UploadStatus,
        to: UploadStatus,
    },
    ProgressRegression {
        from: u8,
        to: u8,
    },
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionError::Illegal { from, to } => {
                write!(f, "cannot move an upload from {from} to {to}")
            }
            TransitionError::ProgressRegression { from, to } => {
                write!(f, "progress cannot go back from {from}% to {to}%")
            }
        }
    }
}

impl std::error::Error for TransitionError {}

#[derive(Debug, Clone)]
pub struct UploadRecord {
    id: UploadId,
    filename: String,
    size_bytes: u64,
    status: UploadStatus,
    progress: u8,
    history: Vec<UploadStatus>,
    failure: Option<String>,
    document_id: Option<String>,
}

impl UploadRecord {
    fn queued(file: &PendingFile) -> Self {
        Self {
            id: UploadId::generate(),
            filename: file.filename().to_string(),
            size_bytes: file.size_bytes(),
            status: UploadStatus::Queued,
            progress: 0,
            history: vec![UploadStatus::Queued],
            failure: None,
            document_id: None,
        }
    }

    pub fn id(&self) -> &UploadId {
        &self.id
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn status(&self) -> UploadStatus {
        self.status
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    /// Every status this record has held, oldest first.
    pub fn history(&self) -> &[UploadStatus] {
        &self.history
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn document_id(&self) -> Option<&str> {
        self.document_id.as_deref()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move to `next`. Terminal states force progress to 0 (`Failed`) or 100
    /// (`Completed`); otherwise progress may not decrease.
    pub fn transition(&mut self, next: UploadStatus, progress: u8) -> Result<(), TransitionError> {
        if !self.status.can_move_to(next) {
            return Err(TransitionError::Illegal {
                from: self.status,
                to: next,
            });
        }

        let progress = match next {
            UploadStatus::Completed => 100,
            UploadStatus::Failed => 0,
            _ => progress.min(100),
        };
        if !next.is_terminal() && progress < self.progress {
            return Err(TransitionError::ProgressRegression {
                from: self.progress,
                to: progress,
            });
        }

        self.status = next;
        self.progress = progress;
        self.history.push(next);
        Ok(())
    }

    fn fail(&mut self, reason: String) -> Result<(), TransitionError> {
        self.transition(UploadStatus::Failed, 0)?;
        self.failure = Some(reason);
        Ok(())
    }
}

/// Outcome of one drop: which files got records and which were turned away.
#[derive(Debug, Default)]
pub struct DropReport {
    pub accepted: Vec<UploadId>,
    pub rejected: Vec<Rejection>,
}

pub struct IngestionTracker {
    records: Vec<UploadRecord>,
    policy: AcceptPolicy,
    service: UploadService,
    cancels: HashMap<UploadId, CancellationToken>,
}

impl IngestionTracker {
    pub fn new(service: UploadService, policy: AcceptPolicy) -> Self {
        Self {
            records: Vec::new(),
            policy,
            service,
            cancels: HashMap::new(),
        }
    }

    pub fn policy(&self) -> &AcceptPolicy {
        &self.policy
    }

    /// Records in drop order, regardless of completion order.
    pub fn records(&self) -> &[UploadRecord] {
        &self.records
    }

    pub fn get(&self, id: &UploadId) -> Option<&UploadRecord> {
        self.records.iter().find(|record| &record.id == id)
    }

    /// Look a record up by a unique id prefix.
    pub fn find_by_prefix(&self, prefix: &str) -> Option<&UploadRecord> {
        let mut matches = self
            .records
            .iter()
            .filter(|record| record.id.as_str().starts_with(prefix));
        match (matches.next(), matches.next()) {
            (Some(record), None) if !prefix.is_empty() => Some(record),
            _ => None,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.records.iter().any(|record| !record.is_terminal())
    }

    /// Validate a batch and start one independent flow per admitted file.
    pub fn drop_files(&mut self, files: Vec<PendingFile>) -> DropReport {
        let mut report = DropReport::default();

        for file in files {
            if let Err(rejection) = self.policy.check(&file) {
                debug!(%rejection, "file rejected at drop");
                report.rejected.push(rejection);
                continue;
            }

            let mut record = UploadRecord::queued(&file);
            if let Err(err) = record.transition(UploadStatus::Uploading, UPLOADING_PROGRESS) {
                warn!(error = %err, "could not dispatch upload");
                continue;
            }

            let id = record.id.clone();
            let cancel = CancellationToken::new();
            self.cancels.insert(id.clone(), cancel.clone());
            self.records.push(record);
            debug!(upload = %id, filename = file.filename(), "dispatching upload");
            self.service.spawn_upload(id.clone(), file, cancel);
            report.accepted.push(id);
        }

        report
    }

    /// Apply an event from an upload flow. Events for dismissed records, and
    /// events that would break the lifecycle, are dropped.
    pub fn apply(&mut self, id: &UploadId, event: UploadEvent) -> Option<&UploadRecord> {
        let Some(index) = self.records.iter().position(|record| &record.id == id) else {
            debug!(upload = %id, "dropping event for dismissed upload");
            return None;
        };
        let record = &mut self.records[index];

        let result = match event {
            UploadEvent::Accepted(ack) => {
                debug!(upload = %id, ack = %ack.summary(), "upload accepted");
                record.document_id = ack.document_id().map(str::to_owned);
                record.transition(UploadStatus::Processing, PROCESSING_PROGRESS)
            }
            UploadEvent::Completed => record.transition(UploadStatus::Completed, 100),
            UploadEvent::Failed(reason) => {
                warn!(upload = %id, %reason, "upload failed");
                record.fail(reason)
            }
        };

        if let Err(err) = result {
            debug!(upload = %id, error = %err, "ignoring upload event");
            return None;
        }
        if record.is_terminal() {
            self.cancels.remove(id);
        }
        Some(&self.records[index])
    }

    /// Stop a running flow and mark its record failed.
    pub fn cancel(&mut self, id: &UploadId) -> bool {
        let Some(record) = self.records.iter_mut().find(|record| &record.id == id) else {
            return false;
        };
        if record.fail("cancelled".to_string()).is_err() {
            return false;
        }
        if let Some(token) = self.cancels.remove(id) {
            token.cancel();
        }
        true
    }

    /// Remove a record at the user's request, stopping its flow if still running.
    pub fn dismiss(&mut self, id: &UploadId) -> Option<UploadRecord> {
        let index = self.records.iter().position(|record| &record.id == id)?;
        if let Some(token) = self.cancels.remove(id) {
            token.cancel();
        }
        Some(self.records.remove(index))
    }

    /// Apply events until every record is terminal.
    pub async fn await_idle(&mut self, rx: &mut UploadEventReceiver) {
        while self.is_busy() {
            let Some((id, event)) = rx.recv().await else {
                break;
            };
            self.apply(&id, event);
        }
    }
}
