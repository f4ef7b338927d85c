use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{PendingFile, UploadId};
use crate::api::{Backend, UploadAck};

/// What happens between the backend accepting a file and the record completing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettleMode {
    /// Complete as soon as the upload is acknowledged.
    Immediate,
    /// Complete after a fixed delay.
    Delay(Duration),
    /// Query the document status until the backend reports it processed.
    Poll { interval: Duration, attempts: u32 },
}

#[derive(Debug, Clone)]
pub enum UploadEvent {
    Accepted(UploadAck),
    Completed,
    Failed(String),
}

pub type UploadEventReceiver = mpsc::UnboundedReceiver<(UploadId, UploadEvent)>;

/// Runs one independent upload flow per record.
#[derive(Clone)]
pub struct UploadService {
    backend: Arc<dyn Backend>,
    settle: SettleMode,
    tx: mpsc::UnboundedSender<(UploadId, UploadEvent)>,
}

impl UploadService {
    pub fn new(backend: Arc<dyn Backend>, settle: SettleMode) -> (Self, UploadEventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { backend, settle, tx }, rx)
    }

    pub fn settle_mode(&self) -> &SettleMode {
        &self.settle
    }

    pub fn spawn_upload(&self, id: UploadId, file: PendingFile, cancel: CancellationToken) {
        let backend = Arc::clone(&self.backend);
        let settle = self.settle.clone();
        let tx = self.tx.clone();

        tokio::spawn(async move {
            let flow = run_upload(backend.as_ref(), &settle, file, |event| {
                let _ = tx.send((id.clone(), event));
            });
            tokio::select! {
                _ = flow => {}
                _ = cancel.cancelled() => debug!(upload = %id, "upload flow cancelled"),
            }
        });
    }
}

async fn run_upload(
    backend: &dyn Backend,
    settle: &SettleMode,
    file: PendingFile,
    emit: impl Fn(UploadEvent),
) {
    let part = match file.into_part().await {
        Ok(part) => part,
        Err(err) => {
            emit(UploadEvent::Failed(format!("could not read file: {err}")));
            return;
        }
    };

    let ack = match backend.upload(part).await {
        Ok(ack) => ack,
        Err(err) => {
            emit(UploadEvent::Failed(err.reason()));
            return;
        }
    };
    let document_id = ack.document_id().map(str::to_owned);
    emit(UploadEvent::Accepted(ack));

    match settle_document(backend, settle, document_id.as_deref()).await {
        Ok(()) => emit(UploadEvent::Completed),
        Err(reason) => emit(UploadEvent::Failed(reason)),
    }
}

async fn settle_document(
    backend: &dyn Backend,
    settle: &SettleMode,
    document_id: Option<&str>,
) -> Result<(), String> {
    match settle {
        SettleMode::Immediate => Ok(()),
        SettleMode::Delay(delay) => {
            tokio::time::sleep(*delay).await;
            Ok(())
        }
        SettleMode::Poll { interval, attempts } => {
            let Some(document_id) = document_id else {
                debug!("upload acknowledgement carries no document id; completing without polling");
                return Ok(());
            };

            for attempt in 1..=*attempts {
                let status = backend
                    .document_status(document_id)
                    .await
                    .map_err(|err| err.reason())?;
                if status.processed_for_rag {
                    return Ok(());
                }
                debug!(document_id, attempt, "document not processed yet");
                if attempt < *attempts {
                    tokio::time::sleep(*interval).await;
                }
            }
            Err(format!(
                "document {document_id} was not processed after {attempts} checks"
            ))
        }
    }
}
