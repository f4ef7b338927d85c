//! In-process backend fake for manager tests.

use crate::api::{
    Backend, BackendError, ChatRequest, ChatResponse, DocumentStatus, UploadAck, UploadPart,
};
use crate::core::ingestion::PendingFile;
use crate::core::message::Citation;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

/// `None` means the call never resolves.
type Scripted<T> = Option<Result<T, BackendError>>;

#[derive(Default)]
pub struct ScriptedBackend {
    chat_replies: Mutex<VecDeque<Scripted<ChatResponse>>>,
    uploads: Mutex<HashMap<String, Scripted<UploadAck>>>,
    upload_delays: Mutex<HashMap<String, Duration>>,
    statuses: Mutex<HashMap<String, VecDeque<Result<DocumentStatus, BackendError>>>>,
    pub chat_requests: Mutex<Vec<ChatRequest>>,
    pub uploaded: Mutex<Vec<String>>,
    pub status_queries: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chat_reply(self, response: ChatResponse) -> Self {
        self.push_chat(Some(Ok(response)))
    }

    pub fn chat_error(self, err: BackendError) -> Self {
        self.push_chat(Some(Err(err)))
    }

    pub fn chat_hang(self) -> Self {
        self.push_chat(None)
    }

    fn push_chat(self, scripted: Scripted<ChatResponse>) -> Self {
        self.chat_replies.lock().unwrap().push_back(scripted);
        self
    }

    pub fn upload_result(self, filename: &str, result: Result<UploadAck, BackendError>) -> Self {
        self.uploads
            .lock()
            .unwrap()
            .insert(filename.to_string(), Some(result));
        self
    }

    pub fn upload_hang(self, filename: &str) -> Self {
        self.uploads.lock().unwrap().insert(filename.to_string(), None);
        self
    }

    pub fn upload_delay(self, filename: &str, delay: Duration) -> Self {
        self.upload_delays
            .lock()
            .unwrap()
            .insert(filename.to_string(), delay);
        self
    }

    /// Successive status answers for a document; the last one repeats.
    pub fn status_sequence(
        self,
        document_id: &str,
        answers: Vec<Result<DocumentStatus, BackendError>>,
    ) -> Self {
        self.statuses
            .lock()
            .unwrap()
            .insert(document_id.to_string(), answers.into());
        self
    }

    pub fn chat_request_count(&self) -> usize {
        self.chat_requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, BackendError> {
        self.chat_requests.lock().unwrap().push(request);
        let scripted = self.chat_replies.lock().unwrap().pop_front();
        match scripted {
            Some(Some(result)) => result,
            Some(None) => std::future::pending().await,
            None => Err(BackendError::Transport("no scripted chat reply".to_string())),
        }
    }

    async fn upload(&self, part: UploadPart) -> Result<UploadAck, BackendError> {
        self.uploaded.lock().unwrap().push(part.filename.clone());
        let delay = self
            .upload_delays
            .lock()
            .unwrap()
            .get(&part.filename)
            .copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self.uploads.lock().unwrap().get(&part.filename).cloned();
        match scripted {
            Some(Some(result)) => result,
            Some(None) => std::future::pending().await,
            None => Ok(UploadAck(serde_json::json!({
                "message": format!("Successfully processed {}", part.filename),
            }))),
        }
    }

    async fn document_status(&self, document_id: &str) -> Result<DocumentStatus, BackendError> {
        self.status_queries
            .lock()
            .unwrap()
            .push(document_id.to_string());
        let mut statuses = self.statuses.lock().unwrap();
        let Some(queue) = statuses.get_mut(document_id) else {
            return Err(BackendError::Status {
                status: 404,
                reason: Some("Dokument ikke funnet".to_string()),
            });
        };
        if queue.len() > 1 {
            queue.pop_front().expect("queue is non-empty")
        } else {
            queue
                .front()
                .cloned()
                .expect("status sequence must not be empty")
        }
    }
}

pub fn reply(text: &str, sources: Vec<Citation>) -> ChatResponse {
    ChatResponse {
        response: Some(text.to_string()),
        sources: Some(sources),
    }
}

pub fn citation(filename: &str, page: Option<u32>, score: f64) -> Citation {
    Citation {
        filename: filename.to_string(),
        page,
        relevance_score: score,
        excerpt: format!("excerpt from {filename}"),
    }
}

pub fn server_error() -> BackendError {
    BackendError::Status {
        status: 500,
        reason: None,
    }
}

pub fn pdf_file(name: &str, size: usize) -> PendingFile {
    PendingFile::from_bytes(name, vec![b'%'; size])
}

pub fn processed(document_id: &str, done: bool) -> DocumentStatus {
    DocumentStatus {
        id: document_id.to_string(),
        filename: None,
        processed_for_rag: done,
    }
}
