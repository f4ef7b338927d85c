//! Wire contracts with the document-chat backend.
//!
//! The backend is an opaque collaborator reachable through three HTTP calls:
//! the chat exchange, the multipart document upload and a per-document
//! status query. [`Backend`] is the seam the managers in [`crate::core`]
//! talk to; [`http::HttpBackend`] is the production implementation.

pub mod http;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub use crate::core::message::Citation;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Successful chat body. Extra fields (`confidence`, `metadata`, ...) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub sources: Option<Vec<Citation>>,
}

/// A single file part for the upload form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPart {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Opaque payload returned by an accepted upload.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct UploadAck(pub Value);

impl UploadAck {
    /// Backend document id, when the payload exposes one.
    pub fn document_id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str)
    }

    pub fn summary(&self) -> String {
        match self.0.get("message").and_then(Value::as_str) {
            Some(message) => message.to_string(),
            None => self.0.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DocumentStatus {
    pub id: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default, alias = "processed")]
    pub processed_for_rag: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The request never produced an HTTP response (connect, timeout, reset).
    Transport(String),

    /// The backend answered with a non-2xx status.
    Status { status: u16, reason: Option<String> },

    /// A 2xx body could not be decoded.
    Decode(String),
}

impl BackendError {
    /// Short human-readable cause, preferring the backend's own wording.
    pub fn reason(&self) -> String {
        match self {
            BackendError::Status {
                reason: Some(reason),
                ..
            } => reason.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Transport(cause) => write!(f, "request failed: {cause}"),
            BackendError::Status {
                status,
                reason: Some(reason),
            } => write!(f, "backend returned {status}: {reason}"),
            BackendError::Status { status, reason: None } => {
                write!(f, "backend returned {status}")
            }
            BackendError::Decode(cause) => write!(f, "unreadable response: {cause}"),
        }
    }
}

impl std::error::Error for BackendError {}

/// Pull a failure reason out of an error body.
///
/// Accepts `{"error": "..."}`, `{"error": {"message": "..."}}`, FastAPI's
/// `{"detail": "..."}` and a bare `{"message": "..."}`. Whitespace is collapsed.
pub fn extract_failure_reason(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body.trim()).ok()?;
    let reason = value
        .pointer("/error/message")
        .and_then(Value::as_str)
        .or_else(|| value.get("error").and_then(Value::as_str))
        .or_else(|| value.get("detail").and_then(Value::as_str))
        .or_else(|| value.get("message").and_then(Value::as_str))?;

    let collapsed = reason.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

#[async_trait]
pub trait Backend: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, BackendError>;

    async fn upload(&self, part: UploadPart) -> Result<UploadAck, BackendError>;

    async fn document_status(&self, document_id: &str) -> Result<DocumentStatus, BackendError>;
}
