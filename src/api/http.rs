use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Response;
use tracing::debug;

use super::{
    extract_failure_reason, Backend, BackendError, ChatRequest, ChatResponse, DocumentStatus,
    UploadAck, UploadPart,
};
use crate::utils::url::construct_api_url;

/// Fully-qualified endpoint URLs, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub chat: String,
    pub upload: String,
    pub documents: String,
}

impl Endpoints {
    pub fn new(base_url: &str, chat_path: &str, upload_path: &str, documents_path: &str) -> Self {
        Self {
            chat: construct_api_url(base_url, chat_path),
            upload: construct_api_url(base_url, upload_path),
            documents: construct_api_url(base_url, documents_path),
        }
    }

    pub fn document(&self, document_id: &str) -> String {
        construct_api_url(&self.documents, document_id)
    }
}

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    endpoints: Endpoints,
}

impl HttpBackend {
    /// Build a backend; `timeout` of `None` keeps the transport default.
    pub fn new(endpoints: Endpoints, timeout: Option<Duration>) -> Result<Self, BackendError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(transport)?;
        Ok(Self { client, endpoints })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }
}

fn transport(err: reqwest::Error) -> BackendError {
    BackendError::Transport(err.to_string())
}

async fn ensure_success(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(BackendError::Status {
        status: status.as_u16(),
        reason: extract_failure_reason(&body),
    })
}

#[async_trait]
impl Backend for HttpBackend {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, BackendError> {
        debug!(url = %self.endpoints.chat, "sending chat request");
        let response = self
            .client
            .post(&self.endpoints.chat)
            .json(&request)
            .send()
            .await
            .map_err(transport)?;
        let response = ensure_success(response).await?;

        response
            .json::<ChatResponse>()
            .await
            .map_err(|err| BackendError::Decode(err.to_string()))
    }

    async fn upload(&self, part: UploadPart) -> Result<UploadAck, BackendError> {
        debug!(
            url = %self.endpoints.upload,
            filename = %part.filename,
            bytes = part.bytes.len(),
            "uploading document"
        );
        let UploadPart {
            filename,
            mime_type,
            bytes,
        } = part;
        let file_part = Part::bytes(bytes)
            .file_name(filename)
            .mime_str(&mime_type)
            .map_err(transport)?;
        let form = Form::new().part("file", file_part);

        let response = self
            .client
            .post(&self.endpoints.upload)
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;
        let response = ensure_success(response).await?;

        let body = response.text().await.map_err(transport)?;
        let payload = serde_json::from_str(&body)
            .unwrap_or_else(|_| serde_json::Value::String(body.trim().to_string()));
        Ok(UploadAck(payload))
    }

    async fn document_status(&self, document_id: &str) -> Result<DocumentStatus, BackendError> {
        let url = self.endpoints.document(document_id);
        debug!(%url, "querying document status");
        let response = self.client.get(url).send().await.map_err(transport)?;
        let response = ensure_success(response).await?;

        response
            .json::<DocumentStatus>()
            .await
            .map_err(|err| BackendError::Decode(err.to_string()))
    }
}
