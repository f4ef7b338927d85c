use super::http::{Endpoints, HttpBackend};
use super::*;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

struct CapturedRequest {
    request_line: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl CapturedRequest {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

async fn read_http_request(stream: &mut TcpStream) -> Result<CapturedRequest, String> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = find_subsequence(&buffer, b"\r\n\r\n") {
            break pos;
        }
        let read = stream.read(&mut chunk).await.map_err(|err| err.to_string())?;
        if read == 0 {
            return Err("Unexpected EOF while reading HTTP headers".to_string());
        }
        buffer.extend_from_slice(&chunk[..read]);
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .collect();

    let mut body = buffer[header_end + 4..].to_vec();
    let content_length = headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.parse::<usize>().ok());
    let chunked = headers.iter().any(|(name, value)| {
        name.eq_ignore_ascii_case("transfer-encoding") && value.eq_ignore_ascii_case("chunked")
    });

    if let Some(length) = content_length {
        while body.len() < length {
            let read = stream.read(&mut chunk).await.map_err(|err| err.to_string())?;
            if read == 0 {
                return Err("Unexpected EOF while reading HTTP body".to_string());
            }
            body.extend_from_slice(&chunk[..read]);
        }
        body.truncate(length);
    } else if chunked {
        while find_subsequence(&body, b"0\r\n\r\n").is_none() {
            let read = stream.read(&mut chunk).await.map_err(|err| err.to_string())?;
            if read == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..read]);
        }
    }

    Ok(CapturedRequest {
        request_line,
        headers,
        body,
    })
}

/// Answer exactly one request with the given status line and JSON body.
async fn serve_once(
    status_line: &'static str,
    body: &'static str,
) -> (String, JoinHandle<Result<CapturedRequest, String>>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("local addr should resolve");

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.map_err(|err| err.to_string())?;
        let captured = read_http_request(&mut stream).await?;
        let response = format!(
            "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\nconnection: close\r\ncontent-length: {}\r\n\r\n{body}",
            body.len()
        );
        stream
            .write_all(response.as_bytes())
            .await
            .map_err(|err| err.to_string())?;
        stream.shutdown().await.map_err(|err| err.to_string())?;
        Ok(captured)
    });

    (format!("http://{addr}"), handle)
}

fn backend_for(base_url: &str) -> HttpBackend {
    HttpBackend::new(
        Endpoints::new(base_url, "api/chat/", "documents/upload", "documents"),
        Some(Duration::from_secs(5)),
    )
    .expect("client should build")
}

#[test]
fn endpoints_join_paths_without_double_slashes() {
    let endpoints = Endpoints::new(
        "http://localhost:8000/",
        "/api/chat/chat/",
        "documents/documents/upload",
        "documents",
    );
    assert_eq!(endpoints.chat, "http://localhost:8000/api/chat/chat/");
    assert_eq!(
        endpoints.upload,
        "http://localhost:8000/documents/documents/upload"
    );
    assert_eq!(
        endpoints.document("abc-123"),
        "http://localhost:8000/documents/abc-123"
    );
}

#[test]
fn chat_request_omits_missing_session() {
    let request = ChatRequest {
        message: "Hva er GPS?".to_string(),
        session_id: None,
    };
    let json = serde_json::to_value(&request).expect("serializes");
    assert_eq!(json, serde_json::json!({ "message": "Hva er GPS?" }));
}

#[test]
fn chat_response_tolerates_extra_and_missing_fields() {
    let response: ChatResponse =
        serde_json::from_str(r#"{"confidence":0.4,"session_id":"s"}"#).expect("decodes");
    assert_eq!(response.response, None);
    assert_eq!(response.sources, None);
}

#[test]
fn chat_response_survives_null_relevance_score() {
    let body = r#"{
        "response": "Bruk UBX-CFG-NAV5.",
        "sources": [{"filename": "m8.pdf", "page": 12, "relevance_score": null, "excerpt": "NAV5"}]
    }"#;
    let response: ChatResponse = serde_json::from_str(body).expect("decodes");

    let sources = response.sources.expect("sources present");
    assert_eq!(sources[0].relevance_score, 0.0);
    assert_eq!(sources[0].page, Some(12));
}

#[test]
fn failure_reasons_come_from_common_error_shapes() {
    assert_eq!(
        extract_failure_reason(r#"{"error":"An error occurred: bad pdf"}"#).as_deref(),
        Some("An error occurred: bad pdf")
    );
    assert_eq!(
        extract_failure_reason(r#"{"detail":"Filen er for stor (maks 10MB)"}"#).as_deref(),
        Some("Filen er for stor (maks 10MB)")
    );
    assert_eq!(
        extract_failure_reason(r#"{"error":{"message":"model   overloaded"}}"#).as_deref(),
        Some("model overloaded")
    );
    assert_eq!(extract_failure_reason("<html>oops</html>"), None);
    assert_eq!(extract_failure_reason(r#"{"error":"   "}"#), None);
}

#[test]
fn upload_ack_exposes_document_id_and_summary() {
    let ack = UploadAck(serde_json::json!({
        "id": "7f0c",
        "filename": "m8.pdf",
        "status": "uploaded",
    }));
    assert_eq!(ack.document_id(), Some("7f0c"));

    let message_ack = UploadAck(serde_json::json!({ "message": "Stored 12 chunks" }));
    assert_eq!(message_ack.document_id(), None);
    assert_eq!(message_ack.summary(), "Stored 12 chunks");
}

#[tokio::test]
async fn chat_posts_json_and_decodes_reply() {
    let (base_url, server) = serve_once(
        "200 OK",
        r#"{"response":"GPS er et satellittbasert navigasjonssystem.","sources":[{"filename":"gps.pdf","page":2,"relevance_score":0.9,"excerpt":"GPS..."}],"confidence":0.8}"#,
    )
    .await;
    let backend = backend_for(&base_url);

    let reply = backend
        .chat(ChatRequest {
            message: "Hva er GPS?".to_string(),
            session_id: Some("default-session".to_string()),
        })
        .await
        .expect("chat should succeed");

    assert_eq!(
        reply.response.as_deref(),
        Some("GPS er et satellittbasert navigasjonssystem.")
    );
    let sources = reply.sources.expect("sources present");
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].page, Some(2));

    let captured = server.await.expect("server task").expect("request captured");
    assert_eq!(captured.request_line, "POST /api/chat/ HTTP/1.1");
    assert!(captured
        .header("content-type")
        .is_some_and(|value| value.starts_with("application/json")));
    let body: serde_json::Value = serde_json::from_slice(&captured.body).expect("json body");
    assert_eq!(
        body,
        serde_json::json!({ "message": "Hva er GPS?", "session_id": "default-session" })
    );
}

#[tokio::test]
async fn chat_maps_server_errors_to_status() {
    let (base_url, server) =
        serve_once("500 Internal Server Error", r#"{"detail":"rag engine down"}"#).await;
    let backend = backend_for(&base_url);

    let err = backend
        .chat(ChatRequest {
            message: "hei".to_string(),
            session_id: None,
        })
        .await
        .expect_err("500 must fail");

    assert_eq!(
        err,
        BackendError::Status {
            status: 500,
            reason: Some("rag engine down".to_string()),
        }
    );
    server.await.expect("server task").expect("request captured");
}

#[tokio::test]
async fn chat_reports_transport_failures() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let backend = backend_for(&format!("http://{addr}"));
    let err = backend
        .chat(ChatRequest {
            message: "hei".to_string(),
            session_id: None,
        })
        .await
        .expect_err("closed port must fail");
    assert!(matches!(err, BackendError::Transport(_)));
}

#[tokio::test]
async fn upload_sends_single_multipart_file_field() {
    let (base_url, server) = serve_once(
        "200 OK",
        r#"{"id":"doc-1","filename":"m8.pdf","status":"uploaded","processed_for_rag":false}"#,
    )
    .await;
    let backend = backend_for(&base_url);

    let ack = backend
        .upload(UploadPart {
            filename: "m8.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            bytes: b"%PDF-1.4 test".to_vec(),
        })
        .await
        .expect("upload should succeed");
    assert_eq!(ack.document_id(), Some("doc-1"));

    let captured = server.await.expect("server task").expect("request captured");
    assert_eq!(captured.request_line, "POST /documents/upload HTTP/1.1");
    assert!(captured
        .header("content-type")
        .is_some_and(|value| value.starts_with("multipart/form-data")));
    let body = String::from_utf8_lossy(&captured.body);
    assert!(body.contains(r#"name="file"; filename="m8.pdf""#));
    assert!(body.contains("%PDF-1.4 test"));
}

#[tokio::test]
async fn upload_failure_surfaces_error_field() {
    let (base_url, server) = serve_once(
        "500 Internal Server Error",
        r#"{"error":"An error occurred: Missing environment variables"}"#,
    )
    .await;
    let backend = backend_for(&base_url);

    let err = backend
        .upload(UploadPart {
            filename: "m8.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            bytes: vec![1, 2, 3],
        })
        .await
        .expect_err("500 must fail");
    assert_eq!(
        err.reason(),
        "An error occurred: Missing environment variables"
    );
    server.await.expect("server task").expect("request captured");
}

#[tokio::test]
async fn document_status_reads_processed_flag() {
    let (base_url, server) = serve_once(
        "200 OK",
        r#"{"id":"doc-1","filename":"m8.pdf","processed_for_rag":true,"extracted_text_length":120}"#,
    )
    .await;
    let backend = backend_for(&base_url);

    let status = backend
        .document_status("doc-1")
        .await
        .expect("status query should succeed");
    assert!(status.processed_for_rag);
    assert_eq!(status.filename.as_deref(), Some("m8.pdf"));

    let captured = server.await.expect("server task").expect("request captured");
    assert_eq!(captured.request_line, "GET /documents/doc-1 HTTP/1.1");
}
