use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct UploadConfig {
    /// Largest file admitted to the tracker, in bytes
    pub max_bytes: Option<u64>,
    /// Accepted document kinds: "pdf-only" or "documents"
    pub allowed: Option<String>,
    /// How a processing upload settles: "immediate", "delay" or "poll"
    pub settle: Option<String>,
    pub settle_delay_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub poll_attempts: Option<u32>,
}

impl UploadConfig {
    fn is_empty(&self) -> bool {
        self == &UploadConfig::default()
    }
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    /// Backend origin, e.g. "http://localhost:8000"
    pub base_url: Option<String>,
    /// Chat endpoint relative to `base_url` (deployments use "api/chat/" or "api/chat/chat/")
    pub chat_path: Option<String>,
    pub upload_path: Option<String>,
    /// Collection path for per-document status queries
    pub documents_path: Option<String>,
    /// Sent with every chat request; an empty string sends none
    pub session_id: Option<String>,
    pub request_timeout_secs: Option<u64>,
    /// Opening assistant message; an empty string disables it
    pub greeting: Option<String>,
    #[serde(default, skip_serializing_if = "UploadConfig::is_empty")]
    pub upload: UploadConfig,
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
