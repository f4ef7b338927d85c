//! Startup resolution of the on-disk config into immutable [`Settings`].
//!
//! Precedence for the backend origin: CLI flag, then `DOCENT_BASE_URL`, then
//! the config file, then the built-in default. Everything is resolved once;
//! nothing downstream reads the environment again.

use std::time::Duration;

use crate::api::http::Endpoints;
use crate::core::config::data::Config;
use crate::core::config::io::ConfigError;
use crate::core::constants::{
    BASE_URL_ENV, DEFAULT_BASE_URL, DEFAULT_CHAT_PATH, DEFAULT_DOCUMENTS_PATH, DEFAULT_GREETING,
    DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_SESSION_ID, DEFAULT_SETTLE_DELAY_MS,
    DEFAULT_UPLOAD_PATH, MAX_UPLOAD_BYTES,
};
use crate::core::ingestion::{AcceptPolicy, AllowedTypes, SettleMode};
use crate::utils::url::{is_http_url, normalize_base_url};

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub base_url: String,
    pub endpoints: Endpoints,
    pub session_id: Option<String>,
    pub request_timeout: Option<Duration>,
    pub greeting: Option<String>,
    pub accept_policy: AcceptPolicy,
    pub settle: SettleMode,
}

impl Config {
    pub fn resolve(&self, cli_base_url: Option<&str>) -> Result<Settings, ConfigError> {
        let env_base_url = std::env::var(BASE_URL_ENV).ok();
        self.resolve_with_env(cli_base_url, env_base_url.as_deref())
    }

    pub fn resolve_with_env(
        &self,
        cli_base_url: Option<&str>,
        env_base_url: Option<&str>,
    ) -> Result<Settings, ConfigError> {
        let base_url = cli_base_url
            .or(env_base_url)
            .or(self.base_url.as_deref())
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_BASE_URL);
        if !is_http_url(base_url) {
            return Err(ConfigError::invalid(
                "base-url",
                format!("'{base_url}' is not an http(s) URL"),
            ));
        }
        let base_url = normalize_base_url(base_url);

        let endpoints = Endpoints::new(
            &base_url,
            self.chat_path.as_deref().unwrap_or(DEFAULT_CHAT_PATH),
            self.upload_path.as_deref().unwrap_or(DEFAULT_UPLOAD_PATH),
            self.documents_path
                .as_deref()
                .unwrap_or(DEFAULT_DOCUMENTS_PATH),
        );

        let session_id = match self.session_id.as_deref() {
            None => Some(DEFAULT_SESSION_ID.to_string()),
            Some(id) if id.trim().is_empty() => None,
            Some(id) => Some(id.trim().to_string()),
        };

        let greeting = match self.greeting.as_deref() {
            None => Some(DEFAULT_GREETING.to_string()),
            Some(text) if text.trim().is_empty() => None,
            Some(text) => Some(text.to_string()),
        };

        let request_timeout = match self.request_timeout_secs {
            Some(0) => {
                return Err(ConfigError::invalid(
                    "request-timeout",
                    "must be at least one second",
                ))
            }
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        };

        Ok(Settings {
            base_url,
            endpoints,
            session_id,
            request_timeout,
            greeting,
            accept_policy: self.accept_policy()?,
            settle: self.settle_mode()?,
        })
    }

    fn accept_policy(&self) -> Result<AcceptPolicy, ConfigError> {
        let max_bytes = self.upload.max_bytes.unwrap_or(MAX_UPLOAD_BYTES);
        if max_bytes == 0 {
            return Err(ConfigError::invalid("upload.max-bytes", "must be positive"));
        }
        let allowed = match self.upload.allowed.as_deref() {
            Some(value) => AllowedTypes::try_from(value)
                .map_err(|message| ConfigError::invalid("upload.allowed", message))?,
            None => AllowedTypes::default(),
        };
        Ok(AcceptPolicy { max_bytes, allowed })
    }

    fn settle_mode(&self) -> Result<SettleMode, ConfigError> {
        let upload = &self.upload;
        match upload.settle.as_deref().map(str::trim) {
            None | Some("delay") => Ok(SettleMode::Delay(Duration::from_millis(
                upload.settle_delay_ms.unwrap_or(DEFAULT_SETTLE_DELAY_MS),
            ))),
            Some("immediate") => Ok(SettleMode::Immediate),
            Some("poll") => {
                let attempts = upload.poll_attempts.unwrap_or(DEFAULT_POLL_ATTEMPTS);
                if attempts == 0 {
                    return Err(ConfigError::invalid(
                        "upload.poll-attempts",
                        "must be at least 1",
                    ));
                }
                Ok(SettleMode::Poll {
                    interval: Duration::from_millis(
                        upload.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS),
                    ),
                    attempts,
                })
            }
            Some(other) => Err(ConfigError::invalid(
                "upload.settle",
                format!("unknown mode '{other}' (expected immediate, delay or poll)"),
            )),
        }
    }
}
