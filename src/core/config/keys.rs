use crate::core::config::data::Config;
use crate::core::config::io::ConfigError;
use crate::core::ingestion::AllowedTypes;
use crate::utils::url::is_http_url;

/// Keys accepted by `docent set` / `docent unset`.
pub const CONFIG_KEYS: &[&str] = &[
    "base-url",
    "chat-path",
    "upload-path",
    "documents-path",
    "session-id",
    "request-timeout",
    "greeting",
    "upload.max-bytes",
    "upload.allowed",
    "upload.settle",
    "upload.settle-delay-ms",
    "upload.poll-interval-ms",
    "upload.poll-attempts",
];

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(key, format!("'{value}' is not a number")))
}

impl Config {
    pub fn set_key(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "base-url" => {
                if !is_http_url(value) {
                    let reason = format!("'{value}' is not an http(s) URL");
                    return Err(ConfigError::invalid(key, reason));
                }
                self.base_url = Some(value.trim().to_string());
            }
            "chat-path" => self.chat_path = Some(value.trim().to_string()),
            "upload-path" => self.upload_path = Some(value.trim().to_string()),
            "documents-path" => self.documents_path = Some(value.trim().to_string()),
            "session-id" => self.session_id = Some(value.trim().to_string()),
            "request-timeout" => self.request_timeout_secs = Some(parse_number(key, value)?),
            "greeting" => self.greeting = Some(value.to_string()),
            "upload.max-bytes" => self.upload.max_bytes = Some(parse_number(key, value)?),
            "upload.allowed" => {
                let allowed = AllowedTypes::try_from(value)
                    .map_err(|message| ConfigError::invalid(key, message))?;
                self.upload.allowed = Some(allowed.as_str().to_string());
            }
            "upload.settle" => {
                let mode = value.trim().to_ascii_lowercase();
                if !matches!(mode.as_str(), "immediate" | "delay" | "poll") {
                    return Err(ConfigError::invalid(
                        key,
                        format!("unknown mode '{value}' (expected immediate, delay or poll)"),
                    ));
                }
                self.upload.settle = Some(mode);
            }
            "upload.settle-delay-ms" => {
                self.upload.settle_delay_ms = Some(parse_number(key, value)?)
            }
            "upload.poll-interval-ms" => {
                self.upload.poll_interval_ms = Some(parse_number(key, value)?)
            }
            "upload.poll-attempts" => self.upload.poll_attempts = Some(parse_number(key, value)?),
            _ => return Err(ConfigError::invalid(key, "unknown config key")),
        }
        Ok(())
    }

    pub fn unset_key(&mut self, key: &str) -> Result<(), ConfigError> {
        match key {
            "base-url" => self.base_url = None,
            "chat-path" => self.chat_path = None,
            "upload-path" => self.upload_path = None,
            "documents-path" => self.documents_path = None,
            "session-id" => self.session_id = None,
            "request-timeout" => self.request_timeout_secs = None,
            "greeting" => self.greeting = None,
            "upload.max-bytes" => self.upload.max_bytes = None,
            "upload.allowed" => self.upload.allowed = None,
            "upload.settle" => self.upload.settle = None,
            "upload.settle-delay-ms" => self.upload.settle_delay_ms = None,
            "upload.poll-interval-ms" => self.upload.poll_interval_ms = None,
            "upload.poll-attempts" => self.upload.poll_attempts = None,
            _ => return Err(ConfigError::invalid(key, "unknown config key")),
        }
        Ok(())
    }
}
