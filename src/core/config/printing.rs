use crate::core::config::data::Config;
use crate::core::config::resolve::Settings;
use crate::core::ingestion::{format_file_size, SettleMode};

impl Config {
    pub fn print_all(&self) {
        println!("Current configuration:");
        let show = |key: &str, value: Option<String>| match value {
            Some(value) => println!("  {key}: {value}"),
            None => println!("  {key}: (unset)"),
        };
        show("base-url", self.base_url.clone());
        show("chat-path", self.chat_path.clone());
        show("upload-path", self.upload_path.clone());
        show("documents-path", self.documents_path.clone());
        show("session-id", self.session_id.clone());
        show(
            "request-timeout",
            self.request_timeout_secs.map(|secs| format!("{secs}s")),
        );
        show("greeting", self.greeting.clone());
        show("upload.max-bytes", self.upload.max_bytes.map(|b| b.to_string()));
        show("upload.allowed", self.upload.allowed.clone());
        show("upload.settle", self.upload.settle.clone());
        show(
            "upload.settle-delay-ms",
            self.upload.settle_delay_ms.map(|ms| ms.to_string()),
        );
        show(
            "upload.poll-interval-ms",
            self.upload.poll_interval_ms.map(|ms| ms.to_string()),
        );
        show(
            "upload.poll-attempts",
            self.upload.poll_attempts.map(|n| n.to_string()),
        );
    }
}

impl Settings {
    pub fn print_effective(&self) {
        println!("Effective settings:");
        println!("  chat endpoint:   {}", self.endpoints.chat);
        println!("  upload endpoint: {}", self.endpoints.upload);
        println!("  status endpoint: {}/{{id}}", self.endpoints.documents);
        match &self.session_id {
            Some(id) => println!("  session id:      {id}"),
            None => println!("  session id:      (none)"),
        }
        match self.request_timeout {
            Some(timeout) => println!("  request timeout: {}s", timeout.as_secs()),
            None => println!("  request timeout: transport default"),
        }
        println!(
            "  uploads:         {} up to {}",
            self.accept_policy.allowed.as_str(),
            format_file_size(self.accept_policy.max_bytes)
        );
        match &self.settle {
            SettleMode::Immediate => println!("  settle:          immediate"),
            SettleMode::Delay(delay) => {
                println!("  settle:          delay {}ms", delay.as_millis())
            }
            SettleMode::Poll { interval, attempts } => println!(
                "  settle:          poll every {}ms, {attempts} attempts",
                interval.as_millis()
            ),
        }
    }
}
