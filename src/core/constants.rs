//! Shared constants used across the application

/// Used when the backend answers successfully but without any text.
pub const EMPTY_REPLY_PLACEHOLDER: &str =
    "Beklager, jeg kunne ikke prosessere forespørselen din.";

/// Substituted for the assistant reply when a chat exchange fails for any reason.
pub const CHAT_FAILURE_REPLY: &str =
    "Beklager, det oppstod en feil. Sørg for at backend-tjenestene kjører og prøv igjen.";

/// Greeting shown as the first assistant message when none is configured.
pub const DEFAULT_GREETING: &str = "Hei! Jeg er din AI-assistent for GPS-data og dokumentanalyse. \
Last opp dine u-blox manualer eller andre dokumenter, så kan jeg hjelpe deg med å finne \
informasjon og analysere GPS-data.";

/// Canned first-contact prompts.
pub const SUGGESTIONS: &[&str] = &[
    "Hva er forskjellen mellom GPS og GNSS?",
    "Hvordan konfigurerer jeg u-blox mottakeren for høy nøyaktighet?",
    "Hvilke NMEA-meldinger støtter u-blox modulene?",
    "Hva er Cold Start vs Warm Start i GPS?",
    "Hvordan aktiverer jeg RTK-modus på u-blox?",
];

/// Upload size ceiling applied before a file enters the tracker (10 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Progress reported once a file has been dispatched.
pub const UPLOADING_PROGRESS: u8 = 25;

/// Progress reported once the backend has accepted a file.
pub const PROCESSING_PROGRESS: u8 = 75;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_CHAT_PATH: &str = "api/chat/";
pub const DEFAULT_UPLOAD_PATH: &str = "documents/upload";
pub const DEFAULT_DOCUMENTS_PATH: &str = "documents";
pub const DEFAULT_SESSION_ID: &str = "default-session";

pub const DEFAULT_SETTLE_DELAY_MS: u64 = 2000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_POLL_ATTEMPTS: u32 = 30;

/// Environment variable that overrides the configured backend base URL.
pub const BASE_URL_ENV: &str = "DOCENT_BASE_URL";

/// Environment variable holding the `tracing` filter directive.
pub const LOG_FILTER_ENV: &str = "DOCENT_LOG";
