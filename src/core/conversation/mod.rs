//! Conversation Manager: one ordered timeline, one chat request in flight.
//!
//! `submit` appends the user's message and dispatches the request on a
//! spawned task; the result comes back over a channel and is applied by the
//! event loop through [`ConversationManager::apply`]. Every exchange ends with
//! exactly one assistant message and `loading` cleared, whether the backend
//! answered, failed, or the user cancelled.


use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::{Backend, BackendError, ChatRequest, ChatResponse};
use crate::core::constants::{CHAT_FAILURE_REPLY, EMPTY_REPLY_PLACEHOLDER, SUGGESTIONS};
use crate::core::message::{Citation, Message, Timeline};
use crate::utils::logging::TranscriptLog;

#[derive(Debug)]
pub enum ChatOutcome {
    Reply(ChatResponse),
    Failed(BackendError),
    Cancelled,
}

pub type ChatOutcomeReceiver = mpsc::UnboundedReceiver<(ChatOutcome, u64)>;

/// Runs chat exchanges off the event loop and reports back tagged with a request id.
#[derive(Clone)]
pub struct ChatService {
    backend: Arc<dyn Backend>,
    tx: mpsc::UnboundedSender<(ChatOutcome, u64)>,
}

impl ChatService {
    pub fn new(backend: Arc<dyn Backend>) -> (Self, ChatOutcomeReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { backend, tx }, rx)
    }

    pub fn spawn_exchange(&self, request: ChatRequest, cancel: CancellationToken, request_id: u64) {
        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let outcome = tokio::select! {
                result = backend.chat(request) => match result {
                    Ok(response) => ChatOutcome::Reply(response),
                    Err(err) => ChatOutcome::Failed(err),
                },
                _ = cancel.cancelled() => ChatOutcome::Cancelled,
            };
            let _ = tx.send((outcome, request_id));
        });
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConversationOptions {
    pub session_id: Option<String>,
    /// First assistant message shown before any exchange.
    pub greeting: Option<String>,
}

struct InFlight {
    request_id: u64,
    cancel: CancellationToken,
}

pub struct ConversationManager {
    timeline: Timeline,
    input: String,
    loading: bool,
    session_id: Option<String>,
    service: ChatService,
    in_flight: Option<InFlight>,
    next_request_id: u64,
    transcript: TranscriptLog,
}

impl ConversationManager {
    pub fn new(service: ChatService, options: ConversationOptions) -> Self {
        let mut manager = Self {
            timeline: Timeline::new(),
            input: String::new(),
            loading: false,
            session_id: options.session_id,
            service,
            in_flight: None,
            next_request_id: 1,
            transcript: TranscriptLog::disabled(),
        };
        if let Some(greeting) = options.greeting.filter(|text| !text.trim().is_empty()) {
            manager.append(Message::assistant_plain(greeting));
        }
        manager
    }

    /// Attach a transcript log. Messages already on the timeline (the
    /// greeting) are appended to it first.
    pub fn with_transcript(mut self, transcript: TranscriptLog) -> Self {
        for message in &self.timeline {
            if let Err(err) = transcript.log_message(message) {
                warn!(error = %err, "failed to write transcript");
            }
        }
        self.transcript = transcript;
        self
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn transcript(&self) -> &TranscriptLog {
        &self.transcript
    }

    pub fn transcript_mut(&mut self) -> &mut TranscriptLog {
        &mut self.transcript
    }

    /// Submit whatever is in the input buffer.
    pub fn submit_input(&mut self) -> Option<u64> {
        let text = self.input.clone();
        self.submit(&text)
    }

    /// Start an exchange, returning its request id.
    ///
    /// Blank text, or any call while a request is outstanding, is a no-op
    /// that leaves the timeline, the input buffer and `loading` untouched.
    pub fn submit(&mut self, text: &str) -> Option<u64> {
        if text.trim().is_empty() {
            return None;
        }
        if self.loading {
            debug!("submit ignored: a chat request is already in flight");
            return None;
        }

        self.append(Message::user(text));
        self.input.clear();
        self.loading = true;

        let request_id = self.next_request_id;
        self.next_request_id += 1;
        let cancel = CancellationToken::new();
        self.in_flight = Some(InFlight {
            request_id,
            cancel: cancel.clone(),
        });

        let request = ChatRequest {
            message: text.to_string(),
            session_id: self.session_id.clone(),
        };
        debug!(request_id, "dispatching chat request");
        self.service.spawn_exchange(request, cancel, request_id);
        Some(request_id)
    }

    /// Submit one of the canned first-contact prompts by position.
    pub fn select_suggestion(&mut self, index: usize) -> Option<u64> {
        let text = SUGGESTIONS.get(index)?;
        self.select_suggestion_text(text)
    }

    pub fn select_suggestion_text(&mut self, text: &str) -> Option<u64> {
        self.set_input(text);
        self.submit_input()
    }

    /// Apply a finished exchange. Outcomes for anything but the current
    /// request are dropped.
    pub fn apply(&mut self, outcome: ChatOutcome, request_id: u64) -> Option<&Message> {
        match &self.in_flight {
            Some(in_flight) if in_flight.request_id == request_id => {}
            _ => {
                debug!(request_id, "dropping stale chat outcome");
                return None;
            }
        }
        self.in_flight = None;

        let message = match outcome {
            ChatOutcome::Reply(response) => reply_message(response),
            ChatOutcome::Failed(err) => {
                warn!(request_id, error = %err, "chat request failed");
                Message::assistant_plain(CHAT_FAILURE_REPLY)
            }
            ChatOutcome::Cancelled => Message::assistant_plain(CHAT_FAILURE_REPLY),
        };
        self.append(message);
        self.loading = false;
        self.timeline.last()
    }

    /// Abandon the outstanding request and close the exchange as a failure.
    pub fn cancel(&mut self) -> bool {
        let Some(in_flight) = self.in_flight.take() else {
            return false;
        };
        debug!(request_id = in_flight.request_id, "cancelling chat request");
        in_flight.cancel.cancel();
        self.append(Message::assistant_plain(CHAT_FAILURE_REPLY));
        self.loading = false;
        true
    }

    /// Wait for the outstanding exchange to resolve and apply it.
    pub async fn await_reply(&mut self, rx: &mut ChatOutcomeReceiver) -> Option<&Message> {
        while self.in_flight.is_some() {
            let (outcome, request_id) = rx.recv().await?;
            if self.apply(outcome, request_id).is_some() {
                break;
            }
        }
        self.timeline.last()
    }

    fn append(&mut self, message: Message) {
        if let Err(err) = self.transcript.log_message(&message) {
            warn!(error = %err, "failed to write transcript");
        }
        if let Err(err) = self.timeline.push(message) {
            warn!(error = %err, "message rejected by timeline");
        }
    }
}

fn reply_message(response: ChatResponse) -> Message {
    let content = response
        .response
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| EMPTY_REPLY_PLACEHOLDER.to_string());
    let sources: Vec<Citation> = response
        .sources
        .unwrap_or_default()
        .into_iter()
        .map(Citation::normalized)
        .collect();
    Message::assistant(content, sources)
}
