//! Interactive line-based session
//!
//! One task owns both managers. Stdin lines, chat outcomes and upload events
//! are multiplexed with `tokio::select!` and applied in arrival order, so the
//! managers never need locks.

use std::error::Error;
use std::path::PathBuf;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cli::connect;
use crate::cli::render::{message_block, record_line, rejection_line, short_id};
use crate::core::config::Settings;
use crate::core::constants::SUGGESTIONS;
use crate::core::conversation::{
    ChatOutcome, ChatOutcomeReceiver, ChatService, ConversationManager, ConversationOptions,
};
use crate::core::ingestion::{
    IngestionTracker, PendingFile, UploadEvent, UploadEventReceiver, UploadId, UploadService,
};
use crate::utils::logging::TranscriptLog;

const HELP: &str = "\
Session commands:
  <text>            Ask a question
  /upload <paths>   Upload one or more documents
  /uploads          List uploads and their status
  /dismiss <id>     Remove an upload from the list
  /cancel [id]      Cancel the pending answer, or an upload
  /suggest [n]      List suggested questions, or ask one
  /log [file]       Start or toggle the transcript log
  /help             Show this help
  /quit             Leave the session";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Empty,
    Ask(String),
    Upload(Vec<String>),
    Uploads,
    Dismiss(String),
    Cancel(Option<String>),
    Suggest(Option<usize>),
    Log(Option<String>),
    Help,
    Quit,
    Unknown(String),
}

pub fn parse_line(line: &str) -> ReplCommand {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ReplCommand::Empty;
    }
    let Some(command) = trimmed.strip_prefix('/') else {
        return ReplCommand::Ask(trimmed.to_string());
    };

    let mut parts = command.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or_default();
    let rest = parts.next().map(str::trim).filter(|rest| !rest.is_empty());

    match name {
        "upload" => match rest {
            Some(rest) => ReplCommand::Upload(rest.split_whitespace().map(String::from).collect()),
            None => ReplCommand::Unknown("usage: /upload <paths>".to_string()),
        },
        "uploads" => ReplCommand::Uploads,
        "dismiss" => match rest {
            Some(id) => ReplCommand::Dismiss(id.to_string()),
            None => ReplCommand::Unknown("usage: /dismiss <id>".to_string()),
        },
        "cancel" => ReplCommand::Cancel(rest.map(String::from)),
        "suggest" => match rest {
            None => ReplCommand::Suggest(None),
            Some(n) => match n.parse::<usize>() {
                Ok(n) if n >= 1 => ReplCommand::Suggest(Some(n)),
                _ => ReplCommand::Unknown(format!("usage: /suggest [1-{}]", SUGGESTIONS.len())),
            },
        },
        "log" => ReplCommand::Log(rest.map(String::from)),
        "help" | "?" => ReplCommand::Help,
        "quit" | "exit" | "q" => ReplCommand::Quit,
        other => ReplCommand::Unknown(format!("unknown command /{other}; try /help")),
    }
}

pub struct Session {
    pub conversation: ConversationManager,
    pub tracker: IngestionTracker,
}

impl Session {
    /// Apply one input line. Returns false when the user asked to leave.
    pub fn handle_line(&mut self, line: &str) -> bool {
        match parse_line(line) {
            ReplCommand::Empty => {}
            ReplCommand::Ask(text) => {
                if self.conversation.submit(&text).is_none() {
                    println!("⏳ Still waiting for the previous answer (/cancel to abandon it)");
                }
            }
            ReplCommand::Upload(paths) => self.upload(paths),
            ReplCommand::Uploads => {
                if self.tracker.records().is_empty() {
                    println!("No uploads yet");
                }
                for record in self.tracker.records() {
                    println!("{}", record_line(record));
                }
            }
            ReplCommand::Dismiss(prefix) => {
                let id = self
                    .tracker
                    .find_by_prefix(&prefix)
                    .map(|record| record.id().clone());
                match id.and_then(|id| self.tracker.dismiss(&id)) {
                    Some(record) => println!("Dismissed {}", record.filename()),
                    None => println!("No single upload matches '{prefix}'"),
                }
            }
            ReplCommand::Cancel(None) => {
                if self.conversation.cancel() {
                    if let Some(message) = self.conversation.timeline().last() {
                        print!("{}", message_block(message));
                    }
                } else {
                    println!("Nothing to cancel");
                }
            }
            ReplCommand::Cancel(Some(prefix)) => {
                let id = self
                    .tracker
                    .find_by_prefix(&prefix)
                    .map(|record| record.id().clone());
                match id {
                    Some(id) if self.tracker.cancel(&id) => {
                        if let Some(record) = self.tracker.get(&id) {
                            println!("{}", record_line(record));
                        }
                    }
                    Some(_) => println!("That upload has already finished"),
                    None => println!("No single upload matches '{prefix}'"),
                }
            }
            ReplCommand::Suggest(None) => {
                for (index, text) in SUGGESTIONS.iter().enumerate() {
                    println!("  {}. {text}", index + 1);
                }
            }
            ReplCommand::Suggest(Some(n)) => {
                if self.conversation.is_loading() {
                    println!("⏳ Still waiting for the previous answer (/cancel to abandon it)");
                } else if self.conversation.select_suggestion(n - 1).is_some() {
                    if let Some(message) = self.conversation.timeline().last() {
                        print!("{}", message_block(message));
                    }
                } else {
                    println!("There are {} suggestions", SUGGESTIONS.len());
                }
            }
            ReplCommand::Log(Some(path)) => {
                match self
                    .conversation
                    .transcript_mut()
                    .set_log_file(PathBuf::from(&path))
                {
                    Ok(status) => {
                        let conversation = &self.conversation;
                        match conversation.transcript().rewrite(conversation.timeline()) {
                            Ok(()) => println!("{status}"),
                            Err(err) => println!("❌ Could not write {path}: {err}"),
                        }
                    }
                    Err(err) => println!("❌ Could not open {path}: {err}"),
                }
            }
            ReplCommand::Log(None) => match self.conversation.transcript_mut().toggle() {
                Ok(status) | Err(status) => println!("{status}"),
            },
            ReplCommand::Help => {
                println!("{HELP}");
                println!("Transcript: {}", self.conversation.transcript().status());
            }
            ReplCommand::Quit => return false,
            ReplCommand::Unknown(message) => println!("{message}"),
        }
        true
    }

    pub fn apply_chat(&mut self, outcome: ChatOutcome, request_id: u64) {
        if let Some(message) = self.conversation.apply(outcome, request_id) {
            print!("{}", message_block(message));
        }
    }

    pub fn apply_upload(&mut self, id: &UploadId, event: UploadEvent) {
        if let Some(record) = self.tracker.apply(id, event) {
            println!("{}", record_line(record));
        }
    }

    /// Apply chat and upload results until nothing is in flight.
    pub async fn drain(
        &mut self,
        chat_rx: &mut ChatOutcomeReceiver,
        upload_rx: &mut UploadEventReceiver,
    ) {
        loop {
            let chatting = self.conversation.is_loading();
            let busy = self.tracker.is_busy();
            if !chatting && !busy {
                break;
            }
            tokio::select! {
                Some((outcome, request_id)) = chat_rx.recv(), if chatting => {
                    self.apply_chat(outcome, request_id);
                }
                Some((id, event)) = upload_rx.recv(), if busy => {
                    self.apply_upload(&id, event);
                }
                else => break,
            }
        }
    }

    fn upload(&mut self, paths: Vec<String>) {
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            match PendingFile::from_path(&path) {
                Ok(file) => files.push(file),
                Err(err) => println!("❌ {path}: {err}"),
            }
        }
        let report = self.tracker.drop_files(files);
        for rejection in &report.rejected {
            println!("{}", rejection_line(rejection));
        }
        for id in &report.accepted {
            if let Some(record) = self.tracker.get(id) {
                println!("{}", record_line(record));
            }
        }
    }
}

pub async fn run_chat(
    settings: &Settings,
    transcript: TranscriptLog,
) -> Result<(), Box<dyn Error>> {
    let backend = connect(settings)?;
    let (chat_service, mut chat_rx) = ChatService::new(backend.clone());
    let (upload_service, mut upload_rx) = UploadService::new(backend, settings.settle.clone());

    let options = ConversationOptions {
        session_id: settings.session_id.clone(),
        greeting: settings.greeting.clone(),
    };
    let mut session = Session {
        conversation: ConversationManager::new(chat_service, options).with_transcript(transcript),
        tracker: IngestionTracker::new(upload_service, settings.accept_policy),
    };

    eprintln!("🚀 docent: {}", settings.base_url);
    eprintln!("💡 Type a question, /help for commands, /quit to leave");
    for message in session.conversation.timeline() {
        print!("{}", message_block(message));
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    // Input closed: let the pending answer and uploads land.
                    session.drain(&mut chat_rx, &mut upload_rx).await;
                    break;
                };
                if !session.handle_line(&line) {
                    break;
                }
            }
            Some((outcome, request_id)) = chat_rx.recv() => {
                session.apply_chat(outcome, request_id);
            }
            Some((id, event)) = upload_rx.recv() => {
                session.apply_upload(&id, event);
            }
        }
    }

    if session.tracker.is_busy() {
        let pending: Vec<_> = session
            .tracker
            .records()
            .iter()
            .filter(|record| !record.is_terminal())
            .map(short_id)
            .collect();
        eprintln!("⚠️  Leaving with unfinished uploads: {}", pending.join(", "));
    }
    Ok(())
}
