//! One-shot "ask" command

use std::error::Error;

use crate::cli::connect;
use crate::cli::render::message_block;
use crate::core::config::Settings;
use crate::core::conversation::{ChatService, ConversationManager, ConversationOptions};
use crate::utils::logging::TranscriptLog;

pub async fn run_ask(
    prompt: String,
    settings: &Settings,
    transcript: TranscriptLog,
) -> Result<(), Box<dyn Error>> {
    if prompt.trim().is_empty() {
        eprintln!("Usage: docent ask <prompt>");
        std::process::exit(1);
    }

    let (service, mut rx) = ChatService::new(connect(settings)?);
    let options = ConversationOptions {
        session_id: settings.session_id.clone(),
        greeting: None,
    };
    let mut conversation = ConversationManager::new(service, options).with_transcript(transcript);

    if conversation.submit(&prompt).is_none() {
        return Ok(());
    }
    if let Some(reply) = conversation.await_reply(&mut rx).await {
        print!("{}", message_block(reply));
    }
    Ok(())
}
