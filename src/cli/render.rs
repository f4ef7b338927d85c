//! Plain-text rendering of timeline messages and upload records.

use crate::core::ingestion::{format_file_size, Rejection, UploadRecord, UploadStatus};
use crate::core::message::{Citation, Message};

const EXCERPT_CHARS: usize = 160;
const SHORT_ID_CHARS: usize = 8;

pub fn message_block(message: &Message) -> String {
    let speaker = if message.is_user() { "You" } else { "Assistant" };
    let mut out = format!("{speaker}: {}\n", message.content);
    let sources = message.sources();
    if !sources.is_empty() {
        out.push_str("  Sources:\n");
        for (index, citation) in sources.iter().enumerate() {
            out.push_str(&format!("  [{}] {}\n", index + 1, citation_label(citation)));
            let excerpt = excerpt(&citation.excerpt);
            if !excerpt.is_empty() {
                out.push_str(&format!("      \"{excerpt}\"\n"));
            }
        }
    }
    out
}

fn citation_label(citation: &Citation) -> String {
    let relevance = (citation.relevance_score * 100.0).round() as u32;
    match citation.page {
        Some(page) => format!("{}, p. {page} ({relevance}% relevant)", citation.filename),
        None => format!("{} ({relevance}% relevant)", citation.filename),
    }
}

fn excerpt(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= EXCERPT_CHARS {
        return collapsed;
    }
    let mut cut: String = collapsed.chars().take(EXCERPT_CHARS).collect();
    cut.push('…');
    cut
}

pub fn short_id(record: &UploadRecord) -> &str {
    let id = record.id().as_str();
    match id.char_indices().nth(SHORT_ID_CHARS) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

pub fn record_line(record: &UploadRecord) -> String {
    let marker = match record.status() {
        UploadStatus::Completed => "✅",
        UploadStatus::Failed => "❌",
        _ => "⏳",
    };
    let mut line = format!(
        "{marker} {} {} ({}) {} {}%",
        short_id(record),
        record.filename(),
        format_file_size(record.size_bytes()),
        record.status(),
        record.progress()
    );
    if let Some(reason) = record.failure() {
        line.push_str(&format!(": {reason}"));
    }
    line
}

pub fn rejection_line(rejection: &Rejection) -> String {
    format!("❌ {rejection}")
}
