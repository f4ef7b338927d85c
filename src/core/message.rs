use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn is_user(self) -> bool {
        self == Role::User
    }

    pub fn is_assistant(self) -> bool {
        self == Role::Assistant
    }
}

impl AsRef<str> for Role {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<&str> for Role {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            _ => Err(format!("invalid message role: {value}")),
        }
    }
}

/// Opaque identifier for a timeline entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId(String);

impl MessageId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A backend-supplied pointer to the excerpt that supports an answer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Citation {
    pub filename: String,
    #[serde(default)]
    pub page: Option<u32>,
    /// A `null` score decodes as 0.
    #[serde(default, deserialize_with = "null_as_default")]
    pub relevance_score: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub excerpt: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Citation {
    /// Clamp the score into `[0, 1]` and drop page numbers below 1.
    pub fn normalized(mut self) -> Self {
        self.relevance_score = if self.relevance_score.is_nan() {
            0.0
        } else {
            self.relevance_score.clamp(0.0, 1.0)
        };
        if self.page == Some(0) {
            self.page = None;
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub sources: Option<Vec<Citation>>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            role: Role::User,
            content: content.into(),
            created_at: Utc::now(),
            sources: None,
        }
    }

    /// Assistant reply carrying the citations the backend returned.
    pub fn assistant(content: impl Into<String>, sources: Vec<Citation>) -> Self {
        Self {
            id: MessageId::generate(),
            role: Role::Assistant,
            content: content.into(),
            created_at: Utc::now(),
            sources: Some(sources),
        }
    }

    /// Assistant-authored text with no sources (greetings, failure notices).
    pub fn assistant_plain(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            role: Role::Assistant,
            content: content.into(),
            created_at: Utc::now(),
            sources: None,
        }
    }

    pub fn is_user(&self) -> bool {
        self.role.is_user()
    }

    pub fn is_assistant(&self) -> bool {
        self.role.is_assistant()
    }

    pub fn sources(&self) -> &[Citation] {
        self.sources.as_deref().unwrap_or(&[])
    }
}

/// Returned when a message would break the timeline's invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineError {
    DuplicateId(MessageId),
    UserWithSources(MessageId),
}

impl fmt::Display for TimelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimelineError::DuplicateId(id) => write!(f, "message {id} is already in the timeline"),
            TimelineError::UserWithSources(id) => {
                write!(f, "user message {id} cannot carry sources")
            }
        }
    }
}

impl std::error::Error for TimelineError {}

/// Append-only, insertion-ordered sequence of messages for one conversation.
#[derive(Debug, Default, Clone)]
pub struct Timeline {
    messages: VecDeque<Message>,
    ids: HashSet<MessageId>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) -> Result<(), TimelineError> {
        if message.is_user() && message.sources.is_some() {
            return Err(TimelineError::UserWithSources(message.id));
        }
        if !self.ids.insert(message.id.clone()) {
            return Err(TimelineError::DuplicateId(message.id));
        }
        self.messages.push_back(message);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.back()
    }

    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }
}

impl<'a> IntoIterator for &'a Timeline {
    type Item = &'a Message;
    type IntoIter = std::collections::vec_deque::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_role_strings_are_rejected() {
        assert!(Role::try_from("system").is_err());
        assert_eq!(Role::try_from("assistant"), Ok(Role::Assistant));
    }

    #[test]
    fn user_messages_never_carry_sources() {
        let mut timeline = Timeline::new();
        let mut message = Message::user("Hva er GPS?");
        message.sources = Some(Vec::new());

        let err = timeline.push(message).expect_err("user sources must be rejected");
        assert!(matches!(err, TimelineError::UserWithSources(_)));
        assert!(timeline.is_empty());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut timeline = Timeline::new();
        let message = Message::user("first");
        timeline.push(message.clone()).expect("first push");

        let err = timeline.push(message).expect_err("duplicate must be rejected");
        assert!(matches!(err, TimelineError::DuplicateId(_)));
        assert_eq!(timeline.len(), 1);
    }

    #[test]
    fn timeline_keeps_insertion_order() {
        let mut timeline = Timeline::new();
        timeline.push(Message::user("a")).unwrap();
        timeline.push(Message::assistant("b", Vec::new())).unwrap();
        timeline.push(Message::user("c")).unwrap();

        let contents: Vec<_> = timeline.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["a", "b", "c"]);
    }

    #[test]
    fn citation_normalization_clamps_score_and_page() {
        let citation = Citation {
            filename: "u-blox-m8.pdf".to_string(),
            page: Some(0),
            relevance_score: 1.7,
            excerpt: "NMEA".to_string(),
        }
        .normalized();

        assert_eq!(citation.page, None);
        assert_eq!(citation.relevance_score, 1.0);

        let negative = Citation {
            relevance_score: -0.2,
            page: Some(3),
            ..citation
        }
        .normalized();
        assert_eq!(negative.relevance_score, 0.0);
        assert_eq!(negative.page, Some(3));
    }

    #[test]
    fn null_citation_fields_decode_as_defaults() {
        let citation: Citation = serde_json::from_str(
            r#"{"filename": "m8.pdf", "page": null, "relevance_score": null, "excerpt": null}"#,
        )
        .expect("null fields decode");

        assert_eq!(citation.page, None);
        assert_eq!(citation.relevance_score, 0.0);
        assert_eq!(citation.excerpt, "");
    }
}
