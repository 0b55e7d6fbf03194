//! Conversation model: messages and the in-memory transcript.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// A single transcript entry. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    content: String,
    timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// The `{role, content}` pair sent to chat APIs.
    pub fn to_chat_message(&self) -> ChatMessage {
        ChatMessage {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

/// Role/content pair as it goes over the wire to a chat-completion API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Ordered conversation history for one session.
///
/// Insertion order is significant and there is no eviction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The trailing `n` messages (fewer if the transcript is shorter).
    pub fn recent(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serde_lowercase() {
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
        let role: Role = serde_json::from_str("\"system\"").unwrap();
        assert_eq!(role, Role::System);
    }

    #[test]
    fn test_recent_window() {
        let mut transcript = Transcript::new();
        for i in 0..15 {
            transcript.push(Message::user(format!("msg {i}")));
        }

        let window = transcript.recent(10);
        assert_eq!(window.len(), 10);
        assert_eq!(window[0].content(), "msg 5");
        assert_eq!(window[9].content(), "msg 14");

        assert_eq!(transcript.recent(100).len(), 15);
        assert!(Transcript::new().recent(10).is_empty());
    }

    #[test]
    fn test_recent_pair_for_display() {
        let mut transcript = Transcript::new();
        transcript.push(Message::user("first"));
        transcript.push(Message::assistant("one"));
        transcript.push(Message::user("second"));
        transcript.push(Message::assistant("two"));

        let pair = transcript.recent(2);
        assert_eq!(pair.len(), 2);
        assert_eq!(pair[0].content(), "second");
        assert_eq!(pair[1].content(), "two");
    }

    #[test]
    fn test_clear() {
        let mut transcript = Transcript::new();
        transcript.push(Message::user("hi"));
        transcript.push(Message::assistant("hello"));
        assert_eq!(transcript.len(), 2);

        transcript.clear();
        assert!(transcript.is_empty());
    }

    #[test]
    fn test_chat_message_conversion() {
        let msg = Message::assistant("yo");
        let wire = serde_json::to_value(msg.to_chat_message()).unwrap();
        assert_eq!(wire["role"], "assistant");
        assert_eq!(wire["content"], "yo");
        assert!(wire.get("timestamp").is_none());
    }
}
