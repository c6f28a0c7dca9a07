//! Conversation messages and history.
//!
//! A conversation is an ordered, append-only list of role-tagged messages.
//! It is replayed in full with every request, so the order of the entries
//! is the order the model sees them in.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// The author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Instructions that set up the assistant's behaviour.
    System,
    /// A turn typed by the user.
    User,
    /// A reply produced by the model.
    Assistant,
}

impl MessageRole {
    /// Wire representation of the role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageRole {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Self::System),
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(CoreError::UnknownRole(other.to_string())),
        }
    }
}

/// One turn of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who wrote the message.
    pub role: MessageRole,
    /// Message text (Markdown).
    pub content: String,
}

impl Message {
    /// Create a message with an explicit role.
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Create a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// Ordered conversation history.
///
/// Entries can only be appended; the history is replaced as a whole when a
/// new conversation starts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Create an empty conversation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a conversation that starts with a system prompt.
    ///
    /// A blank prompt produces an empty conversation.
    #[must_use]
    pub fn with_system_prompt(prompt: &str) -> Self {
        let mut conversation = Self::new();
        if !prompt.trim().is_empty() {
            conversation.push(Message::system(prompt));
        }
        conversation
    }

    /// Append a message.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// All messages in order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The most recent message, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the conversation has no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl From<Vec<Message>> for Conversation {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&MessageRole::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");

        let parsed: MessageRole = serde_json::from_str("\"system\"").unwrap();
        assert_eq!(parsed, MessageRole::System);
    }

    #[test]
    fn role_from_str() {
        assert_eq!("user".parse::<MessageRole>().unwrap(), MessageRole::User);
        assert!(matches!(
            "tool".parse::<MessageRole>(),
            Err(CoreError::UnknownRole(role)) if role == "tool"
        ));
    }

    #[test]
    fn message_serializes_as_wire_object() {
        let msg = Message::user("hi");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, serde_json::json!({"role": "user", "content": "hi"}));
    }

    #[test]
    fn conversation_with_system_prompt() {
        let conversation = Conversation::with_system_prompt("Be terse.");
        assert_eq!(conversation.len(), 1);
        assert_eq!(conversation.messages()[0], Message::system("Be terse."));
    }

    #[test]
    fn conversation_with_blank_prompt_is_empty() {
        let conversation = Conversation::with_system_prompt("   ");
        assert!(conversation.is_empty());
    }

    #[test]
    fn conversation_keeps_order() {
        let mut conversation = Conversation::new();
        conversation.push(Message::user("one"));
        conversation.push(Message::assistant("two"));

        let roles: Vec<_> = conversation.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![MessageRole::User, MessageRole::Assistant]);
        assert_eq!(conversation.last().map(|m| m.content.as_str()), Some("two"));
    }

    #[test]
    fn conversation_serializes_as_array() {
        let conversation = Conversation::from(vec![Message::user("hi")]);
        let value = serde_json::to_value(&conversation).unwrap();
        assert_eq!(value, serde_json::json!([{"role": "user", "content": "hi"}]));
    }
}
