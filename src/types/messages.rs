//! Canonical message types shared by every backend.

use serde::{Deserialize, Serialize};

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message from the user/human
    User,
    /// Message from the AI assistant
    Assistant,
    /// System message (instructions, context)
    System,
}

impl MessageRole {
    /// Lowercase wire name used by every backend
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
        }
    }
}

/// A single role-tagged message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: MessageRole,
    /// Plain text content
    pub text: String,
}

impl Message {
    /// Create a new user message
    pub fn user<S: Into<String>>(text: S) -> Self {
        Self::new(MessageRole::User, text)
    }

    /// Create a new assistant message
    pub fn assistant<S: Into<String>>(text: S) -> Self {
        Self::new(MessageRole::Assistant, text)
    }

    /// Create a new system message
    pub fn system<S: Into<String>>(text: S) -> Self {
        Self::new(MessageRole::System, text)
    }

    pub fn new<S: Into<String>>(role: MessageRole, text: S) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }
}

/// An ordered conversation plus an optional system prompt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Messages {
    /// The list of messages in conversation order
    pub messages: Vec<Message>,
    /// Optional system prompt for the conversation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl Messages {
    /// Create a new empty message collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new message collection with a system prompt
    pub fn with_system_prompt<S: Into<String>>(system_prompt: S) -> Self {
        Self {
            messages: Vec::new(),
            system_prompt: Some(system_prompt.into()),
        }
    }

    /// Add a message to the collection
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Convenience method to add a user message
    pub fn add_user_message(&mut self, text: &str) {
        self.push(Message::user(text));
    }

    /// Convenience method to add an assistant message
    pub fn add_assistant_message(&mut self, text: &str) {
        self.push(Message::assistant(text));
    }

    /// The effective system prompt: the explicit prompt followed by any
    /// system-role messages, joined by newlines.
    pub fn system_text(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .system_prompt
            .iter()
            .map(String::as_str)
            .chain(
                self.messages
                    .iter()
                    .filter(|m| m.role == MessageRole::System)
                    .map(|m| m.text.as_str()),
            )
            .filter(|text| !text.is_empty())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n"))
        }
    }

    /// Conversation turns with system messages removed and consecutive
    /// same-role messages merged into one, joined by a blank line.
    ///
    /// Empty messages are dropped. The result never has more entries than
    /// the input and strictly alternates roles.
    pub fn alternating_turns(&self) -> Vec<Message> {
        let mut turns: Vec<Message> = Vec::with_capacity(self.messages.len());

        for message in &self.messages {
            if message.role == MessageRole::System || message.text.is_empty() {
                continue;
            }
            match turns.last_mut() {
                Some(last) if last.role == message.role => {
                    last.text.push_str("\n\n");
                    last.text.push_str(&message.text);
                }
                _ => turns.push(message.clone()),
            }
        }

        turns
    }
}

impl std::ops::Deref for Messages {
    type Target = Vec<Message>;

    fn deref(&self) -> &Self::Target {
        &self.messages
    }
}

impl From<Vec<Message>> for Messages {
    fn from(messages: Vec<Message>) -> Self {
        Self {
            messages,
            system_prompt: None,
        }
    }
}
