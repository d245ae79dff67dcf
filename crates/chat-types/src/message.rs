use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Marker appended to assistant content while a response is still streaming.
pub const CURSOR_GLYPH: &str = "█";

/// Role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A persisted message, owned by exactly one chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    pub chat_id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub is_generating: bool,
    /// Insertion position within the chat; breaks ties between equal timestamps.
    #[serde(default)]
    pub seq: u64,
}

impl MessageRecord {
    pub fn new(chat_id: impl Into<String>, role: Role, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            chat_id: chat_id.into(),
            role,
            content: content.into(),
            created_at: Utc::now(),
            is_generating: false,
            seq: 0,
        }
    }

    /// Empty assistant turn showing only the cursor glyph.
    pub fn placeholder(chat_id: impl Into<String>) -> Self {
        Self {
            is_generating: true,
            ..Self::new(chat_id, Role::Assistant, CURSOR_GLYPH)
        }
    }

    /// Role/content pair as sent to the completion endpoint.
    /// A glyph left behind on an interrupted assistant answer is not part
    /// of the text; other roles are sent as written.
    pub fn to_chat_message(&self) -> ChatMessage {
        let content = match self.role {
            Role::Assistant => self
                .content
                .strip_suffix(CURSOR_GLYPH)
                .unwrap_or(&self.content),
            Role::System | Role::User => &self.content,
        };
        ChatMessage {
            role: self.role,
            content: content.to_string(),
        }
    }
}

/// A role/content pair on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self { role: Role::System, content: text.into() }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, content: text.into() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: text.into() }
    }
}
