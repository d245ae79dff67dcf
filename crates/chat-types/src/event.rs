use serde::{Deserialize, Serialize};

/// Events published by the conversation controller.
/// UI subscribes to these instead of polling the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChatEvent {
    /// A turn passed validation; the assistant placeholder is `message_id`
    TurnStart { chat_id: String, message_id: String },

    /// A message was inserted into the chat
    MessageAdded { chat_id: String, message_id: String },

    /// A message's content was rewritten by stream reconciliation
    MessageUpdated {
        chat_id: String,
        message_id: String,
        content: String,
        is_generating: bool,
    },

    /// The turn finished; `total_tokens` is the chat's new running total
    TurnEnd { chat_id: String, message_id: String, total_tokens: u64 },

    /// Something the user should see
    Notice(Notice),
}

impl ChatEvent {
    /// Chat this event concerns, if any.
    pub fn chat_id(&self) -> Option<&str> {
        match self {
            ChatEvent::TurnStart { chat_id, .. }
            | ChatEvent::MessageAdded { chat_id, .. }
            | ChatEvent::MessageUpdated { chat_id, .. }
            | ChatEvent::TurnEnd { chat_id, .. } => Some(chat_id),
            ChatEvent::Notice(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, "Error", message)
    }
}
