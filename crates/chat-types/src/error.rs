use thiserror::Error;

use crate::event::{Notice, NoticeLevel};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChatError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Upstream error (HTTP {status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Cancelled")]
    Cancelled,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JS interop error: {0}")]
    JsInterop(String),
}

impl ChatError {
    /// User-facing notice for this error.
    pub fn notice(&self) -> Notice {
        match self {
            ChatError::Cancelled => Notice::new(
                NoticeLevel::Warning,
                "Stopped",
                "Stopped generating message.",
            ),
            ChatError::Validation(message) | ChatError::Auth(message) => {
                Notice::error(message.clone())
            }
            ChatError::Network(_) => Notice::error("No internet connection."),
            ChatError::Upstream { message, .. } => Notice::error(message.clone()),
            other => Notice::error(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(e: serde_json::Error) -> Self {
        ChatError::Serialization(e.to_string())
    }
}
