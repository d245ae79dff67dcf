use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: String,
    pub description: String,
    /// Cleared once the first turn has persisted its system prompt
    #[serde(default = "default_true")]
    pub is_new_chat: bool,
    /// Model chosen for this chat; falls back to settings when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub total_tokens: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    pub created_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl Chat {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: "New Chat".to_string(),
            is_new_chat: true,
            model: None,
            total_tokens: 0,
            api_base: None,
            api_version: None,
            created_at: Utc::now(),
        }
    }
}
