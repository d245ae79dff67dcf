//! Typed record store on top of StoragePort.
//!
//! Three key spaces, one JSON record per key:
//!   chats:<id>
//!   messages:<chat_id>:<message_id>
//!   settings:<id>
//!
//! The chat id inside a message key is percent-encoded, so a `:` in one
//! chat's id cannot widen another chat's prefix. Messages of a chat are
//! found by prefix listing and returned in `(created_at, seq)` order.

use std::rc::Rc;
use serde::{de::DeserializeOwned, Serialize};
use chat_types::{
    ChatError, Result,
    chat::Chat,
    message::MessageRecord,
    settings::{Settings, GENERAL_SETTINGS_ID},
};
use crate::ports::StoragePort;

const CHAT_PREFIX: &str = "chats:";
const MESSAGE_PREFIX: &str = "messages:";
const SETTINGS_PREFIX: &str = "settings:";

#[derive(Clone)]
pub struct ChatDb {
    storage: Rc<dyn StoragePort>,
}

impl ChatDb {
    pub fn new(storage: Rc<dyn StoragePort>) -> Self {
        Self { storage }
    }

    pub fn backend_name(&self) -> &str {
        self.storage.backend_name()
    }

    // ─── Chats ───────────────────────────────────────────────

    pub async fn chat(&self, id: &str) -> Result<Option<Chat>> {
        self.read(&chat_key(id)).await
    }

    pub async fn put_chat(&self, chat: &Chat) -> Result<()> {
        self.write(&chat_key(&chat.id), chat).await
    }

    /// Load the chat, creating it on first use.
    pub async fn ensure_chat(&self, id: &str) -> Result<Chat> {
        if let Some(chat) = self.chat(id).await? {
            return Ok(chat);
        }
        let chat = Chat::new(id);
        self.put_chat(&chat).await?;
        log::debug!("Created chat {}", id);
        Ok(chat)
    }

    /// Read-modify-write of a chat record.
    pub async fn modify_chat(&self, id: &str, f: impl FnOnce(&mut Chat)) -> Result<Chat> {
        let mut chat = self
            .chat(id)
            .await?
            .ok_or_else(|| ChatError::Storage(format!("Chat not found: {}", id)))?;
        f(&mut chat);
        self.put_chat(&chat).await?;
        Ok(chat)
    }

    /// Add to the chat's running token estimate; returns the new total.
    pub async fn add_tokens(&self, id: &str, tokens: u64) -> Result<u64> {
        let chat = self
            .modify_chat(id, |chat| chat.total_tokens = chat.total_tokens.saturating_add(tokens))
            .await?;
        Ok(chat.total_tokens)
    }

    pub async fn list_chats(&self) -> Result<Vec<Chat>> {
        let mut chats: Vec<Chat> = self.read_prefix(CHAT_PREFIX).await?;
        chats.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(chats)
    }

    // ─── Messages ────────────────────────────────────────────

    /// Insert a message, assigning its position within the chat.
    pub async fn add_message(&self, message: &MessageRecord) -> Result<MessageRecord> {
        let prefix = messages_prefix(&message.chat_id);
        let existing = self.storage.list_keys(&prefix).await?;
        let mut record = message.clone();
        record.seq = existing.len() as u64;
        self.write(&message_key(&record.chat_id, &record.id), &record).await?;
        Ok(record)
    }

    pub async fn message(&self, chat_id: &str, id: &str) -> Result<Option<MessageRecord>> {
        self.read(&message_key(chat_id, id)).await
    }

    /// Overwrite a message's content and generating flag.
    pub async fn update_message(
        &self,
        chat_id: &str,
        id: &str,
        content: &str,
        is_generating: bool,
    ) -> Result<MessageRecord> {
        let mut record = self
            .message(chat_id, id)
            .await?
            .ok_or_else(|| ChatError::Storage(format!("Message not found: {}", id)))?;
        record.content = content.to_string();
        record.is_generating = is_generating;
        self.write(&message_key(chat_id, id), &record).await?;
        Ok(record)
    }

    /// Messages of a chat, oldest first.
    pub async fn messages(&self, chat_id: &str) -> Result<Vec<MessageRecord>> {
        let mut messages: Vec<MessageRecord> = self.read_prefix(&messages_prefix(chat_id)).await?;
        messages.retain(|m| m.chat_id == chat_id);
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.seq.cmp(&b.seq)));
        Ok(messages)
    }

    /// Clear `is_generating` on messages left behind by an interrupted turn.
    /// Content is not touched. Returns how many records changed.
    pub async fn settle_generating(&self, chat_id: &str) -> Result<usize> {
        let mut settled = 0;
        for mut message in self.messages(chat_id).await? {
            if message.is_generating {
                message.is_generating = false;
                self.write(&message_key(chat_id, &message.id), &message).await?;
                settled += 1;
            }
        }
        Ok(settled)
    }

    // ─── Settings ────────────────────────────────────────────

    /// The "general" settings record, if one was ever saved.
    pub async fn settings(&self) -> Result<Option<Settings>> {
        self.read(&settings_key(GENERAL_SETTINGS_ID)).await
    }

    pub async fn put_settings(&self, settings: &Settings) -> Result<()> {
        self.write(&settings_key(&settings.id), settings).await
    }

    // ─── Helpers ─────────────────────────────────────────────

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.storage.get(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.storage.set(key, &bytes).await
    }

    async fn read_prefix<T: DeserializeOwned>(&self, prefix: &str) -> Result<Vec<T>> {
        let mut records = Vec::new();
        for key in self.storage.list_keys(prefix).await? {
            if let Some(record) = self.read(&key).await? {
                records.push(record);
            }
        }
        Ok(records)
    }
}

fn chat_key(id: &str) -> String {
    format!("{}{}", CHAT_PREFIX, id)
}

fn messages_prefix(chat_id: &str) -> String {
    format!("{}{}:", MESSAGE_PREFIX, urlencoding::encode(chat_id))
}

fn message_key(chat_id: &str, id: &str) -> String {
    format!("{}{}", messages_prefix(chat_id), id)
}

fn settings_key(id: &str) -> String {
    format!("{}{}", SETTINGS_PREFIX, id)
}
