//! Stream reconciliation: turns completion fragments into persisted state.
//!
//! Non-final content is stored with the cursor glyph appended and the
//! message marked as generating. Final content is stored verbatim, the flag
//! is cleared, and the chat's token total grows by the content's token count.

use chat_types::{
    ChatError, Result,
    event::ChatEvent,
    message::CURSOR_GLYPH,
};
use crate::ports::CancellationToken;
use crate::event_bus::EventBus;
use crate::store::ChatDb;
use crate::tokens::count_tokens;

/// Cumulative content of the target message after one stream event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentUpdate {
    pub content: String,
    pub is_final: bool,
}

/// Folds content fragments into cumulative text.
#[derive(Debug, Default)]
pub struct ContentAccumulator {
    text: String,
}

impl ContentAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fragment: &str) -> ContentUpdate {
        self.text.push_str(fragment);
        ContentUpdate { content: self.text.clone(), is_final: false }
    }

    pub fn finish(&self) -> ContentUpdate {
        ContentUpdate { content: self.text.clone(), is_final: true }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Sole writer of one assistant message for the duration of a turn.
pub struct StreamReconciler {
    db: ChatDb,
    bus: EventBus,
    cancel: CancellationToken,
    chat_id: String,
    message_id: String,
    /// Chat total after token accounting; set at most once
    total_tokens: Option<u64>,
}

impl StreamReconciler {
    pub fn new(
        db: ChatDb,
        bus: EventBus,
        cancel: CancellationToken,
        chat_id: impl Into<String>,
        message_id: impl Into<String>,
    ) -> Self {
        Self {
            db,
            bus,
            cancel,
            chat_id: chat_id.into(),
            message_id: message_id.into(),
            total_tokens: None,
        }
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn is_finalized(&self) -> bool {
        self.total_tokens.is_some()
    }

    /// Persist one update. Returns the chat's token total once finalized.
    /// Nothing is written after the turn's token has been cancelled.
    pub async fn apply(&mut self, update: &ContentUpdate) -> Result<Option<u64>> {
        if self.cancel.is_cancelled() {
            return Err(ChatError::Cancelled);
        }

        if !update.is_final {
            let shown = format!("{}{}", update.content, CURSOR_GLYPH);
            self.write(&shown, true).await?;
            return Ok(None);
        }

        self.write(&update.content, false).await?;

        // A replayed final rewrites the same content but is counted once.
        if let Some(total) = self.total_tokens {
            return Ok(Some(total));
        }
        let tokens = count_tokens(&update.content);
        let total = self.db.add_tokens(&self.chat_id, tokens).await?;
        log::debug!(
            "Chat {}: +{} tokens (total {})",
            self.chat_id, tokens, total
        );
        self.total_tokens = Some(total);
        Ok(Some(total))
    }

    async fn write(&self, content: &str, is_generating: bool) -> Result<()> {
        self.db
            .update_message(&self.chat_id, &self.message_id, content, is_generating)
            .await?;
        self.bus.emit(ChatEvent::MessageUpdated {
            chat_id: self.chat_id.clone(),
            message_id: self.message_id.clone(),
            content: content.to_string(),
            is_generating,
        });
        Ok(())
    }
}
