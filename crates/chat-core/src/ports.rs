//! Port traits: the hexagonal architecture boundary.
//!
//! These traits are defined here in `chat-core` (pure Rust).
//! Implementations live in `chat-platform` (browser adapters).
//! The core never imports platform code; it only depends on these traits.

use std::pin::Pin;
use async_trait::async_trait;
use futures::Stream;
use chat_types::{
    ChatError, Result,
    config::Connection,
    message::ChatMessage,
};

pub use tokio_util::sync::CancellationToken;

// ─── Completion Port ─────────────────────────────────────────

/// Streaming event from a completion response
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionEvent {
    /// A content fragment, to be appended to what came before
    Delta(String),
    /// Stream finished
    Done,
    /// Error during streaming
    Error(ChatError),
}

/// Request to send to the completion endpoint.
/// Carries its own connection so adapters hold no ambient configuration.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub connection: Connection,
}

/// Complete (non-streaming) response
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub message: ChatMessage,
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[async_trait(?Send)]
pub trait CompletionPort {
    /// Non-streaming chat completion
    async fn complete(&self, req: CompletionRequest) -> Result<CompletionResponse>;

    /// Streaming chat completion. The adapter stops producing events once
    /// `cancel` fires; it does not retry.
    fn stream_complete(
        &self,
        req: CompletionRequest,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Stream<Item = CompletionEvent>>>;

    /// List models offered by the endpoint
    async fn list_models(&self, connection: &Connection) -> Result<Vec<String>>;
}

// ─── Storage Port ────────────────────────────────────────────

#[async_trait(?Send)]
pub trait StoragePort {
    /// Get a value by key
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Set a value
    async fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Delete a value
    async fn delete(&self, key: &str) -> Result<()>;

    /// List keys with a given prefix
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>>;

    /// Check if a key exists
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Name of this backend (for logging/debug)
    fn backend_name(&self) -> &str;
}
