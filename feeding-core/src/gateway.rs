//! Outbound port to the chat surface.

use async_trait::async_trait;

use crate::ids::{ChatId, MessageId};
use crate::view::View;

/// Result type for gateway operations.
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Gateway I/O failure.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("{method} rejected: {description}")]
    Api { method: String, description: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Operation timed out")]
    Timeout,
}

/// Sends, edits and deletes messages in a chat.
///
/// Implementations render the [`View`] in whatever form the surface needs.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Post a new message and return its id.
    async fn send(&self, chat: ChatId, view: &View) -> ChannelResult<MessageId>;

    /// Replace the content of an existing message.
    async fn edit(&self, chat: ChatId, message: MessageId, view: &View) -> ChannelResult<()>;

    /// Remove a message.
    async fn delete(&self, chat: ChatId, message: MessageId) -> ChannelResult<()>;
}
