//! Error types for the chat subsystem.

use thiserror::Error;

use crate::chat::core::ids::ConversationId;

/// Chat subsystem error type.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Invalid configuration or unsupported values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// `SQLite` storage error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Key pattern failed to compile.
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
    /// A storage key contains characters the backend cannot store.
    #[error("invalid storage key {0:?}")]
    InvalidKey(String),
    /// A blocking storage task panicked or was cancelled.
    #[error("storage task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
    /// Identifier could not be parsed.
    #[error("invalid id: {0}")]
    InvalidId(#[from] uuid::Error),
    /// The persisted collection could not be deserialized.
    #[error("stored collection under {key:?} is corrupted: {reason}")]
    CorruptedStore {
        /// Storage key holding the corrupted payload.
        key: String,
        /// Parser error message.
        reason: String,
    },
    /// A message was appended while no conversation was active.
    #[error("no active conversation to add message to")]
    NoActiveConversation,
    /// Message content was empty after trimming.
    #[error("message content must not be empty")]
    EmptyMessage,
    /// Rating outside of 1..=5.
    #[error("rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),
    /// A simulated reply is still pending for the conversation.
    #[error("a reply is already pending for conversation {0}")]
    ReplyPending(ConversationId),
    /// Conversation lookup failed.
    #[error("conversation {0} not found")]
    ConversationNotFound(ConversationId),
    /// An internal lock was poisoned by a panicking writer.
    #[error("lock poisoned: {0}")]
    LockPoisoned(&'static str),
}

/// Convenience result alias for chat operations.
pub type ChatResult<T> = Result<T, ChatError>;
