//! Simulated assistant chat: conversation persistence and canned responses.
//!
//! This module is organized into:
//! - `core`: Configuration, errors, IDs, clock, conversation records
//! - `storage`: Key-value backends and the whole-collection conversation store
//! - `matching`: Canned corpus, response matcher and suggestions
//! - `engine`: Chat service and cancellable delayed replies

pub mod core;
pub mod engine;
pub mod matching;
pub mod storage;

// Re-export commonly used types for convenience
pub use core::{
    BackendKind, ChatConfig, ChatError, ChatResult, Clock, Conversation, ConversationId,
    ConversationPatch, CorruptionPolicy, DEFAULT_TITLE, ManualClock, Message, MessageId, Reaction,
    SystemClock,
};
pub use engine::{ChatService, ReplyScheduler};
pub use matching::{Corpus, MatchKind, MatchOutcome, QaPair, ResponseMatcher, Suggestion};
pub use storage::{
    ConversationStore, FileBackend, KeyValueBackend, LoadOutcome, MemoryBackend, SqliteBackend,
    open_backend,
};
