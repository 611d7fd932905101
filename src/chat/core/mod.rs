//! Core chat types, identifiers, configuration and errors.

pub mod clock;
pub mod config;
pub mod conversation;
pub mod errors;
pub mod ids;

pub use clock::{Clock, ManualClock, SystemClock, format_date};
pub use config::{
    BackendKind, ChatConfig, CorruptionPolicy, MatcherConfig, ServerConfig, SessionConfig,
    StorageConfig,
};
pub use conversation::{
    Conversation, ConversationPatch, DEFAULT_TITLE, MAX_RATING, MIN_RATING, Message, Reaction,
    TITLE_MAX_CHARS, derive_title, validate_rating,
};
pub use errors::{ChatError, ChatResult};
pub use ids::{ConversationId, MessageId};
