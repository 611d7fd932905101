//! Conversation and message records as persisted in the collection blob.
//!
//! Field names follow the stored JSON layout (`isUser`, `createdAt`,
//! `updatedAt`), so existing collections load without migration.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::core::ids::{ConversationId, MessageId};

/// Title given to a conversation until its first user message.
pub const DEFAULT_TITLE: &str = "New Chat";

/// Number of characters kept when deriving a title.
pub const TITLE_MAX_CHARS: usize = 20;

/// Lowest accepted rating.
pub const MIN_RATING: u8 = 1;

/// Highest accepted rating.
pub const MAX_RATING: u8 = 5;

/// Reaction a user can leave on a message.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reaction {
    /// Thumbs up.
    Like,
    /// Thumbs down.
    Dislike,
}

impl Reaction {
    /// Stable string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Dislike => "dislike",
        }
    }
}

impl fmt::Display for Reaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One turn in a conversation.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Message identifier.
    pub id: MessageId,
    /// Text content.
    pub content: String,
    /// Whether the user (rather than the assistant) wrote it.
    pub is_user: bool,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// Optional reaction; stored as `null` when absent.
    #[serde(default)]
    pub reaction: Option<Reaction>,
}

impl Message {
    /// Build a user message.
    #[must_use]
    pub fn user(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(content, true, timestamp)
    }

    /// Build an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(content, false, timestamp)
    }

    fn new(content: impl Into<String>, is_user: bool, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: MessageId::new(),
            content: content.into(),
            is_user,
            timestamp,
            reaction: None,
        }
    }
}

/// A titled, ordered list of messages plus optional rating and feedback.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Conversation identifier.
    pub id: ConversationId,
    /// Display title.
    pub title: String,
    /// Messages in chronological order.
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
    /// Optional 1-5 rating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    /// Optional free-text feedback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

impl Conversation {
    /// Create an empty conversation titled [`DEFAULT_TITLE`].
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            id: ConversationId::new(),
            title: DEFAULT_TITLE.to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            rating: None,
            feedback: None,
        }
    }

    /// Refresh `updated_at`, never moving it backwards or before `created_at`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now.max(self.updated_at).max(self.created_at);
    }

    /// Append a message, deriving the title from the first user message.
    pub fn push_message(&mut self, message: Message, now: DateTime<Utc>) {
        if message.is_user && self.title == DEFAULT_TITLE && !self.has_user_message() {
            self.title = derive_title(&message.content);
        }
        self.messages.push(message);
        self.touch(now);
    }

    /// Whether any user message has been recorded.
    #[must_use]
    pub fn has_user_message(&self) -> bool {
        self.messages.iter().any(|m| m.is_user)
    }

    /// Set or clear a message reaction. Returns `false` if the message is unknown.
    pub fn set_reaction(
        &mut self,
        message_id: MessageId,
        reaction: Option<Reaction>,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(message) = self.messages.iter_mut().find(|m| m.id == message_id) else {
            return false;
        };
        message.reaction = reaction;
        self.touch(now);
        true
    }
}

/// Derive a title from a user message: at most [`TITLE_MAX_CHARS`]
/// characters, with `...` appended when the message was longer.
#[must_use]
pub fn derive_title(content: &str) -> String {
    if content.chars().count() > TITLE_MAX_CHARS {
        let head: String = content.chars().take(TITLE_MAX_CHARS).collect();
        format!("{head}...")
    } else {
        content.to_string()
    }
}

/// Check a rating against `MIN_RATING..=MAX_RATING`.
///
/// # Errors
/// Returns `ChatError::InvalidRating` when out of range.
pub const fn validate_rating(rating: u8) -> ChatResult<u8> {
    if rating < MIN_RATING || rating > MAX_RATING {
        return Err(ChatError::InvalidRating(rating));
    }
    Ok(rating)
}

/// Fields to shallow-merge over a stored conversation.
///
/// `None` leaves the stored value untouched.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationPatch {
    /// New title.
    #[serde(default)]
    pub title: Option<String>,
    /// Replacement message list.
    #[serde(default)]
    pub messages: Option<Vec<Message>>,
    /// New rating.
    #[serde(default)]
    pub rating: Option<u8>,
    /// New feedback text.
    #[serde(default)]
    pub feedback: Option<String>,
}

impl ConversationPatch {
    /// Patch carrying a rating and feedback, as saved from the feedback form.
    #[must_use]
    pub const fn feedback(rating: Option<u8>, feedback: Option<String>) -> Self {
        Self {
            title: None,
            messages: None,
            rating,
            feedback,
        }
    }

    /// Validate supplied fields.
    ///
    /// # Errors
    /// Returns an error if the rating is out of range.
    pub fn validate(&self) -> ChatResult<()> {
        if let Some(rating) = self.rating {
            validate_rating(rating)?;
        }
        Ok(())
    }

    /// Merge supplied fields over `conversation` and stamp `updated_at`.
    pub fn apply(self, conversation: &mut Conversation, now: DateTime<Utc>) {
        if let Some(title) = self.title {
            conversation.title = title;
        }
        if let Some(messages) = self.messages {
            conversation.messages = messages;
        }
        if let Some(rating) = self.rating {
            conversation.rating = Some(rating);
        }
        if let Some(feedback) = self.feedback {
            conversation.feedback = Some(feedback);
        }
        conversation.touch(now);
    }
}
