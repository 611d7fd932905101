//! Chat service: the surface the UI layer talks to.
//!
//! Tracks the active conversation, appends user and assistant messages,
//! and schedules the simulated reply after the typing pause. Store calls
//! are synchronous and run on the blocking pool.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::chat::core::clock::Clock;
use crate::chat::core::config::ChatConfig;
use crate::chat::core::conversation::{Conversation, ConversationPatch, Message, Reaction};
use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::core::ids::{ConversationId, MessageId};
use crate::chat::engine::reply_scheduler::ReplyScheduler;
use crate::chat::matching::matcher::{MatchOutcome, ResponseMatcher};
use crate::chat::matching::suggestions::{Suggestion, sample_suggestions};
use crate::chat::storage::conversation_store::ConversationStore;
use crate::chat::storage::open_backend;

/// Conversation operations for a single user.
pub struct ChatService {
    store: Arc<ConversationStore>,
    matcher: Arc<ResponseMatcher>,
    clock: Arc<dyn Clock>,
    scheduler: ReplyScheduler,
    typing_delay: Duration,
    suggestion_count: usize,
    active: RwLock<Option<ConversationId>>,
}

impl ChatService {
    /// Assemble a service from its parts.
    #[must_use]
    pub fn new(
        store: Arc<ConversationStore>,
        matcher: Arc<ResponseMatcher>,
        clock: Arc<dyn Clock>,
        config: &ChatConfig,
    ) -> Self {
        Self {
            store,
            matcher,
            clock,
            scheduler: ReplyScheduler::new(),
            typing_delay: config.session.typing_delay(),
            suggestion_count: config.matcher.suggestion_count,
            active: RwLock::new(None),
        }
    }

    /// Build the backend, store and matcher described by `config`.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be opened or the corpus is invalid.
    pub fn from_config(config: &ChatConfig, clock: Arc<dyn Clock>) -> ChatResult<Self> {
        config.validate()?;
        let backend = open_backend(&config.storage)?;
        let store = Arc::new(ConversationStore::from_config(
            backend,
            Arc::clone(&clock),
            &config.storage,
        ));
        let matcher = Arc::new(ResponseMatcher::from_config(&config.matcher)?);
        Ok(Self::new(store, matcher, clock, config))
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    /// The response matcher.
    #[must_use]
    pub const fn matcher(&self) -> &Arc<ResponseMatcher> {
        &self.matcher
    }

    /// Create an empty conversation, persist it and make it active.
    ///
    /// # Errors
    /// Returns an error if storage fails.
    pub async fn create_conversation(&self) -> ChatResult<Conversation> {
        let conversation = Conversation::new(self.clock.now());
        let stored = conversation.clone();
        self.with_store(move |store| store.upsert(&stored)).await?;
        *self.active.write().await = Some(conversation.id);
        info!(id = %conversation.id, "Created conversation");
        Ok(conversation)
    }

    /// Load a conversation and make it active if it exists.
    ///
    /// # Errors
    /// Returns an error if storage fails.
    pub async fn load_conversation(&self, id: ConversationId) -> ChatResult<Option<Conversation>> {
        let conversation = self.with_store(move |store| store.get(id)).await?;
        if conversation.is_some() {
            *self.active.write().await = Some(id);
            debug!(%id, "Switched active conversation");
        }
        Ok(conversation)
    }

    /// Id of the active conversation.
    pub async fn active_id(&self) -> Option<ConversationId> {
        *self.active.read().await
    }

    /// The active conversation as currently stored.
    ///
    /// # Errors
    /// Returns an error if storage fails.
    pub async fn active_conversation(&self) -> ChatResult<Option<Conversation>> {
        match self.active_id().await {
            Some(id) => self.with_store(move |store| store.get(id)).await,
            None => Ok(None),
        }
    }

    /// Forget the active conversation, cancelling its pending reply.
    pub async fn clear_active(&self) {
        let Some(id) = self.active.write().await.take() else {
            return;
        };
        if self.scheduler.cancel(id) {
            debug!(%id, "Cancelled pending reply of cleared conversation");
        }
    }

    /// Append a message to the active conversation.
    ///
    /// # Errors
    /// Returns `NoActiveConversation` without an active conversation,
    /// `EmptyMessage` for blank content, or a storage error.
    pub async fn add_message(&self, content: &str, is_user: bool) -> ChatResult<Message> {
        let Some(id) = self.active_id().await else {
            warn!("No active conversation to add message to");
            return Err(ChatError::NoActiveConversation);
        };
        self.append(id, content, is_user).await
    }

    /// Append the canned reply to `user_text` to the active conversation.
    ///
    /// # Errors
    /// Same as [`Self::add_message`].
    pub async fn add_ai_response(&self, user_text: &str) -> ChatResult<Message> {
        let reply = self.matcher.respond(user_text).to_string();
        self.add_message(&reply, false).await
    }

    /// Send a user message and schedule the assistant reply.
    ///
    /// Creates a conversation first when none is active. The reply slot is
    /// claimed before the user message is stored, so a concurrent send to
    /// the same conversation is rejected without writing anything.
    ///
    /// # Errors
    /// Returns `EmptyMessage`, `ReplyPending` while the previous reply is
    /// still pending, or a storage error.
    pub async fn send_message(&self, content: &str) -> ChatResult<(ConversationId, Message)> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let id = match self.active_id().await {
            Some(id) => id,
            None => self.create_conversation().await?.id,
        };
        let reservation = self.scheduler.reserve(id)?;

        let message = match self.append(id, content, true).await {
            Ok(message) => message,
            Err(err) => {
                self.scheduler.release(reservation);
                return Err(err);
            }
        };

        let reply = self.matcher.respond(content).to_string();
        let store = Arc::clone(&self.store);
        let clock = Arc::clone(&self.clock);
        self.scheduler.arm(reservation, self.typing_delay, move || {
            let message = Message::assistant(reply, clock.now());
            match store.append_message(id, message) {
                Ok(Some(_)) => debug!(%id, "Appended assistant reply"),
                Ok(None) => debug!(%id, "Conversation gone before reply"),
                Err(err) => error!(%id, %err, "Failed to append assistant reply"),
            }
        });

        Ok((id, message))
    }

    /// Whether an assistant reply is pending for `id`.
    #[must_use]
    pub fn is_reply_pending(&self, id: ConversationId) -> bool {
        self.scheduler.is_pending(id)
    }

    /// Cancel the pending reply for `id`. Returns whether one was pending.
    #[must_use]
    pub fn cancel_pending_reply(&self, id: ConversationId) -> bool {
        let cancelled = self.scheduler.cancel(id);
        if cancelled {
            info!(%id, "Cancelled pending reply");
        }
        cancelled
    }

    /// Set or clear a message reaction. Returns `false` for unknown ids.
    ///
    /// # Errors
    /// Returns an error if storage fails.
    pub async fn set_reaction(
        &self,
        conversation_id: ConversationId,
        message_id: MessageId,
        reaction: Option<Reaction>,
    ) -> ChatResult<bool> {
        self.with_store(move |store| {
            store.set_message_reaction(conversation_id, message_id, reaction)
        })
        .await
    }

    /// Save rating and feedback. Returns `None` for an unknown id.
    ///
    /// # Errors
    /// Returns `InvalidRating` or a storage error.
    pub async fn save_feedback(
        &self,
        id: ConversationId,
        rating: Option<u8>,
        feedback: Option<String>,
    ) -> ChatResult<Option<Conversation>> {
        let patch = ConversationPatch::feedback(rating, feedback);
        let updated = self
            .with_store(move |store| store.apply_partial_update(id, patch))
            .await?;
        if updated.is_some() {
            info!(%id, ?rating, "Saved conversation feedback");
        }
        Ok(updated)
    }

    /// Conversations, newest `updated_at` first, optionally filtered by rating.
    ///
    /// # Errors
    /// Returns an error if storage fails.
    pub async fn list_conversations(&self, rating: Option<u8>) -> ChatResult<Vec<Conversation>> {
        let mut conversations = self
            .with_store(move |store| store.filter_by_rating(rating))
            .await?;
        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(conversations)
    }

    /// Delete a conversation, cancelling its pending reply.
    ///
    /// # Errors
    /// Returns an error if storage fails.
    pub async fn delete_conversation(&self, id: ConversationId) -> ChatResult<bool> {
        if self.scheduler.cancel(id) {
            debug!(%id, "Cancelled pending reply of deleted conversation");
        }
        let removed = self.with_store(move |store| store.remove(id)).await?;
        let mut active = self.active.write().await;
        if *active == Some(id) {
            *active = None;
        }
        Ok(removed)
    }

    /// Random prompt suggestions.
    #[must_use]
    pub fn suggestions(&self) -> Vec<Suggestion> {
        sample_suggestions(
            self.matcher.corpus(),
            self.suggestion_count,
            &mut rand::thread_rng(),
        )
    }

    /// Which matcher pass answers `text`, without touching any conversation.
    #[must_use]
    pub fn preview_response(&self, text: &str) -> MatchOutcome<'_> {
        self.matcher.find(text)
    }

    /// Cancel all pending replies. Returns how many were cancelled.
    #[must_use]
    pub fn shutdown(&self) -> usize {
        self.scheduler.cancel_all()
    }

    async fn append(&self, id: ConversationId, content: &str, is_user: bool) -> ChatResult<Message> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let now = self.clock.now();
        let message = if is_user {
            Message::user(content, now)
        } else {
            Message::assistant(content, now)
        };
        let stored = message.clone();
        self.with_store(move |store| store.append_message(id, stored))
            .await?
            .ok_or(ChatError::ConversationNotFound(id))?;
        Ok(message)
    }

    /// Run a synchronous store call on the blocking pool.
    async fn with_store<T, F>(&self, f: F) -> ChatResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&ConversationStore) -> ChatResult<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(&store)).await?
    }
}
