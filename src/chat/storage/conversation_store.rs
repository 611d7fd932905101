//! Whole-collection conversation persistence.
//!
//! All conversations live in one JSON array under a single key. Every
//! mutation loads the array, edits it in memory and writes the whole array
//! back. Within one store instance those cycles are serialized by
//! `write_lock`; separate processes sharing a backend are last-writer-wins.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::chat::core::clock::Clock;
use crate::chat::core::config::{CorruptionPolicy, StorageConfig};
use crate::chat::core::conversation::{Conversation, ConversationPatch, Message, Reaction};
use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::core::ids::{ConversationId, MessageId};
use crate::chat::storage::backend::KeyValueBackend;

/// Result of reading the persisted collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The collection parsed successfully.
    Loaded(Vec<Conversation>),
    /// Nothing is stored under the key.
    Empty,
    /// A payload exists but could not be parsed.
    Corrupted {
        /// The stored payload, untouched.
        raw: String,
        /// Parser error message.
        reason: String,
    },
}

/// Conversation store over an injected key-value backend.
pub struct ConversationStore {
    backend: Arc<dyn KeyValueBackend>,
    clock: Arc<dyn Clock>,
    key: String,
    on_corrupt: CorruptionPolicy,
    write_lock: Mutex<()>,
    recover_lock: Mutex<()>,
}

impl ConversationStore {
    /// Create a store writing to `key` in `backend`.
    #[must_use]
    pub fn new(
        backend: Arc<dyn KeyValueBackend>,
        clock: Arc<dyn Clock>,
        key: impl Into<String>,
        on_corrupt: CorruptionPolicy,
    ) -> Self {
        Self {
            backend,
            clock,
            key: key.into(),
            on_corrupt,
            write_lock: Mutex::new(()),
            recover_lock: Mutex::new(()),
        }
    }

    /// Create a store from storage configuration.
    #[must_use]
    pub fn from_config(
        backend: Arc<dyn KeyValueBackend>,
        clock: Arc<dyn Clock>,
        config: &StorageConfig,
    ) -> Self {
        Self::new(backend, clock, config.collection_key.clone(), config.on_corrupt)
    }

    /// Read the collection without applying the corruption policy.
    ///
    /// # Errors
    /// Returns an error if the backend fails.
    pub fn load_snapshot(&self) -> ChatResult<LoadOutcome> {
        let Some(raw) = self.backend.get(&self.key)? else {
            return Ok(LoadOutcome::Empty);
        };
        if raw.is_empty() {
            return Ok(LoadOutcome::Empty);
        }

        match serde_json::from_str::<Vec<Conversation>>(&raw) {
            Ok(conversations) => Ok(LoadOutcome::Loaded(conversations)),
            Err(err) => Ok(LoadOutcome::Corrupted {
                raw,
                reason: err.to_string(),
            }),
        }
    }

    /// Load every conversation.
    ///
    /// Corrupt payloads are handled by the configured [`CorruptionPolicy`].
    ///
    /// # Errors
    /// Returns an error if the backend fails, or if the payload is corrupt
    /// and the policy is `Fail`.
    pub fn load_all(&self) -> ChatResult<Vec<Conversation>> {
        match self.load_snapshot()? {
            LoadOutcome::Loaded(conversations) => Ok(conversations),
            LoadOutcome::Empty => Ok(Vec::new()),
            LoadOutcome::Corrupted { raw, reason } => self.recover(&raw, reason),
        }
    }

    fn recover(&self, raw: &str, reason: String) -> ChatResult<Vec<Conversation>> {
        match self.on_corrupt {
            CorruptionPolicy::Discard => {
                warn!(key = %self.key, %reason, "Discarding unparsable conversation collection");
                Ok(Vec::new())
            }
            CorruptionPolicy::Backup => {
                let guard = self
                    .recover_lock
                    .lock()
                    .map_err(|_| ChatError::LockPoisoned("corruption recovery"))?;
                if self.backend.get(&self.key)?.as_deref() != Some(raw) {
                    // Already backed up and reset by a concurrent caller.
                    drop(guard);
                    return self.load_all();
                }
                let backup_key = format!(
                    "{}.corrupt.{}",
                    self.key,
                    self.clock.now().timestamp_millis()
                );
                self.backend.set(&backup_key, raw)?;
                self.backend.set(&self.key, "[]")?;
                drop(guard);
                warn!(
                    key = %self.key,
                    %backup_key,
                    %reason,
                    "Conversation collection unparsable; raw payload backed up and reset"
                );
                Ok(Vec::new())
            }
            CorruptionPolicy::Fail => Err(ChatError::CorruptedStore {
                key: self.key.clone(),
                reason,
            }),
        }
    }

    /// Serialize and overwrite the whole collection.
    ///
    /// # Errors
    /// Returns an error if serialization or the backend fails.
    pub fn save_all(&self, conversations: &[Conversation]) -> ChatResult<()> {
        let payload = serde_json::to_string(conversations)?;
        self.backend.set(&self.key, &payload)?;
        debug!(count = conversations.len(), "Saved conversation collection");
        Ok(())
    }

    /// Find a conversation by id.
    ///
    /// # Errors
    /// Returns an error if loading fails.
    pub fn get(&self, id: ConversationId) -> ChatResult<Option<Conversation>> {
        Ok(self.load_all()?.into_iter().find(|c| c.id == id))
    }

    /// Replace the conversation with the same id, or append it.
    ///
    /// `updated_at` is stored as given.
    ///
    /// # Errors
    /// Returns an error if loading or saving fails.
    pub fn upsert(&self, conversation: &Conversation) -> ChatResult<()> {
        let _guard = self.lock()?;
        let mut conversations = self.load_all()?;
        match conversations.iter_mut().find(|c| c.id == conversation.id) {
            Some(existing) => existing.clone_from(conversation),
            None => conversations.push(conversation.clone()),
        }
        self.save_all(&conversations)
    }

    /// Shallow-merge `patch` over a stored conversation and stamp `updated_at`.
    ///
    /// Returns `None` (and writes nothing) when the id is unknown.
    ///
    /// # Errors
    /// Returns an error if the patch is invalid or storage fails.
    pub fn apply_partial_update(
        &self,
        id: ConversationId,
        patch: ConversationPatch,
    ) -> ChatResult<Option<Conversation>> {
        patch.validate()?;
        let now = self.clock.now();
        self.modify(id, |conversation| {
            patch.apply(conversation, now);
            Some(conversation.clone())
        })
    }

    /// Set or clear a message reaction and stamp the conversation.
    ///
    /// Returns `false` (and writes nothing) when either id is unknown.
    ///
    /// # Errors
    /// Returns an error if storage fails.
    pub fn set_message_reaction(
        &self,
        conversation_id: ConversationId,
        message_id: MessageId,
        reaction: Option<Reaction>,
    ) -> ChatResult<bool> {
        let now = self.clock.now();
        let applied = self.modify(conversation_id, |conversation| {
            conversation
                .set_reaction(message_id, reaction, now)
                .then_some(())
        })?;
        if applied.is_none() {
            debug!(%conversation_id, %message_id, "Reaction target not found");
        }
        Ok(applied.is_some())
    }

    /// Append a message to the stored conversation, deriving its title from
    /// the first user message.
    ///
    /// Returns `None` (and writes nothing) when the id is unknown.
    ///
    /// # Errors
    /// Returns an error if storage fails.
    pub fn append_message(
        &self,
        id: ConversationId,
        message: Message,
    ) -> ChatResult<Option<Conversation>> {
        let now = self.clock.now();
        self.modify(id, move |conversation| {
            conversation.push_message(message, now);
            Some(conversation.clone())
        })
    }

    /// Delete a conversation. Returns whether a row was removed.
    ///
    /// # Errors
    /// Returns an error if storage fails.
    pub fn remove(&self, id: ConversationId) -> ChatResult<bool> {
        let _guard = self.lock()?;
        let mut conversations = self.load_all()?;
        let before = conversations.len();
        conversations.retain(|c| c.id != id);
        if conversations.len() == before {
            return Ok(false);
        }
        self.save_all(&conversations)?;
        info!(%id, "Removed conversation");
        Ok(true)
    }

    /// Conversations with exactly `rating`, or all of them for `None`.
    ///
    /// # Errors
    /// Returns an error if loading fails.
    pub fn filter_by_rating(&self, rating: Option<u8>) -> ChatResult<Vec<Conversation>> {
        let conversations = self.load_all()?;
        Ok(match rating {
            None => conversations,
            Some(rating) => conversations
                .into_iter()
                .filter(|c| c.rating == Some(rating))
                .collect(),
        })
    }

    /// Load, locate `id`, run `f`, and persist only if `f` returns `Some`.
    fn modify<T>(
        &self,
        id: ConversationId,
        f: impl FnOnce(&mut Conversation) -> Option<T>,
    ) -> ChatResult<Option<T>> {
        let _guard = self.lock()?;
        let mut conversations = self.load_all()?;
        let Some(conversation) = conversations.iter_mut().find(|c| c.id == id) else {
            debug!(%id, "Conversation not found; nothing to update");
            return Ok(None);
        };
        let Some(out) = f(conversation) else {
            return Ok(None);
        };
        self.save_all(&conversations)?;
        Ok(Some(out))
    }

    fn lock(&self) -> ChatResult<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| ChatError::LockPoisoned("conversation store"))
    }
}
