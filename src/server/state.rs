//! Application state shared across all request handlers.

use std::sync::Arc;

use crate::chat::core::clock::{Clock, SystemClock};
use crate::chat::core::config::ChatConfig;
use crate::chat::core::errors::ChatResult;
use crate::chat::engine::ChatService;

/// Shared application state.
pub struct AppState {
    /// Conversation service.
    pub chat: ChatService,
    /// Effective configuration.
    pub config: ChatConfig,
}

impl AppState {
    /// Create state from configuration using the system clock.
    ///
    /// # Errors
    /// Returns an error if the backend or corpus cannot be initialized.
    pub fn new(config: ChatConfig) -> ChatResult<Arc<Self>> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create state with an explicit clock.
    ///
    /// # Errors
    /// Returns an error if the backend or corpus cannot be initialized.
    pub fn with_clock(config: ChatConfig, clock: Arc<dyn Clock>) -> ChatResult<Arc<Self>> {
        let chat = ChatService::from_config(&config, clock)?;
        Ok(Arc::new(Self { chat, config }))
    }
}
