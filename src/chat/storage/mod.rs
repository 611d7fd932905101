//! Persistence: key-value backends and the conversation store.

pub mod backend;
pub mod conversation_store;
pub mod file_backend;
pub mod sqlite_backend;

use std::sync::Arc;

use tracing::info;

pub use backend::{KeyValueBackend, MemoryBackend};
pub use conversation_store::{ConversationStore, LoadOutcome};
pub use file_backend::FileBackend;
pub use sqlite_backend::SqliteBackend;

use crate::chat::core::config::{BackendKind, StorageConfig};
use crate::chat::core::errors::ChatResult;

/// Open the backend selected by `config`.
///
/// # Errors
/// Returns an error if the data directory or database cannot be opened.
pub fn open_backend(config: &StorageConfig) -> ChatResult<Arc<dyn KeyValueBackend>> {
    let backend: Arc<dyn KeyValueBackend> = match config.backend {
        BackendKind::Memory => Arc::new(MemoryBackend::new()),
        BackendKind::File => Arc::new(FileBackend::new(&config.data_dir)?),
        BackendKind::Sqlite => {
            std::fs::create_dir_all(&config.data_dir)?;
            Arc::new(SqliteBackend::open(config.sqlite_path(), &config.sqlite_table)?)
        }
    };
    info!(backend = ?config.backend, dir = ?config.data_dir, "Opened storage backend");
    Ok(backend)
}
