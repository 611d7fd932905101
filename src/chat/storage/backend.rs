//! Key-value persistence primitive and the in-memory implementation.

use dashmap::DashMap;

use crate::chat::core::errors::ChatResult;

/// Synchronous string key-value store.
///
/// This is the store's only I/O dependency. Values are whole serialized
/// payloads; there are no partial writes or transactions.
pub trait KeyValueBackend: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn get(&self, key: &str) -> ChatResult<Option<String>>;

    /// Overwrite the value stored under `key`.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn set(&self, key: &str, value: &str) -> ChatResult<()>;

    /// Delete `key`. Deleting a missing key is not an error.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn remove(&self, key: &str) -> ChatResult<()>;
}

/// Process-local backend, used in tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: DashMap<String, String>,
}

impl MemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys starting with `prefix`, sorted.
    #[must_use]
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        keys
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> ChatResult<Option<String>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> ChatResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> ChatResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_backend_set_get_remove() {
        let backend = MemoryBackend::new();
        assert!(matches!(backend.get("k"), Ok(None)));

        assert!(backend.set("k", "v1").is_ok());
        assert!(backend.set("k", "v2").is_ok());
        assert_eq!(backend.get("k").ok().flatten().as_deref(), Some("v2"));
        assert_eq!(backend.keys_with_prefix(""), vec!["k"]);

        assert!(backend.remove("k").is_ok());
        assert!(backend.remove("k").is_ok());
        assert!(backend.keys_with_prefix("").is_empty());
    }

    #[test]
    fn test_keys_with_prefix() {
        let backend = MemoryBackend::new();
        let _ = backend.set("a.2", "");
        let _ = backend.set("a.1", "");
        let _ = backend.set("b", "");
        assert_eq!(backend.keys_with_prefix("a."), vec!["a.1", "a.2"]);
    }
}
