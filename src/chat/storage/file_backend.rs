//! File-per-key backend for a standalone client.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use regex::Regex;

use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::storage::backend::KeyValueBackend;

/// Keys allowed as file names.
const KEY_PATTERN: &str = r"^[A-Za-z0-9_-][A-Za-z0-9._-]*$";

/// Stores each key as `<dir>/<key>.json`.
///
/// Keys outside `[A-Za-z0-9._-]` (or starting with a dot) are rejected
/// rather than rewritten, so two keys never share a file. Writes go to a
/// temporary sibling first and are renamed into place, so a crash
/// mid-write leaves the previous value intact.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
    key_pattern: Regex,
}

impl FileBackend {
    /// Open (and create if needed) the data directory.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>) -> ChatResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let key_pattern = Regex::new(KEY_PATTERN)?;
        Ok(Self { dir, key_pattern })
    }

    /// File path used for `key`.
    ///
    /// # Errors
    /// Returns `ChatError::InvalidKey` for keys that are not plain file names.
    pub fn path_for(&self, key: &str) -> ChatResult<PathBuf> {
        if !self.key_pattern.is_match(key) {
            return Err(ChatError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueBackend for FileBackend {
    fn get(&self, key: &str) -> ChatResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> ChatResult<()> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> ChatResult<()> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_keys_map_to_json_files() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path()).unwrap();
        assert_eq!(
            backend.path_for("bot_ai_conversations").unwrap(),
            dir.path().join("bot_ai_conversations.json")
        );
        assert_eq!(
            backend.path_for("bot_ai_conversations.corrupt.1760860800000").unwrap(),
            dir.path().join("bot_ai_conversations.corrupt.1760860800000.json")
        );
    }

    #[test]
    fn test_unsafe_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path()).unwrap();
        for key in ["", "a/b", "../etc/passwd", ".hidden", "a b", "ключ"] {
            assert!(
                matches!(backend.path_for(key), Err(ChatError::InvalidKey(_))),
                "{key:?}"
            );
        }
        assert!(matches!(backend.set("a/b", "x"), Err(ChatError::InvalidKey(_))));
        backend.set("a_b", "x").unwrap();
        assert_eq!(backend.get("a_b").unwrap().as_deref(), Some("x"));
    }

    #[test]
    fn test_set_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path()).unwrap();

        assert_eq!(backend.get("k").unwrap(), None);
        backend.set("k", "[1]").unwrap();
        backend.set("k", "[2]").unwrap();
        assert_eq!(backend.get("k").unwrap().as_deref(), Some("[2]"));
        assert!(!dir.path().join("k.json.tmp").exists());

        backend.remove("k").unwrap();
        backend.remove("k").unwrap();
        assert_eq!(backend.get("k").unwrap(), None);
    }
}
