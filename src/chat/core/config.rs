//! Configuration for the chat service.
//!
//! Defaults reproduce the browser client: collection key
//! `bot_ai_conversations`, a one second "typing" pause and a 0.7 keyword
//! overlap threshold. [`ChatConfig::from_env`] layers an optional JSON file
//! and `BOT_AI_*` environment variables on top.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::chat::core::errors::{ChatError, ChatResult};

/// Environment variable naming an optional JSON config file.
pub const ENV_CONFIG_PATH: &str = "BOT_AI_CONFIG";

/// Top-level configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Persistence settings.
    pub storage: StorageConfig,
    /// Response matching settings.
    pub matcher: MatcherConfig,
    /// Session behavior settings.
    pub session: SessionConfig,
    /// HTTP server settings.
    pub server: ServerConfig,
}

impl ChatConfig {
    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> ChatResult<()> {
        if self.storage.collection_key.trim().is_empty() {
            return Err(ChatError::InvalidConfig(
                "storage.collection_key must not be empty".to_string(),
            ));
        }

        if self.storage.sqlite_table.is_empty()
            || !self
                .storage
                .sqlite_table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(ChatError::InvalidConfig(
                "storage.sqlite_table must be a non-empty identifier".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.matcher.overlap_threshold) {
            return Err(ChatError::InvalidConfig(
                "matcher.overlap_threshold must be within 0.0..=1.0".to_string(),
            ));
        }

        if self.matcher.suggestion_count == 0 {
            return Err(ChatError::InvalidConfig(
                "matcher.suggestion_count must be > 0".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ChatError::InvalidConfig(
                "server.port must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Load configuration from `BOT_AI_CONFIG` (if set) and apply
    /// `BOT_AI_*` environment overrides.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, an override
    /// is malformed, or the result fails validation.
    pub fn from_env() -> ChatResult<Self> {
        let mut config = match std::env::var(ENV_CONFIG_PATH) {
            Ok(path) => {
                let raw = std::fs::read_to_string(&path)?;
                serde_json::from_str(&raw)?
            }
            Err(_) => Self::default(),
        };

        if let Some(port) = env_parse::<u16>("BOT_AI_PORT")? {
            config.server.port = port;
        }
        if let Some(backend) = env_parse::<BackendKind>("BOT_AI_BACKEND")? {
            config.storage.backend = backend;
        }
        if let Ok(dir) = std::env::var("BOT_AI_DATA_DIR") {
            config.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(policy) = env_parse::<CorruptionPolicy>("BOT_AI_ON_CORRUPT")? {
            config.storage.on_corrupt = policy;
        }
        if let Some(delay) = env_parse::<u64>("BOT_AI_TYPING_DELAY_MS")? {
            config.session.typing_delay_ms = delay;
        }
        if let Ok(path) = std::env::var("BOT_AI_CORPUS") {
            config.matcher.corpus_path = Some(PathBuf::from(path));
        }

        config.validate()?;
        Ok(config)
    }
}

fn env_parse<T>(name: &str) -> ChatResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|err| ChatError::InvalidConfig(format!("{name}: {err}"))),
        Err(_) => Ok(None),
    }
}

/// Key-value backend selector.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Process-local map; nothing survives a restart.
    Memory,
    /// One JSON file per key under `data_dir`.
    File,
    /// `SQLite` database at `data_dir/bot_ai.sqlite`.
    Sqlite,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(format!("unknown backend {other:?}")),
        }
    }
}

/// What to do when the persisted collection cannot be parsed.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorruptionPolicy {
    /// Log and treat as empty. The next write overwrites the payload.
    Discard,
    /// Copy the raw payload to a backup key once, reset the collection to
    /// `[]`, log, and treat as empty.
    #[default]
    Backup,
    /// Surface `ChatError::CorruptedStore` to the caller.
    Fail,
}

impl FromStr for CorruptionPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "discard" => Ok(Self::Discard),
            "backup" => Ok(Self::Backup),
            "fail" => Ok(Self::Fail),
            other => Err(format!("unknown corruption policy {other:?}")),
        }
    }
}

/// Storage configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Which backend to use.
    pub backend: BackendKind,
    /// Directory for file and `SQLite` backends.
    pub data_dir: PathBuf,
    /// Key holding the serialized conversation collection.
    pub collection_key: String,
    /// Table used by the `SQLite` backend.
    pub sqlite_table: String,
    /// Handling of unparsable collections.
    pub on_corrupt: CorruptionPolicy,
}

impl StorageConfig {
    /// Path of the `SQLite` database file.
    #[must_use]
    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir.join("bot_ai.sqlite")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::File,
            data_dir: PathBuf::from("data"),
            collection_key: "bot_ai_conversations".to_string(),
            sqlite_table: "kv_store".to_string(),
            on_corrupt: CorruptionPolicy::default(),
        }
    }
}

/// Response matcher settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Keyword fraction that must be exceeded for an overlap match.
    pub overlap_threshold: f64,
    /// Words shorter than this are not significant keywords.
    pub min_keyword_chars: usize,
    /// Reply when nothing matches.
    pub default_response: String,
    /// Number of suggestions to sample.
    pub suggestion_count: usize,
    /// Optional JSON corpus replacing the built-in one.
    pub corpus_path: Option<PathBuf>,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            overlap_threshold: 0.7,
            min_keyword_chars: 4,
            default_response: "Sorry, Did not understand your query!".to_string(),
            suggestion_count: 4,
            corpus_path: None,
        }
    }
}

/// Session behavior.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Simulated typing pause before the assistant reply, in milliseconds.
    pub typing_delay_ms: u64,
}

impl SessionConfig {
    /// Typing pause as a `Duration`.
    #[must_use]
    pub const fn typing_delay(&self) -> Duration {
        Duration::from_millis(self.typing_delay_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            typing_delay_ms: 1000,
        }
    }
}

/// HTTP server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listening port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 3000 }
    }
}
