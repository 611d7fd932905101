//! `SQLite`-backed key-value store.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension};

use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::storage::backend::KeyValueBackend;

/// Key-value rows in a single `SQLite` table.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
    table: String,
}

impl SqliteBackend {
    /// Open a database file and create the table if it doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open(path: impl AsRef<Path>, table: &str) -> ChatResult<Self> {
        Self::with_connection(Connection::open(path)?, table)
    }

    fn with_connection(conn: Connection, table: &str) -> ChatResult<Self> {
        if table.is_empty() || !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ChatError::InvalidConfig(format!(
                "invalid sqlite table name {table:?}"
            )));
        }

        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );"
        ))?;

        Ok(Self {
            conn: Mutex::new(conn),
            table: table.to_string(),
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> ChatResult<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| ChatError::LockPoisoned("sqlite connection"))?;
        Ok(f(&conn)?)
    }
}

impl KeyValueBackend for SqliteBackend {
    fn get(&self, key: &str) -> ChatResult<Option<String>> {
        let table = &self.table;
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT value FROM {table} WHERE key = ?1"),
                rusqlite::params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
        })
    }

    fn set(&self, key: &str, value: &str) -> ChatResult<()> {
        let table = &self.table;
        self.with_conn(|conn| {
            conn.execute(
                &format!("INSERT OR REPLACE INTO {table} (key, value) VALUES (?1, ?2)"),
                rusqlite::params![key, value],
            )
        })?;
        Ok(())
    }

    fn remove(&self, key: &str) -> ChatResult<()> {
        let table = &self.table;
        self.with_conn(|conn| {
            conn.execute(
                &format!("DELETE FROM {table} WHERE key = ?1"),
                rusqlite::params![key],
            )
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_backend_roundtrip() {
        let Ok(backend) = Connection::open_in_memory()
            .map_err(ChatError::from)
            .and_then(|conn| SqliteBackend::with_connection(conn, "kv_store"))
        else {
            panic!("in-memory sqlite should open");
        };
        assert!(matches!(backend.get("k"), Ok(None)));
        assert!(backend.set("k", "[1]").is_ok());
        assert!(backend.set("k", "[2]").is_ok());
        assert_eq!(backend.get("k").ok().flatten().as_deref(), Some("[2]"));
        assert!(backend.remove("k").is_ok());
        assert!(matches!(backend.get("k"), Ok(None)));
    }

    #[test]
    fn test_rejects_unsafe_table_name() {
        let Ok(conn) = Connection::open_in_memory() else {
            panic!("in-memory sqlite should open");
        };
        let result = SqliteBackend::with_connection(conn, "kv store");
        assert!(matches!(result, Err(ChatError::InvalidConfig(_))));
    }
}
