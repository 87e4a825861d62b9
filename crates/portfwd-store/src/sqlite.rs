//! SQLite-backed storage area.
//!
//! One `items` table per database file. Values survive restarts; change
//! notifications are process-local.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::area::{StorageArea, StorageChange, CHANGE_CAPACITY};
use crate::schema::SCHEMA_SQL;
use portfwd_core::{Error, Result};

/// Persistent key-value storage area.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    changes: broadcast::Sender<StorageChange>,
}

impl SqliteStorage {
    /// Open or create the storage area.
    ///
    /// `db_dir` is the directory (e.g., `data/storage/`). The file will be `db_dir/storage.db`.
    pub fn open(db_dir: impl AsRef<Path>) -> Result<Self> {
        let db_dir = db_dir.as_ref();
        std::fs::create_dir_all(db_dir).map_err(|e| Error::Storage(e.to_string()))?;
        let db_path = db_dir.join("storage.db");

        let conn = Self::create_connection(&db_path)?;
        Self::init_schema(&conn)?;

        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        let store = Self {
            conn: Mutex::new(conn),
            db_path,
            changes,
        };

        info!(
            "SqliteStorage initialized: {} items, path={}",
            store.count_items()?,
            store.db_path.display()
        );

        Ok(store)
    }

    fn create_connection(db_path: &Path) -> Result<Connection> {
        let conn = Connection::open(db_path).map_err(|e| Error::Database(e.to_string()))?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(conn)
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| Error::Database(format!("Schema init failed: {}", e)))?;
        Ok(())
    }

    /// Path of the backing database file.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Number of stored keys.
    pub fn count_items(&self) -> Result<i64> {
        let conn = self.conn.lock();
        conn.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))
            .map_err(|e| Error::Database(e.to_string()))
    }
}

impl StorageArea for SqliteStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        let value: Option<String> = conn
            .prepare_cached("SELECT value FROM items WHERE key = ?1")
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row(params![key], |row| row.get(0))
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        let old_value = {
            let conn = self.conn.lock();
            let old_value: Option<String> = conn
                .prepare_cached("SELECT value FROM items WHERE key = ?1")
                .map_err(|e| Error::Database(e.to_string()))?
                .query_row(params![key], |row| row.get(0))
                .optional()
                .map_err(|e| Error::Database(e.to_string()))?;

            conn.prepare_cached(
                "INSERT INTO items (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            )
            .map_err(|e| Error::Database(e.to_string()))?
            .execute(params![key, value, now])
            .map_err(|e| Error::Database(e.to_string()))?;
            old_value
        };

        debug!("Stored key '{}' ({} bytes)", key, value.len());

        // No subscribers is fine.
        let _ = self.changes.send(StorageChange {
            key: key.to_string(),
            old_value,
            new_value: Some(value.to_string()),
        });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.changes.subscribe()
    }
}
