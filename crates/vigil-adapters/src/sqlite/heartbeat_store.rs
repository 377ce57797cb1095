use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use vigil_core::{HeartbeatMark, HeartbeatStore, HeartbeatStoreError};

/// Single-row store for the liveness mark, kept apart from the outbox database.
pub struct SqliteHeartbeatStore {
    connection: Mutex<Connection>,
}

impl SqliteHeartbeatStore {
    pub fn new(path: &Path) -> Result<Self, HeartbeatStoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| HeartbeatStoreError::Storage {
                message: format!("cannot create {}: {}", parent.display(), error),
            })?;
        }

        let connection = Connection::open(path).map_err(storage_error)?;
        Self::with_connection(connection)
    }

    pub fn in_memory() -> Result<Self, HeartbeatStoreError> {
        let connection = Connection::open_in_memory().map_err(storage_error)?;
        Self::with_connection(connection)
    }

    fn with_connection(connection: Connection) -> Result<Self, HeartbeatStoreError> {
        let store = Self {
            connection: Mutex::new(connection),
        };
        store.initialize_schema()?;

        Ok(store)
    }

    fn initialize_schema(&self) -> Result<(), HeartbeatStoreError> {
        let connection = self.lock()?;
        connection
            .execute_batch(
                "PRAGMA synchronous = FULL;
                CREATE TABLE IF NOT EXISTS heartbeat (
                    id INTEGER PRIMARY KEY CHECK (id = 1),
                    last_seen_ms INTEGER NOT NULL
                );",
            )
            .map_err(storage_error)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, HeartbeatStoreError> {
        self.connection
            .lock()
            .map_err(|_| HeartbeatStoreError::Storage {
                message: "heartbeat connection lock poisoned".to_string(),
            })
    }
}

impl HeartbeatStore for SqliteHeartbeatStore {
    fn record(&self, mark: HeartbeatMark) -> Result<(), HeartbeatStoreError> {
        let connection = self.lock()?;

        connection
            .execute(
                "INSERT INTO heartbeat (id, last_seen_ms) VALUES (1, ?1)
                 ON CONFLICT(id) DO UPDATE SET last_seen_ms = excluded.last_seen_ms",
                params![mark.last_seen_ms],
            )
            .map_err(storage_error)?;

        Ok(())
    }

    fn last(&self) -> Result<Option<HeartbeatMark>, HeartbeatStoreError> {
        let connection = self.lock()?;

        let last_seen_ms: Option<i64> = connection
            .query_row("SELECT last_seen_ms FROM heartbeat WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()
            .map_err(storage_error)?;

        Ok(last_seen_ms.map(HeartbeatMark::at))
    }
}

fn storage_error(error: rusqlite::Error) -> HeartbeatStoreError {
    HeartbeatStoreError::Storage {
        message: error.to_string(),
    }
}
