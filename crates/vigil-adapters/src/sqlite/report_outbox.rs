use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection};
use tracing::warn;

use vigil_core::{OutboxError, PendingReport, ReportKind, ReportOutbox, ReportPayload};

pub struct SqliteReportOutbox {
    connection: Mutex<Connection>,
}

impl SqliteReportOutbox {
    pub fn new(path: &Path) -> Result<Self, OutboxError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| OutboxError::Storage {
                message: format!("cannot create {}: {}", parent.display(), error),
            })?;
        }

        let connection = Connection::open(path).map_err(storage_error)?;
        Self::with_connection(connection)
    }

    pub fn in_memory() -> Result<Self, OutboxError> {
        let connection = Connection::open_in_memory().map_err(storage_error)?;
        Self::with_connection(connection)
    }

    fn with_connection(connection: Connection) -> Result<Self, OutboxError> {
        let outbox = Self {
            connection: Mutex::new(connection),
        };
        outbox.initialize_schema()?;

        Ok(outbox)
    }

    fn initialize_schema(&self) -> Result<(), OutboxError> {
        let connection = self.lock()?;
        connection
            .execute_batch(
                "PRAGMA synchronous = FULL;
                CREATE TABLE IF NOT EXISTS pending_reports (
                    id TEXT PRIMARY KEY,
                    kind TEXT NOT NULL,
                    timestamp_ms INTEGER NOT NULL,
                    payload TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_pending_reports_timestamp
                    ON pending_reports(timestamp_ms);",
            )
            .map_err(storage_error)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, OutboxError> {
        self.connection.lock().map_err(|_| OutboxError::Storage {
            message: "outbox connection lock poisoned".to_string(),
        })
    }
}

impl ReportOutbox for SqliteReportOutbox {
    fn enqueue(&self, report: &PendingReport) -> Result<(), OutboxError> {
        let payload =
            serde_json::to_string(&report.payload).map_err(|error| OutboxError::Corrupted {
                id: report.id.clone(),
                message: error.to_string(),
            })?;

        let connection = self.lock()?;

        // Upsert keeps the original rowid, so tie ordering follows the first enqueue.
        connection
            .execute(
                "INSERT INTO pending_reports (id, kind, timestamp_ms, payload)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    kind = excluded.kind,
                    timestamp_ms = excluded.timestamp_ms,
                    payload = excluded.payload",
                params![report.id, report.kind.as_str(), report.timestamp_ms, payload],
            )
            .map_err(storage_error)?;

        Ok(())
    }

    fn list_pending(&self) -> Result<Vec<PendingReport>, OutboxError> {
        let connection = self.lock()?;

        let mut statement = connection
            .prepare(
                "SELECT id, kind, timestamp_ms, payload
                 FROM pending_reports
                 ORDER BY timestamp_ms ASC, rowid ASC",
            )
            .map_err(storage_error)?;

        let rows = statement
            .query_map([], |row| {
                Ok(StoredRow {
                    id: row.get(0)?,
                    kind: row.get(1)?,
                    timestamp_ms: row.get(2)?,
                    payload: row.get(3)?,
                })
            })
            .map_err(storage_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage_error)?;

        let mut reports = Vec::with_capacity(rows.len());
        for row in rows {
            match row.into_report() {
                Ok(report) => reports.push(report),
                // A single undecodable row must not block delivery of the rest.
                Err(error) => warn!(%error, "skipping undecodable pending report"),
            }
        }

        Ok(reports)
    }

    fn acknowledge(&self, id: &str) -> Result<(), OutboxError> {
        let connection = self.lock()?;

        connection
            .execute("DELETE FROM pending_reports WHERE id = ?1", params![id])
            .map_err(storage_error)?;

        Ok(())
    }

    fn count_pending(&self) -> Result<u64, OutboxError> {
        let connection = self.lock()?;

        let count: i64 = connection
            .query_row("SELECT COUNT(*) FROM pending_reports", [], |row| row.get(0))
            .map_err(storage_error)?;

        Ok(count.max(0) as u64)
    }
}

struct StoredRow {
    id: String,
    kind: String,
    timestamp_ms: i64,
    payload: String,
}

impl StoredRow {
    fn into_report(self) -> Result<PendingReport, OutboxError> {
        let kind = ReportKind::from_stored(&self.kind).ok_or_else(|| OutboxError::Corrupted {
            id: self.id.clone(),
            message: format!("unknown kind '{}'", self.kind),
        })?;

        let payload = serde_json::from_str::<ReportPayload>(&self.payload).map_err(|error| {
            OutboxError::Corrupted {
                id: self.id.clone(),
                message: error.to_string(),
            }
        })?;

        Ok(PendingReport {
            id: self.id,
            kind,
            timestamp_ms: self.timestamp_ms,
            payload,
        })
    }
}

fn storage_error(error: rusqlite::Error) -> OutboxError {
    OutboxError::Storage {
        message: error.to_string(),
    }
}
