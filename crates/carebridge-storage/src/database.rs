// SPDX-FileCopyrightText: 2026 CareBridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use carebridge_core::CareError;
use chrono::{SecondsFormat, Utc};
use tracing::debug;

use crate::migrations;

/// Handle to the single SQLite connection used by all query modules.
#[derive(Clone, Debug)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path` with WAL mode enabled,
    /// foreign keys enforced, and all migrations applied.
    pub async fn open(path: &str) -> Result<Self, CareError> {
        Self::open_with_options(path, true).await
    }

    /// Open with an explicit WAL toggle (tests and constrained filesystems).
    pub async fn open_with_options(path: &str, wal_mode: bool) -> Result<Self, CareError> {
        // `open` surfaces the raw rusqlite error, not the wrapper type the
        // background-thread calls use.
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| CareError::Storage {
                source: Box::new(e),
            })?;

        conn.call(move |conn| {
            if wal_mode {
                conn.pragma_update(None, "journal_mode", "WAL")?;
            }
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.pragma_update(None, "busy_timeout", 5000)?;
            migrations::run_migrations(conn)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// Returns the underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Close the database, flushing the WAL.
    pub async fn close(self) -> Result<(), CareError> {
        self.conn.close().await.map_err(map_tr_err)
    }
}

/// Map a tokio-rusqlite error into the domain storage error.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error) -> CareError {
    CareError::Storage {
        source: Box::new(e),
    }
}

/// Current UTC time as an RFC 3339 string with millisecond precision and a
/// `Z` suffix. Used for every stored timestamp so lexicographic order equals
/// chronological order.
pub fn now_ts() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_runs_migrations() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        // All three tables and both views exist after open.
        let count: i64 = db
            .connection()
            .call(|conn| -> Result<i64, tokio_rusqlite::Error> {
                let n = conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master
                     WHERE name IN ('conversations', 'messages', 'handoff_requests',
                                    'active_conversations', 'pending_handoff_queue')",
                    [],
                    |row| row.get(0),
                )?;
                Ok(n)
            })
            .await
            .unwrap();
        assert_eq!(count, 5);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let path = db_path.to_str().unwrap();

        let db = Database::open(path).await.unwrap();
        db.close().await.unwrap();

        // Second open re-runs the migration runner without error.
        let db = Database::open(path).await.unwrap();
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn open_failure_maps_to_storage_error() {
        // Parent directory does not exist, so SQLite cannot create the file.
        let err = Database::open("/nonexistent-dir/sub/test.db")
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "storage_error");
    }

    #[test]
    fn now_ts_is_rfc3339_utc() {
        let ts = now_ts();
        assert!(ts.ends_with('Z'), "timestamp must use Z suffix: {ts}");
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }

    #[test]
    fn now_ts_orders_lexicographically() {
        let a = now_ts();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let b = now_ts();
        assert!(a < b);
    }
}
