// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Query modules accept `&Database` and call through `connection().call()`.
//! Do NOT create additional Connection instances for writes: conditional
//! UPDATE/INSERT guards stay correct across processes, but a second in-process
//! writer reintroduces SQLITE_BUSY noise the single-writer model exists to
//! avoid.

use std::path::Path;

use confab_core::ConfabError;
use tracing::{debug, info};

/// Handle to the orchestration database. Cheap to clone; all clones share
/// the same background writer thread.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if needed) the database at `path`, run pending
    /// migrations, and apply connection pragmas. WAL mode is enabled.
    pub async fn open(path: &str) -> Result<Self, ConfabError> {
        Self::open_with(path, true).await
    }

    /// Open the database with explicit control over WAL mode.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, ConfabError> {
        let owned = path.to_string();

        // Migrations run on a short-lived blocking connection so the async
        // connection below starts against a fully migrated schema.
        let migration_path = owned.clone();
        tokio::task::spawn_blocking(move || -> Result<(), ConfabError> {
            if let Some(parent) = Path::new(&migration_path).parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent).map_err(|e| ConfabError::Storage {
                    source: Box::new(e),
                })?;
            }
            let mut conn =
                rusqlite::Connection::open(&migration_path).map_err(|e| ConfabError::Storage {
                    source: Box::new(e),
                })?;
            if wal_mode {
                conn.pragma_update(None, "journal_mode", "WAL")
                    .map_err(|e| ConfabError::Storage {
                        source: Box::new(e),
                    })?;
            }
            crate::migrations::run_migrations(&mut conn)
        })
        .await
        .map_err(|e| ConfabError::Internal(format!("migration task failed: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(owned.clone())
            .await
            .map_err(|e| map_tr_err(e.into()))?;

        // Per-connection pragmas. journal_mode is a database-file property
        // and was already set above.
        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.pragma_update(None, "busy_timeout", 5000)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        debug!(path = %owned, wal = wal_mode, "database pragmas applied");
        info!(path = %owned, "database opened");
        Ok(Self { conn })
    }

    /// Returns the shared connection for query modules.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Close the underlying connection, flushing the WAL.
    pub async fn close(self) -> Result<(), ConfabError> {
        self.conn.close().await.map_err(map_tr_err)
    }
}

/// Convert tokio-rusqlite errors into [`ConfabError::Storage`].
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> ConfabError {
    ConfabError::Storage {
        source: e.to_string().into(),
    }
}

/// Current UTC time in the storage timestamp format: RFC 3339 with
/// millisecond precision and a `Z` suffix, identical to the SQL-side
/// `strftime('%Y-%m-%dT%H:%M:%fZ', 'now')` defaults.
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Timestamp `secs` seconds in the past, in the storage format. Used as a
/// staleness cutoff: any `started_at` lexicographically below it is older
/// than `secs`.
pub fn timestamp_secs_ago(secs: u64) -> String {
    (chrono::Utc::now() - chrono::Duration::seconds(secs as i64))
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
