// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Streaming delta persistence.
//!
//! Each run keeps its own zero-based sequence; `UNIQUE(run_id, seq)` rejects
//! gaps being filled twice if a run's driver is ever retried.

use confab_core::ConfabError;
use rusqlite::params;

use crate::database::Database;
use crate::models::StreamEventRow;

/// Record one streamed delta for a run.
pub async fn append_event(
    db: &Database,
    thread_id: &str,
    run_id: &str,
    seq: i64,
    delta: &str,
) -> Result<(), ConfabError> {
    let thread_id = thread_id.to_string();
    let run_id = run_id.to_string();
    let delta = delta.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO stream_events (thread_id, run_id, seq, delta)
                 VALUES (?1, ?2, ?3, ?4)",
                params![thread_id, run_id, seq, delta],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All deltas for a run in sequence order.
pub async fn events_for_run(
    db: &Database,
    run_id: &str,
) -> Result<Vec<StreamEventRow>, ConfabError> {
    let run_id = run_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<StreamEventRow>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, thread_id, run_id, seq, delta, created_at
                 FROM stream_events WHERE run_id = ?1 ORDER BY seq ASC",
            )?;
            let rows = stmt.query_map(params![run_id], |row| {
                Ok(StreamEventRow {
                    id: row.get(0)?,
                    thread_id: row.get(1)?,
                    run_id: row.get(2)?,
                    seq: row.get(3)?,
                    delta: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })?;
            let mut events = Vec::new();
            for row in rows {
                events.push(row?);
            }
            Ok(events)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
