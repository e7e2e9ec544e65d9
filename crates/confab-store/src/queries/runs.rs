// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Run lifecycle operations.
//!
//! The `runs_single_flight` partial unique index makes the INSERT in
//! [`try_start_run`] the authoritative gate for the at-most-one-running-run
//! invariant. Every status transition out of `running` is a conditional
//! UPDATE guarded by `status = 'running'`, so terminal states are immutable
//! and concurrent transitions resolve to exactly one winner.

use confab_core::ConfabError;
use rusqlite::params;

use crate::database::Database;
use crate::models::RunRow;

const SELECT_COLUMNS: &str = "id, thread_id, status, error, started_at, finished_at";

fn row_to_run(row: &rusqlite::Row<'_>) -> Result<RunRow, rusqlite::Error> {
    Ok(RunRow {
        id: row.get(0)?,
        thread_id: row.get(1)?,
        status: row.get(2)?,
        error: row.get(3)?,
        started_at: row.get(4)?,
        finished_at: row.get(5)?,
    })
}

/// Attempt to create a run in status `running` for the thread.
///
/// Returns `Ok(false)` when another running run already holds the thread's
/// single-flight slot; the caller lost the race and should enqueue instead.
pub async fn try_start_run(
    db: &Database,
    run_id: &str,
    thread_id: &str,
) -> Result<bool, ConfabError> {
    let run_id = run_id.to_string();
    let thread_id = thread_id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let result = conn.execute(
                "INSERT INTO runs (id, thread_id, status) VALUES (?1, ?2, 'running')",
                params![run_id, thread_id],
            );
            match result {
                Ok(_) => Ok(true),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
                {
                    Ok(false)
                }
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get the thread's running run, if any. The partial unique index guarantees
/// at most one.
pub async fn get_running_run(
    db: &Database,
    thread_id: &str,
) -> Result<Option<RunRow>, ConfabError> {
    let thread_id = thread_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<RunRow>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM runs WHERE thread_id = ?1 AND status = 'running'"
            ))?;
            let result = stmt.query_row(params![thread_id], row_to_run);
            match result {
                Ok(run) => Ok(Some(run)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a run by ID.
pub async fn get_run(db: &Database, run_id: &str) -> Result<Option<RunRow>, ConfabError> {
    let run_id = run_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<RunRow>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM runs WHERE id = ?1"
            ))?;
            let result = stmt.query_row(params![run_id], row_to_run);
            match result {
                Ok(run) => Ok(Some(run)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All runs for a thread, oldest first.
pub async fn runs_for_thread(db: &Database, thread_id: &str) -> Result<Vec<RunRow>, ConfabError> {
    let thread_id = thread_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<RunRow>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM runs
                 WHERE thread_id = ?1 ORDER BY started_at ASC, rowid ASC"
            ))?;
            let rows = stmt.query_map(params![thread_id], row_to_run)?;
            let mut runs = Vec::new();
            for row in rows {
                runs.push(row?);
            }
            Ok(runs)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Transition a run from `running` to `completed`.
///
/// Returns `false` if the run was not in `running` (already terminal, or
/// reaped by a concurrent submission).
pub async fn complete_run(db: &Database, run_id: &str) -> Result<bool, ConfabError> {
    let run_id = run_id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let affected = conn.execute(
                "UPDATE runs SET status = 'completed',
                 finished_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND status = 'running'",
                params![run_id],
            )?;
            Ok(affected > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Transition a run from `running` to `failed`, recording the error text.
///
/// Returns `false` if the run was not in `running`.
pub async fn fail_run(db: &Database, run_id: &str, error: &str) -> Result<bool, ConfabError> {
    let run_id = run_id.to_string();
    let error = error.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let affected = conn.execute(
                "UPDATE runs SET status = 'failed', error = ?2,
                 finished_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND status = 'running'",
                params![run_id, error],
            )?;
            Ok(affected > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fail a running run only if it started before `cutoff`.
///
/// The age re-check inside the UPDATE makes the reap race-safe: if the run
/// completed (or was already reaped) between the caller's read and this
/// write, zero rows are affected and the caller proceeds against the gate.
pub async fn fail_run_if_stale(
    db: &Database,
    run_id: &str,
    cutoff: &str,
    error: &str,
) -> Result<bool, ConfabError> {
    let run_id = run_id.to_string();
    let cutoff = cutoff.to_string();
    let error = error.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let affected = conn.execute(
                "UPDATE runs SET status = 'failed', error = ?2,
                 finished_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND status = 'running' AND started_at < ?3",
                params![run_id, error, cutoff],
            )?;
            Ok(affected > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
