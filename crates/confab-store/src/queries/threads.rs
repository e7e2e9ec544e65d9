// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Thread row operations.
//!
//! Thread lifecycle belongs to the surrounding CRUD layer; these operations
//! exist for the registry, operator tooling, and tests.

use confab_core::ConfabError;
use rusqlite::params;

use crate::database::Database;
use crate::models::ThreadRow;

/// Insert a new thread.
pub async fn insert_thread(db: &Database, thread: &ThreadRow) -> Result<(), ConfabError> {
    let thread = thread.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO threads (id, owner_id, title, provider, model, system_prompt,
                                      archived, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    thread.id,
                    thread.owner_id,
                    thread.title,
                    thread.provider,
                    thread.model,
                    thread.system_prompt,
                    thread.archived,
                    thread.created_at,
                    thread.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a thread by ID.
pub async fn get_thread(db: &Database, id: &str) -> Result<Option<ThreadRow>, ConfabError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<ThreadRow>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, owner_id, title, provider, model, system_prompt,
                        archived, created_at, updated_at
                 FROM threads WHERE id = ?1",
            )?;
            let result = stmt.query_row(params![id], |row| {
                Ok(ThreadRow {
                    id: row.get(0)?,
                    owner_id: row.get(1)?,
                    title: row.get(2)?,
                    provider: row.get(3)?,
                    model: row.get(4)?,
                    system_prompt: row.get(5)?,
                    archived: row.get(6)?,
                    created_at: row.get(7)?,
                    updated_at: row.get(8)?,
                })
            });
            match result {
                Ok(thread) => Ok(Some(thread)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Set a thread's archived flag. Returns `false` if no such thread exists.
pub async fn set_archived(db: &Database, id: &str, archived: bool) -> Result<bool, ConfabError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let affected = conn.execute(
                "UPDATE threads SET archived = ?1,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2",
                params![archived, id],
            )?;
            Ok(affected > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
