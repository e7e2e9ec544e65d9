// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transcript persistence.
//!
//! Timestamps come from the caller so a user message and the assistant reply
//! produced from it can share the orchestrator's clock. Reads tiebreak equal
//! timestamps on rowid, which preserves insertion order.

use confab_core::ConfabError;
use rusqlite::params;

use crate::database::Database;
use crate::models::MessageRow;

const SELECT_COLUMNS: &str = "id, thread_id, role, sender_id, sender_name, content, created_at";

fn row_to_message(row: &rusqlite::Row<'_>) -> Result<MessageRow, rusqlite::Error> {
    Ok(MessageRow {
        id: row.get(0)?,
        thread_id: row.get(1)?,
        role: row.get(2)?,
        sender_id: row.get(3)?,
        sender_name: row.get(4)?,
        content: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Append a message to a thread's transcript.
pub async fn append_message(db: &Database, message: &MessageRow) -> Result<(), ConfabError> {
    let message = message.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO messages (id, thread_id, role, sender_id, sender_name, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    message.id,
                    message.thread_id,
                    message.role,
                    message.sender_id,
                    message.sender_name,
                    message.content,
                    message.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Full transcript for a thread, oldest first.
pub async fn messages_for_thread(
    db: &Database,
    thread_id: &str,
) -> Result<Vec<MessageRow>, ConfabError> {
    let thread_id = thread_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<MessageRow>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM messages
                 WHERE thread_id = ?1 ORDER BY created_at ASC, rowid ASC"
            ))?;
            let rows = stmt.query_map(params![thread_id], row_to_message)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
