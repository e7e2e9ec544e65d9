// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pending-message queue operations.
//!
//! Items are consumed oldest-first. Claiming is a conditional UPDATE on
//! `status = 'pending'`, so two drains racing for the same item resolve to
//! one winner; the loser sees `false` and re-reads the queue.

use confab_core::{ConfabError, SenderKind};
use rusqlite::params;

use crate::database::Database;
use crate::models::{EnqueueReceipt, QueueItemRow};

const SELECT_COLUMNS: &str =
    "id, thread_id, user_id, sender_kind, content, status, created_at, consumed_at, discarded_at";

fn row_to_item(row: &rusqlite::Row<'_>) -> Result<QueueItemRow, rusqlite::Error> {
    Ok(QueueItemRow {
        id: row.get(0)?,
        thread_id: row.get(1)?,
        user_id: row.get(2)?,
        sender_kind: row.get(3)?,
        content: row.get(4)?,
        status: row.get(5)?,
        created_at: row.get(6)?,
        consumed_at: row.get(7)?,
        discarded_at: row.get(8)?,
    })
}

/// Append a message to the thread's pending queue.
///
/// The returned position is 1-based among pending items at insertion time;
/// it is informational and may shrink as earlier items are consumed.
pub async fn enqueue(
    db: &Database,
    thread_id: &str,
    user_id: &str,
    sender_kind: SenderKind,
    content: &str,
) -> Result<EnqueueReceipt, ConfabError> {
    let thread_id = thread_id.to_string();
    let user_id = user_id.to_string();
    let sender_kind = sender_kind.to_string();
    let content = content.to_string();
    db.connection()
        .call(move |conn| -> Result<EnqueueReceipt, rusqlite::Error> {
            conn.execute(
                "INSERT INTO queue_items (thread_id, user_id, sender_kind, content)
                 VALUES (?1, ?2, ?3, ?4)",
                params![thread_id, user_id, sender_kind, content],
            )?;
            let item_id = conn.last_insert_rowid();
            let position: i64 = conn.query_row(
                "SELECT COUNT(*) FROM queue_items
                 WHERE thread_id = ?1 AND status = 'pending' AND id <= ?2",
                params![thread_id, item_id],
                |row| row.get(0),
            )?;
            Ok(EnqueueReceipt { item_id, position })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The oldest pending item for a thread, if any.
pub async fn oldest_pending(
    db: &Database,
    thread_id: &str,
) -> Result<Option<QueueItemRow>, ConfabError> {
    let thread_id = thread_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<QueueItemRow>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM queue_items
                 WHERE thread_id = ?1 AND status = 'pending'
                 ORDER BY created_at ASC, id ASC LIMIT 1"
            ))?;
            let result = stmt.query_row(params![thread_id], row_to_item);
            match result {
                Ok(item) => Ok(Some(item)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Atomically mark a pending item consumed.
///
/// Returns `false` if the item was already consumed or discarded.
pub async fn claim(db: &Database, item_id: i64) -> Result<bool, ConfabError> {
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let affected = conn.execute(
                "UPDATE queue_items SET status = 'consumed',
                 consumed_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND status = 'pending'",
                params![item_id],
            )?;
            Ok(affected > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Discard every pending item for a thread. Returns the discard count.
pub async fn discard_pending(db: &Database, thread_id: &str) -> Result<usize, ConfabError> {
    let thread_id = thread_id.to_string();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            let affected = conn.execute(
                "UPDATE queue_items SET status = 'discarded',
                 discarded_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE thread_id = ?1 AND status = 'pending'",
                params![thread_id],
            )?;
            Ok(affected)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Count of pending items for a thread.
pub async fn pending_count(db: &Database, thread_id: &str) -> Result<i64, ConfabError> {
    let thread_id = thread_id.to_string();
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.query_row(
                "SELECT COUNT(*) FROM queue_items WHERE thread_id = ?1 AND status = 'pending'",
                params![thread_id],
                |row| row.get(0),
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::now_timestamp;
    use crate::models::ThreadRow;
    use crate::queries::threads::insert_thread;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        insert_thread(
            &db,
            &ThreadRow {
                id: "t-1".to_string(),
                owner_id: "user-1".to_string(),
                title: String::new(),
                provider: "openai".to_string(),
                model: "gpt-4o-mini".to_string(),
                system_prompt: None,
                archived: false,
                created_at: now_timestamp(),
                updated_at: now_timestamp(),
            },
        )
        .await
        .unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn enqueue_claim_lifecycle() {
        let (db, _dir) = setup_db().await;

        let receipt = enqueue(&db, "t-1", "user-1", SenderKind::Owner, "hello")
            .await
            .unwrap();
        assert_eq!(receipt.position, 1);

        let item = oldest_pending(&db, "t-1").await.unwrap().unwrap();
        assert_eq!(item.id, receipt.item_id);
        assert_eq!(item.content, "hello");
        assert_eq!(item.status, "pending");
        assert_eq!(item.sender_kind, "owner");
        assert!(item.consumed_at.is_none());

        assert!(claim(&db, item.id).await.unwrap());
        assert!(oldest_pending(&db, "t-1").await.unwrap().is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn double_claim_loses() {
        let (db, _dir) = setup_db().await;

        let receipt = enqueue(&db, "t-1", "user-1", SenderKind::Owner, "hello")
            .await
            .unwrap();
        assert!(claim(&db, receipt.item_id).await.unwrap());
        assert!(!claim(&db, receipt.item_id).await.unwrap());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn queue_is_fifo() {
        let (db, _dir) = setup_db().await;

        let first = enqueue(&db, "t-1", "user-1", SenderKind::Owner, "first")
            .await
            .unwrap();
        let second = enqueue(&db, "t-1", "user-2", SenderKind::Collaborator, "second")
            .await
            .unwrap();
        assert_eq!(first.position, 1);
        assert_eq!(second.position, 2);

        let item = oldest_pending(&db, "t-1").await.unwrap().unwrap();
        assert_eq!(item.content, "first");
        assert!(claim(&db, item.id).await.unwrap());

        let item = oldest_pending(&db, "t-1").await.unwrap().unwrap();
        assert_eq!(item.content, "second");
        assert_eq!(item.sender_kind, "collaborator");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn discard_clears_pending_but_not_consumed() {
        let (db, _dir) = setup_db().await;

        let first = enqueue(&db, "t-1", "user-1", SenderKind::Owner, "first")
            .await
            .unwrap();
        enqueue(&db, "t-1", "user-1", SenderKind::Owner, "second")
            .await
            .unwrap();
        enqueue(&db, "t-1", "user-1", SenderKind::Owner, "third")
            .await
            .unwrap();
        assert!(claim(&db, first.item_id).await.unwrap());

        let discarded = discard_pending(&db, "t-1").await.unwrap();
        assert_eq!(discarded, 2);
        assert!(oldest_pending(&db, "t-1").await.unwrap().is_none());
        assert_eq!(pending_count(&db, "t-1").await.unwrap(), 0);

        // Consumed item untouched.
        let status: String = db
            .connection()
            .call(move |conn| -> Result<String, rusqlite::Error> {
                conn.query_row(
                    "SELECT status FROM queue_items WHERE id = ?1",
                    params![first.item_id],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert_eq!(status, "consumed");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn position_counts_only_pending() {
        let (db, _dir) = setup_db().await;

        let first = enqueue(&db, "t-1", "user-1", SenderKind::Owner, "first")
            .await
            .unwrap();
        assert!(claim(&db, first.item_id).await.unwrap());

        // Earlier consumed item does not inflate the position.
        let second = enqueue(&db, "t-1", "user-1", SenderKind::Owner, "second")
            .await
            .unwrap();
        assert_eq!(second.position, 1);

        db.close().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_enqueues_all_land() {
        let (db, _dir) = setup_db().await;

        let mut handles = Vec::new();
        for i in 0..20 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                enqueue(&db, "t-1", "user-1", SenderKind::Owner, &format!("msg-{i}")).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(pending_count(&db, "t-1").await.unwrap(), 20);

        db.close().await.unwrap();
    }
}
