// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lazy staleness recovery for abandoned runs.
//!
//! There is no background timer. The submission path calls in here when it
//! finds a running run; a run older than the configured threshold is failed
//! so the thread's single-flight slot frees up. The conditional UPDATE
//! re-checks age and status, so a run that completed in the meantime is left
//! alone.

use confab_core::ConfabError;
use confab_store::database::timestamp_secs_ago;
use confab_store::models::RunRow;
use confab_store::queries::runs;
use confab_store::Database;
use tracing::info;

/// Error text recorded on runs failed by the reaper.
pub const STALE_RUN_ERROR: &str = "run stalled and was superseded by a newer submission";

/// Whether a run's start time is past the staleness threshold.
pub fn is_stale(run: &RunRow, stale_after_secs: u64) -> bool {
    // Timestamps sort lexicographically, so a plain string compare works.
    run.started_at < timestamp_secs_ago(stale_after_secs)
}

/// Fail the run if it is stale. Returns whether this call performed the
/// transition; `false` means the run was fresh, already terminal, or lost to
/// a concurrent writer.
pub async fn reap_if_stale(
    db: &Database,
    run: &RunRow,
    stale_after_secs: u64,
) -> Result<bool, ConfabError> {
    let cutoff = timestamp_secs_ago(stale_after_secs);
    if run.started_at >= cutoff {
        return Ok(false);
    }
    let reaped = runs::fail_run_if_stale(db, &run.id, &cutoff, STALE_RUN_ERROR).await?;
    if reaped {
        info!(run_id = %run.id, thread_id = %run.thread_id, "stale run failed by reaper");
    }
    Ok(reaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use confab_store::database::now_timestamp;
    use confab_store::models::ThreadRow;
    use confab_store::queries::threads::insert_thread;
    use tempfile::tempdir;

    async fn setup_with_run(started_secs_ago: u64) -> (Database, RunRow, tempfile::TempDir) {
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
        assert!(runs::try_start_run(&db, "r-1", "t-1").await.unwrap());

        let started_at = timestamp_secs_ago(started_secs_ago);
        db.connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "UPDATE runs SET started_at = ?1 WHERE id = 'r-1'",
                    rusqlite::params![started_at],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let run = runs::get_run(&db, "r-1").await.unwrap().unwrap();
        (db, run, dir)
    }

    #[tokio::test]
    async fn fresh_run_is_not_reaped() {
        let (db, run, _dir) = setup_with_run(10).await;

        assert!(!is_stale(&run, 120));
        assert!(!reap_if_stale(&db, &run, 120).await.unwrap());
        assert_eq!(runs::get_run(&db, "r-1").await.unwrap().unwrap().status, "running");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn old_run_is_failed_with_the_stale_error() {
        let (db, run, _dir) = setup_with_run(300).await;

        assert!(is_stale(&run, 120));
        assert!(reap_if_stale(&db, &run, 120).await.unwrap());

        let reaped = runs::get_run(&db, "r-1").await.unwrap().unwrap();
        assert_eq!(reaped.status, "failed");
        assert_eq!(reaped.error.as_deref(), Some(STALE_RUN_ERROR));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn completed_run_is_left_alone() {
        let (db, run, _dir) = setup_with_run(300).await;
        assert!(runs::complete_run(&db, "r-1").await.unwrap());

        // The stale snapshot no longer matches; the guard refuses.
        assert!(!reap_if_stale(&db, &run, 120).await.unwrap());
        assert_eq!(runs::get_run(&db, "r-1").await.unwrap().unwrap().status, "completed");

        db.close().await.unwrap();
    }
}
