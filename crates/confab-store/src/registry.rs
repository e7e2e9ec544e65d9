// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed implementations of the lookup traits the orchestrator
//! depends on.

use std::str::FromStr;

use async_trait::async_trait;
use confab_core::{
    ConfabError, ProfileRegistry, ProviderKind, ThreadId, ThreadInfo, ThreadRegistry, UserId,
};

use crate::database::Database;
use crate::models::ThreadRow;
use crate::queries;

fn row_to_info(row: ThreadRow) -> Result<ThreadInfo, ConfabError> {
    // The CHECK constraint keeps this column in range; a parse failure means
    // the schema and the enum drifted apart.
    let provider = ProviderKind::from_str(&row.provider).map_err(|_| {
        ConfabError::Internal(format!(
            "thread {} has unrecognized provider '{}'",
            row.id, row.provider
        ))
    })?;
    Ok(ThreadInfo {
        id: ThreadId(row.id),
        owner_id: UserId(row.owner_id),
        title: row.title,
        provider,
        model: row.model,
        system_prompt: row.system_prompt,
        archived: row.archived,
    })
}

/// Thread lookups backed by the `threads` table.
#[derive(Clone)]
pub struct SqliteThreadRegistry {
    db: Database,
}

impl SqliteThreadRegistry {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ThreadRegistry for SqliteThreadRegistry {
    async fn lookup(&self, thread_id: &ThreadId) -> Result<Option<ThreadInfo>, ConfabError> {
        match queries::threads::get_thread(&self.db, &thread_id.0).await? {
            Some(row) => Ok(Some(row_to_info(row)?)),
            None => Ok(None),
        }
    }
}

/// Display-name lookups backed by the `profiles` table.
#[derive(Clone)]
pub struct SqliteProfileRegistry {
    db: Database,
}

impl SqliteProfileRegistry {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProfileRegistry for SqliteProfileRegistry {
    async fn display_name(&self, user_id: &UserId) -> Result<Option<String>, ConfabError> {
        queries::profiles::get_display_name(&self.db, &user_id.0).await
    }
}
