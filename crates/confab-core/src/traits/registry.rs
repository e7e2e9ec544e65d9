// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only registries the orchestration core consults.
//!
//! Thread and profile lifecycle (creation, archival, renames) belongs to the
//! surrounding CRUD layer; the core only ever looks records up.

use async_trait::async_trait;

use crate::error::ConfabError;
use crate::types::{ThreadId, ThreadInfo, UserId};

/// Lookup of thread metadata: owner, provider binding, model, prompt,
/// archived flag.
#[async_trait]
pub trait ThreadRegistry: Send + Sync {
    /// Returns the thread's metadata, or `None` if no such thread exists.
    async fn lookup(&self, thread_id: &ThreadId) -> Result<Option<ThreadInfo>, ConfabError>;
}

/// Minimal directory slice used for speaker attribution in transcripts.
#[async_trait]
pub trait ProfileRegistry: Send + Sync {
    /// Returns the user's display name, or `None` if the user has none set
    /// or is unknown.
    async fn display_name(&self, user_id: &UserId) -> Result<Option<String>, ConfabError>;
}
