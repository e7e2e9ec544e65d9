// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types for storage entities.
//!
//! These mirror the SQLite schema: statuses and enums are stored as strings
//! (backed by CHECK constraints) and stay strings here. The typed seam types
//! in `confab-core` are produced at the registry boundary, not in row form.

/// A row in `threads`.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadRow {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub provider: String,
    pub model: String,
    pub system_prompt: Option<String>,
    pub archived: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// A row in `runs`.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRow {
    pub id: String,
    pub thread_id: String,
    pub status: String,
    pub error: Option<String>,
    pub started_at: String,
    pub finished_at: Option<String>,
}

/// A row in `queue_items`.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueItemRow {
    pub id: i64,
    pub thread_id: String,
    pub user_id: String,
    pub sender_kind: String,
    pub content: String,
    pub status: String,
    pub created_at: String,
    pub consumed_at: Option<String>,
    pub discarded_at: Option<String>,
}

/// Outcome of enqueueing a submission: the new item id and its 1-based
/// position among the thread's pending items at enqueue time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnqueueReceipt {
    pub item_id: i64,
    pub position: i64,
}

/// A row in `messages`.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageRow {
    pub id: String,
    pub thread_id: String,
    pub role: String,
    pub sender_id: Option<String>,
    pub sender_name: Option<String>,
    pub content: String,
    pub created_at: String,
}

/// A row in `stream_events`.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEventRow {
    pub id: i64,
    pub thread_id: String,
    pub run_id: String,
    pub seq: i64,
    pub delta: String,
    pub created_at: String,
}

/// A row in `credentials`. `ciphertext` is opaque for client-scheme rows.
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialRow {
    pub user_id: String,
    pub provider: String,
    pub scheme: String,
    pub ciphertext: Vec<u8>,
    pub nonce: Option<Vec<u8>>,
    pub created_at: String,
    pub updated_at: String,
}
