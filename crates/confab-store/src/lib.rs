// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Confab run orchestrator.
//!
//! WAL-mode SQLite with embedded migrations, accessed through the
//! single-writer model of `tokio-rusqlite`, with typed operations for
//! threads, runs, the pending-message queue, transcripts, and encrypted
//! credentials.
//! The single-flight run gate lives here as a partial unique index, so the
//! invariant holds across every process sharing the database file.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod registry;

pub use database::Database;
pub use models::*;
pub use registry::{SqliteProfileRegistry, SqliteThreadRegistry};
