// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Schema migrations, embedded at build time.
//!
//! Refinery compiles everything under `migrations/` into the binary and
//! records what has been applied in its `refinery_schema_history` table, so
//! opening a database always leaves it at the current schema.

use confab_core::ConfabError;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Bring the connection's schema up to date.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), ConfabError> {
    let report = embedded::migrations::runner()
        .run(conn)
        .map_err(|e| ConfabError::Storage { source: Box::new(e) })?;

    let applied = report.applied_migrations().len();
    if applied > 0 {
        tracing::debug!(applied, "applied schema migrations");
    }
    Ok(())
}
