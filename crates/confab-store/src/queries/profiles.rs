// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User profile lookups, used to annotate transcript history with display
//! names.

use confab_core::ConfabError;
use rusqlite::params;

use crate::database::Database;

/// Insert or update a user's display name.
pub async fn upsert_profile(
    db: &Database,
    user_id: &str,
    display_name: Option<&str>,
) -> Result<(), ConfabError> {
    let user_id = user_id.to_string();
    let display_name = display_name.map(str::to_string);
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO profiles (user_id, display_name) VALUES (?1, ?2)
                 ON CONFLICT (user_id) DO UPDATE SET display_name = excluded.display_name",
                params![user_id, display_name],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// A user's display name, or `None` when unset or the user is unknown.
pub async fn get_display_name(
    db: &Database,
    user_id: &str,
) -> Result<Option<String>, ConfabError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
            let result = conn.query_row(
                "SELECT display_name FROM profiles WHERE user_id = ?1",
                params![user_id],
                |row| row.get::<_, Option<String>>(0),
            );
            match result {
                Ok(name) => Ok(name),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}
