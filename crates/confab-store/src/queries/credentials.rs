// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Encrypted credential rows.
//!
//! The store never sees plaintext keys. Server-scheme rows carry a nonce for
//! the server-side cipher; client-scheme rows hold an opaque blob the client
//! encrypted, so their nonce column is NULL.

use confab_core::{ConfabError, CredentialScheme, ProviderKind};
use rusqlite::params;

use crate::database::Database;
use crate::models::CredentialRow;

const SELECT_COLUMNS: &str =
    "user_id, provider, scheme, ciphertext, nonce, created_at, updated_at";

fn row_to_credential(row: &rusqlite::Row<'_>) -> Result<CredentialRow, rusqlite::Error> {
    Ok(CredentialRow {
        user_id: row.get(0)?,
        provider: row.get(1)?,
        scheme: row.get(2)?,
        ciphertext: row.get(3)?,
        nonce: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

/// Insert or replace a user's credential for a provider.
pub async fn upsert_credential(
    db: &Database,
    user_id: &str,
    provider: ProviderKind,
    scheme: CredentialScheme,
    ciphertext: &[u8],
    nonce: Option<&[u8]>,
) -> Result<(), ConfabError> {
    let user_id = user_id.to_string();
    let provider = provider.to_string();
    let scheme = scheme.to_string();
    let ciphertext = ciphertext.to_vec();
    let nonce = nonce.map(<[u8]>::to_vec);
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO credentials (user_id, provider, scheme, ciphertext, nonce)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (user_id, provider) DO UPDATE SET
                     scheme = excluded.scheme,
                     ciphertext = excluded.ciphertext,
                     nonce = excluded.nonce,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![user_id, provider, scheme, ciphertext, nonce],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// A user's credential for a provider, if stored.
pub async fn get_credential(
    db: &Database,
    user_id: &str,
    provider: ProviderKind,
) -> Result<Option<CredentialRow>, ConfabError> {
    let user_id = user_id.to_string();
    let provider = provider.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<CredentialRow>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM credentials WHERE user_id = ?1 AND provider = ?2"
            ))?;
            let result = stmt.query_row(params![user_id, provider], row_to_credential);
            match result {
                Ok(credential) => Ok(Some(credential)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Remove a user's credential for a provider. Returns `false` if none existed.
pub async fn delete_credential(
    db: &Database,
    user_id: &str,
    provider: ProviderKind,
) -> Result<bool, ConfabError> {
    let user_id = user_id.to_string();
    let provider = provider.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let affected = conn.execute(
                "DELETE FROM credentials WHERE user_id = ?1 AND provider = ?2",
                params![user_id, provider],
            )?;
            Ok(affected > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All credentials stored for a user, ordered by provider.
pub async fn list_credentials(
    db: &Database,
    user_id: &str,
) -> Result<Vec<CredentialRow>, ConfabError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<CredentialRow>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM credentials
                 WHERE user_id = ?1 ORDER BY provider ASC"
            ))?;
            let rows = stmt.query_map(params![user_id], row_to_credential)?;
            let mut credentials = Vec::new();
            for row in rows {
                credentials.push(row?);
            }
            Ok(credentials)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn upsert_roundtrip_and_replace() {
        let (db, _dir) = setup_db().await;

        upsert_credential(
            &db,
            "user-1",
            ProviderKind::OpenAi,
            CredentialScheme::Server,
            b"ciphertext-v1",
            Some(b"twelve-bytes"),
        )
        .await
        .unwrap();

        let stored = get_credential(&db, "user-1", ProviderKind::OpenAi)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.scheme, "server");
        assert_eq!(stored.ciphertext, b"ciphertext-v1");
        assert_eq!(stored.nonce.as_deref(), Some(b"twelve-bytes".as_slice()));

        // Re-upsert replaces ciphertext and scheme in place.
        upsert_credential(
            &db,
            "user-1",
            ProviderKind::OpenAi,
            CredentialScheme::Client,
            b"client-blob",
            None,
        )
        .await
        .unwrap();

        let replaced = get_credential(&db, "user-1", ProviderKind::OpenAi)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(replaced.scheme, "client");
        assert_eq!(replaced.ciphertext, b"client-blob");
        assert!(replaced.nonce.is_none());
        assert_eq!(replaced.created_at, stored.created_at);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn providers_are_independent_slots() {
        let (db, _dir) = setup_db().await;

        upsert_credential(
            &db,
            "user-1",
            ProviderKind::OpenAi,
            CredentialScheme::Server,
            b"openai-key",
            Some(b"nonce-openai"),
        )
        .await
        .unwrap();
        upsert_credential(
            &db,
            "user-1",
            ProviderKind::Gemini,
            CredentialScheme::Server,
            b"gemini-key",
            Some(b"nonce-gemini"),
        )
        .await
        .unwrap();

        let all = list_credentials(&db, "user-1").await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].provider, "gemini");
        assert_eq!(all[1].provider, "openai");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn delete_reports_presence() {
        let (db, _dir) = setup_db().await;

        upsert_credential(
            &db,
            "user-1",
            ProviderKind::OpenAi,
            CredentialScheme::Server,
            b"key",
            Some(b"nonce"),
        )
        .await
        .unwrap();

        assert!(delete_credential(&db, "user-1", ProviderKind::OpenAi).await.unwrap());
        assert!(!delete_credential(&db, "user-1", ProviderKind::OpenAi).await.unwrap());
        assert!(get_credential(&db, "user-1", ProviderKind::OpenAi)
            .await
            .unwrap()
            .is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn credentials_are_scoped_per_user() {
        let (db, _dir) = setup_db().await;

        upsert_credential(
            &db,
            "user-1",
            ProviderKind::OpenAi,
            CredentialScheme::Server,
            b"key",
            Some(b"nonce"),
        )
        .await
        .unwrap();

        assert!(get_credential(&db, "user-2", ProviderKind::OpenAi)
            .await
            .unwrap()
            .is_none());
        assert!(list_credentials(&db, "user-2").await.unwrap().is_empty());

        db.close().await.unwrap();
    }
}
