// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyring lifecycle: store, resolve, list, and delete per-user provider
//! credentials.
//!
//! Two credential schemes coexist in the same table:
//! - `server`: the API key is sealed under the HKDF-derived server key and
//!   the keyring can decrypt it on demand.
//! - `client`: the stored blob was encrypted in the user's browser. The
//!   server never holds that key, so resolution requires the caller to pass
//!   the already-decrypted plaintext along with the request.

use std::str::FromStr;

use async_trait::async_trait;
use confab_core::{
    ConfabError, CredentialResolver, CredentialScheme, ProviderKind, UserId,
};
use confab_store::queries::credentials;
use confab_store::Database;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use zeroize::Zeroizing;

use crate::crypto;

/// One row of [`Keyring::list_masked`] output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialSummary {
    pub provider: ProviderKind,
    pub scheme: CredentialScheme,
    pub preview: String,
    pub updated_at: String,
}

/// The keyring, holding the derived sealing key in memory.
///
/// Debug output intentionally omits the key.
pub struct Keyring {
    db: Database,
    key: Zeroizing<[u8; 32]>,
}

impl std::fmt::Debug for Keyring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keyring").field("key", &"[REDACTED]").finish()
    }
}

impl Keyring {
    /// Build a keyring over the store, deriving the sealing key from the
    /// configured server secret.
    pub fn new(db: Database, server_secret: &SecretString) -> Result<Self, ConfabError> {
        let key = crypto::derive_key(server_secret.expose_secret().as_bytes())?;
        Ok(Self { db, key })
    }

    /// Seal an API key under the server key and store it for the user.
    pub async fn store_server_key(
        &self,
        user_id: &UserId,
        provider: ProviderKind,
        api_key: &SecretString,
    ) -> Result<(), ConfabError> {
        let (ciphertext, nonce) = crypto::seal(&self.key, api_key.expose_secret().as_bytes())?;
        credentials::upsert_credential(
            &self.db,
            &user_id.0,
            provider,
            CredentialScheme::Server,
            &ciphertext,
            Some(&nonce),
        )
        .await?;
        debug!(user_id = %user_id, provider = %provider, "server-scheme credential stored");
        Ok(())
    }

    /// Store a browser-encrypted blob as-is. The server cannot decrypt it.
    pub async fn store_client_blob(
        &self,
        user_id: &UserId,
        provider: ProviderKind,
        blob: &[u8],
    ) -> Result<(), ConfabError> {
        credentials::upsert_credential(
            &self.db,
            &user_id.0,
            provider,
            CredentialScheme::Client,
            blob,
            None,
        )
        .await?;
        debug!(user_id = %user_id, provider = %provider, "client-scheme credential stored");
        Ok(())
    }

    /// Remove a credential. Returns `false` if none was stored.
    pub async fn delete(
        &self,
        user_id: &UserId,
        provider: ProviderKind,
    ) -> Result<bool, ConfabError> {
        let deleted = credentials::delete_credential(&self.db, &user_id.0, provider).await?;
        if deleted {
            debug!(user_id = %user_id, provider = %provider, "credential deleted");
        }
        Ok(deleted)
    }

    /// All of a user's credentials with masked previews, safe to print.
    pub async fn list_masked(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<CredentialSummary>, ConfabError> {
        let rows = credentials::list_credentials(&self.db, &user_id.0).await?;
        let mut result = Vec::with_capacity(rows.len());
        for row in rows {
            let provider = parse_provider(&row.provider)?;
            let scheme = parse_scheme(&row.scheme)?;
            let preview = match scheme {
                CredentialScheme::Server => match self.open_server_row(&row.nonce, &row.ciphertext)
                {
                    Ok(plaintext) => mask_secret(plaintext.expose_secret()),
                    Err(_) => "[error: could not decrypt]".to_string(),
                },
                CredentialScheme::Client => "[client-encrypted]".to_string(),
            };
            result.push(CredentialSummary {
                provider,
                scheme,
                preview,
                updated_at: row.updated_at,
            });
        }
        Ok(result)
    }

    fn open_server_row(
        &self,
        nonce: &Option<Vec<u8>>,
        ciphertext: &[u8],
    ) -> Result<SecretString, ConfabError> {
        let nonce_bytes = nonce
            .as_deref()
            .ok_or_else(|| ConfabError::Crypto("server-scheme row is missing its nonce".into()))?;
        let nonce_arr: [u8; 12] = nonce_bytes
            .try_into()
            .map_err(|_| ConfabError::Crypto("stored nonce has the wrong length".to_string()))?;
        let plaintext = crypto::open(&self.key, &nonce_arr, ciphertext)?;
        let key = String::from_utf8(plaintext)
            .map_err(|_| ConfabError::Crypto("decrypted credential is not valid UTF-8".into()))?;
        Ok(SecretString::from(key))
    }
}

#[async_trait]
impl CredentialResolver for Keyring {
    async fn resolve(
        &self,
        owner: &UserId,
        provider: ProviderKind,
        supplied: Option<SecretString>,
    ) -> Result<SecretString, ConfabError> {
        let row = credentials::get_credential(&self.db, &owner.0, provider)
            .await?
            .ok_or(ConfabError::CredentialMissing { provider })?;

        match parse_scheme(&row.scheme)? {
            CredentialScheme::Server => self.open_server_row(&row.nonce, &row.ciphertext),
            CredentialScheme::Client => {
                supplied.ok_or(ConfabError::ClientKeyRequired { provider })
            }
        }
    }
}

/// Display form of a secret: first and last four characters, or fully
/// starred when the value is too short for that to hide anything.
pub fn mask_secret(value: &str) -> String {
    let head = value.get(..4);
    let tail = value.get(value.len().saturating_sub(4)..);
    match (head, tail) {
        (Some(head), Some(tail)) if value.len() >= 10 => format!("{head}...{tail}"),
        _ => "****".to_string(),
    }
}

fn parse_provider(value: &str) -> Result<ProviderKind, ConfabError> {
    ProviderKind::from_str(value).map_err(|_| {
        ConfabError::Internal(format!("credential row has unrecognized provider '{value}'"))
    })
}

fn parse_scheme(value: &str) -> Result<CredentialScheme, ConfabError> {
    CredentialScheme::from_str(value).map_err(|_| {
        ConfabError::Internal(format!("credential row has unrecognized scheme '{value}'"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn server_secret() -> SecretString {
        SecretString::from("an adequately long server secret")
    }

    async fn setup_keyring() -> (Keyring, Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        let keyring = Keyring::new(db.clone(), &server_secret()).unwrap();
        (keyring, db, dir)
    }

    fn user() -> UserId {
        UserId("user-1".to_string())
    }

    #[tokio::test]
    async fn server_key_roundtrips_through_resolve() {
        let (keyring, db, _dir) = setup_keyring().await;

        keyring
            .store_server_key(
                &user(),
                ProviderKind::OpenAi,
                &SecretString::from("sk-proj-abcdef1234567890"),
            )
            .await
            .unwrap();

        let resolved = keyring
            .resolve(&user(), ProviderKind::OpenAi, None)
            .await
            .unwrap();
        assert_eq!(resolved.expose_secret(), "sk-proj-abcdef1234567890");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn missing_credential_is_a_distinct_error() {
        let (keyring, db, _dir) = setup_keyring().await;

        let err = keyring
            .resolve(&user(), ProviderKind::Gemini, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ConfabError::CredentialMissing { provider: ProviderKind::Gemini }
        ));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn client_scheme_requires_a_supplied_key() {
        let (keyring, db, _dir) = setup_keyring().await;

        keyring
            .store_client_blob(&user(), ProviderKind::OpenAi, b"opaque browser blob")
            .await
            .unwrap();

        let err = keyring
            .resolve(&user(), ProviderKind::OpenAi, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ConfabError::ClientKeyRequired { provider: ProviderKind::OpenAi }
        ));

        let resolved = keyring
            .resolve(
                &user(),
                ProviderKind::OpenAi,
                Some(SecretString::from("sk-supplied-by-client")),
            )
            .await
            .unwrap();
        assert_eq!(resolved.expose_secret(), "sk-supplied-by-client");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn wrong_server_secret_cannot_decrypt() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        let keyring = Keyring::new(db.clone(), &server_secret()).unwrap();
        keyring
            .store_server_key(
                &user(),
                ProviderKind::OpenAi,
                &SecretString::from("sk-proj-abcdef1234567890"),
            )
            .await
            .unwrap();

        let other = Keyring::new(db.clone(), &SecretString::from("a completely different secret"))
            .unwrap();
        let err = other
            .resolve(&user(), ProviderKind::OpenAi, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ConfabError::Crypto(_)));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_masks_server_keys_and_flags_client_blobs() {
        let (keyring, db, _dir) = setup_keyring().await;

        keyring
            .store_server_key(
                &user(),
                ProviderKind::OpenAi,
                &SecretString::from("sk-proj-abcdef1234567890"),
            )
            .await
            .unwrap();
        keyring
            .store_client_blob(&user(), ProviderKind::Gemini, b"opaque browser blob")
            .await
            .unwrap();

        let listed = keyring.list_masked(&user()).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].provider, ProviderKind::Gemini);
        assert_eq!(listed[0].scheme, CredentialScheme::Client);
        assert_eq!(listed[0].preview, "[client-encrypted]");
        assert_eq!(listed[1].provider, ProviderKind::OpenAi);
        assert_eq!(listed[1].preview, "sk-p...7890");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn delete_reports_presence() {
        let (keyring, db, _dir) = setup_keyring().await;

        keyring
            .store_server_key(&user(), ProviderKind::OpenAi, &SecretString::from("sk-key"))
            .await
            .unwrap();
        assert!(keyring.delete(&user(), ProviderKind::OpenAi).await.unwrap());
        assert!(!keyring.delete(&user(), ProviderKind::OpenAi).await.unwrap());

        db.close().await.unwrap();
    }

    #[test]
    fn mask_secret_short_values_fully_hidden() {
        assert_eq!(mask_secret("short"), "****");
        assert_eq!(mask_secret(""), "****");
        assert_eq!(mask_secret("123456789"), "****");
    }

    #[test]
    fn mask_secret_keeps_prefix_and_suffix() {
        assert_eq!(mask_secret("sk-proj-abcdef1234567890"), "sk-p...7890");
        assert_eq!(mask_secret("0123456789"), "0123...6789");
    }

    #[test]
    fn debug_output_redacts_the_key() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let rt = tokio::runtime::Runtime::new().unwrap();
        let db = rt.block_on(Database::open(db_path.to_str().unwrap())).unwrap();
        let keyring = Keyring::new(db, &server_secret()).unwrap();
        let rendered = format!("{keyring:?}");
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("server secret"));
    }
}
