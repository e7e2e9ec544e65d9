// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory credential resolver mirroring the keyring's contract.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use confab_core::{ConfabError, CredentialResolver, ProviderKind, UserId};
use secrecy::SecretString;
use tokio::sync::Mutex;

enum Entry {
    /// Resolvable server-side; `resolve` returns this key.
    Server(String),
    /// Browser-encrypted; `resolve` only succeeds with a supplied key.
    ClientOnly,
}

/// Credential resolver with fixed entries, for orchestrator and gateway
/// tests that should not exercise real crypto.
#[derive(Default)]
pub struct StaticCredentials {
    entries: Mutex<HashMap<(String, ProviderKind), Entry>>,
}

impl StaticCredentials {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn insert_server_key(&self, user_id: &UserId, provider: ProviderKind, key: &str) {
        self.entries
            .lock()
            .await
            .insert((user_id.0.clone(), provider), Entry::Server(key.to_string()));
    }

    pub async fn insert_client_only(&self, user_id: &UserId, provider: ProviderKind) {
        self.entries
            .lock()
            .await
            .insert((user_id.0.clone(), provider), Entry::ClientOnly);
    }
}

#[async_trait]
impl CredentialResolver for StaticCredentials {
    async fn resolve(
        &self,
        owner: &UserId,
        provider: ProviderKind,
        supplied: Option<SecretString>,
    ) -> Result<SecretString, ConfabError> {
        let entries = self.entries.lock().await;
        match entries.get(&(owner.0.clone(), provider)) {
            None => Err(ConfabError::CredentialMissing { provider }),
            Some(Entry::Server(key)) => Ok(SecretString::from(key.clone())),
            Some(Entry::ClientOnly) => supplied.ok_or(ConfabError::ClientKeyRequired { provider }),
        }
    }
}
