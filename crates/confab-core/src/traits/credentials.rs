// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential resolution seam.

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::ConfabError;
use crate::types::{ProviderKind, UserId};

/// Resolves the provider API key for a thread owner.
///
/// `supplied` carries a caller-provided plaintext key, required when the
/// stored credential is client-encrypted and the server cannot open it.
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    /// Returns the plaintext API key for `owner`/`provider`.
    ///
    /// Errors with [`ConfabError::CredentialMissing`] when no credential is
    /// stored, and with [`ConfabError::ClientKeyRequired`] when the stored
    /// credential is client-encrypted and `supplied` is `None`.
    async fn resolve(
        &self,
        owner: &UserId,
        provider: ProviderKind,
        supplied: Option<SecretString>,
    ) -> Result<SecretString, ConfabError>;
}
