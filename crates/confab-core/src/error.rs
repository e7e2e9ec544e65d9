// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Confab orchestration core.

use thiserror::Error;

use crate::types::ProviderKind;

/// The primary error type used across all Confab crates and core operations.
#[derive(Debug, Error)]
pub enum ConfabError {
    /// A configuration value that loaded but cannot be used.
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The referenced thread does not exist.
    #[error("thread not found: {thread_id}")]
    ThreadNotFound { thread_id: String },

    /// The referenced thread is archived and accepts no new submissions.
    #[error("thread is archived: {thread_id}")]
    ThreadArchived { thread_id: String },

    /// No stored API key for the thread owner and target provider.
    #[error("no {provider} credential stored for this user")]
    CredentialMissing { provider: ProviderKind },

    /// The stored API key is client-encrypted and the caller did not supply
    /// the decrypted key with the request.
    #[error("{provider} credential requires client-side decryption; supply the key with the request")]
    ClientKeyRequired { provider: ProviderKind },

    /// Sealing or opening an encrypted credential failed.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Generation provider errors (API failure, malformed stream, empty response).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Invariant violations and other states that should not be reachable.
    #[error("internal error: {0}")]
    Internal(String),
}
