// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Encrypted credential storage and resolution for Confab.
//!
//! Per-user API keys are sealed with AES-256-GCM under a key derived from the
//! configured server secret via HKDF-SHA256. Browser-encrypted credentials
//! are stored opaque; resolving those requires the caller to supply the
//! plaintext key with the request.

pub mod crypto;
pub mod keyring;

pub use keyring::{mask_secret, CredentialSummary, Keyring};
