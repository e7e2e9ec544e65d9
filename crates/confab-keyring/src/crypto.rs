// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key derivation and AES-256-GCM seal/open primitives.
//!
//! The 32-byte sealing key is derived once per process from the configured
//! server secret via HKDF-SHA256. Every call to [`seal`] generates a fresh
//! random 96-bit nonce via the system CSPRNG; nonce reuse would be
//! catastrophic for GCM security.

use confab_core::ConfabError;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::hkdf;
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroizing;

// Fixed HKDF salt and info label. Changing either invalidates every stored
// server-scheme credential.
const HKDF_SALT: &[u8] = b"confab-keyring-v1";
const HKDF_INFO: &[u8] = b"credential-sealing-key";

/// Derive the 32-byte sealing key from the server secret via HKDF-SHA256.
///
/// Deterministic: the same secret always yields the same key, so credentials
/// sealed in one process decrypt in any other configured with that secret.
pub fn derive_key(server_secret: &[u8]) -> Result<Zeroizing<[u8; 32]>, ConfabError> {
    let salt = hkdf::Salt::new(hkdf::HKDF_SHA256, HKDF_SALT);
    let prk = salt.extract(server_secret);
    let okm = prk
        .expand(&[HKDF_INFO], hkdf::HKDF_SHA256)
        .map_err(|_| ConfabError::Crypto("HKDF-SHA256 expansion failed".to_string()))?;

    let mut key = Zeroizing::new([0u8; 32]);
    okm.fill(key.as_mut())
        .map_err(|_| ConfabError::Crypto("HKDF-SHA256 output fill failed".to_string()))?;
    Ok(key)
}

/// Encrypt plaintext with AES-256-GCM under a random 96-bit nonce.
///
/// Returns `(ciphertext_with_tag, nonce_bytes)`; both must be stored to
/// decrypt later.
pub fn seal(key: &[u8; 32], plaintext: &[u8]) -> Result<(Vec<u8>, [u8; 12]), ConfabError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key)
        .map_err(|_| ConfabError::Crypto("failed to create AES-256-GCM key".to_string()))?;
    let less_safe = LessSafeKey::new(unbound);

    let rng = SystemRandom::new();
    let mut nonce_bytes = [0u8; 12];
    rng.fill(&mut nonce_bytes)
        .map_err(|_| ConfabError::Crypto("failed to generate random nonce".to_string()))?;
    let nonce = Nonce::assume_unique_for_key(nonce_bytes);

    // Seal in place; the buffer grows by the 16-byte authentication tag.
    let mut in_out = plaintext.to_vec();
    less_safe
        .seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| ConfabError::Crypto("AES-256-GCM encryption failed".to_string()))?;

    Ok((in_out, nonce_bytes))
}

/// Decrypt ciphertext sealed by [`seal`].
///
/// Fails if the key is wrong or the ciphertext was tampered with.
pub fn open(
    key: &[u8; 32],
    nonce_bytes: &[u8; 12],
    ciphertext: &[u8],
) -> Result<Vec<u8>, ConfabError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key)
        .map_err(|_| ConfabError::Crypto("failed to create AES-256-GCM key".to_string()))?;
    let less_safe = LessSafeKey::new(unbound);
    let nonce = Nonce::assume_unique_for_key(*nonce_bytes);

    let mut in_out = ciphertext.to_vec();
    let plaintext = less_safe
        .open_in_place(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| {
            ConfabError::Crypto(
                "AES-256-GCM decryption failed (wrong key or corrupted data)".to_string(),
            )
        })?;

    Ok(plaintext.to_vec())
}
