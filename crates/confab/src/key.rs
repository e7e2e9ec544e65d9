// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `confab key` subcommands: store, list, and remove per-user provider
//! credentials from the command line.
//!
//! Secrets are read from a prompt with echo disabled, or from stdin when
//! `--stdin` is passed for non-interactive use. They never appear in argv.

use std::io::IsTerminal;

use base64::Engine as _;
use clap::Subcommand;
use confab_config::ConfabConfig;
use confab_core::{ConfabError, ProviderKind, UserId};
use confab_keyring::Keyring;
use confab_store::Database;
use secrecy::{ExposeSecret, SecretString};

#[derive(Subcommand, Debug)]
pub enum KeyCommand {
    /// Store an API key for a user and provider.
    Set {
        /// User the credential belongs to.
        #[arg(long)]
        user: String,

        /// Provider the credential is for.
        #[arg(long)]
        provider: ProviderKind,

        /// Read the secret from stdin instead of prompting.
        #[arg(long)]
        stdin: bool,

        /// Store a base64 blob that was encrypted client-side. The server
        /// keeps it opaque and cannot use it without the caller's key.
        #[arg(long)]
        client_blob: bool,
    },

    /// List stored credentials for a user with masked previews.
    List {
        /// User whose credentials to list.
        #[arg(long)]
        user: String,
    },

    /// Remove a stored credential.
    Rm {
        /// User the credential belongs to.
        #[arg(long)]
        user: String,

        /// Provider the credential is for.
        #[arg(long)]
        provider: ProviderKind,
    },
}

/// The configured server secret, required before any keyring operation.
pub(crate) fn require_server_secret(config: &ConfabConfig) -> Result<SecretString, ConfabError> {
    match &config.keyring.server_secret {
        Some(secret) if !secret.is_empty() => Ok(SecretString::from(secret.clone())),
        _ => Err(ConfabError::Config(
            "keyring.server_secret is not set; add it to confab.toml or set \
             CONFAB_KEYRING_SERVER_SECRET"
                .to_string(),
        )),
    }
}

/// Read a secret without echoing it. `--stdin` reads one line from standard
/// input instead, for piping from a secret manager.
fn read_secret(prompt: &str, from_stdin: bool) -> Result<SecretString, ConfabError> {
    if from_stdin {
        let mut line = String::new();
        std::io::stdin()
            .read_line(&mut line)
            .map_err(|e| ConfabError::Config(format!("could not read secret from stdin: {e}")))?;
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            return Err(ConfabError::Config("empty secret on stdin".to_string()));
        }
        return Ok(SecretString::from(trimmed));
    }

    if !std::io::stdin().is_terminal() {
        return Err(ConfabError::Config(
            "no TTY; use --stdin to read the key from standard input".to_string(),
        ));
    }

    eprint!("{prompt}: ");
    let secret = rpassword::read_password()
        .map_err(|e| ConfabError::Config(format!("could not read secret: {e}")))?;
    if secret.is_empty() {
        return Err(ConfabError::Config("empty secret".to_string()));
    }
    Ok(SecretString::from(secret))
}

pub async fn run_key(config: ConfabConfig, command: KeyCommand) -> Result<(), ConfabError> {
    let secret = require_server_secret(&config)?;
    let db = Database::open_with(&config.storage.database_path, config.storage.wal_mode).await?;
    let keyring = Keyring::new(db.clone(), &secret)?;

    match command {
        KeyCommand::Set {
            user,
            provider,
            stdin,
            client_blob,
        } => {
            let user_id = UserId(user);
            if client_blob {
                let encoded = read_secret("Client-encrypted blob (base64)", stdin)?;
                let blob = base64::engine::general_purpose::STANDARD
                    .decode(encoded.expose_secret())
                    .map_err(|e| {
                        ConfabError::Config(format!("client blob is not valid base64: {e}"))
                    })?;
                keyring.store_client_blob(&user_id, provider, &blob).await?;
                println!("stored client-encrypted credential for {provider}");
            } else {
                let api_key = read_secret(&format!("API key for {provider}"), stdin)?;
                keyring.store_server_key(&user_id, provider, &api_key).await?;
                println!("stored credential for {provider}");
            }
        }
        KeyCommand::List { user } => {
            let summaries = keyring.list_masked(&UserId(user)).await?;
            if summaries.is_empty() {
                println!("no credentials stored");
            } else {
                for summary in summaries {
                    println!(
                        "{}\t{}\t{}\t{}",
                        summary.provider, summary.scheme, summary.preview, summary.updated_at
                    );
                }
            }
        }
        KeyCommand::Rm { user, provider } => {
            let removed = keyring.delete(&UserId(user), provider).await?;
            if removed {
                println!("removed credential for {provider}");
            } else {
                println!("no credential stored for {provider}");
            }
        }
    }

    db.close().await
}
