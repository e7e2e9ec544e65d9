// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `confab thread` subcommands: create and archive conversation threads.

use clap::Subcommand;
use confab_config::ConfabConfig;
use confab_core::{ConfabError, ProviderKind};
use confab_store::database::now_timestamp;
use confab_store::models::ThreadRow;
use confab_store::queries::{queue, threads};
use confab_store::Database;
use uuid::Uuid;

#[derive(Subcommand, Debug)]
pub enum ThreadCommand {
    /// Create a thread bound to a model and provider.
    Add {
        /// User who owns the thread.
        #[arg(long)]
        owner: String,

        /// Human-readable thread title.
        #[arg(long)]
        title: String,

        /// Model identifier, e.g. `gpt-4o-mini` or `gemini-2.0-flash`.
        #[arg(long)]
        model: String,

        /// Provider backing the thread. Inferred from the model name when
        /// omitted.
        #[arg(long)]
        provider: Option<ProviderKind>,

        /// System prompt prepended to every generation.
        #[arg(long)]
        system_prompt: Option<String>,
    },

    /// Archive a thread and discard its pending queue items.
    Archive {
        /// Thread id to archive.
        id: String,
    },
}

pub async fn run_thread(config: ConfabConfig, command: ThreadCommand) -> Result<(), ConfabError> {
    let db = Database::open_with(&config.storage.database_path, config.storage.wal_mode).await?;

    match command {
        ThreadCommand::Add {
            owner,
            title,
            model,
            provider,
            system_prompt,
        } => {
            let provider = match provider.or_else(|| ProviderKind::infer(&model)) {
                Some(provider) => provider,
                None => {
                    return Err(ConfabError::Config(format!(
                        "cannot infer a provider from model '{model}'; pass --provider \
                         openai|gemini"
                    )));
                }
            };
            let id = Uuid::new_v4().to_string();
            let now = now_timestamp();
            threads::insert_thread(
                &db,
                &ThreadRow {
                    id: id.clone(),
                    owner_id: owner,
                    title,
                    provider: provider.to_string(),
                    model,
                    system_prompt,
                    archived: false,
                    created_at: now.clone(),
                    updated_at: now,
                },
            )
            .await?;
            println!("created thread {id} ({provider})");
        }
        ThreadCommand::Archive { id } => {
            if !threads::set_archived(&db, &id, true).await? {
                return Err(ConfabError::ThreadNotFound { thread_id: id });
            }
            let discarded = queue::discard_pending(&db, &id).await?;
            println!("archived thread {id}; discarded {discarded} pending item(s)");
        }
    }

    db.close().await
}
