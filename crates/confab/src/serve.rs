// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `confab serve` command: wire storage, keyring, providers and the
//! orchestrator together and run the HTTP gateway until shutdown.

use std::sync::Arc;

use confab_config::ConfabConfig;
use confab_core::{ConfabError, GenerationProvider};
use confab_gateway::{GatewayState, ServerConfig};
use confab_keyring::Keyring;
use confab_providers::{GeminiProvider, OpenAiProvider};
use confab_runner::Orchestrator;
use confab_store::registry::{SqliteProfileRegistry, SqliteThreadRegistry};
use confab_store::Database;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Crates whose log output follows the configured level. Everything else
/// stays at `warn` unless `RUST_LOG` overrides the whole filter.
const CRATES: &[&str] = &[
    "confab",
    "confab_config",
    "confab_core",
    "confab_gateway",
    "confab_keyring",
    "confab_providers",
    "confab_runner",
    "confab_store",
];

fn init_tracing(log_level: &str) {
    let directives = CRATES
        .iter()
        .map(|krate| format!("{krate}={log_level}"))
        .collect::<Vec<_>>()
        .join(",");
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{directives},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

/// Run the gateway server. Blocks until the listener fails or the process
/// is terminated.
pub async fn run_serve(config: ConfabConfig) -> Result<(), ConfabError> {
    init_tracing(&config.server.log_level);
    info!(version = env!("CARGO_PKG_VERSION"), "starting confab serve");

    let db = Database::open_with(&config.storage.database_path, config.storage.wal_mode).await?;

    let server_secret = crate::key::require_server_secret(&config)?;
    let keyring = Arc::new(Keyring::new(db.clone(), &server_secret)?);

    let openai = OpenAiProvider::new(&config.providers.openai)?;
    let gemini = GeminiProvider::new(&config.providers.gemini)?;
    let providers: Vec<Arc<dyn GenerationProvider>> = vec![Arc::new(openai), Arc::new(gemini)];

    let orchestrator = Arc::new(Orchestrator::new(
        db.clone(),
        Arc::new(SqliteThreadRegistry::new(db.clone())),
        Arc::new(SqliteProfileRegistry::new(db.clone())),
        keyring,
        providers,
        config.orchestrator.stale_after_secs,
    ));

    let server_config = ServerConfig {
        bind_address: config.server.bind_address.clone(),
        port: config.server.port,
        allowed_origins: config.server.allowed_origins.clone(),
    };
    let state = GatewayState { orchestrator, db };

    confab_gateway::start_server(&server_config, state).await
}
