// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Confab orchestration core.
//!
//! Every section derives `deny_unknown_fields`, so a typoed key fails
//! startup with a rich diagnostic instead of being silently ignored.

use serde::{Deserialize, Serialize};

/// Top-level Confab configuration.
///
/// Assembled by merging built-in defaults, the XDG-hierarchy TOML files,
/// and `CONFAB_*` environment variables. Any section may be omitted.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfabConfig {
    /// HTTP gateway settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// SQLite persistence settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Run/queue orchestration settings.
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Generation provider endpoints.
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Credential keyring settings.
    #[serde(default)]
    pub keyring: KeyringConfig,
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind the gateway to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Minimum level for the tracing subscriber (trace through error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Origins allowed by the CORS layer. Empty means same-origin only.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            log_level: default_log_level(),
            allowed_origins: Vec::new(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8787
}

fn default_log_level() -> String {
    "info".to_string()
}

/// SQLite persistence configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Filesystem path of the SQLite database.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Open the database in write-ahead-logging mode.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("confab").join("confab.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("confab.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Run/queue orchestration configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OrchestratorConfig {
    /// Age in seconds after which a running run is treated as stuck and
    /// failed by the next submission.
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            stale_after_secs: default_stale_after_secs(),
        }
    }
}

fn default_stale_after_secs() -> u64 {
    120 // 2 minutes
}

/// Generation provider endpoint configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProvidersConfig {
    /// OpenAI-compatible chat-completion endpoint.
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Gemini generateContent endpoint.
    #[serde(default)]
    pub gemini: GeminiConfig,
}

/// OpenAI-compatible endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OpenAiConfig {
    /// Base URL of the API, without the `/chat/completions` suffix.
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Request timeout in seconds. Generation calls are long-lived.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

/// Gemini endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeminiConfig {
    /// Base URL of the API, without the `/v1beta/models/...` suffix.
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: default_gemini_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_request_timeout_secs() -> u64 {
    300
}

/// Credential keyring configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KeyringConfig {
    /// Server secret the credential encryption key is derived from.
    /// Required for storing or resolving server-encrypted credentials.
    #[serde(default)]
    pub server_secret: Option<String>,
}
