// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading built on Figment.
//!
//! XDG hierarchy: `./confab.toml` > `~/.config/confab/confab.toml` >
//! `/etc/confab/confab.toml`, topped by `CONFAB_*` environment variables.

#![allow(clippy::result_large_err)] // figment::Error is external; boxing it would leak into every signature

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::ConfabConfig;

/// Load from the standard XDG hierarchy with environment overrides.
///
/// Sources merge lowest precedence first:
/// compiled defaults, then `/etc/confab/confab.toml`, then
/// `~/.config/confab/confab.toml`, then `./confab.toml`, and finally
/// `CONFAB_*` environment variables.
pub fn load_config() -> Result<ConfabConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ConfabConfig::default()))
        .merge(Toml::file("/etc/confab/confab.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("confab/confab.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("confab.toml"))
        .merge(env_provider())
        .extract()
}

/// Load from a TOML string alone, with no file lookup and no environment.
/// Keeps tests insensitive to whatever `CONFAB_*` variables the host has set.
pub fn load_config_from_str(toml_content: &str) -> Result<ConfabConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ConfabConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load a single named file with environment overrides on top.
pub fn load_config_from_path(path: &Path) -> Result<ConfabConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ConfabConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Environment provider with explicit section mapping.
///
/// `Env::split("_")` would be wrong here: key names themselves contain
/// underscores, and `CONFAB_STORAGE_DATABASE_PATH` has to become
/// `storage.database_path`, never `storage.database.path`.
fn env_provider() -> Env {
    Env::prefixed("CONFAB_").map(|key| map_env_key(key.as_str()).into())
}

/// Rewrite a prefix-stripped, lowercased env var name into a dotted config
/// path. Prefix matches are anchored at the start; field names that contain
/// a section name (`keyring_server_secret`) must not be rewritten twice.
fn map_env_key(key: &str) -> String {
    // Two-level provider sections first so the single-level rewrite does
    // not eat their prefixes.
    const SECTIONS: &[(&str, &str)] = &[
        ("providers_openai_", "providers.openai."),
        ("providers_gemini_", "providers.gemini."),
        ("server_", "server."),
        ("storage_", "storage."),
        ("orchestrator_", "orchestrator."),
        ("keyring_", "keyring."),
    ];
    for (prefix, section) in SECTIONS {
        if let Some(rest) = key.strip_prefix(prefix) {
            return format!("{section}{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_without_any_sources() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1");
        assert_eq!(config.server.port, 8787);
        assert_eq!(config.orchestrator.stale_after_secs, 120);
        assert_eq!(config.providers.openai.base_url, "https://api.openai.com/v1");
        assert!(config.keyring.server_secret.is_none());
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = load_config_from_str(
            r#"
[server]
port = 9000

[orchestrator]
stale_after_secs = 30

[providers.gemini]
base_url = "http://localhost:4000"
"#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.orchestrator.stale_after_secs, 30);
        assert_eq!(config.providers.gemini.base_url, "http://localhost:4000");
        // Untouched sections keep their defaults.
        assert!(config.storage.wal_mode);
    }

    #[test]
    fn unknown_key_is_rejected() {
        let result = load_config_from_str(
            r#"
[orchestrator]
stale_after_seconds = 30
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn env_keys_map_to_dotted_paths() {
        assert_eq!(map_env_key("server_bind_address"), "server.bind_address");
        assert_eq!(map_env_key("storage_database_path"), "storage.database_path");
        assert_eq!(
            map_env_key("orchestrator_stale_after_secs"),
            "orchestrator.stale_after_secs"
        );
        assert_eq!(
            map_env_key("providers_openai_base_url"),
            "providers.openai.base_url"
        );
        // The field name contains another section's name; only the leading
        // section prefix may be rewritten.
        assert_eq!(map_env_key("keyring_server_secret"), "keyring.server_secret");
    }
}
