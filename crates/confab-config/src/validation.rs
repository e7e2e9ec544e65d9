// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic checks that run after deserialization.
//!
//! Serde can enforce shape but not meaning. These checks cover the rest:
//! addresses that must be bindable, paths that must be set, thresholds that
//! must leave the single-flight gate functional.

use crate::diagnostic::ConfigError;
use crate::model::ConfabConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Check a deserialized configuration for semantic problems.
///
/// Collects every failure rather than stopping at the first, so one edit
/// cycle can fix them all.
pub fn validate_config(config: &ConfabConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let addr = config.server.bind_address.trim();
    if addr.is_empty() {
        fail("server.bind_address must not be empty".to_string());
    } else if !looks_like_host(addr) {
        fail(format!(
            "server.bind_address `{addr}` is neither an IP address nor a plausible hostname"
        ));
    }

    if config.server.port == 0 {
        fail("server.port must be non-zero".to_string());
    }

    if !LOG_LEVELS.contains(&config.server.log_level.as_str()) {
        fail(format!(
            "server.log_level must be one of {}, got `{}`",
            LOG_LEVELS.join(", "),
            config.server.log_level
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must be set to a file path".to_string());
    }

    // A zero threshold would reap every run the moment a second submission
    // arrives, defeating the single-flight gate.
    if config.orchestrator.stale_after_secs == 0 {
        fail("orchestrator.stale_after_secs must be at least 1".to_string());
    }

    for (name, base_url) in [
        ("providers.openai.base_url", &config.providers.openai.base_url),
        ("providers.gemini.base_url", &config.providers.gemini.base_url),
    ] {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            fail(format!(
                "{name} must start with http:// or https://, got `{base_url}`"
            ));
        }
    }

    if let Some(secret) = &config.keyring.server_secret
        && secret.len() < 16
    {
        fail(format!(
            "keyring.server_secret must be at least 16 characters, got {}",
            secret.len()
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Loose hostname test: parses as an IP, or contains only characters legal
/// in a hostname or bracketless IPv6 literal.
fn looks_like_host(addr: &str) -> bool {
    if addr.parse::<std::net::IpAddr>().is_ok() {
        return true;
    }
    addr.chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':')
}
