// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Confab orchestration core.
//!
//! TOML parsing over an XDG file hierarchy with `CONFAB_*` environment
//! overrides, strict schemas (`deny_unknown_fields`), and miette-rendered
//! diagnostics that point at the offending line and suggest corrections.
//!
//! # Usage
//!
//! ```no_run
//! let config = confab_config::load_and_validate().expect("config errors");
//! println!("listening on {}:{}", config.server.bind_address, config.server.port);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{render_errors, ConfigError};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::ConfabConfig;

/// Load from the XDG hierarchy plus environment, then validate.
///
/// Figment failures come back as rich diagnostics with spans resolved
/// against the merged TOML files; deserialization success still has to pass
/// the semantic checks in [`validation`].
pub fn load_and_validate() -> Result<ConfabConfig, Vec<ConfigError>> {
    let config = loader::load_config()
        .map_err(|err| diagnostic::figment_to_config_errors(err, &read_merged_files()))?;
    validation::validate_config(&config)?;
    Ok(config)
}

/// Load from a TOML string, then validate. Used by tests and by callers
/// that manage their own file handling.
pub fn load_and_validate_str(toml_content: &str) -> Result<ConfabConfig, Vec<ConfigError>> {
    let config = loader::load_config_from_str(toml_content).map_err(|err| {
        let sources = vec![("<inline>".to_string(), toml_content.to_string())];
        diagnostic::figment_to_config_errors(err, &sources)
    })?;
    validation::validate_config(&config)?;
    Ok(config)
}

/// Re-read the merged TOML files so diagnostics can underline the offending
/// line. Files that vanished since the merge are skipped.
fn read_merged_files() -> Vec<(String, String)> {
    let mut candidates = vec![std::path::PathBuf::from("/etc/confab/confab.toml")];
    if let Some(config_dir) = dirs::config_dir() {
        candidates.push(config_dir.join("confab/confab.toml"));
    }
    candidates.push(
        std::env::current_dir()
            .map(|d| d.join("confab.toml"))
            .unwrap_or_else(|_| std::path::PathBuf::from("confab.toml")),
    );

    candidates
        .into_iter()
        .filter_map(|path| {
            let content = std::fs::read_to_string(&path).ok()?;
            Some((path.display().to_string(), content))
        })
        .collect()
}
