// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rich config diagnostics.
//!
//! Figment reports deserialization failures as a flat error chain. This
//! module lifts each failure into a [`ConfigError`] that miette can render
//! with the offending TOML line underlined, the section's valid keys, and a
//! "did you mean" correction picked by Jaro-Winkler similarity.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Similarity floor below which no correction is offered. Jaro-Winkler
/// scores transpositions near the front of the string highly, which fits
/// config-key typos (`prot`, `stale_after_sec`) well.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// One renderable configuration problem.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A key that no section of the config schema knows about.
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(confab::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        /// Closest valid key, when one scores above the threshold.
        suggestion: Option<String>,
        /// Comma-joined valid keys for the section.
        valid_keys: String,
        #[label("unrecognized key")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value of the wrong TOML type.
    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(code(confab::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
        #[label("wrong type here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A key the schema requires but the sources never set.
    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(confab::config::missing_key),
        help("add `{key} = <value>` to your confab.toml")
    )]
    MissingKey { key: String },

    /// A value that deserialized fine but fails a semantic check.
    #[error("validation error: {message}")]
    #[diagnostic(code(confab::config::validation))]
    Validation { message: String },

    /// Anything figment reports that has no richer mapping.
    #[error("configuration error: {0}")]
    #[diagnostic(code(confab::config::other))]
    Other(String),
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(candidate) => format!("did you mean `{candidate}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// Convert a `figment::Error` into renderable diagnostics.
///
/// A single figment error can wrap several independent failures; each one
/// becomes its own entry. `toml_sources` carries `(path, content)` pairs of
/// the files that were merged, used to resolve source spans.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| convert_one(error, toml_sources))
        .collect()
}

fn convert_one(error: figment::Error, toml_sources: &[(String, String)]) -> ConfigError {
    use figment::error::Kind;

    match &error.kind {
        Kind::UnknownField(field, expected) => {
            let valid_keys: Vec<&str> = expected.to_vec();
            let suggestion = suggest_key(field, &valid_keys);
            let (span, src) = locate_key(&error, field, toml_sources);
            ConfigError::UnknownKey {
                key: field.clone(),
                suggestion,
                valid_keys: valid_keys.join(", "),
                span,
                src,
            }
        }
        Kind::MissingField(field) => ConfigError::MissingKey {
            key: field.clone().into_owned(),
        },
        Kind::InvalidType(actual, expected) => ConfigError::InvalidType {
            key: error.path.join("."),
            detail: format!("found {actual}, expected {expected}"),
            expected: expected.to_string(),
            span: None,
            src: None,
        },
        _ => ConfigError::Other(error.to_string()),
    }
}

/// Resolve the span of `field` in whichever merged TOML file the error
/// points at. Returns nothing when the error came from a non-file source
/// (env var, inline string) or the key cannot be found verbatim.
fn locate_key(
    error: &figment::Error,
    field: &str,
    toml_sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let file = error
        .metadata
        .as_ref()
        .and_then(|metadata| metadata.source.as_ref())
        .and_then(|source| match source {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });

    let Some(file) = file else {
        return (None, None);
    };
    let Some((path, content)) = toml_sources
        .iter()
        .find(|(path, _)| *path == file)
        .map(|(path, content)| (path.as_str(), content.as_str()))
    else {
        return (None, None);
    };

    match key_offset(content, &error.path, field) {
        Some(offset) => {
            let span = SourceSpan::new(offset.into(), field.len());
            (Some(span), Some(NamedSource::new(path, content.to_string())))
        }
        None => (None, None),
    }
}

/// Byte offset of `field` inside `content`, scoped to the section named by
/// the first element of `path` (whole file when `path` is empty).
///
/// The match is line-anchored: the key must open a line (after indentation)
/// and be followed by `=` or whitespace, so `port` does not match inside
/// `transport_mode`.
pub fn key_offset(content: &str, path: &[String], field: &str) -> Option<usize> {
    let section_end = match path.first() {
        None => 0,
        Some(section) => {
            let header = format!("[{section}]");
            content.find(&header)? + header.len()
        }
    };

    let mut cursor = section_end;
    for line in content[section_end..].lines() {
        let key = line.trim_start();
        if let Some(rest) = key.strip_prefix(field) {
            if matches!(rest.bytes().next(), Some(b' ' | b'\t' | b'=')) {
                return Some(cursor + (line.len() - key.len()));
            }
        }
        cursor += line.len() + 1;
    }
    None
}

/// Best fuzzy correction for `unknown` among `valid_keys`, if any scores
/// above the threshold.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|(a, _), (b, _)| a.total_cmp(b))
        .map(|(_, key)| key.to_string())
}

/// Render diagnostics to stderr with miette's graphical handler. Falls back
/// to plain `Display` if rendering itself fails.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut rendered = String::new();
        if handler.render_report(&mut rendered, error).is_ok() {
            eprint!("{rendered}");
        } else {
            eprintln!("Error: {error}");
        }
    }
}
