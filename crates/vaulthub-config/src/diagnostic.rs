// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Diagnostics for `vaulthub config check` and server startup.
//!
//! Figment reports problems by dotted path. This module maps them back onto
//! the `vaulthub.toml` text so miette can point at the offending line, and
//! offers the nearest known section or key when a name looks like a typo.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use std::fmt::Write as _;

use figment::error::{Error as FigmentError, Kind};
use miette::{Diagnostic, GraphicalReportHandler, NamedSource, SourceSpan};
use thiserror::Error;
use tracing::debug;

use crate::loader::SECTIONS;

/// Jaro-Winkler score a known name must beat to be offered as the fix.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// One problem found while loading or validating `vaulthub.toml`.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A section or key the config model does not define.
    #[error("unknown configuration key `{path}`")]
    #[diagnostic(
        code(vaulthub::config::unknown_key),
        help("{}", unknown_key_help(*suggestion, valid_keys))
    )]
    UnknownKey {
        /// The unrecognised name as written.
        key: String,
        /// Dotted location, e.g. `encryption.master_kye`.
        path: String,
        suggestion: Option<&'static str>,
        /// Names accepted at that level: `SECTIONS` at the top, the
        /// section's fields below it.
        valid_keys: &'static [&'static str],
        #[label("not a VaultHub setting")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A known key holding a value of the wrong shape.
    #[error("invalid value for `{key}`: found {found}")]
    #[diagnostic(code(vaulthub::config::invalid_value), help("expected {expected}"))]
    InvalidValue {
        key: String,
        found: String,
        expected: String,
        #[label("wrong type")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A semantic check in [`crate::validation`] failed.
    #[error("validation error: {message}")]
    #[diagnostic(code(vaulthub::config::validation))]
    Validation { message: String },

    /// The configuration could not be read or parsed at all.
    #[error("cannot load configuration: {0}")]
    #[diagnostic(code(vaulthub::config::unreadable))]
    Unreadable(String),
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &[&str]) -> String {
    let known = valid_keys.join(", ");
    match suggestion {
        Some(fix) => format!("did you mean `{fix}`? Known keys here: {known}"),
        None => format!("known keys here: {known}"),
    }
}

/// Convert every problem inside a figment error into a [`ConfigError`].
///
/// `sources` pairs each config file path with its contents and is only used
/// to attach spans. With a single source, errors whose figment metadata does
/// not name a file (inline TOML) are located in that source.
pub fn from_figment(err: FigmentError, sources: &[(String, String)]) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| {
            let converted = convert(&error, sources);
            debug!(error = %converted, "configuration rejected");
            converted
        })
        .collect()
}

fn convert(error: &FigmentError, sources: &[(String, String)]) -> ConfigError {
    let source = source_of(error, sources);
    match &error.kind {
        Kind::UnknownField(key, expected) => {
            let section = error.path.first().map(String::as_str);
            let valid_keys: &'static [&'static str] = match section {
                None => SECTIONS,
                Some(_) => *expected,
            };
            let path = match section {
                None => key.clone(),
                Some(section) => format!("{section}.{key}"),
            };
            let (span, src) = locate(source, section, key);
            ConfigError::UnknownKey {
                key: key.clone(),
                path,
                suggestion: closest_key(key, valid_keys),
                valid_keys,
                span,
                src,
            }
        }
        Kind::InvalidType(found, expected) | Kind::InvalidValue(found, expected) => {
            let key = error.path.last().map(String::as_str).unwrap_or_default();
            let section = (error.path.len() > 1).then(|| error.path[0].as_str());
            let (span, src) = locate(source, section, key);
            ConfigError::InvalidValue {
                key: error.path.join("."),
                found: found.to_string(),
                expected: expected.clone(),
                span,
                src,
            }
        }
        _ => ConfigError::Unreadable(error.to_string()),
    }
}

fn source_of<'a>(
    error: &FigmentError,
    sources: &'a [(String, String)],
) -> Option<&'a (String, String)> {
    let file = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|source| match source {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });
    match file {
        Some(file) => sources.iter().find(|(path, _)| *path == file),
        None if sources.len() == 1 => sources.first(),
        None => None,
    }
}

fn locate(
    source: Option<&(String, String)>,
    section: Option<&str>,
    key: &str,
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let Some((path, content)) = source else {
        return (None, None);
    };
    match locate_key(content, section, key) {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), key.len())),
            Some(NamedSource::new(path, content.clone())),
        ),
        None => (None, None),
    }
}

/// Byte offset of `key` inside `content`.
///
/// With `section = None` this matches a top-level assignment or a `[key]`
/// header. Otherwise only assignments under the `[section]` header count, so
/// a `port` under `[storage]` is never reported for `server.port`.
pub fn locate_key(content: &str, section: Option<&str>, key: &str) -> Option<usize> {
    let mut current: Option<&str> = None;
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_start();
        let indent = line.len() - trimmed.len();
        if let Some(rest) = trimmed.strip_prefix('[') {
            let raw = rest.split(']').next().unwrap_or_default();
            let name = raw.trim();
            if section.is_none() && name == key {
                return Some(offset + indent + 1 + (raw.len() - raw.trim_start().len()));
            }
            current = Some(name);
        } else if current == section
            && trimmed
                .strip_prefix(key)
                .is_some_and(|rest| rest.trim_start().starts_with('='))
        {
            return Some(offset + indent);
        }
        offset += line.len();
    }
    None
}

/// The candidate most similar to `unknown`, if any is close enough.
pub fn closest_key<'a>(unknown: &str, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .map(|&candidate| (candidate, strsim::jaro_winkler(unknown, candidate)))
        .filter(|(_, score)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(candidate, _)| candidate)
}

/// Render diagnostics with miette's graphical handler.
pub fn report_to_string(errors: &[ConfigError]) -> String {
    let handler = GraphicalReportHandler::new();
    let mut out = String::new();
    for error in errors {
        if handler.render_report(&mut out, error).is_err() {
            let _ = writeln!(out, "error: {error}");
        }
    }
    out
}

/// Print diagnostics to stderr.
pub fn render_errors(errors: &[ConfigError]) {
    eprint!("{}", report_to_string(errors));
}
