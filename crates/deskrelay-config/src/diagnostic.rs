// SPDX-FileCopyrightText: 2026 Deskrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Diagnostic error types and rendering for configuration failures.
//!
//! Figment parse errors and post-deserialization validation failures are
//! both surfaced as [`ConfigError`] values and rendered through miette so
//! startup failures point at the offending key.

use miette::Diagnostic;
use thiserror::Error;

/// A single configuration problem.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// The TOML/env sources could not be parsed or merged.
    #[error("{message}")]
    #[diagnostic(
        code(deskrelay::config::parse),
        help("check deskrelay.toml and DESKRELAY_* environment variables")
    )]
    Parse { message: String },

    /// The configuration parsed but a semantic constraint failed.
    #[error("{message}")]
    #[diagnostic(code(deskrelay::config::validation))]
    Validation { message: String },
}

/// Convert a figment error (which may aggregate several failures) into
/// one `ConfigError` per underlying problem.
pub fn figment_to_config_errors(err: figment::Error) -> Vec<ConfigError> {
    err.into_iter()
        .map(|e| ConfigError::Parse {
            message: e.to_string(),
        })
        .collect()
}

/// Render all collected errors to stderr as miette reports.
pub fn render_errors(errors: &[ConfigError]) {
    for error in errors {
        let report = miette::Report::msg(format!("{error}"));
        eprintln!("{report:?}");
    }
    eprintln!(
        "deskrelay: {} configuration error{} found",
        errors.len(),
        if errors.len() == 1 { "" } else { "s" }
    );
}
