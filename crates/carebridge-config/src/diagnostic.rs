// SPDX-FileCopyrightText: 2026 CareBridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration error diagnostics rendered through miette.

use miette::Diagnostic;
use thiserror::Error;

/// A configuration error with diagnostic information.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A deserialization error from Figment (unknown key, type mismatch).
    #[error("configuration error: {message}")]
    #[diagnostic(
        code(carebridge::config::parse),
        help("check carebridge.toml against the documented sections")
    )]
    Parse {
        /// Figment's own description of the failure.
        message: String,
    },

    /// A semantic validation error for a config value.
    #[error("validation error: {message}")]
    #[diagnostic(code(carebridge::config::validation))]
    Validation {
        /// Description of the validation failure.
        message: String,
    },
}

/// Convert a Figment extraction error into diagnostic errors.
pub fn figment_to_config_errors(err: figment::Error) -> Vec<ConfigError> {
    err.into_iter()
        .map(|e| ConfigError::Parse {
            message: e.to_string(),
        })
        .collect()
}

/// Render configuration errors to stderr with miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    use miette::GraphicalReportHandler;

    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        let diagnostic: &dyn Diagnostic = error;
        if handler.render_report(&mut buf, diagnostic).is_ok() {
            eprint!("{buf}");
        } else {
            eprintln!("Error: {error}");
        }
    }
}
