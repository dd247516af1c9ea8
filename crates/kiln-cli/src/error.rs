//! Error handling for the kiln CLI.
//!
//! Library failures arrive as [`kiln_config::ConfigError`] and are wrapped in
//! [`CliError`]. `main` renders exactly one error through miette, with a hint when
//! there is an obvious next step.

use std::path::PathBuf;

use kiln_config::ConfigError;
use miette::Report;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Invalid command-line arguments or options
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Project root not found: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Suggested next step for the operator, if there is an obvious one.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            CliError::Config(err) => config_hint(err),
            CliError::RootNotFound(_) => Some("Pass an existing directory to --cwd"),
            _ => None,
        }
    }
}

fn config_hint(err: &ConfigError) -> Option<&'static str> {
    match err {
        ConfigError::NotFound => {
            Some("Create a kiln.toml in the project root, or pass --config <path>")
        }
        ConfigError::UnmatchedFile { .. } => {
            Some("Add a rule whose `extensions` or `test` covers this file")
        }
        ConfigError::AmbiguousRule { .. } => {
            Some("Give the rules disjoint `include`/`exclude` roots, or merge them into one rule")
        }
        ConfigError::AmbiguousScope { .. } => {
            Some("A rule may list `include` roots or `exclude` roots, not both")
        }
        ConfigError::UnknownCapability { .. } => {
            Some("Check the identifier's spelling; editor identifiers are case-sensitive")
        }
        ConfigError::ConfigurationInconsistency(_) => Some(
            "Add a plugin with kind = \"hot-reload\" and when = \"development\", or set dev_server.hot_reload = false",
        ),
        ConfigError::StaticRootNotFound(_) => {
            Some("Create the directory or point dev_server.static_root at an existing one")
        }
        ConfigError::EntryNotFound(_) => Some("Check the `entries` list in your config"),
        _ => None,
    }
}

/// Convert a CliError into a miette report
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err.hint() {
        Some(hint) => miette::miette!(help = hint, "{}", err),
        None => miette::miette!("{}", err),
    }
}
