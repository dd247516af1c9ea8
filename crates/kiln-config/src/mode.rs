//! Environment mode derivation.
//!
//! The mode is computed once from the invocation context and then passed by value into
//! [`RuleSet::resolve`](crate::RuleSet::resolve) and the plugin orchestrator. Nothing in
//! this crate reads it from global state.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Command that starts an interactive development session.
pub const DEV_COMMAND: &str = "dev";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentMode {
    Development,
    #[default]
    Production,
}

impl EnvironmentMode {
    pub fn as_str(self) -> &'static str {
        match self {
            EnvironmentMode::Development => "development",
            EnvironmentMode::Production => "production",
        }
    }

    pub fn is_development(self) -> bool {
        matches!(self, EnvironmentMode::Development)
    }
}

impl fmt::Display for EnvironmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnvironmentMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(EnvironmentMode::Development),
            "production" | "prod" => Ok(EnvironmentMode::Production),
            other => Err(ConfigError::invalid_value(
                "mode",
                format!("expected `development` or `production`, got `{other}`"),
            )),
        }
    }
}

/// What the process was asked to do, as parsed by the CLI.
///
/// Only the command name and an explicit mode take part in mode derivation. Option
/// values and file paths never do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationContext {
    command: Option<String>,
    explicit_mode: Option<EnvironmentMode>,
}

impl InvocationContext {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: Some(command.into()),
            explicit_mode: None,
        }
    }

    /// Pin the mode, as `--mode` does.
    pub fn with_mode(mut self, mode: Option<EnvironmentMode>) -> Self {
        self.explicit_mode = mode;
        self
    }

    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    pub fn explicit_mode(&self) -> Option<EnvironmentMode> {
        self.explicit_mode
    }

    fn signals_dev_session(&self) -> bool {
        self.command() == Some(DEV_COMMAND)
    }
}

/// Derive the environment mode from an invocation context.
///
/// An explicit mode wins. Otherwise the mode is development only for the
/// [`DEV_COMMAND`] command, and production in every other case.
///
/// # Example
///
/// ```
/// use kiln_config::{derive_mode, EnvironmentMode, InvocationContext};
///
/// let ctx = InvocationContext::new("build");
/// assert_eq!(derive_mode(&ctx), EnvironmentMode::Production);
///
/// let ctx = InvocationContext::new("dev");
/// assert_eq!(derive_mode(&ctx), EnvironmentMode::Development);
///
/// let ctx = InvocationContext::new("dev").with_mode(Some(EnvironmentMode::Production));
/// assert_eq!(derive_mode(&ctx), EnvironmentMode::Production);
/// ```
pub fn derive_mode(ctx: &InvocationContext) -> EnvironmentMode {
    if let Some(explicit) = ctx.explicit_mode() {
        return explicit;
    }

    if ctx.signals_dev_session() {
        EnvironmentMode::Development
    } else {
        EnvironmentMode::Production
    }
}

/// Holds the mode for one process lifetime and rejects a second derivation.
#[derive(Debug, Default)]
pub struct ModeSelector {
    mode: OnceLock<EnvironmentMode>,
}

impl ModeSelector {
    pub const fn new() -> Self {
        Self {
            mode: OnceLock::new(),
        }
    }

    /// Derive and store the mode.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ModeAlreadyDerived` when called more than once.
    pub fn select(&self, ctx: &InvocationContext) -> Result<EnvironmentMode> {
        if self.mode.get().is_some() {
            return Err(ConfigError::ModeAlreadyDerived);
        }

        let mode = derive_mode(ctx);
        self.mode
            .set(mode)
            .map_err(|_| ConfigError::ModeAlreadyDerived)?;
        tracing::debug!(%mode, "environment mode derived");
        Ok(mode)
    }

    pub fn get(&self) -> Option<EnvironmentMode> {
        self.mode.get().copied()
    }
}
