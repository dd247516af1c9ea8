//! Error types for configuration loading, rule resolution and plugin activation.
//!
//! Every variant is a load-time or startup-time failure. None of them can occur once the
//! external bundler has started running transformers.

use std::path::PathBuf;

use thiserror::Error;

use crate::capability::CapabilityKind;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    // Rule resolution
    #[error("no rule matches {}", .path.display())]
    UnmatchedFile { path: PathBuf },

    #[error("rules `{first}` and `{second}` both match {}; keep their directory scopes disjoint", .path.display())]
    AmbiguousRule {
        path: PathBuf,
        first: String,
        second: String,
    },

    #[error("rule `{rule}` declares both include and exclude directories")]
    AmbiguousScope { rule: String },

    #[error("rule `{rule}` has an invalid pattern: {source}")]
    InvalidPattern {
        rule: String,
        #[source]
        source: regex::Error,
    },

    // Plugin orchestration
    #[error("plugin `{plugin}` failed to activate: {reason}")]
    PluginActivation { plugin: String, reason: String },

    // Editor capabilities
    #[error("unknown editor {kind} `{identifier}`")]
    UnknownCapability {
        kind: CapabilityKind,
        identifier: String,
    },

    // Cross-component invariants
    #[error("inconsistent configuration: {0}")]
    ConfigurationInconsistency(String),

    #[error("environment mode was already derived for this process")]
    ModeAlreadyDerived,

    // Dev server descriptor
    #[error("dev server port {0} is outside 1-65535")]
    InvalidPort(u32),

    #[error("static root is not a directory: {}", .0.display())]
    StaticRootNotFound(PathBuf),

    // Filesystem validation
    #[error("entry path not found: {}", .0.display())]
    EntryNotFound(PathBuf),

    // Config parsing/loading errors
    #[error("config not found")]
    NotFound,

    #[error("invalid config value for `{field}`{}", .hint.as_deref().map(|h| format!(": {h}")).unwrap_or_default())]
    InvalidValue {
        field: String,
        hint: Option<String>,
    },

    #[error("invalid profile override: {0}")]
    InvalidProfileOverride(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    pub(crate) fn invalid_value(field: impl Into<String>, hint: impl ToString) -> Self {
        Self::InvalidValue {
            field: field.into(),
            hint: Some(hint.to_string()),
        }
    }
}
