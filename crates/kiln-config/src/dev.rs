//! Development server configuration types.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// The `[dev_server]` section of `kiln.toml`, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DevServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    /// Kept wider than `u16` so out-of-range values reach validation instead of
    /// failing as a type error.
    #[serde(default = "default_port")]
    pub port: u32,

    /// Directory served as-is next to the in-memory bundle
    #[serde(default = "default_static_root")]
    pub static_root: PathBuf,

    #[serde(default = "default_true")]
    pub hot_reload: bool,

    /// Inject the live-update client into the bundle instead of a separate script
    #[serde(default = "default_true")]
    pub inline: bool,

    /// Patterns the watcher skips, in addition to hidden files
    #[serde(default = "default_watch_ignore")]
    pub watch_ignore: Vec<String>,

    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_root: default_static_root(),
            hot_reload: true,
            inline: true,
            watch_ignore: default_watch_ignore(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl DevServerConfig {
    /// Validate against the project root and freeze into a descriptor.
    ///
    /// # Errors
    ///
    /// - `InvalidPort` when the port is 0 or above 65535
    /// - `StaticRootNotFound` when `static_root` is not an existing directory
    pub fn validate(&self, root: &Path) -> Result<DevServerDescriptor> {
        let port = u16::try_from(self.port)
            .ok()
            .filter(|port| *port != 0)
            .ok_or(ConfigError::InvalidPort(self.port))?;

        if port < 1024 {
            tracing::warn!(port, "dev server port is in the privileged range");
        }

        let static_root = root.join(&self.static_root);
        if !static_root.is_dir() {
            return Err(ConfigError::StaticRootNotFound(static_root));
        }

        Ok(DevServerDescriptor {
            host: self.host.clone(),
            port,
            static_root,
            hot_reload: self.hot_reload,
            inline: self.inline,
            watch_ignore: self.watch_ignore.clone(),
            debounce_ms: self.debounce_ms,
        })
    }
}

/// Validated, immutable description of one development session.
///
/// A new session needs a new descriptor; there are no setters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DevServerDescriptor {
    host: String,
    port: u16,
    static_root: PathBuf,
    hot_reload: bool,
    inline: bool,
    watch_ignore: Vec<String>,
    debounce_ms: u64,
}

impl DevServerDescriptor {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn static_root(&self) -> &Path {
        &self.static_root
    }

    pub fn hot_reload_enabled(&self) -> bool {
        self.hot_reload
    }

    pub fn inline(&self) -> bool {
        self.inline
    }

    pub fn watch_ignore(&self) -> &[String] {
        &self.watch_ignore
    }

    pub fn debounce_ms(&self) -> u64 {
        self.debounce_ms
    }
}

fn default_host() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u32 {
    8080
}

fn default_static_root() -> PathBuf {
    PathBuf::from("public")
}

fn default_true() -> bool {
    true
}

fn default_watch_ignore() -> Vec<String> {
    vec![
        "node_modules".to_string(),
        "public".to_string(),
        "dist".to_string(),
        "*.log".to_string(),
    ]
}

fn default_debounce_ms() -> u64 {
    100
}
