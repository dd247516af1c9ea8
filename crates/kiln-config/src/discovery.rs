//! File-based config discovery for CLI use
//!
//! Handles finding and loading kiln configuration files from the filesystem.

use std::fs;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format as _, Serialized, Toml};
use serde_json::Value;

use crate::config::KilnConfig;
use crate::error::{ConfigError, Result};
use crate::mode::EnvironmentMode;

pub const CONFIG_FILE: &str = "kiln.toml";
pub const ENV_PREFIX: &str = "KILN_";

/// Top-level config keys that `KILN_` variables may override. Any other `KILN_*`
/// variable belongs to something else and is left alone.
const ENV_KEYS: &[&str] = &[
    "entries",
    "output",
    "rules",
    "plugins",
    "editor",
    "dev_server",
    "excluded",
    "profiles",
];

/// File-based configuration discovery
///
/// Library users with an in-memory config should use [`KilnConfig::from_value`]
/// directly.
///
/// # Example
///
/// ```no_run
/// use kiln_config::ConfigDiscovery;
///
/// let discovery = ConfigDiscovery::new(".");
/// let config = discovery.load().unwrap();
/// ```
pub struct ConfigDiscovery {
    root: PathBuf,
}

impl ConfigDiscovery {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Find a config file in the root directory
    ///
    /// Searches in this order:
    /// 1. `kiln.toml`
    /// 2. `package.json` with a non-null `kiln` field
    pub fn find(&self) -> Option<PathBuf> {
        let toml_path = self.root.join(CONFIG_FILE);
        if toml_path.exists() {
            return Some(toml_path);
        }

        let pkg_path = self.root.join("package.json");
        let content = fs::read_to_string(&pkg_path).ok()?;
        let parsed = serde_json::from_str::<Value>(&content).ok()?;
        parsed
            .get("kiln")
            .is_some_and(|value| !value.is_null())
            .then_some(pkg_path)
    }

    /// Load config from the discovered file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if no config file is found.
    pub fn load(&self) -> Result<KilnConfig> {
        let path = self.find().ok_or(ConfigError::NotFound)?;
        self.load_from(&path)
    }

    /// Load config and apply the profile for `mode`.
    pub fn load_for_mode(&self, mode: EnvironmentMode) -> Result<KilnConfig> {
        self.load()?.materialize_profile(mode)
    }

    /// Load config from a specific file, then overlay `KILN_` environment variables.
    ///
    /// Nested keys are separated by a double underscore: `KILN_OUTPUT__DIR=dist`.
    /// Variables whose first segment is not a config key are ignored.
    pub fn load_from(&self, path: &Path) -> Result<KilnConfig> {
        let figment = if path.file_name() == Some(std::ffi::OsStr::new("package.json")) {
            Figment::from(Serialized::defaults(self.package_json_section(path)?))
        } else {
            if !path.exists() {
                return Err(ConfigError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{} does not exist", path.display()),
                )));
            }
            Figment::from(Toml::file(path))
        };

        let config: KilnConfig = figment
            .merge(
                Env::prefixed(ENV_PREFIX)
                    .filter(|key| is_env_key(key.as_str()))
                    .split("__"),
            )
            .extract()
            .map_err(|e| ConfigError::invalid_value("configuration", e))?;

        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    fn package_json_section(&self, path: &Path) -> Result<Value> {
        let content = fs::read_to_string(path)?;

        let mut parsed: Value = serde_json::from_str(&content)
            .map_err(|e| ConfigError::invalid_value("package.json", format!("Invalid JSON: {e}")))?;

        match parsed.get_mut("kiln").map(Value::take) {
            None | Some(Value::Null) => Err(ConfigError::InvalidValue {
                field: "kiln".to_string(),
                hint: Some("Add a non-null 'kiln' field to your package.json".to_string()),
            }),
            Some(section) => Ok(section),
        }
    }
}

fn is_env_key(key: &str) -> bool {
    let head = key.split("__").next().unwrap_or(key);
    ENV_KEYS.iter().any(|known| known.eq_ignore_ascii_case(head))
}

/// Discover and load config from the current directory.
///
/// ```no_run
/// let config = kiln_config::discover().unwrap();
/// ```
pub fn discover() -> Result<KilnConfig> {
    let root = std::env::current_dir()?;
    ConfigDiscovery::new(&root).load()
}
