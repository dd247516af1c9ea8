//! High-level configuration structure for kiln.
//!
//! This module provides the main `KilnConfig` struct and mode-profile merging.
//! For file discovery, see the `discovery` module.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::annotation::Exclusions;
use crate::capability::EditorConfig;
use crate::dev::DevServerConfig;
use crate::error::{ConfigError, Result as ConfigResult};
use crate::mode::EnvironmentMode;
use crate::plugin::PluginDescriptor;
use crate::rules::RuleConfig;

const REFERENCE_CONFIG: &str = include_str!("reference.toml");

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KilnConfig {
    /// Entry points, in initial inclusion order
    #[serde(default)]
    pub entries: Vec<PathBuf>,

    #[serde(default)]
    pub output: OutputOptions,

    #[serde(default)]
    pub rules: Vec<RuleConfig>,

    #[serde(default)]
    pub plugins: Vec<PluginDescriptor>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor: Option<EditorConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_server: Option<DevServerConfig>,

    #[serde(default)]
    pub excluded: Exclusions,

    /// Overrides keyed by mode name, deep-merged by [`KilnConfig::materialize_profile`]
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub profiles: HashMap<String, Value>,
}

/// Where the external bundler writes its output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputOptions {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_output_filename")]
    pub filename: String,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            filename: default_output_filename(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("public")
}

fn default_output_filename() -> String {
    "bundle.js".to_string()
}

impl KilnConfig {
    /// Create from serde_json::Value (for programmatic config)
    ///
    /// # Example
    ///
    /// ```
    /// use kiln_config::KilnConfig;
    /// use serde_json::json;
    /// use std::path::PathBuf;
    ///
    /// let config = KilnConfig::from_value(json!({
    ///     "entries": ["src/App.fsproj"],
    ///     "output": { "filename": "app.js" }
    /// }))
    /// .unwrap();
    ///
    /// assert_eq!(config.entries, vec![PathBuf::from("src/App.fsproj")]);
    /// assert_eq!(config.output.filename, "app.js");
    /// ```
    pub fn from_value(value: Value) -> ConfigResult<Self> {
        serde_json::from_value(value).map_err(|e| ConfigError::invalid_value("config", e))
    }

    /// Convert to serde_json::Value
    pub fn to_value(&self) -> ConfigResult<Value> {
        serde_json::to_value(self).map_err(|e| ConfigError::invalid_value("config", e))
    }

    /// Parse a `kiln.toml` document.
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        toml::from_str(source).map_err(|e| ConfigError::invalid_value("toml", e))
    }

    /// The configuration of the editor playground this crate was first written for:
    /// an F# app with Sass styles, a Babel-compiled script layer and an embedded editor.
    pub fn reference() -> ConfigResult<Self> {
        Self::from_toml_str(REFERENCE_CONFIG)
    }

    /// Merge `profiles.<mode>` over the base config.
    ///
    /// Tables merge key by key; arrays and scalars in the override replace the base
    /// value. The profiles table itself is kept untouched.
    pub fn materialize_profile(mut self, mode: EnvironmentMode) -> ConfigResult<Self> {
        let Some(overrides) = self.profiles.get(mode.as_str()).cloned() else {
            return Ok(self);
        };

        if overrides.is_null() {
            return Ok(self);
        }

        let profiles = std::mem::take(&mut self.profiles);
        let mut base = serde_json::to_value(&self)
            .map_err(|err| ConfigError::InvalidProfileOverride(err.to_string()))?;
        merge_values(&mut base, &overrides);

        let mut merged: KilnConfig = serde_json::from_value(base)
            .map_err(|err| ConfigError::InvalidProfileOverride(format!("{mode}: {err}")))?;
        merged.profiles = profiles;

        tracing::debug!(%mode, "applied mode profile");
        Ok(merged)
    }
}

fn merge_values(target: &mut Value, update: &Value) {
    match (target, update) {
        (Value::Object(target_map), Value::Object(update_map)) => {
            for (key, value) in update_map {
                merge_values(target_map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
        (target_slot, _) => {
            *target_slot = update.clone();
        }
    }
}
