//! Pluggable config validation strategies
//!
//! Separates filesystem validation (for CLI use) from schema validation (for library use).

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::KilnConfig;
use crate::error::{ConfigError, Result};
use crate::mode::EnvironmentMode;

pub trait ConfigValidator {
    fn validate(&self, config: &KilnConfig) -> Result<()>;
}

/// Schema-only validation (no filesystem checks)
///
/// # Example
///
/// ```
/// use kiln_config::{ConfigValidator, KilnConfig, SchemaValidator};
///
/// let config = KilnConfig {
///     entries: vec!["src/index.js".into()],
///     ..Default::default()
/// };
/// SchemaValidator.validate(&config).unwrap();
/// ```
pub struct SchemaValidator;

impl ConfigValidator for SchemaValidator {
    fn validate(&self, config: &KilnConfig) -> Result<()> {
        if config.entries.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "entries".to_string(),
                hint: Some("List at least one entry point".to_string()),
            });
        }

        if config.output.filename.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "output.filename",
                "the bundle filename cannot be empty",
            ));
        }

        let mut names = HashSet::with_capacity(config.plugins.len());
        for plugin in &config.plugins {
            if plugin.name.trim().is_empty() || plugin.kind.trim().is_empty() {
                return Err(ConfigError::invalid_value(
                    "plugins",
                    "every plugin needs a non-empty `name` and `kind`",
                ));
            }
            if !names.insert(plugin.name.as_str()) {
                return Err(ConfigError::invalid_value(
                    "plugins",
                    format!("duplicate plugin name `{}`", plugin.name),
                ));
            }
        }

        for key in config.profiles.keys() {
            let canonical = key.parse::<EnvironmentMode>().ok().map(EnvironmentMode::as_str);
            if canonical != Some(key.as_str()) {
                return Err(ConfigError::invalid_value(
                    format!("profiles.{key}"),
                    "profiles are keyed by `development` or `production`",
                ));
            }
        }

        Ok(())
    }
}

/// Filesystem validator (for CLI use)
///
/// Runs [`SchemaValidator`] first, then checks that entry points exist and that the
/// dev server's static root, when configured, is a directory.
pub struct FsValidator {
    root: PathBuf,
}

impl FsValidator {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl ConfigValidator for FsValidator {
    fn validate(&self, config: &KilnConfig) -> Result<()> {
        SchemaValidator.validate(config)?;

        for entry in &config.entries {
            let path = self.root.join(entry);
            if !path.exists() {
                return Err(ConfigError::EntryNotFound(path));
            }
        }

        if let Some(dev_server) = &config.dev_server {
            let path = self.root.join(&dev_server.static_root);
            if !path.is_dir() {
                return Err(ConfigError::StaticRootNotFound(path));
            }
        }

        Ok(())
    }
}

pub fn validate_schema(config: &KilnConfig) -> Result<()> {
    SchemaValidator.validate(config)
}

pub fn validate_fs(config: &KilnConfig, root: impl AsRef<Path>) -> Result<()> {
    FsValidator::new(root).validate(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{Activation, PluginDescriptor};
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn minimal() -> KilnConfig {
        KilnConfig {
            entries: vec![PathBuf::from("src/index.js")],
            ..Default::default()
        }
    }

    #[test]
    fn schema_requires_entries() {
        let err = validate_schema(&KilnConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field, .. } if field == "entries"));
    }

    #[test]
    fn schema_rejects_duplicate_plugin_names() {
        let mut config = minimal();
        config.plugins = vec![
            PluginDescriptor::new("hmr", "hot-reload", Activation::Development),
            PluginDescriptor::new("hmr", "css-extract", Activation::Production),
        ];
        assert!(validate_schema(&config).is_err());
    }

    #[test]
    fn schema_rejects_unknown_profile_keys() {
        let mut config = minimal();
        config.profiles.insert("staging".into(), json!({}));
        assert!(validate_schema(&config).is_err());

        let mut config = minimal();
        config.profiles.insert("dev".into(), json!({}));
        assert!(validate_schema(&config).is_err());

        let mut config = minimal();
        config.profiles.insert("development".into(), json!({}));
        validate_schema(&config).unwrap();
    }

    #[test]
    fn fs_validator_checks_entries() {
        let dir = TempDir::new().unwrap();
        let err = validate_fs(&minimal(), dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::EntryNotFound(path) if path.ends_with("src/index.js")));

        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/index.js"), "").unwrap();
        validate_fs(&minimal(), dir.path()).unwrap();
    }

    #[test]
    fn fs_validator_checks_static_root() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/index.js"), "").unwrap();

        let mut config = minimal();
        config.dev_server = Some(Default::default());
        let err = validate_fs(&config, dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::StaticRootNotFound(_)));
    }
}
