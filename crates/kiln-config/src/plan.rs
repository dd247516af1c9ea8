//! Load-time assembly of everything the external bundler needs.
//!
//! A [`Pipeline`] is a config compiled for one mode: rules, the editor subset and the
//! project root. [`Pipeline::plan`] turns it into a [`BuildPlan`], resolving every entry
//! and activating plugins. Any failure aborts assembly; a plan is never partial.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::annotation::Exclusions;
use crate::capability::{CapabilitySubset, ValidatedCapabilitySubset};
use crate::chain::TransformationChain;
use crate::config::{KilnConfig, OutputOptions};
use crate::dev::{DevServerConfig, DevServerDescriptor};
use crate::error::{ConfigError, Result};
use crate::mode::EnvironmentMode;
use crate::plugin::{ActivatedPlugin, ActivationContext, PluginOrchestrator};
use crate::rules::RuleSet;
use crate::validation::{ConfigValidator, SchemaValidator};

#[derive(Debug, Clone)]
pub struct Pipeline {
    root: PathBuf,
    mode: EnvironmentMode,
    config: KilnConfig,
    rules: RuleSet,
    editor: Option<ValidatedCapabilitySubset>,
}

impl Pipeline {
    /// Apply the mode profile, validate the schema and compile rules.
    pub fn load(config: KilnConfig, root: impl Into<PathBuf>, mode: EnvironmentMode) -> Result<Self> {
        Self::load_with(config, root, mode, &SchemaValidator)
    }

    /// Like [`Pipeline::load`] with a caller-chosen validator.
    pub fn load_with(
        config: KilnConfig,
        root: impl Into<PathBuf>,
        mode: EnvironmentMode,
        validator: &dyn ConfigValidator,
    ) -> Result<Self> {
        let config = config.materialize_profile(mode)?;
        validator.validate(&config)?;

        let rules = RuleSet::new(&config.rules)?;
        let editor = config
            .editor
            .as_ref()
            .map(|editor| editor.build(&CapabilitySubset::editor_universe()))
            .transpose()?;

        Ok(Self {
            root: root.into(),
            mode,
            config,
            rules,
            editor,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mode(&self) -> EnvironmentMode {
        self.mode
    }

    /// The config after the mode profile was applied.
    pub fn config(&self) -> &KilnConfig {
        &self.config
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn editor(&self) -> Option<&ValidatedCapabilitySubset> {
        self.editor.as_ref()
    }

    /// Resolve `path` in this pipeline's mode.
    ///
    /// Absolute paths under the project root are matched relative to it, so watcher
    /// events and config entries hit the same include/exclude roots.
    pub fn resolve(&self, path: impl AsRef<Path>) -> Result<TransformationChain> {
        let path = path.as_ref();
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        self.rules.resolve(relative, self.mode)
    }

    /// Validate the dev server section for a development session.
    ///
    /// A development pipeline without a `[dev_server]` section gets the defaults.
    /// Production never has a dev server.
    pub fn dev_server(&self) -> Result<Option<DevServerDescriptor>> {
        if !self.mode.is_development() {
            return Ok(None);
        }

        let fallback;
        let section = match &self.config.dev_server {
            Some(section) => section,
            None => {
                fallback = DevServerConfig::default();
                &fallback
            }
        };
        section.validate(&self.root).map(Some)
    }

    /// Assemble the build plan.
    ///
    /// Order of checks: every entry resolves, the dev server validates, plugins
    /// activate, then hot-reload consistency holds. The first failure is returned.
    pub async fn plan(&self, orchestrator: &PluginOrchestrator) -> Result<BuildPlan> {
        let entries = self
            .config
            .entries
            .iter()
            .map(|locator| {
                Ok(PlannedEntry {
                    locator: locator.clone(),
                    chain: self.resolve(locator)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let dev_server = self.dev_server()?;

        let ctx = ActivationContext::new(self.mode, &self.root).with_editor(self.editor.clone());
        let plugins = orchestrator.activate(&self.config.plugins, ctx).await?;

        ensure_hot_reload_consistency(dev_server.as_ref(), &plugins)?;

        tracing::info!(
            mode = %self.mode,
            entries = entries.len(),
            plugins = plugins.len(),
            "assembled build plan"
        );

        Ok(BuildPlan {
            mode: self.mode,
            entries,
            output: self.config.output.clone(),
            plugins,
            dev_server,
            excluded: self.config.excluded.clone(),
        })
    }
}

/// A dev server with hot reload on needs an active hot-reload plugin.
pub fn ensure_hot_reload_consistency(
    dev_server: Option<&DevServerDescriptor>,
    plugins: &[ActivatedPlugin],
) -> Result<()> {
    let Some(dev_server) = dev_server else {
        return Ok(());
    };

    if dev_server.hot_reload_enabled() && !plugins.iter().any(ActivatedPlugin::is_hot_reload) {
        return Err(ConfigError::ConfigurationInconsistency(
            "dev server has hot_reload enabled but no hot-reload plugin is active".to_string(),
        ));
    }

    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedEntry {
    pub locator: PathBuf,
    pub chain: TransformationChain,
}

/// Everything the external bundler needs for one run, serialisable to JSON.
#[derive(Debug, Clone, Serialize)]
pub struct BuildPlan {
    pub mode: EnvironmentMode,
    pub entries: Vec<PlannedEntry>,
    pub output: OutputOptions,
    pub plugins: Vec<ActivatedPlugin>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev_server: Option<DevServerDescriptor>,
    #[serde(skip_serializing_if = "Exclusions::is_empty")]
    pub excluded: Exclusions,
}

impl BuildPlan {
    pub fn to_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| ConfigError::invalid_value("plan", e))
    }
}
