//! Build plugins: declarations, activation conditions and the orchestrator.
//!
//! Descriptors come from config. The orchestrator keeps those whose activation condition
//! holds for the current mode, then activates them concurrently through registered
//! [`PluginFactory`] implementations. Activation is all-or-nothing: the first failure
//! aborts the others and no partial plugin set is ever returned.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::task::JoinSet;

use crate::capability::{CapabilitySubset, ValidatedCapabilitySubset, build_subset};
use crate::error::{ConfigError, Result};
use crate::mode::EnvironmentMode;

/// Built-in plugin kinds.
pub mod kinds {
    pub const HOT_RELOAD: &str = "hot-reload";
    pub const CSS_EXTRACT: &str = "css-extract";
    pub const EDITOR: &str = "editor";
}

/// When a plugin takes part in a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Always,
    Development,
    Production,
}

impl Activation {
    pub fn holds(self, mode: EnvironmentMode) -> bool {
        match self {
            Activation::Always => true,
            Activation::Development => mode == EnvironmentMode::Development,
            Activation::Production => mode == EnvironmentMode::Production,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PluginDescriptor {
    /// Identity reported in errors; unique within a config
    pub name: String,

    /// Which factory builds this plugin
    pub kind: String,

    #[serde(default, rename = "when")]
    pub activation: Activation,

    /// Factory-specific options, passed through untouched
    #[serde(default)]
    pub options: Value,
}

impl PluginDescriptor {
    pub fn new(name: impl Into<String>, kind: impl Into<String>, activation: Activation) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            activation,
            options: Value::Null,
        }
    }

    pub fn with_options(mut self, options: Value) -> Self {
        self.options = options;
        self
    }
}

/// A plugin ready to hand to the external bundler.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivatedPlugin {
    name: String,
    kind: String,
    settings: Value,
}

impl ActivatedPlugin {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Normalised settings produced by the factory
    pub fn settings(&self) -> &Value {
        &self.settings
    }

    pub fn is_hot_reload(&self) -> bool {
        self.kind == kinds::HOT_RELOAD
    }
}

/// What a factory may consult while activating.
#[derive(Debug, Clone)]
pub struct ActivationContext {
    pub mode: EnvironmentMode,
    /// Project root for resolving relative option paths
    pub root: PathBuf,
    /// Validated `[editor]` section, if the config has one
    pub editor: Option<ValidatedCapabilitySubset>,
}

impl ActivationContext {
    pub fn new(mode: EnvironmentMode, root: impl Into<PathBuf>) -> Self {
        Self {
            mode,
            root: root.into(),
            editor: None,
        }
    }

    pub fn with_editor(mut self, editor: Option<ValidatedCapabilitySubset>) -> Self {
        self.editor = editor;
        self
    }
}

/// Builds one kind of plugin from its descriptor.
///
/// Implementations may perform I/O. They must not depend on other activations, since
/// all activations of a build run concurrently.
#[async_trait]
pub trait PluginFactory: Send + Sync {
    async fn activate(
        &self,
        descriptor: &PluginDescriptor,
        ctx: &ActivationContext,
    ) -> anyhow::Result<Value>;
}

/// Filter descriptors by activation condition, keeping declaration order.
pub fn active_descriptors(
    descriptors: &[PluginDescriptor],
    mode: EnvironmentMode,
) -> Vec<&PluginDescriptor> {
    descriptors
        .iter()
        .filter(|descriptor| descriptor.activation.holds(mode))
        .collect()
}

#[derive(Clone)]
pub struct PluginOrchestrator {
    factories: HashMap<String, Arc<dyn PluginFactory>>,
}

impl Default for PluginOrchestrator {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl PluginOrchestrator {
    /// An orchestrator with no factories registered.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// An orchestrator with the `hot-reload`, `css-extract` and `editor` factories.
    pub fn with_builtins() -> Self {
        let mut orchestrator = Self::empty();
        orchestrator.register(kinds::HOT_RELOAD, HotReloadFactory);
        orchestrator.register(kinds::CSS_EXTRACT, CssExtractFactory);
        orchestrator.register(kinds::EDITOR, EditorFactory);
        orchestrator
    }

    pub fn register(&mut self, kind: impl Into<String>, factory: impl PluginFactory + 'static) {
        self.factories.insert(kind.into(), Arc::new(factory));
    }

    /// Activate every descriptor whose condition holds for `ctx.mode`.
    ///
    /// The returned plugins keep declaration order. Activations run concurrently and
    /// the call returns only once all have finished, or as soon as one fails; the
    /// remaining activations are then aborted.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::PluginActivation` naming the failed descriptor.
    pub async fn activate(
        &self,
        descriptors: &[PluginDescriptor],
        ctx: ActivationContext,
    ) -> Result<Vec<ActivatedPlugin>> {
        let selected = active_descriptors(descriptors, ctx.mode);

        let mut jobs = Vec::with_capacity(selected.len());
        for descriptor in selected {
            let factory = self.factories.get(&descriptor.kind).cloned().ok_or_else(|| {
                ConfigError::PluginActivation {
                    plugin: descriptor.name.clone(),
                    reason: format!("no factory registered for kind `{}`", descriptor.kind),
                }
            })?;
            jobs.push((factory, descriptor.clone()));
        }

        let ctx = Arc::new(ctx);
        let mut tasks = JoinSet::new();
        let mut names = HashMap::with_capacity(jobs.len());
        let mut activated: Vec<Option<ActivatedPlugin>> = vec![None; jobs.len()];

        for (index, (factory, descriptor)) in jobs.into_iter().enumerate() {
            let ctx = Arc::clone(&ctx);
            let name = descriptor.name.clone();
            let handle = tasks.spawn(async move {
                let settings = factory.activate(&descriptor, &ctx).await?;
                anyhow::Ok((
                    index,
                    ActivatedPlugin {
                        name: descriptor.name,
                        kind: descriptor.kind,
                        settings,
                    },
                ))
            });
            names.insert(handle.id(), name);
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((_, Ok((index, plugin)))) => {
                    tracing::debug!(plugin = %plugin.name, kind = %plugin.kind, "plugin activated");
                    activated[index] = Some(plugin);
                }
                Ok((id, Err(err))) => {
                    return Err(ConfigError::PluginActivation {
                        plugin: names.remove(&id).unwrap_or_default(),
                        reason: format!("{err:#}"),
                    });
                }
                Err(err) => {
                    return Err(ConfigError::PluginActivation {
                        plugin: names.remove(&err.id()).unwrap_or_default(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        Ok(activated.into_iter().flatten().collect())
    }
}

fn options_object<'a>(
    descriptor: &'a PluginDescriptor,
) -> anyhow::Result<Option<&'a serde_json::Map<String, Value>>> {
    match &descriptor.options {
        Value::Null => Ok(None),
        Value::Object(map) => Ok(Some(map)),
        other => anyhow::bail!("options must be a table, got {other}"),
    }
}

fn string_option(descriptor: &PluginDescriptor, key: &str) -> anyhow::Result<Option<String>> {
    let Some(map) = options_object(descriptor)? else {
        return Ok(None);
    };
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(other) => anyhow::bail!("option `{key}` must be a string, got {other}"),
    }
}

/// Live module replacement wiring for the dev server.
pub struct HotReloadFactory;

#[async_trait]
impl PluginFactory for HotReloadFactory {
    async fn activate(
        &self,
        descriptor: &PluginDescriptor,
        ctx: &ActivationContext,
    ) -> anyhow::Result<Value> {
        if !ctx.mode.is_development() {
            anyhow::bail!("hot reload only runs in a development session");
        }

        let path = string_option(descriptor, "path")?.unwrap_or_else(|| "/__kiln/hmr".into());
        if !path.starts_with('/') {
            anyhow::bail!("option `path` must start with `/`, got `{path}`");
        }

        Ok(json!({ "path": path }))
    }
}

/// Extracts injected styles into a static stylesheet.
pub struct CssExtractFactory;

#[async_trait]
impl PluginFactory for CssExtractFactory {
    async fn activate(
        &self,
        descriptor: &PluginDescriptor,
        _ctx: &ActivationContext,
    ) -> anyhow::Result<Value> {
        let filename = string_option(descriptor, "filename")?.unwrap_or_else(|| "styles.css".into());
        let relative = std::path::Path::new(&filename);
        if filename.is_empty() || relative.is_absolute() || filename.contains("..") {
            anyhow::bail!("option `filename` must be a relative path inside the output directory");
        }

        Ok(json!({ "filename": filename }))
    }
}

/// Embedded code editor, compiled with a restricted capability subset.
///
/// The subset comes from the validated `[editor]` section, or from a JSON file named by
/// the `manifest` option when the config has no such section.
pub struct EditorFactory;

#[async_trait]
impl PluginFactory for EditorFactory {
    async fn activate(
        &self,
        descriptor: &PluginDescriptor,
        ctx: &ActivationContext,
    ) -> anyhow::Result<Value> {
        if let Some(subset) = &ctx.editor {
            return Ok(subset.to_manifest());
        }

        let Some(manifest) = string_option(descriptor, "manifest")? else {
            anyhow::bail!("needs an [editor] section or a `manifest` option");
        };

        let path = ctx.root.join(&manifest);
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|err| anyhow::anyhow!("cannot read {}: {err}", path.display()))?;
        let requested: CapabilitySubset = serde_json::from_str(&raw)?;
        let subset = build_subset(&requested, &CapabilitySubset::editor_universe())?;

        Ok(subset.to_manifest())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptors() -> Vec<PluginDescriptor> {
        vec![
            PluginDescriptor::new("extract", kinds::CSS_EXTRACT, Activation::Production),
            PluginDescriptor::new("hmr", kinds::HOT_RELOAD, Activation::Development),
            PluginDescriptor::new("editor", kinds::EDITOR, Activation::Development)
                .with_options(json!({ "manifest": "editor.json" })),
        ]
    }

    #[test]
    fn activation_conditions() {
        assert!(Activation::Always.holds(EnvironmentMode::Production));
        assert!(Activation::Development.holds(EnvironmentMode::Development));
        assert!(!Activation::Development.holds(EnvironmentMode::Production));
        assert!(!Activation::Production.holds(EnvironmentMode::Development));
    }

    #[test]
    fn filter_preserves_declaration_order() {
        let all = descriptors();
        let names: Vec<_> = active_descriptors(&all, EnvironmentMode::Development)
            .into_iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(names, vec!["hmr", "editor"]);
    }

    #[tokio::test]
    async fn production_activates_only_production_plugins() {
        let plugins = PluginOrchestrator::with_builtins()
            .activate(
                &descriptors(),
                ActivationContext::new(EnvironmentMode::Production, "."),
            )
            .await
            .unwrap();

        assert_eq!(plugins.len(), 1);
        assert_eq!(plugins[0].name(), "extract");
        assert_eq!(plugins[0].settings()["filename"], json!("styles.css"));
    }

    #[tokio::test]
    async fn unknown_kind_fails_with_descriptor_name() {
        let all = vec![PluginDescriptor::new("mystery", "teleport", Activation::Always)];
        let err = PluginOrchestrator::with_builtins()
            .activate(&all, ActivationContext::new(EnvironmentMode::Production, "."))
            .await
            .unwrap_err();

        assert!(matches!(err, ConfigError::PluginActivation { plugin, .. } if plugin == "mystery"));
    }

    #[tokio::test]
    async fn hot_reload_refuses_production() {
        let all = vec![PluginDescriptor::new("hmr", kinds::HOT_RELOAD, Activation::Always)];
        let err = PluginOrchestrator::with_builtins()
            .activate(&all, ActivationContext::new(EnvironmentMode::Production, "."))
            .await
            .unwrap_err();

        assert!(matches!(err, ConfigError::PluginActivation { plugin, .. } if plugin == "hmr"));
    }

    #[tokio::test]
    async fn invalid_options_are_reported() {
        let all = vec![
            PluginDescriptor::new("extract", kinds::CSS_EXTRACT, Activation::Always)
                .with_options(json!({ "filename": "/etc/styles.css" })),
        ];
        let err = PluginOrchestrator::with_builtins()
            .activate(&all, ActivationContext::new(EnvironmentMode::Production, "."))
            .await
            .unwrap_err();

        assert!(matches!(err, ConfigError::PluginActivation { plugin, .. } if plugin == "extract"));
    }

    #[tokio::test]
    async fn editor_uses_validated_section() {
        let universe = CapabilitySubset::editor_universe();
        let subset = build_subset(&CapabilitySubset::new(["fsharp"], ["hover"]), &universe).unwrap();
        let all = vec![PluginDescriptor::new("editor", kinds::EDITOR, Activation::Always)];

        let plugins = PluginOrchestrator::with_builtins()
            .activate(
                &all,
                ActivationContext::new(EnvironmentMode::Development, ".").with_editor(Some(subset)),
            )
            .await
            .unwrap();

        assert_eq!(plugins[0].settings()["languages"], json!(["fsharp"]));
    }
}
