//! Transformation rules and the chain resolver.
//!
//! A [`RuleSet`] is compiled once at configuration-load time. Compilation rejects rules
//! that could never be resolved unambiguously; [`RuleSet::resolve`] is then a pure lookup
//! that never reorders the declared steps.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::chain::{ChainTemplate, TransformationChain};
use crate::error::{ConfigError, Result};
use crate::matcher::{FilePattern, MatchRule};
use crate::mode::EnvironmentMode;

/// A rule as written in `kiln.toml`.
///
/// ```toml
/// [[rules]]
/// name = "styles"
/// extensions = ["sass", "scss", "css"]
/// include = ["src"]
/// use = [
///     { transformer = "sass" },
///     { transformer = "css" },
///     { development = { transformer = "style-inject" }, production = { transformer = "css-extract" } },
/// ]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    pub name: String,

    /// Extension group (mutually exclusive with `test`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<String>,

    /// Regular expression over the path (mutually exclusive with `extensions`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<String>,

    /// Only match under these roots
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<PathBuf>,

    /// Never match under these roots
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<PathBuf>,

    #[serde(rename = "use")]
    pub steps: ChainTemplate,
}

impl RuleConfig {
    fn pattern(&self) -> Result<FilePattern> {
        match (&self.test, self.extensions.is_empty()) {
            (Some(test), true) => FilePattern::regex(test, &self.name),
            (None, false) => Ok(FilePattern::extensions(&self.extensions)),
            (Some(_), false) => Err(ConfigError::invalid_value(
                format!("rules.{}", self.name),
                "set either `extensions` or `test`, not both",
            )),
            (None, true) => Err(ConfigError::invalid_value(
                format!("rules.{}", self.name),
                "a rule needs `extensions` or `test`",
            )),
        }
    }
}

/// A compiled rule with both mode-resolved chains precomputed.
#[derive(Debug, Clone)]
pub struct Rule {
    name: Arc<str>,
    matcher: MatchRule,
    template: ChainTemplate,
    development: TransformationChain,
    production: TransformationChain,
}

impl Rule {
    pub fn compile(config: &RuleConfig) -> Result<Self> {
        if config.steps.is_empty() || config.steps.slots().iter().any(|slot| slot.is_void()) {
            return Err(ConfigError::invalid_value(
                format!("rules.{}", config.name),
                "`use` must list at least one step and every conditional slot needs a side",
            ));
        }

        let matcher = MatchRule::new(
            &config.name,
            config.pattern()?,
            config.include.clone(),
            config.exclude.clone(),
        )?;
        let name: Arc<str> = Arc::from(config.name.as_str());

        Ok(Self {
            development: config
                .steps
                .instantiate(&name, EnvironmentMode::Development),
            production: config.steps.instantiate(&name, EnvironmentMode::Production),
            template: config.steps.clone(),
            matcher,
            name,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matcher(&self) -> &MatchRule {
        &self.matcher
    }

    pub fn template(&self) -> &ChainTemplate {
        &self.template
    }

    pub fn chain(&self, mode: EnvironmentMode) -> TransformationChain {
        match mode {
            EnvironmentMode::Development => self.development.clone(),
            EnvironmentMode::Production => self.production.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Compile rule configs in declaration order.
    ///
    /// # Errors
    ///
    /// - `InvalidValue` for duplicate names, empty chains or a missing/doubled pattern
    /// - `InvalidPattern` for a regex that fails to compile
    /// - `AmbiguousScope` for a rule with both include and exclude roots
    /// - `AmbiguousRule` for two extension rules sharing an extension whose scopes overlap
    pub fn new(configs: &[RuleConfig]) -> Result<Self> {
        let mut seen = HashSet::with_capacity(configs.len());
        let mut rules = Vec::with_capacity(configs.len());

        for config in configs {
            if !seen.insert(config.name.as_str()) {
                return Err(ConfigError::invalid_value(
                    "rules",
                    format!("duplicate rule name `{}`", config.name),
                ));
            }
            rules.push(Rule::compile(config)?);
        }

        check_overlaps(&rules)?;
        tracing::debug!(count = rules.len(), "compiled transformation rules");

        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Resolve the chain for `path` under `mode`.
    ///
    /// # Errors
    ///
    /// - `UnmatchedFile` when no rule matches
    /// - `AmbiguousRule` when more than one rule matches
    ///
    /// # Example
    ///
    /// ```
    /// use kiln_config::{EnvironmentMode, RuleConfig, RuleSet};
    /// use serde_json::json;
    ///
    /// let rules: Vec<RuleConfig> = serde_json::from_value(json!([
    ///     { "name": "app-styles", "extensions": ["scss"], "include": ["src"],
    ///       "use": [{ "transformer": "preprocess" }, { "transformer": "extract" }] },
    ///     { "name": "vendor-styles", "extensions": ["scss"], "include": ["vendor"],
    ///       "use": [{ "transformer": "preprocess" }, { "transformer": "inline" }] }
    /// ])).unwrap();
    /// let rules = RuleSet::new(&rules).unwrap();
    ///
    /// let chain = rules.resolve("vendor/x.scss", EnvironmentMode::Production).unwrap();
    /// assert_eq!(chain.kinds(), vec!["preprocess", "inline"]);
    /// assert!(rules.resolve("other/x.scss", EnvironmentMode::Production).is_err());
    /// ```
    pub fn resolve(
        &self,
        path: impl AsRef<Path>,
        mode: EnvironmentMode,
    ) -> Result<TransformationChain> {
        let path = path.as_ref();
        let mut matched = self.rules.iter().filter(|rule| rule.matcher.matches(path));

        let Some(rule) = matched.next() else {
            return Err(ConfigError::UnmatchedFile {
                path: path.to_path_buf(),
            });
        };

        if let Some(other) = matched.next() {
            return Err(ConfigError::AmbiguousRule {
                path: path.to_path_buf(),
                first: rule.name.to_string(),
                second: other.name.to_string(),
            });
        }

        tracing::debug!(path = %path.display(), rule = %rule.name, %mode, "resolved chain");
        Ok(rule.chain(mode))
    }
}

fn check_overlaps(rules: &[Rule]) -> Result<()> {
    for (index, first) in rules.iter().enumerate() {
        for second in &rules[index + 1..] {
            let Some(ext) = first
                .matcher
                .pattern()
                .shared_extension(second.matcher.pattern())
            else {
                continue;
            };

            if !first.matcher.scope().is_disjoint(second.matcher.scope()) {
                return Err(ConfigError::AmbiguousRule {
                    path: PathBuf::from(format!("*.{ext}")),
                    first: first.name.to_string(),
                    second: second.name.to_string(),
                });
            }
        }
    }
    Ok(())
}
