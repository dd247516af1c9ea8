//! Check command implementation.
//!
//! Validates configuration, entry points and plugin activation without printing a
//! plan.

use kiln_config::{EnvironmentMode, FsValidator, Pipeline, PluginOrchestrator};

use crate::commands::Project;
use crate::error::Result;
use crate::ui;

pub async fn execute(project: &Project) -> Result<()> {
    ui::info("Checking configuration...");

    let pipeline = project.load(&FsValidator::new(&project.root))?;
    ui::success(&format!(
        "{} rules compiled, {} entries found",
        pipeline.rules().len(),
        pipeline.config().entries.len()
    ));

    for line in mode_dependent_rules(&pipeline) {
        ui::info(&line);
    }

    let excluded = &pipeline.config().excluded;
    for note in excluded
        .rules
        .iter()
        .chain(&excluded.plugins)
        .chain(&excluded.externals)
    {
        match &note.reason {
            Some(reason) => ui::info(&format!("excluded `{}`: {reason}", note.id)),
            None => ui::info(&format!("excluded `{}`", note.id)),
        }
    }

    for line in contradicted_exclusions(&pipeline) {
        ui::warning(&line);
    }

    let plan = pipeline.plan(&PluginOrchestrator::with_builtins()).await?;
    ui::success(&format!(
        "{} plugins activate in {} mode",
        plan.plugins.len(),
        plan.mode
    ));

    ui::success("All checks passed!");
    Ok(())
}

/// Exclusion notes naming a rule or plugin that the config still declares.
fn contradicted_exclusions(pipeline: &Pipeline) -> Vec<String> {
    let config = pipeline.config();
    let rules = config.excluded.rules.iter().filter(|note| {
        pipeline
            .rules()
            .rules()
            .iter()
            .any(|rule| rule.name() == note.id)
    });
    let plugins = config
        .excluded
        .plugins
        .iter()
        .filter(|note| config.plugins.iter().any(|plugin| plugin.name == note.id));

    rules
        .map(|note| format!("rule `{}` is marked excluded but still declared", note.id))
        .chain(plugins.map(|note| {
            format!("plugin `{}` is marked excluded but still declared", note.id)
        }))
        .collect()
}

/// One line per rule whose chain differs between modes.
fn mode_dependent_rules(pipeline: &Pipeline) -> Vec<String> {
    pipeline
        .rules()
        .rules()
        .iter()
        .filter_map(|rule| {
            let dev = rule.chain(EnvironmentMode::Development);
            let prod = rule.chain(EnvironmentMode::Production);
            (dev.steps() != prod.steps()).then(|| {
                format!(
                    "rule `{}` differs by mode: development [{}], production [{}]",
                    rule.name(),
                    dev.kinds().join(", "),
                    prod.kinds().join(", ")
                )
            })
        })
        .collect()
}
