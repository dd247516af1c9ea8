//! Build command implementation.
//!
//! Assembles the build plan and prints it as JSON for the external bundler.

use kiln_config::{BuildPlan, FsValidator, PluginOrchestrator};

use crate::cli::BuildArgs;
use crate::commands::Project;
use crate::error::Result;
use crate::ui;

pub async fn execute(project: &Project, args: BuildArgs) -> Result<()> {
    let pipeline = project.load(&FsValidator::new(&project.root))?;
    let plan = pipeline.plan(&PluginOrchestrator::with_builtins()).await?;

    println!("{}", render(&plan, args.pretty)?);
    ui::success(&format!(
        "Planned {} entries with {} plugins ({} mode)",
        plan.entries.len(),
        plan.plugins.len(),
        plan.mode
    ));
    Ok(())
}

pub fn render(plan: &BuildPlan, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(plan)?
    } else {
        serde_json::to_string(plan)?
    };
    Ok(json)
}
