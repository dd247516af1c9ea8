//! Resolve command implementation.

use std::path::Path;

use kiln_config::{Pipeline, SchemaValidator, TransformationChain};

use crate::cli::ResolveArgs;
use crate::commands::Project;
use crate::error::Result;

/// Print the chain for each path, stopping at the first that fails.
///
/// Paths need not exist; resolution is purely lexical.
pub fn execute(project: &Project, args: ResolveArgs) -> Result<()> {
    let pipeline = project.load(&SchemaValidator)?;

    for path in &args.paths {
        println!("{}", resolve_line(&pipeline, path, args.json)?);
    }
    Ok(())
}

fn resolve_line(pipeline: &Pipeline, path: &Path, json: bool) -> Result<String> {
    let chain = pipeline.resolve(path)?;
    if json {
        Ok(serde_json::to_string(&serde_json::json!({
            "path": path,
            "chain": chain,
        }))?)
    } else {
        Ok(format!("{}: {}", path.display(), describe(&chain)))
    }
}

fn describe(chain: &TransformationChain) -> String {
    format!("[{}] {}", chain.rule(), chain.kinds().join(" -> "))
}
