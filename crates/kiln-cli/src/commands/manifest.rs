//! Manifest command implementation.

use kiln_config::SchemaValidator;

use crate::commands::Project;
use crate::error::{CliError, Result};

/// Print the validated editor capability manifest.
pub fn execute(project: &Project) -> Result<()> {
    let pipeline = project.load(&SchemaValidator)?;
    let subset = pipeline
        .editor()
        .ok_or_else(|| CliError::InvalidArgument("config has no [editor] section".into()))?;

    println!("{}", serde_json::to_string_pretty(&subset.to_manifest())?);
    Ok(())
}
