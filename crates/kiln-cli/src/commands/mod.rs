//! Command implementations for the kiln CLI.
//!
//! Each command lives in its own module and exposes an `execute` function. Machine
//! output (plans, chains, manifests, dev events) goes to stdout; status lines go to
//! stderr.

pub mod build;
pub mod check;
pub mod dev;
pub mod manifest;
pub mod resolve;

use std::path::{Path, PathBuf};

use kiln_config::{ConfigDiscovery, ConfigValidator, EnvironmentMode, Pipeline};

use crate::cli::{Cli, Command};
use crate::error::{CliError, Result};

/// Where the project lives, which config to read, and the mode for this process.
#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    pub config: Option<PathBuf>,
    pub mode: EnvironmentMode,
}

impl Project {
    pub fn new(root: &Path, config: Option<PathBuf>, mode: EnvironmentMode) -> Result<Self> {
        let root = root
            .canonicalize()
            .map_err(|_| CliError::RootNotFound(root.to_path_buf()))?;
        if !root.is_dir() {
            return Err(CliError::RootNotFound(root));
        }

        Ok(Self { root, config, mode })
    }

    pub fn from_cli(cli: &Cli, mode: EnvironmentMode) -> Result<Self> {
        let root = match &cli.cwd {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };
        Self::new(&root, cli.config.clone(), mode)
    }

    /// Read the config, apply the mode profile, validate and compile it.
    pub fn load(&self, validator: &dyn ConfigValidator) -> Result<Pipeline> {
        let discovery = ConfigDiscovery::new(&self.root);
        let config = match &self.config {
            Some(path) => discovery.load_from(&resolve_path(path, &self.root))?,
            None => discovery.load()?,
        };

        Ok(Pipeline::load_with(config, &self.root, self.mode, validator)?)
    }
}

fn resolve_path(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// Run the parsed command in `mode`.
pub async fn dispatch(cli: Cli, mode: EnvironmentMode) -> Result<()> {
    let project = Project::from_cli(&cli, mode)?;
    tracing::debug!(root = %project.root.display(), %mode, "dispatching command");

    match cli.command {
        Command::Build(args) => build::execute(&project, args).await,
        Command::Dev(args) => dev::execute(&project, args).await,
        Command::Check => check::execute(&project).await,
        Command::Resolve(args) => resolve::execute(&project, args),
        Command::Manifest => manifest::execute(&project),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::fs;

    use tempfile::TempDir;

    pub const KILN_TOML: &str = r#"
entries = ["src/main.scss", "src/app.js"]

[[rules]]
name = "styles"
extensions = ["scss"]
include = ["src"]
use = [
    { transformer = "sass" },
    { development = { transformer = "style-inject" }, production = { transformer = "css-extract" } },
]

[[rules]]
name = "scripts"
extensions = ["js"]
exclude = ["node_modules"]
use = [{ transformer = "babel" }]

[[plugins]]
name = "hmr"
kind = "hot-reload"
when = "development"

[editor]
languages = ["css", "javascript"]
features = ["find"]
"#;

    pub fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::create_dir_all(dir.path().join("public")).unwrap();
        fs::write(dir.path().join("src/main.scss"), "body { margin: 0 }").unwrap();
        fs::write(dir.path().join("src/app.js"), "export {}").unwrap();
        fs::write(dir.path().join("kiln.toml"), KILN_TOML).unwrap();
        dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_config::SchemaValidator;
    use serial_test::serial;

    #[test]
    #[serial]
    fn loads_discovered_config() {
        let dir = fixtures::project();
        let project = Project::new(dir.path(), None, EnvironmentMode::Production).unwrap();
        let pipeline = project.load(&SchemaValidator).unwrap();
        assert_eq!(pipeline.rules().len(), 2);
    }

    #[test]
    #[serial]
    fn explicit_config_is_relative_to_root() {
        let dir = fixtures::project();
        std::fs::rename(dir.path().join("kiln.toml"), dir.path().join("build.toml")).unwrap();

        let project = Project::new(
            dir.path(),
            Some(PathBuf::from("build.toml")),
            EnvironmentMode::Production,
        )
        .unwrap();
        assert!(project.load(&SchemaValidator).is_ok());
    }

    #[test]
    fn missing_root_is_reported() {
        let err = Project::new(
            Path::new("/definitely/not/here"),
            None,
            EnvironmentMode::Production,
        )
        .unwrap_err();
        assert!(matches!(err, CliError::RootNotFound(_)));
    }
}
