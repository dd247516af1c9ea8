//! Command-line interface definition for kiln.
//!
//! - `kiln build` - Print the build plan for the external bundler
//! - `kiln dev` - Development session with watch-driven re-resolution
//! - `kiln check` - Validate configuration, entries and plugins
//! - `kiln resolve` - Show the chain a file would pass through
//! - `kiln manifest` - Print the editor capability manifest

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use kiln_config::{EnvironmentMode, InvocationContext};

/// kiln - transformation rules and build plans for a JavaScript bundler
#[derive(Parser, Debug)]
#[command(
    name = "kiln",
    version,
    about = "Resolve transformation chains and assemble build plans",
    long_about = "kiln decides which transformers every source file passes through, which build\n\
                  plugins are active, and how the development server is described. It prints\n\
                  a build plan for an external bundler; it never transforms files itself."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Config file (defaults to kiln.toml, then the "kiln" field of package.json)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Project root (defaults to the current directory)
    #[arg(long, global = true, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Environment mode
    ///
    /// Without this flag the mode is development for `kiln dev` and production
    /// for everything else.
    #[arg(long, global = true, value_name = "MODE", value_parser = parse_mode)]
    pub mode: Option<EnvironmentMode>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// The parts of this invocation that decide the environment mode.
    pub fn invocation(&self) -> InvocationContext {
        InvocationContext::new(self.command.name()).with_mode(self.mode)
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the build plan as JSON
    Build(BuildArgs),

    /// Start a development session
    ///
    /// Watches the project and re-resolves each changed file, printing one JSON
    /// event per line for the dev-server runtime.
    Dev(DevArgs),

    /// Validate configuration, entry points and plugin activation
    Check,

    /// Show the transformation chain for one or more files
    Resolve(ResolveArgs),

    /// Print the editor capability manifest
    Manifest,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Build(_) => "build",
            Command::Dev(_) => kiln_config::DEV_COMMAND,
            Command::Check => "check",
            Command::Resolve(_) => "resolve",
            Command::Manifest => "manifest",
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct BuildArgs {
    /// Pretty-print the plan
    #[arg(long)]
    pub pretty: bool,
}

#[derive(Args, Debug, Default)]
pub struct DevArgs {
    /// Print the initial plan and exit without watching
    #[arg(long)]
    pub once: bool,
}

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Files to resolve, relative to the project root
    #[arg(required = true, value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Print one JSON chain per line
    #[arg(long)]
    pub json: bool,
}

fn parse_mode(value: &str) -> Result<EnvironmentMode, String> {
    value.parse().map_err(|err: kiln_config::ConfigError| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_config::derive_mode;

    fn mode_of(argv: &[&str]) -> EnvironmentMode {
        let cli = Cli::try_parse_from(argv).unwrap();
        derive_mode(&cli.invocation())
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["kiln", "resolve", "src/a.js", "--mode", "dev", "-v"]);
        assert!(cli.verbose);
        assert_eq!(cli.mode, Some(EnvironmentMode::Development));
        match cli.command {
            Command::Resolve(args) => assert_eq!(args.paths, vec![PathBuf::from("src/a.js")]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn only_the_dev_command_selects_development() {
        assert_eq!(mode_of(&["kiln", "dev"]), EnvironmentMode::Development);
        assert_eq!(mode_of(&["kiln", "dev", "--once"]), EnvironmentMode::Development);
        assert_eq!(mode_of(&["kiln", "build"]), EnvironmentMode::Production);
    }

    #[test]
    fn argument_values_never_select_development() {
        assert_eq!(
            mode_of(&["kiln", "--cwd", "dev", "build"]),
            EnvironmentMode::Production
        );
        assert_eq!(
            mode_of(&["kiln", "resolve", "src/dev-server.js"]),
            EnvironmentMode::Production
        );
        assert_eq!(
            mode_of(&["kiln", "build", "--config", "dev-server.toml"]),
            EnvironmentMode::Production
        );
        assert_eq!(mode_of(&["kiln", "resolve", "dev"]), EnvironmentMode::Production);
    }

    #[test]
    fn mode_flag_overrides_the_command() {
        assert_eq!(
            mode_of(&["kiln", "dev", "--mode", "production"]),
            EnvironmentMode::Production
        );
        assert_eq!(
            mode_of(&["kiln", "resolve", "src/a.scss", "--mode=development"]),
            EnvironmentMode::Development
        );
    }

    #[test]
    fn rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["kiln", "build", "--mode", "staging"]).is_err());
    }

    #[test]
    fn verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["kiln", "check", "-v", "-q"]).is_err());
    }

    #[test]
    fn resolve_requires_a_path() {
        assert!(Cli::try_parse_from(["kiln", "resolve"]).is_err());
    }
}
