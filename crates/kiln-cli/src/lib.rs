//! kiln CLI - resolve transformation chains and assemble build plans.
//!
//! The CLI is the process boundary for [`kiln_config`]: it derives the environment
//! mode from the invocation, installs logging, loads the project config and turns
//! library errors into operator-facing diagnostics.
//!
//! - [`cli`] - clap definitions
//! - [`commands`] - `build`, `dev`, `check`, `resolve` and `manifest`
//! - [`dev`] - file watching and per-path rebuild scheduling
//! - [`error`] - error type and miette rendering
//! - [`logger`] - tracing subscriber setup
//! - [`ui`] - status lines on stderr

pub mod cli;
pub mod commands;
pub mod dev;
pub mod error;
pub mod logger;
pub mod ui;

pub use error::{CliError, Result};
