//! Transformation-rule engine for the kiln build pipeline.
//!
//! Given a project config and an environment mode, this crate decides which ordered
//! chain of transformers every source file passes through, which build plugins are
//! active, and how the development server is described. It never runs a transformer
//! itself; the result is a [`BuildPlan`] handed to an external bundler.
//!
//! ```
//! use kiln_config::{EnvironmentMode, KilnConfig, Pipeline};
//!
//! let config = KilnConfig::reference().unwrap();
//! let pipeline = Pipeline::load(config, ".", EnvironmentMode::Production).unwrap();
//!
//! let chain = pipeline.resolve("src/scss/main.scss").unwrap();
//! assert_eq!(chain.kinds(), vec!["sass", "css", "css-extract"]);
//! ```

pub mod annotation;
pub mod capability;
pub mod chain;
pub mod config;
pub mod dev;
pub mod discovery;
pub mod error;
pub mod matcher;
pub mod mode;
pub mod plan;
pub mod plugin;
pub mod rules;
pub mod validation;

// Re-export main types
pub use annotation::*;
pub use capability::*;
pub use chain::*;
pub use config::*;
pub use dev::*;
pub use error::*;
pub use matcher::*;
pub use mode::*;
pub use plan::*;
pub use plugin::*;
pub use rules::*;

// Re-export discovery and validation
pub use discovery::{ConfigDiscovery, discover};
pub use validation::{ConfigValidator, FsValidator, SchemaValidator, validate_fs, validate_schema};
