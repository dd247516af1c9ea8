//! Development sessions.
//!
//! The watcher filters filesystem events, the scheduler re-resolves changed files,
//! and every outcome is emitted as a [`DevEvent`] for the external dev-server runtime.

pub mod scheduler;
pub mod watcher;

use std::path::PathBuf;

use kiln_config::{BuildPlan, TransformationChain};
use serde::Serialize;

pub use scheduler::RebuildScheduler;
pub use watcher::{ChangeKind, FileChange, FileWatcher, WatchFilter};

/// Events in the dev session lifecycle, printed one JSON object per line.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DevEvent {
    /// Initial plan assembled; the session is watching
    Ready { plan: Box<BuildPlan> },

    /// A changed file resolved to its chain
    Rebuilt {
        path: PathBuf,
        chain: TransformationChain,
    },

    /// A changed file could not be resolved
    RebuildFailed { path: PathBuf, error: String },

    Removed { path: PathBuf },
}
