//! Recursive file watcher for development sessions.
//!
//! Watches the project root and forwards relevant changes over a channel. Hidden
//! paths and configured ignore patterns never reach the scheduler. Debouncing is
//! per path and lives in the scheduler.

use std::path::{Path, PathBuf};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::error::{CliError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Created or modified
    Changed,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub kind: ChangeKind,
    pub path: PathBuf,
}

impl FileChange {
    pub fn changed(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: ChangeKind::Changed,
            path: path.into(),
        }
    }

    pub fn removed(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: ChangeKind::Removed,
            path: path.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum IgnorePattern {
    /// `*.log`: file names ending in `.log`
    Suffix(String),
    /// `node_modules` or `public/vendor`: a directory prefix, or any path segment
    /// for single-segment patterns
    Prefix(PathBuf),
}

impl IgnorePattern {
    fn parse(raw: &str) -> Self {
        match raw.strip_prefix('*') {
            Some(suffix) => IgnorePattern::Suffix(suffix.to_string()),
            None => IgnorePattern::Prefix(PathBuf::from(raw.trim_end_matches('/'))),
        }
    }

    fn matches(&self, relative: &Path) -> bool {
        match self {
            IgnorePattern::Suffix(suffix) => relative
                .file_name()
                .is_some_and(|name| name.to_string_lossy().ends_with(suffix.as_str())),
            IgnorePattern::Prefix(prefix) if prefix.components().count() == 1 => relative
                .components()
                .any(|component| component.as_os_str() == prefix.as_os_str()),
            IgnorePattern::Prefix(prefix) => relative.starts_with(prefix),
        }
    }
}

/// Decides which paths under a root are worth a rebuild.
#[derive(Debug, Clone)]
pub struct WatchFilter {
    root: PathBuf,
    patterns: Vec<IgnorePattern>,
}

impl WatchFilter {
    pub fn new(root: impl Into<PathBuf>, ignore: &[String]) -> Self {
        Self {
            root: root.into(),
            patterns: ignore.iter().map(|raw| IgnorePattern::parse(raw)).collect(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Paths outside the root, hidden paths and ignored paths are skipped.
    pub fn should_ignore(&self, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return true;
        };

        let hidden = relative.components().any(|component| {
            component
                .as_os_str()
                .to_str()
                .is_some_and(|name| name.starts_with('.') && name != "." && name != "..")
        });

        hidden || self.patterns.iter().any(|pattern| pattern.matches(relative))
    }

    fn classify(&self, event: &Event) -> Vec<FileChange> {
        let kind = match event.kind {
            EventKind::Create(_) | EventKind::Modify(_) => ChangeKind::Changed,
            EventKind::Remove(_) => ChangeKind::Removed,
            _ => return Vec::new(),
        };

        event
            .paths
            .iter()
            .filter(|path| !self.should_ignore(path))
            .map(|path| FileChange {
                kind,
                path: path.clone(),
            })
            .collect()
    }
}

/// Keeps the underlying notify watcher alive; dropping it stops the events.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FileWatcher {
    /// Start watching `filter.root()` recursively.
    ///
    /// # Errors
    ///
    /// Returns `RootNotFound` for a missing root, or the notify error if the platform
    /// watcher cannot be created.
    pub fn spawn(filter: WatchFilter) -> Result<(Self, mpsc::UnboundedReceiver<FileChange>)> {
        let root = filter.root().to_path_buf();
        if !root.is_dir() {
            return Err(CliError::RootNotFound(root));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    for change in filter.classify(&event) {
                        // Receiver gone means the session is shutting down.
                        if tx.send(change).is_err() {
                            return;
                        }
                    }
                }
                Err(err) => tracing::warn!(error = %err, "file watcher error"),
            }
        })?;

        watcher.watch(&root, RecursiveMode::Recursive)?;
        tracing::debug!(root = %root.display(), "watching for changes");

        Ok((
            Self {
                _watcher: watcher,
                root,
            },
            rx,
        ))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, RemoveKind};

    fn filter(patterns: &[&str]) -> WatchFilter {
        let patterns: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
        WatchFilter::new("/project", &patterns)
    }

    #[test]
    fn ignores_directory_segments() {
        let filter = filter(&["node_modules"]);
        assert!(filter.should_ignore(Path::new("/project/node_modules/react/index.js")));
        assert!(filter.should_ignore(Path::new("/project/packages/a/node_modules/x.js")));
        assert!(!filter.should_ignore(Path::new("/project/src/node_modules_shim.js")));
        assert!(!filter.should_ignore(Path::new("/project/src/index.js")));
    }

    #[test]
    fn ignores_nested_prefixes_only_at_root() {
        let filter = filter(&["public/vendor"]);
        assert!(filter.should_ignore(Path::new("/project/public/vendor/lib.js")));
        assert!(!filter.should_ignore(Path::new("/project/src/public/vendor/lib.js")));
    }

    #[test]
    fn ignores_suffixes() {
        let filter = filter(&["*.log"]);
        assert!(filter.should_ignore(Path::new("/project/debug.log")));
        assert!(!filter.should_ignore(Path::new("/project/src/log.js")));
    }

    #[test]
    fn ignores_hidden_and_outside_paths() {
        let filter = filter(&[]);
        assert!(filter.should_ignore(Path::new("/project/.git/config")));
        assert!(filter.should_ignore(Path::new("/project/src/.cache/file.js")));
        assert!(filter.should_ignore(Path::new("/other/file.js")));
    }

    #[test]
    fn classifies_notify_events() {
        let filter = filter(&["*.log"]);
        let created = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/project/src/a.scss"))
            .add_path(PathBuf::from("/project/build.log"));
        assert_eq!(
            filter.classify(&created),
            vec![FileChange::changed("/project/src/a.scss")]
        );

        let removed = Event::new(EventKind::Remove(RemoveKind::File))
            .add_path(PathBuf::from("/project/src/a.scss"));
        assert_eq!(
            filter.classify(&removed),
            vec![FileChange::removed("/project/src/a.scss")]
        );

        let access = Event::new(EventKind::Access(notify::event::AccessKind::Any))
            .add_path(PathBuf::from("/project/src/a.scss"));
        assert!(filter.classify(&access).is_empty());
    }
}
