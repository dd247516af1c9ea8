//! Development session command implementation.
//!
//! 1. Load the config in development mode and assemble the initial plan
//! 2. Print a `ready` event carrying the plan
//! 3. Watch the project and re-resolve each changed file
//! 4. Stop on Ctrl+C

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use kiln_config::{FsValidator, PluginOrchestrator};
use tokio::signal;

use crate::cli::DevArgs;
use crate::commands::Project;
use crate::dev::{DevEvent, FileWatcher, RebuildScheduler, WatchFilter};
use crate::error::{CliError, Result};
use crate::ui;

pub async fn execute(project: &Project, args: DevArgs) -> Result<()> {
    if !project.mode.is_development() {
        return Err(CliError::InvalidArgument(format!(
            "a dev session needs development mode, got {}",
            project.mode
        )));
    }

    let pipeline = Arc::new(project.load(&FsValidator::new(&project.root))?);
    let plan = pipeline.plan(&PluginOrchestrator::with_builtins()).await?;
    let Some(dev_server) = plan.dev_server.clone() else {
        return Err(CliError::InvalidArgument(
            "the build plan carries no dev server".into(),
        ));
    };

    ui::info(&format!(
        "Dev server at http://{}:{} serving {}",
        dev_server.host(),
        dev_server.port(),
        dev_server.static_root().display()
    ));
    emit(&DevEvent::Ready {
        plan: Box::new(plan),
    })?;

    if args.once {
        return Ok(());
    }

    let (watcher, mut changes) = FileWatcher::spawn(WatchFilter::new(
        project.root.clone(),
        dev_server.watch_ignore(),
    ))?;
    let (scheduler, mut events) = RebuildScheduler::new(
        Arc::clone(&pipeline),
        Duration::from_millis(dev_server.debounce_ms()),
    );

    ui::info(&format!(
        "Watching for changes in: {}",
        watcher.root().display()
    ));
    ui::info("Press Ctrl+C to stop");

    loop {
        tokio::select! {
            Some(change) = changes.recv() => scheduler.schedule(change),
            Some(event) = events.recv() => {
                if let DevEvent::RebuildFailed { path, error } = &event {
                    ui::error(&format!("{}: {error}", path.display()));
                }
                emit(&event)?;
            }
            _ = signal::ctrl_c() => {
                ui::info("Shutting down development session...");
                break;
            }
        }
    }

    ui::success("Development session stopped");
    Ok(())
}

/// Write one event as a single JSON line and flush.
fn emit(event: &DevEvent) -> Result<()> {
    let line = serde_json::to_string(event)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{line}")?;
    stdout.flush()?;
    Ok(())
}
