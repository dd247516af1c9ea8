//! Per-path rebuild scheduling for development sessions.
//!
//! Each change waits out the debounce window and then re-resolves only the changed
//! file. A newer change to the same path aborts the pending rebuild, so at most one
//! rebuild per path is in flight and events for a path arrive in filesystem order.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use kiln_config::Pipeline;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::DevEvent;
use super::watcher::{ChangeKind, FileChange};

struct InFlight {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Slots {
    next_generation: u64,
    by_path: HashMap<PathBuf, InFlight>,
}

pub struct RebuildScheduler {
    pipeline: Arc<Pipeline>,
    debounce: Duration,
    events: mpsc::UnboundedSender<DevEvent>,
    slots: Arc<Mutex<Slots>>,
}

impl RebuildScheduler {
    pub fn new(
        pipeline: Arc<Pipeline>,
        debounce: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<DevEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (
            Self {
                pipeline,
                debounce,
                events,
                slots: Arc::default(),
            },
            rx,
        )
    }

    /// Number of rebuilds waiting or running.
    pub fn in_flight(&self) -> usize {
        self.slots.lock().by_path.len()
    }

    /// Handle one change. Must be called from within a tokio runtime.
    pub fn schedule(&self, change: FileChange) {
        let mut slots = self.slots.lock();

        if let Some(stale) = slots.by_path.remove(&change.path) {
            tracing::debug!(path = %change.path.display(), "aborting stale rebuild");
            stale.handle.abort();
        }

        if change.kind == ChangeKind::Removed {
            let _ = self.events.send(DevEvent::Removed { path: change.path });
            return;
        }

        slots.next_generation += 1;
        let generation = slots.next_generation;

        let path = change.path;
        let handle = tokio::spawn(rebuild(
            Arc::clone(&self.pipeline),
            self.debounce,
            path.clone(),
            generation,
            self.events.clone(),
            Arc::clone(&self.slots),
        ));
        slots.by_path.insert(path, InFlight { generation, handle });
    }
}

impl Drop for RebuildScheduler {
    fn drop(&mut self) {
        for (_, pending) in self.slots.lock().by_path.drain() {
            pending.handle.abort();
        }
    }
}

async fn rebuild(
    pipeline: Arc<Pipeline>,
    debounce: Duration,
    path: PathBuf,
    generation: u64,
    events: mpsc::UnboundedSender<DevEvent>,
    slots: Arc<Mutex<Slots>>,
) {
    tokio::time::sleep(debounce).await;

    let relative = path
        .strip_prefix(pipeline.root())
        .map(PathBuf::from)
        .unwrap_or_else(|_| path.clone());

    // Hold the slot lock across the send so a newer change cannot slip its event in
    // ahead of this one.
    let mut slots = slots.lock();
    let current = slots
        .by_path
        .get(&path)
        .is_some_and(|pending| pending.generation == generation);
    if !current {
        return;
    }

    let event = match pipeline.resolve(&relative) {
        Ok(chain) => DevEvent::Rebuilt {
            path: relative,
            chain,
        },
        Err(err) => DevEvent::RebuildFailed {
            path: relative,
            error: err.to_string(),
        },
    };
    let _ = events.send(event);
    slots.by_path.remove(&path);
}
