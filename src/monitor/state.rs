//! Run-scoped state shared across location threads.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use tracing::error;

use crate::shutdown::Cancelled;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Paths handled in this run, compared case-insensitively.
#[derive(Debug, Default)]
pub struct ProcessedSet {
    paths: Mutex<HashSet<String>>,
}

impl ProcessedSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(path: &Path) -> String {
        path.to_string_lossy().to_lowercase()
    }

    pub fn contains(&self, path: &Path) -> bool {
        lock(&self.paths).contains(&Self::key(path))
    }

    /// Claim `path` for handling. Exactly one caller wins per path per run.
    pub fn try_claim(&self, path: &Path) -> bool {
        lock(&self.paths).insert(Self::key(path))
    }

    pub fn len(&self) -> usize {
        lock(&self.paths).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Append-only incident descriptions for the end-of-run report.
#[derive(Debug, Default)]
pub struct IncidentLog {
    entries: Mutex<Vec<String>>,
}

impl IncidentLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, incident: impl Into<String>) {
        lock(&self.entries).push(incident.into());
    }

    pub fn snapshot(&self) -> Vec<String> {
        lock(&self.entries).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// How the secondary tasks of a run ended.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TaskOutcome {
    pub completed: usize,
    pub cancelled: usize,
    pub panicked: usize,
}

/// Long-lived waits spawned by handlers, joined before the run report.
#[derive(Debug, Default)]
pub struct TaskSet {
    handles: Mutex<Vec<JoinHandle<Result<(), Cancelled>>>>,
}

impl TaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&self, name: String, task: F)
    where
        F: FnOnce() -> Result<(), Cancelled> + Send + 'static,
    {
        let builder = thread::Builder::new().name(name.clone());
        match builder.spawn(task) {
            Ok(handle) => lock(&self.handles).push(handle),
            Err(e) => error!("Failed to start task {name}: {e}"),
        }
    }

    pub fn pending(&self) -> usize {
        lock(&self.handles).len()
    }

    /// Join every task, including any spawned while joining.
    pub fn join_all(&self) -> TaskOutcome {
        let mut outcome = TaskOutcome::default();
        loop {
            let batch: Vec<_> = lock(&self.handles).drain(..).collect();
            if batch.is_empty() {
                return outcome;
            }
            for handle in batch {
                let name = handle.thread().name().unwrap_or("task").to_string();
                match handle.join() {
                    Ok(Ok(())) => outcome.completed += 1,
                    Ok(Err(Cancelled)) => outcome.cancelled += 1,
                    Err(_) => {
                        error!("Task {name} panicked");
                        outcome.panicked += 1;
                    }
                }
            }
        }
    }
}
