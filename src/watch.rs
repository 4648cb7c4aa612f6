//! File system watcher with per-path debouncing.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐  mpsc   ┌──────────────────────┐  settled path  ┌────────────┐
//! │  notify    │────────▶│      Debouncer       │───────────────▶│  callback  │
//! │  events    │         │ path → deadline map  │                │ (reparse)  │
//! └────────────┘         └──────────────────────┘                └────────────┘
//! ```
//!
//! Every event for a path pushes that path's deadline to `now + window`.
//! A path fires once its deadline passes without further events, so a burst
//! of saves triggers exactly one callback that sees the final file content.
//! Unrelated paths keep independent deadlines.

use crate::log;
use anyhow::{Context, Result};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use rustc_hash::FxHashMap;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use tokio::{
    sync::mpsc::{self, UnboundedReceiver},
    time::{self, Instant},
};

// =============================================================================
// Path Utilities
// =============================================================================

/// Check if path is a temp/backup file (editor artifacts).
pub fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

const fn is_relevant(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
    )
}

// =============================================================================
// Debounce State
// =============================================================================

/// Pending paths and the instant each one settles.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    pending: FxHashMap<PathBuf, Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: FxHashMap::default(),
        }
    }

    /// Record an event for `path`, restarting its window.
    ///
    /// Returns `false` for editor temp files, which are never scheduled.
    pub fn schedule(&mut self, path: PathBuf, now: Instant) -> bool {
        if is_temp_file(&path) {
            return false;
        }
        self.pending.insert(path, now + self.window);
        true
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().min().copied()
    }

    /// Remove and return every path whose deadline is at or before `now`,
    /// sorted.
    pub fn take_due(&mut self, now: Instant) -> Vec<PathBuf> {
        let mut due: Vec<PathBuf> = self
            .pending
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(path, _)| path.clone())
            .collect();
        for path in &due {
            self.pending.remove(path);
        }
        due.sort();
        due
    }

    /// Drop every pending deadline.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

// =============================================================================
// Event Loop
// =============================================================================

/// Drive `on_settled` from a stream of changed paths.
///
/// Runs until the sender side is dropped (pending deadlines are discarded)
/// or the callback returns an error.
pub async fn debounce_loop<F>(
    mut events: UnboundedReceiver<PathBuf>,
    window: Duration,
    mut on_settled: F,
) -> Result<()>
where
    F: FnMut(&Path) -> Result<()>,
{
    let mut debouncer = Debouncer::new(window);

    loop {
        let next_deadline = debouncer.next_deadline();
        tokio::select! {
            event = events.recv() => match event {
                Some(path) => {
                    debouncer.schedule(path, Instant::now());
                }
                None => {
                    debouncer.clear();
                    break;
                }
            },
            () = async {
                if let Some(deadline) = next_deadline {
                    time::sleep_until(deadline).await;
                }
            }, if next_deadline.is_some() => {
                for path in debouncer.take_due(Instant::now()) {
                    on_settled(&path)?;
                }
            }
        }
    }

    Ok(())
}

/// Watch `dirs` recursively and call `on_settled` once per path after it has
/// been quiet for `window`.
pub async fn watch_debounced<F>(dirs: &[PathBuf], window: Duration, on_settled: F) -> Result<()>
where
    F: FnMut(&Path) -> Result<()>,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) if is_relevant(&event) => {
            for path in event.paths {
                tx.send(path).ok();
            }
        }
        Ok(_) => {}
        Err(e) => log!("watch"; "error: {e}"),
    })
    .context("Failed to create file watcher")?;

    for dir in dirs {
        watcher
            .watch(dir, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {}", dir.display()))?;
    }
    let shown: Vec<_> = dirs.iter().map(|d| d.display().to_string()).collect();
    log!("watch"; "watching {} (debounce {:?})", shown.join(", "), window);

    debounce_loop(rx, window, on_settled).await
}

// =============================================================================
// Tests
// =============================================================================
