use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_mini::{new_debouncer, DebouncedEvent, DebouncedEventKind, Debouncer};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::action::Action;
use crate::event::Event;

/// Default debounce interval in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Watches the directory being browsed (non-recursively) and reports
/// changes as `Action::DirectoryChanged`.
pub struct FsWatcher {
    debouncer: Debouncer<RecommendedWatcher>,
    /// Directory currently watched, shared with the debouncer callback.
    watched: Arc<Mutex<Option<PathBuf>>>,
}

impl FsWatcher {
    /// Create a watcher with nothing watched yet.
    pub fn new(debounce_duration: Duration, event_tx: mpsc::UnboundedSender<Event>) -> notify::Result<Self> {
        let watched: Arc<Mutex<Option<PathBuf>>> = Arc::new(Mutex::new(None));
        let watched_cb = Arc::clone(&watched);

        let debouncer = new_debouncer(
            debounce_duration,
            move |result: Result<Vec<DebouncedEvent>, notify::Error>| {
                let events = match result {
                    Ok(events) => events,
                    Err(e) => {
                        // Watcher errors are non-fatal.
                        debug!(error = %e, "watcher error");
                        return;
                    }
                };
                let Some(dir) = watched_cb.lock().ok().and_then(|w| w.clone()) else {
                    return;
                };
                let paths: Vec<PathBuf> = events
                    .iter()
                    .filter(|e| e.kind == DebouncedEventKind::Any)
                    .map(|e| e.path.clone())
                    .collect();
                if touches_directory(&paths, &dir) {
                    let _ = event_tx.send(Event::Action(Action::DirectoryChanged(dir)));
                }
            },
        )?;

        Ok(Self { debouncer, watched })
    }

    /// Watch `dir` instead of whatever was watched before.
    pub fn watch(&mut self, dir: &Path) -> notify::Result<()> {
        let previous = match self.watched.lock() {
            Ok(mut watched) => watched.take(),
            Err(_) => None,
        };
        if let Some(previous) = previous {
            if previous == dir {
                self.set_watched(Some(previous));
                return Ok(());
            }
            if let Err(e) = self.debouncer.watcher().unwatch(&previous) {
                warn!(path = %previous.display(), error = %e, "failed to unwatch directory");
            }
        }
        self.debouncer
            .watcher()
            .watch(dir, RecursiveMode::NonRecursive)?;
        self.set_watched(Some(dir.to_path_buf()));
        debug!(path = %dir.display(), "watching directory");
        Ok(())
    }

    fn set_watched(&self, dir: Option<PathBuf>) {
        if let Ok(mut watched) = self.watched.lock() {
            *watched = dir;
        }
    }
}

/// Whether any of `paths` is `dir` itself or a direct child of it.
pub fn touches_directory(paths: &[PathBuf], dir: &Path) -> bool {
    paths
        .iter()
        .any(|p| p == dir || p.parent() == Some(dir))
}
