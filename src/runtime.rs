//! Carries out the effects returned by the reducer.
//!
//! Blocking filesystem work runs on tokio's blocking pool inside abortable
//! tasks; global searches run on the searcher's own worker threads. Every
//! completion re-enters the event queue as an `Action`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::action::{Action, Effect};
use crate::app::loader::LoadToken;
use crate::config::AppConfig;
use crate::event::Event;
use crate::fs::preview::{build_preview, Highlighter, PreviewOptions};
use crate::fs::reader::read_listing;
use crate::fs::searcher::{SearchUpdate, Searcher};
use crate::fs::watcher::{FsWatcher, DEFAULT_DEBOUNCE_MS};

/// Effect executor owning every background task handle.
pub struct Runtime {
    tx: mpsc::UnboundedSender<Event>,
    directory_tasks: HashMap<LoadToken, JoinHandle<()>>,
    preview_timers: HashMap<LoadToken, JoinHandle<()>>,
    preview_tasks: HashMap<LoadToken, JoinHandle<()>>,
    highlighter: Option<Arc<Highlighter>>,
    preview_options: Arc<PreviewOptions>,
    watcher: Option<FsWatcher>,
    watcher_enabled: bool,
}

impl Runtime {
    pub fn new(
        tx: mpsc::UnboundedSender<Event>,
        preview_options: PreviewOptions,
        highlighter: Option<Highlighter>,
        watcher_enabled: bool,
    ) -> Self {
        Self {
            tx,
            directory_tasks: HashMap::new(),
            preview_timers: HashMap::new(),
            preview_tasks: HashMap::new(),
            highlighter: highlighter.map(Arc::new),
            preview_options: Arc::new(preview_options),
            watcher: None,
            watcher_enabled,
        }
    }

    /// Build the runtime from resolved configuration. Loading syntect
    /// assets is skipped when highlighting or previews are disabled.
    pub fn from_config(tx: mpsc::UnboundedSender<Event>, config: &AppConfig) -> Self {
        let options = PreviewOptions {
            max_text_bytes: config.max_text_bytes(),
            max_lines: config.max_lines(),
            hex_bytes: config.hex_bytes(),
            ..PreviewOptions::default()
        };
        let highlighter = (config.preview_enabled() && config.highlight_enabled())
            .then(|| Highlighter::new(config.syntax_theme_name()));
        Self::new(tx, options, highlighter, config.watcher_enabled())
    }

    pub fn execute(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            self.apply(effect);
        }
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::LoadDirectory { token, path } => self.load_directory(token, path),
            Effect::CancelDirectory { token } => {
                if let Some(handle) = self.directory_tasks.remove(&token) {
                    debug!(%token, "aborting directory load");
                    handle.abort();
                }
            }
            Effect::SchedulePreview { token, delay } => self.schedule_preview(token, delay),
            Effect::CancelPreviewTimer { token } => {
                if let Some(handle) = self.preview_timers.remove(&token) {
                    handle.abort();
                }
            }
            Effect::LoadPreview {
                token,
                path,
                hide_hidden,
            } => self.load_preview(token, path, hide_hidden),
            Effect::CancelPreview { token } => {
                if let Some(handle) = self.preview_tasks.remove(&token) {
                    debug!(%token, "aborting preview load");
                    handle.abort();
                }
            }
            Effect::RunSearch {
                searcher,
                search_id,
                query,
                case_sensitive,
            } => self.run_search(&searcher, search_id, &query, case_sensitive),
            Effect::CancelSearch { searcher, discard } => {
                if discard {
                    searcher.shutdown();
                } else {
                    searcher.cancel();
                }
            }
            Effect::WatchDirectory(dir) => self.watch(dir),
            Effect::Quit => self.shutdown(),
        }
    }

    fn load_directory(&mut self, token: LoadToken, path: PathBuf) {
        self.directory_tasks.retain(|_, h| !h.is_finished());
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            let target = path.clone();
            let result = match tokio::task::spawn_blocking(move || read_listing(&target)).await {
                Ok(Ok(listing)) => Ok(listing),
                Ok(Err(e)) => Err(e.to_string()),
                Err(e) => Err(format!("directory reader failed: {e}")),
            };
            let _ = tx.send(Event::Action(Action::DirectoryLoaded {
                token,
                path,
                result,
            }));
        });
        self.directory_tasks.insert(token, handle);
    }

    fn schedule_preview(&mut self, token: LoadToken, delay: Duration) {
        self.preview_timers.retain(|_, h| !h.is_finished());
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Event::Action(Action::PreviewLoadStart { token }));
        });
        self.preview_timers.insert(token, handle);
    }

    fn load_preview(&mut self, token: LoadToken, path: PathBuf, hide_hidden: bool) {
        self.preview_tasks.retain(|_, h| !h.is_finished());
        let tx = self.tx.clone();
        let options = Arc::clone(&self.preview_options);
        let highlighter = self.highlighter.clone();
        let handle = tokio::spawn(async move {
            let target = path.clone();
            let built = tokio::task::spawn_blocking(move || {
                build_preview(&target, hide_hidden, &options, highlighter.as_deref())
            })
            .await;
            let result = match built {
                Ok(Ok(preview)) => Ok(preview),
                Ok(Err(e)) => Err(e.to_string()),
                Err(e) => Err(format!("preview builder failed: {e}")),
            };
            let _ = tx.send(Event::Action(Action::PreviewLoaded {
                token,
                path,
                result,
            }));
        });
        self.preview_tasks.insert(token, handle);
    }

    fn run_search(&self, searcher: &Searcher, search_id: u64, query: &str, case_sensitive: bool) {
        let tx = self.tx.clone();
        searcher.search_async(query, case_sensitive, move |update| {
            let action = match update {
                SearchUpdate::Batch(batch) => Action::SearchResults { search_id, batch },
                SearchUpdate::Progress(progress) => Action::SearchIndexProgress {
                    search_id,
                    progress,
                },
            };
            tx.send(Event::Action(action)).is_ok()
        });
    }

    fn watch(&mut self, dir: PathBuf) {
        if !self.watcher_enabled {
            return;
        }
        if self.watcher.is_none() {
            match FsWatcher::new(Duration::from_millis(DEFAULT_DEBOUNCE_MS), self.tx.clone()) {
                Ok(watcher) => self.watcher = Some(watcher),
                Err(e) => {
                    warn!(error = %e, "filesystem watcher unavailable, auto-refresh disabled");
                    self.watcher_enabled = false;
                    return;
                }
            }
        }
        if let Some(watcher) = self.watcher.as_mut() {
            if let Err(e) = watcher.watch(&dir) {
                warn!(path = %dir.display(), error = %e, "failed to watch directory");
            }
        }
    }

    /// Abort every outstanding task and drop the watcher.
    pub fn shutdown(&mut self) {
        for (_, handle) in self
            .directory_tasks
            .drain()
            .chain(self.preview_timers.drain())
            .chain(self.preview_tasks.drain())
        {
            handle.abort();
        }
        self.watcher = None;
    }
}
