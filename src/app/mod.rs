pub mod filter;
pub mod history;
pub mod loader;
pub mod overlay;
pub mod preview;
pub mod search;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::config::{AppConfig, DEFAULT_PREVIEW_DEBOUNCE_MS};
use crate::fs::reader::FileEntry;
use crate::fs::searcher::SearchOptions;
use crate::fuzzy::Matcher;

use filter::FilterState;
use history::History;
use loader::LoadSlot;
use preview::PreviewState;
use search::GlobalSearchState;

/// Rows not available to the file list: header, status bar and the two
/// list borders.
pub const FIXED_CHROME_ROWS: usize = 4;

/// How a directory load was triggered. Decides how history is repaired if
/// the load fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKind {
    /// First load at startup.
    Init,
    /// New navigation recorded in history.
    Push,
    Back,
    Forward,
    /// Re-read of the current directory.
    Reload,
}

/// Work to run after a directory's load is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostLoad {
    /// Select the entry at this base index, clamped.
    RestoreSelection(usize),
    /// Select the entry with this path, else the base index `fallback`.
    SelectPath { path: PathBuf, fallback: usize },
    /// Refresh the preview for the new selection.
    RequestPreview,
}

/// Tunables derived from configuration.
#[derive(Debug, Clone)]
pub struct StateOptions {
    pub preview_enabled: bool,
    pub preview_debounce: Duration,
    pub line_wrap: bool,
    pub search: SearchOptions,
}

impl Default for StateOptions {
    fn default() -> Self {
        Self {
            preview_enabled: true,
            preview_debounce: Duration::from_millis(DEFAULT_PREVIEW_DEBOUNCE_MS),
            line_wrap: false,
            search: SearchOptions::default(),
        }
    }
}

impl StateOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            preview_enabled: config.preview_enabled(),
            preview_debounce: config.preview_debounce(),
            line_wrap: config.line_wrap(),
            search: SearchOptions {
                max_results: config.max_search_results(),
                batch_interval: config.search_batch_interval(),
            },
        }
    }
}

/// The browser's whole state. Only the reducer mutates it.
pub struct AppState {
    pub current_path: PathBuf,
    /// Current directory snapshot, replaced wholesale on every load.
    pub files: Vec<FileEntry>,
    pub parent_entries: Vec<FileEntry>,
    /// Base index into `files`.
    pub selected_index: Option<usize>,
    /// First visible row, in display space.
    pub scroll_offset: usize,
    pub screen_width: u16,
    pub screen_height: u16,
    pub hide_hidden: bool,
    pub filter: FilterState,
    pub history: History,
    /// Last selected base index per visited directory.
    pub selection_history: HashMap<PathBuf, usize>,
    pub dir_loader: LoadSlot<NavKind, PostLoad>,
    pub preview: PreviewState,
    pub search: GlobalSearchState,
    pub last_error: Option<String>,
    pub status_message: Option<(String, Instant)>,
    pub help_visible: bool,
    pub should_quit: bool,
    pub options: StateOptions,
    pub(crate) matcher: Matcher,
    /// Base indices of the displayed entries, in display order.
    display: Vec<usize>,
}

impl AppState {
    /// Create an empty state at `path`. Nothing is read until `Init`.
    pub fn new(path: &Path, hide_hidden: bool, options: StateOptions) -> Self {
        Self {
            current_path: path.to_path_buf(),
            files: Vec::new(),
            parent_entries: Vec::new(),
            selected_index: None,
            scroll_offset: 0,
            screen_width: 80,
            screen_height: 24,
            hide_hidden,
            filter: FilterState::default(),
            history: History::new(path),
            selection_history: HashMap::new(),
            dir_loader: LoadSlot::new(),
            preview: PreviewState::new(options.line_wrap),
            search: GlobalSearchState::new(path),
            last_error: None,
            status_message: None,
            help_visible: false,
            should_quit: false,
            options,
            matcher: Matcher::new(),
            display: Vec::new(),
        }
    }

    pub fn selected_entry(&self) -> Option<&FileEntry> {
        self.selected_index.and_then(|i| self.files.get(i))
    }

    pub fn selected_path(&self) -> Option<PathBuf> {
        self.selected_entry().map(|e| e.path.clone())
    }

    /// Base index of the entry with `path`.
    pub fn index_of(&self, path: &Path) -> Option<usize> {
        self.files.iter().position(|e| e.path == path)
    }

    /// Replace the directory snapshot and rebuild everything derived from it.
    pub fn set_files(&mut self, files: Vec<FileEntry>) {
        self.files = files;
        self.selected_index = self.selected_index.filter(|&i| i < self.files.len());
        self.refresh_folded_names();
        if self.filter.active {
            self.recompute_filter();
        }
        self.invalidate_overlay();
    }

    /// Set a status message with current timestamp.
    pub fn set_status_message(&mut self, msg: String) {
        self.status_message = Some((msg, Instant::now()));
    }

    /// Clear the status message if it has been displayed for more than 3 seconds.
    pub fn clear_expired_status(&mut self) {
        if let Some((_, ref created)) = self.status_message {
            if created.elapsed().as_secs() > 3 {
                self.status_message = None;
            }
        }
    }
}
