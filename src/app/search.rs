//! Global (recursive) search overlay state and its coordination with the
//! background searcher.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::action::Effect;
use crate::fs::searcher::{sort_hits, IndexProgress, SearchBatch, SearchHit, Searcher};
use crate::fuzzy::{prepare_tokens, triggers_case_sensitivity};

use super::AppState;

/// Rows of the search overlay not used by results: two borders, the input
/// line and the separator under it.
pub const SEARCH_CHROME_ROWS: usize = 4;

/// Height of the search overlay for a terminal of `screen_height` rows.
pub fn overlay_height(screen_height: u16) -> u16 {
    (screen_height.saturating_mul(4) / 5).max(SEARCH_CHROME_ROWS as u16 + 1)
}

/// Result rows visible in the search overlay.
pub fn result_rows(screen_height: u16) -> usize {
    (overlay_height(screen_height) as usize)
        .saturating_sub(SEARCH_CHROME_ROWS)
        .max(1)
}

/// Where the current search stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchPhase {
    #[default]
    Idle,
    /// The index is still being built; results are partial.
    Index,
    /// The index is complete and results are being merged.
    Merging,
    Complete,
}

impl SearchPhase {
    pub fn of(batch: &SearchBatch) -> Self {
        match (batch.in_progress, batch.is_done) {
            (true, false) => SearchPhase::Index,
            (true, true) => SearchPhase::Merging,
            (false, _) => SearchPhase::Complete,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SearchPhase::Idle => "",
            SearchPhase::Index => "indexing",
            SearchPhase::Merging => "merging",
            SearchPhase::Complete => "done",
        }
    }
}

/// Query remembered when the overlay closes, restored when it is reopened
/// on the same root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastQuery {
    pub root: PathBuf,
    pub query: String,
    pub selected_path: Option<PathBuf>,
    pub selected_index: usize,
}

/// Cursor motions inside the query input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMove {
    Left,
    Right,
    Home,
    End,
}

#[derive(Debug)]
pub struct GlobalSearchState {
    pub active: bool,
    pub query: String,
    /// Byte offset into `query`, always on a char boundary.
    pub cursor: usize,
    pub case_sensitive: bool,
    pub results: Vec<SearchHit>,
    pub selected: usize,
    pub scroll: usize,
    /// Bumped on every edit and on close; batches tagged with an older id
    /// are dropped.
    pub search_id: u64,
    pub searcher: Option<Searcher>,
    pub root: PathBuf,
    /// Result to select as soon as it shows up in a batch.
    pub desired_path: Option<PathBuf>,
    /// Result position to select once enough results have arrived.
    pub pending_index: Option<usize>,
    pub phase: SearchPhase,
    pub progress: IndexProgress,
    pub last_query: Option<LastQuery>,
    /// Query and case of the results currently held, for local narrowing.
    results_query: Option<(String, bool)>,
}

impl GlobalSearchState {
    pub fn new(root: &Path) -> Self {
        Self {
            active: false,
            query: String::new(),
            cursor: 0,
            case_sensitive: false,
            results: Vec::new(),
            selected: 0,
            scroll: 0,
            search_id: 0,
            searcher: None,
            root: root.to_path_buf(),
            desired_path: None,
            pending_index: None,
            phase: SearchPhase::Idle,
            progress: IndexProgress::default(),
            last_query: None,
            results_query: None,
        }
    }

    pub fn selected_hit(&self) -> Option<&SearchHit> {
        self.results.get(self.selected)
    }

    /// Re-acquire the selection after `results` changed.
    fn reacquire_selection(&mut self) {
        if let Some(desired) = &self.desired_path {
            if let Some(i) = self.results.iter().position(|h| &h.path == desired) {
                self.selected = i;
                self.desired_path = None;
                self.pending_index = None;
                return;
            }
        } else if let Some(pending) = self.pending_index {
            if pending < self.results.len() {
                self.selected = pending;
                self.pending_index = None;
                return;
            }
        }
        self.selected = self.selected.min(self.results.len().saturating_sub(1));
    }

    /// Settle selection targets once no more batches will come.
    fn finish_targets(&mut self) {
        if self.desired_path.is_some() {
            if let Some(pending) = self.pending_index {
                if pending < self.results.len() {
                    self.selected = pending;
                }
            }
        }
        self.desired_path = None;
        self.pending_index = None;
    }

    fn keep_selected_visible(&mut self, rows: usize) {
        if self.selected < self.scroll {
            self.scroll = self.selected;
        } else if self.selected >= self.scroll + rows {
            self.scroll = self.selected + 1 - rows;
        }
        self.scroll = self.scroll.min(self.results.len().saturating_sub(rows));
    }

    fn prev_boundary(&self) -> usize {
        self.query[..self.cursor]
            .char_indices()
            .next_back()
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    fn next_boundary(&self) -> usize {
        self.query[self.cursor..]
            .chars()
            .next()
            .map(|c| self.cursor + c.len_utf8())
            .unwrap_or(self.cursor)
    }
}

impl AppState {
    fn search_rows(&self) -> usize {
        result_rows(self.screen_height)
    }

    /// Open the overlay rooted at the current directory, restoring the last
    /// query if it was made on the same root.
    pub fn global_search_start(&mut self) -> Vec<Effect> {
        if self.search.active {
            return Vec::new();
        }
        let search = &mut self.search;
        search.active = true;
        search.root = self.current_path.clone();
        search.query.clear();
        search.cursor = 0;
        search.case_sensitive = false;
        search.results.clear();
        search.results_query = None;
        search.selected = 0;
        search.scroll = 0;
        search.phase = SearchPhase::Idle;
        search.desired_path = None;
        search.pending_index = None;

        let restored = search
            .last_query
            .as_ref()
            .filter(|last| last.root == search.root && !last.query.is_empty())
            .cloned();
        match restored {
            Some(last) => {
                search.case_sensitive = last.query.chars().any(triggers_case_sensitivity);
                search.cursor = last.query.len();
                search.query = last.query;
                search.desired_path = last.selected_path;
                search.pending_index = Some(last.selected_index);
                self.on_search_query_edited()
            }
            None => Vec::new(),
        }
    }

    pub fn search_insert_char(&mut self, c: char) -> Vec<Effect> {
        if !self.search.active {
            return Vec::new();
        }
        if triggers_case_sensitivity(c) {
            self.search.case_sensitive = true;
        }
        let cursor = self.search.cursor;
        self.search.query.insert(cursor, c);
        self.search.cursor += c.len_utf8();
        self.on_search_query_edited()
    }

    pub fn search_backspace(&mut self) -> Vec<Effect> {
        if !self.search.active || self.search.cursor == 0 {
            return Vec::new();
        }
        let start = self.search.prev_boundary();
        self.search.query.replace_range(start..self.search.cursor, "");
        self.search.cursor = start;
        self.on_search_query_edited()
    }

    pub fn search_delete(&mut self) -> Vec<Effect> {
        if !self.search.active || self.search.cursor >= self.search.query.len() {
            return Vec::new();
        }
        let end = self.search.next_boundary();
        self.search.query.replace_range(self.search.cursor..end, "");
        self.on_search_query_edited()
    }

    /// Delete the word before the cursor, along with the whitespace between.
    pub fn search_delete_word(&mut self) -> Vec<Effect> {
        if !self.search.active || self.search.cursor == 0 {
            return Vec::new();
        }
        let head = &self.search.query[..self.search.cursor];
        let trimmed = head.trim_end();
        let start = trimmed
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_whitespace())
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        self.search.query.replace_range(start..self.search.cursor, "");
        self.search.cursor = start;
        self.on_search_query_edited()
    }

    pub fn search_move_cursor(&mut self, motion: CursorMove) {
        let search = &mut self.search;
        search.cursor = match motion {
            CursorMove::Left => search.prev_boundary(),
            CursorMove::Right => search.next_boundary(),
            CursorMove::Home => 0,
            CursorMove::End => search.query.len(),
        };
    }

    /// Move the result selection by `delta`, clamped.
    pub fn search_navigate(&mut self, delta: isize) {
        let len = self.search.results.len();
        if len == 0 {
            return;
        }
        let target = (self.search.selected as isize + delta).clamp(0, len as isize - 1);
        self.search.selected = target as usize;
        // The user took over; stop chasing restored targets.
        self.search.desired_path = None;
        self.search.pending_index = None;
        let rows = self.search_rows();
        self.search.keep_selected_visible(rows);
    }

    /// Re-clamp the result viewport, e.g. after a resize.
    pub fn clamp_search_scroll(&mut self) {
        let rows = self.search_rows();
        self.search.keep_selected_visible(rows);
    }

    pub fn search_page(&mut self, down: bool) {
        let rows = self.search_rows() as isize;
        self.search_navigate(if down { rows } else { -rows });
    }

    /// Close the overlay, remembering the query for this root.
    pub fn search_close(&mut self) -> Vec<Effect> {
        let search = &mut self.search;
        if !search.query.trim().is_empty() {
            search.last_query = Some(LastQuery {
                root: search.root.clone(),
                query: search.query.clone(),
                selected_path: search.selected_hit().map(|h| h.path.clone()),
                selected_index: search.selected,
            });
        }
        search.active = false;
        search.search_id += 1;
        search.results.clear();
        search.results_query = None;
        search.selected = 0;
        search.scroll = 0;
        search.phase = SearchPhase::Idle;
        search.desired_path = None;
        search.pending_index = None;
        match search.searcher.take() {
            Some(searcher) => vec![Effect::CancelSearch {
                searcher,
                discard: true,
            }],
            None => Vec::new(),
        }
    }

    /// Apply a result batch from the background searcher.
    pub fn search_results(&mut self, search_id: u64, batch: SearchBatch) {
        if !self.search.active || search_id != self.search.search_id {
            debug!(search_id, current = self.search.search_id, "dropping stale search batch");
            return;
        }
        let phase = SearchPhase::of(&batch);
        self.search.results = batch.results;
        self.search.phase = phase;
        self.search.reacquire_selection();
        if phase == SearchPhase::Complete {
            self.search.finish_targets();
            self.search.results_query =
                Some((self.search.query.trim().to_string(), self.search.case_sensitive));
        }
        let rows = self.search_rows();
        self.search.keep_selected_visible(rows);
    }

    pub fn search_progress(&mut self, search_id: u64, progress: IndexProgress) {
        if search_id == self.search.search_id {
            self.search.progress = progress;
        }
    }

    fn on_search_query_edited(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.search.search_id += 1;
        if self.search.query.is_empty() {
            self.search.case_sensitive = false;
        }

        let query = self.search.query.trim().to_string();
        let case_sensitive = self.search.case_sensitive;
        if query.is_empty() {
            self.search.results.clear();
            self.search.results_query = None;
            self.search.selected = 0;
            self.search.scroll = 0;
            self.search.phase = SearchPhase::Idle;
            if let Some(searcher) = &self.search.searcher {
                effects.push(Effect::CancelSearch {
                    searcher: searcher.clone(),
                    discard: false,
                });
            }
            return effects;
        }

        let reusable = self
            .search
            .searcher
            .as_ref()
            .is_some_and(|s| s.serves(&self.search.root, self.hide_hidden));
        if !reusable {
            if let Some(old) = self.search.searcher.take() {
                effects.push(Effect::CancelSearch {
                    searcher: old,
                    discard: true,
                });
            }
            self.search.searcher = Some(Searcher::new(
                &self.search.root,
                self.hide_hidden,
                self.options.search.clone(),
            ));
            // Results from another index cannot be narrowed.
            self.search.results_query = None;
        }
        let Some(searcher) = self.search.searcher.clone() else {
            return effects;
        };

        if let Some(hits) = searcher.cached_results(&query, case_sensitive) {
            searcher.cancel();
            self.search.results = hits;
            self.search.phase = SearchPhase::Complete;
            self.search.reacquire_selection();
            self.search.finish_targets();
            self.search.results_query = Some((query, case_sensitive));
            let rows = self.search_rows();
            self.search.keep_selected_visible(rows);
            return effects;
        }

        self.narrow_results_locally(&query, case_sensitive);

        effects.push(Effect::RunSearch {
            searcher,
            search_id: self.search.search_id,
            query,
            case_sensitive,
        });
        effects
    }

    /// Narrow the held results when `query` only extends the query they
    /// were produced for.
    fn narrow_results_locally(&mut self, query: &str, case_sensitive: bool) {
        let extends = self
            .search
            .results_query
            .as_ref()
            .is_some_and(|(prev, prev_case)| {
                *prev_case == case_sensitive && query.len() > prev.len() && query.starts_with(prev.as_str())
            });
        if !extends {
            return;
        }
        let tokens = prepare_tokens(query, case_sensitive);
        let matcher = &self.matcher;
        let mut narrowed: Vec<SearchHit> = self
            .search
            .results
            .iter()
            .filter_map(|hit| {
                let target = if case_sensitive {
                    hit.relative.clone()
                } else {
                    hit.relative.to_lowercase()
                };
                matcher.score_tokens(&tokens, &target).map(|score| SearchHit {
                    score,
                    ..hit.clone()
                })
            })
            .collect();
        sort_hits(&mut narrowed);
        self.search.results = narrowed;
        self.search.results_query = Some((query.to_string(), case_sensitive));
        self.search.reacquire_selection();
        let rows = self.search_rows();
        self.search.keep_selected_visible(rows);
    }
}
