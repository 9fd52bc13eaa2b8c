//! Preview pane state: debounced loading, per-path cache and scroll memory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tracing::debug;

use crate::action::Effect;
use crate::fs::preview::{PreviewData, PreviewMeta};

use super::loader::{LoadSlot, LoadToken};
use super::AppState;

/// A built preview together with the file state it was built from.
#[derive(Debug, Clone)]
pub struct CachedPreview {
    pub size: u64,
    pub modified: Option<SystemTime>,
    pub is_dir: bool,
    pub data: Arc<PreviewData>,
}

/// Preview scroll motions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewScroll {
    LineUp,
    LineDown,
    PageUp,
    PageDown,
    Top,
    Bottom,
}

/// Per-request preview metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewRequest {
    /// Made for a different file than the one shown.
    pub reset_scroll: bool,
    /// Hidden-entry visibility the listing must be built with.
    pub hide_hidden: bool,
}

#[derive(Debug)]
pub struct PreviewState {
    pub data: Option<Arc<PreviewData>>,
    pub path: Option<PathBuf>,
    pub scroll: usize,
    pub fullscreen: bool,
    pub wrap: bool,
    pub loader: LoadSlot<PreviewRequest, ()>,
    cache: HashMap<PathBuf, CachedPreview>,
    scroll_memory: HashMap<PathBuf, usize>,
}

impl PreviewState {
    pub fn new(wrap: bool) -> Self {
        Self {
            data: None,
            path: None,
            scroll: 0,
            fullscreen: false,
            wrap,
            loader: LoadSlot::new(),
            cache: HashMap::new(),
            scroll_memory: HashMap::new(),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loader.is_loading()
    }

    /// Cached preview for `path` if it was built from the same size and
    /// modification time.
    pub fn cached(&self, path: &Path, size: u64, modified: Option<SystemTime>) -> Option<Arc<PreviewData>> {
        self.cache
            .get(path)
            .filter(|c| c.size == size && c.modified == modified)
            .map(|c| Arc::clone(&c.data))
    }

    pub fn store(&mut self, path: &Path, meta: PreviewMeta, data: Arc<PreviewData>) {
        self.cache.insert(
            path.to_path_buf(),
            CachedPreview {
                size: meta.size,
                modified: meta.modified,
                is_dir: meta.is_dir,
                data,
            },
        );
    }

    /// Directory listings depend on hidden-entry visibility.
    pub fn evict_directories(&mut self) {
        self.cache.retain(|_, c| !c.is_dir);
    }

    pub fn remembered_scroll(&self, path: &Path) -> Option<usize> {
        self.scroll_memory.get(path).copied()
    }

    fn clear(&mut self) {
        self.remember_scroll();
        self.data = None;
        self.path = None;
        self.scroll = 0;
        self.fullscreen = false;
    }

    fn remember_scroll(&mut self) {
        if let Some(path) = &self.path {
            self.scroll_memory.insert(path.clone(), self.scroll);
        }
    }
}

impl AppState {
    /// Schedule a debounced preview for the current selection, replacing any
    /// request that has not fired yet.
    pub fn request_preview(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if !self.options.preview_enabled {
            return effects;
        }

        let Some(target) = self.selected_path() else {
            let cancelled = self.preview.loader.cancel();
            if let Some(token) = cancelled.pending {
                effects.push(Effect::CancelPreviewTimer { token });
            }
            if let Some(token) = cancelled.in_flight {
                effects.push(Effect::CancelPreview { token });
            }
            self.preview.clear();
            return effects;
        };

        let hide_hidden = self.hide_hidden;
        let leaving = self
            .preview
            .loader
            .in_flight()
            .is_some_and(|r| r.path != target || r.meta.hide_hidden != hide_hidden);
        if leaving {
            if let Some(token) = self.preview.loader.cancel_in_flight() {
                effects.push(Effect::CancelPreview { token });
            }
        }

        let reset_scroll = self.preview.path.as_deref() != Some(target.as_path());
        let (token, replaced) = self.preview.loader.schedule(
            &target,
            PreviewRequest {
                reset_scroll,
                hide_hidden,
            },
        );
        if let Some(old) = replaced {
            effects.push(Effect::CancelPreviewTimer { token: old });
        }
        effects.push(Effect::SchedulePreview {
            token,
            delay: self.options.preview_debounce,
        });
        effects
    }

    /// The debounce timer for `token` fired.
    pub fn preview_load_start(&mut self, token: LoadToken) -> Vec<Effect> {
        let Some(mut request) = self.preview.loader.take_pending(token) else {
            debug!(%token, "dropping superseded preview timer");
            return Vec::new();
        };

        let fresh = self
            .files
            .iter()
            .find(|e| e.path == request.path)
            .and_then(|e| self.preview.cached(&request.path, e.size, e.modified));
        if let Some(data) = fresh {
            self.apply_preview(&request.path, data, request.meta.reset_scroll);
            request.meta.reset_scroll = false;
        }

        let duplicate = self
            .preview
            .loader
            .in_flight()
            .is_some_and(|r| {
                r.path == request.path && r.meta.hide_hidden == request.meta.hide_hidden
            });
        if duplicate {
            return Vec::new();
        }

        let path = request.path.clone();
        let hide_hidden = request.meta.hide_hidden;
        let mut effects = Vec::new();
        if let Some(old) = self.preview.loader.begin(request) {
            effects.push(Effect::CancelPreview { token: old });
        }
        effects.push(Effect::LoadPreview {
            token,
            path,
            hide_hidden,
        });
        effects
    }

    /// A preview build finished.
    pub fn preview_loaded(
        &mut self,
        token: LoadToken,
        result: std::result::Result<(PreviewData, PreviewMeta), String>,
    ) {
        let Some((request, _)) = self.preview.loader.complete(token) else {
            debug!(%token, "dropping stale preview result");
            return;
        };
        match result {
            Ok((data, meta)) => {
                if meta.is_dir && request.meta.hide_hidden != self.hide_hidden {
                    debug!(path = %request.path.display(), "dropping outdated directory preview");
                    return;
                }
                let data = Arc::new(data);
                self.preview.store(&request.path, meta, Arc::clone(&data));
                if self.selected_path().as_deref() == Some(request.path.as_path()) {
                    self.apply_preview(&request.path, data, request.meta.reset_scroll);
                }
            }
            Err(e) => {
                debug!(path = %request.path.display(), error = %e, "preview failed");
                self.preview.clear();
            }
        }
    }

    fn apply_preview(&mut self, path: &Path, data: Arc<PreviewData>, reset_scroll: bool) {
        let new_file = self.preview.path.as_deref() != Some(path);
        if new_file || reset_scroll {
            self.preview.remember_scroll();
            self.preview.scroll = self.preview.remembered_scroll(path).unwrap_or(0);
            if new_file {
                self.preview.fullscreen = false;
            }
        }
        self.preview.path = Some(path.to_path_buf());
        self.preview.data = Some(data);
        self.preview.scroll = self.preview.scroll.min(self.preview_max_scroll());
    }

    pub fn preview_max_scroll(&self) -> usize {
        self.preview
            .data
            .as_ref()
            .map(|d| d.line_count().saturating_sub(self.visible_lines()))
            .unwrap_or(0)
    }

    pub fn scroll_preview(&mut self, motion: PreviewScroll) {
        let page = self.visible_lines();
        let max = self.preview_max_scroll();
        let scroll = self.preview.scroll;
        self.preview.scroll = match motion {
            PreviewScroll::LineUp => scroll.saturating_sub(1),
            PreviewScroll::LineDown => (scroll + 1).min(max),
            PreviewScroll::PageUp => scroll.saturating_sub(page),
            PreviewScroll::PageDown => (scroll + page).min(max),
            PreviewScroll::Top => 0,
            PreviewScroll::Bottom => max,
        };
    }

    pub fn enter_preview_fullscreen(&mut self) {
        if self.preview.data.is_some() {
            self.preview.fullscreen = true;
        }
    }

    pub fn exit_preview_fullscreen(&mut self) {
        self.preview.fullscreen = false;
    }

    pub fn toggle_wrap(&mut self) {
        self.preview.wrap = !self.preview.wrap;
    }
}
