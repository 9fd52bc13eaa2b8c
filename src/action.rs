//! Everything the reducer accepts, and everything it asks the runtime to do.

use std::path::PathBuf;
use std::time::Duration;

use crate::app::loader::LoadToken;
use crate::app::preview::PreviewScroll;
use crate::app::search::CursorMove;
use crate::fs::preview::{PreviewData, PreviewMeta};
use crate::fs::reader::DirListing;
use crate::fs::searcher::{IndexProgress, SearchBatch, Searcher};

/// Inputs to the reducer. User intents come from the key/mouse handler,
/// the rest from background work re-entering through the event queue.
#[derive(Debug, Clone)]
pub enum Action {
    // Navigation
    MoveUp,
    MoveDown,
    PageUp,
    PageDown,
    Top,
    Bottom,
    /// Move the selection by a signed number of rows (mouse wheel).
    ScrollLines(isize),
    /// Select the row at `row`, counted from the top of the list pane.
    MouseSelect {
        row: usize,
    },
    Enter,
    Parent,
    Home,
    HistoryBack,
    HistoryForward,

    // Inline filter
    FilterStart,
    FilterChar(char),
    FilterBackspace,
    FilterReset,
    FilterClear,

    // View
    Resize {
        width: u16,
        height: u16,
    },
    ToggleHidden,
    ToggleWrap,
    ToggleHelp,

    // Preview
    PreviewEnterFullscreen,
    PreviewExitFullscreen,
    PreviewScroll(PreviewScroll),

    // Global search
    GlobalSearchStart,
    SearchChar(char),
    SearchBackspace,
    SearchDelete,
    SearchDeleteWord,
    SearchMoveCursor(CursorMove),
    SearchNavigate(isize),
    SearchPage {
        down: bool,
    },
    SearchOpen,
    SearchClear,

    // Background results
    DirectoryLoaded {
        token: LoadToken,
        path: PathBuf,
        result: Result<DirListing, String>,
    },
    PreviewLoadStart {
        token: LoadToken,
    },
    PreviewLoaded {
        token: LoadToken,
        path: PathBuf,
        result: Result<(PreviewData, PreviewMeta), String>,
    },
    SearchIndexProgress {
        search_id: u64,
        progress: IndexProgress,
    },
    SearchResults {
        search_id: u64,
        batch: SearchBatch,
    },

    // Lifecycle
    Init,
    /// Periodic timer; expires status messages.
    Tick,
    Refresh,
    /// The watched directory changed on disk.
    DirectoryChanged(PathBuf),
    Quit,
}

/// Side effects requested by the reducer.
#[derive(Debug, Clone)]
pub enum Effect {
    LoadDirectory {
        token: LoadToken,
        path: PathBuf,
    },
    CancelDirectory {
        token: LoadToken,
    },
    /// Deliver `Action::PreviewLoadStart { token }` after `delay`.
    SchedulePreview {
        token: LoadToken,
        delay: Duration,
    },
    CancelPreviewTimer {
        token: LoadToken,
    },
    LoadPreview {
        token: LoadToken,
        path: PathBuf,
        hide_hidden: bool,
    },
    CancelPreview {
        token: LoadToken,
    },
    RunSearch {
        searcher: Searcher,
        search_id: u64,
        query: String,
        case_sensitive: bool,
    },
    /// Stop the searcher's running search; `discard` also shuts it down.
    CancelSearch {
        searcher: Searcher,
        discard: bool,
    },
    WatchDirectory(PathBuf),
    Quit,
}
