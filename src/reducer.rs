//! The single state-transition function.
//!
//! `reduce` applies one `Action` to the `AppState` and returns the effects
//! the runtime must carry out. It never blocks and never performs I/O;
//! background results come back as further actions.

use std::path::{Path, PathBuf};

use tracing::{debug, info, trace, warn};

use crate::action::{Action, Effect};
use crate::app::loader::LoadToken;
use crate::app::{AppState, NavKind, PostLoad};
use crate::error::{AppError, Result};
use crate::fs::reader::DirListing;

/// Whether an action owes a preview refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Owed {
    No,
    /// Only if the selected entry changed.
    IfMoved,
    Always,
}

/// Apply `action` to `state`.
///
/// Recoverable failures are recorded on the state. The only error returned
/// is an unresolvable home directory.
pub fn reduce(state: &mut AppState, action: Action) -> Result<Vec<Effect>> {
    let before = state.selected_path();

    let (mut effects, owed) = match action {
        Action::MoveUp => (move_selection(state, -1), Owed::IfMoved),
        Action::MoveDown => (move_selection(state, 1), Owed::IfMoved),
        Action::PageUp => {
            let page = state.visible_lines() as isize;
            (move_selection(state, -page), Owed::IfMoved)
        }
        Action::PageDown => {
            let page = state.visible_lines() as isize;
            (move_selection(state, page), Owed::IfMoved)
        }
        Action::Top => (select_display(state, 0), Owed::IfMoved),
        Action::Bottom => {
            let last = state.display_len().saturating_sub(1);
            (select_display(state, last), Owed::IfMoved)
        }
        Action::ScrollLines(delta) => (move_selection(state, delta), Owed::IfMoved),
        Action::MouseSelect { row } => {
            let target = state.scroll_offset + row;
            if target < state.display_len() {
                (select_display(state, target), Owed::IfMoved)
            } else {
                (Vec::new(), Owed::No)
            }
        }
        Action::Enter => enter(state),
        Action::Parent => (parent(state), Owed::No),
        Action::Home => (go_home(state, dirs::home_dir())?, Owed::No),
        Action::HistoryBack => (history_step(state, NavKind::Back), Owed::No),
        Action::HistoryForward => (history_step(state, NavKind::Forward), Owed::No),

        Action::FilterStart => {
            state.filter_start();
            (Vec::new(), Owed::IfMoved)
        }
        Action::FilterChar(c) => {
            state.filter_char(c);
            (Vec::new(), Owed::IfMoved)
        }
        Action::FilterBackspace => {
            state.filter_backspace();
            (Vec::new(), Owed::IfMoved)
        }
        Action::FilterReset => {
            state.filter_reset();
            (Vec::new(), Owed::IfMoved)
        }
        Action::FilterClear => {
            state.filter_clear();
            (Vec::new(), Owed::IfMoved)
        }

        Action::Resize { width, height } => {
            state.screen_width = width;
            state.screen_height = height;
            state.update_scroll_visibility();
            state.clamp_search_scroll();
            let max = state.preview_max_scroll();
            state.preview.scroll = state.preview.scroll.min(max);
            (Vec::new(), Owed::No)
        }
        Action::ToggleHidden => {
            toggle_hidden(state);
            (Vec::new(), Owed::Always)
        }
        Action::ToggleWrap => {
            state.toggle_wrap();
            let msg = if state.preview.wrap { "Line wrap on" } else { "Line wrap off" };
            state.set_status_message(msg.to_string());
            (Vec::new(), Owed::No)
        }
        Action::ToggleHelp => {
            state.help_visible = !state.help_visible;
            (Vec::new(), Owed::No)
        }

        Action::PreviewEnterFullscreen => {
            state.enter_preview_fullscreen();
            (Vec::new(), Owed::No)
        }
        Action::PreviewExitFullscreen => {
            state.exit_preview_fullscreen();
            (Vec::new(), Owed::No)
        }
        Action::PreviewScroll(motion) => {
            state.scroll_preview(motion);
            (Vec::new(), Owed::No)
        }

        Action::GlobalSearchStart => (state.global_search_start(), Owed::No),
        Action::SearchChar(c) => (state.search_insert_char(c), Owed::No),
        Action::SearchBackspace => (state.search_backspace(), Owed::No),
        Action::SearchDelete => (state.search_delete(), Owed::No),
        Action::SearchDeleteWord => (state.search_delete_word(), Owed::No),
        Action::SearchMoveCursor(motion) => {
            state.search_move_cursor(motion);
            (Vec::new(), Owed::No)
        }
        Action::SearchNavigate(delta) => {
            state.search_navigate(delta);
            (Vec::new(), Owed::No)
        }
        Action::SearchPage { down } => {
            state.search_page(down);
            (Vec::new(), Owed::No)
        }
        Action::SearchOpen => search_open(state),
        Action::SearchClear => (state.search_close(), Owed::No),

        Action::DirectoryLoaded {
            token,
            path,
            result,
        } => (directory_loaded(state, token, &path, result), Owed::No),
        Action::PreviewLoadStart { token } => (state.preview_load_start(token), Owed::No),
        Action::PreviewLoaded {
            token,
            path,
            result,
        } => {
            trace!(%token, path = %path.display(), ok = result.is_ok(), "preview result");
            state.preview_loaded(token, result);
            (Vec::new(), Owed::No)
        }
        Action::SearchIndexProgress {
            search_id,
            progress,
        } => {
            state.search_progress(search_id, progress);
            (Vec::new(), Owed::No)
        }
        Action::SearchResults { search_id, batch } => {
            state.search_results(search_id, batch);
            (Vec::new(), Owed::No)
        }

        Action::Init => {
            let path = state.current_path.clone();
            info!(path = %path.display(), "initial load");
            (
                navigate_to(state, &path, NavKind::Init, PostLoad::RestoreSelection(0)),
                Owed::No,
            )
        }
        Action::Tick => {
            state.clear_expired_status();
            (Vec::new(), Owed::No)
        }
        Action::Refresh => (refresh(state), Owed::No),
        Action::DirectoryChanged(path) => {
            if path == state.current_path && !state.dir_loader.is_loading() {
                debug!(path = %path.display(), "directory changed on disk");
                (refresh(state), Owed::No)
            } else {
                (Vec::new(), Owed::No)
            }
        }
        Action::Quit => {
            state.should_quit = true;
            (vec![Effect::Quit], Owed::No)
        }
    };

    let owed = match owed {
        Owed::No => false,
        Owed::IfMoved => state.selected_path() != before,
        Owed::Always => true,
    };
    if owed {
        effects.extend(state.request_preview());
    }
    Ok(effects)
}

fn move_selection(state: &mut AppState, delta: isize) -> Vec<Effect> {
    let len = state.display_len();
    if len == 0 {
        return Vec::new();
    }
    let target = match state.display_selected_index() {
        Some(d) => (d as isize + delta).clamp(0, len as isize - 1) as usize,
        None => 0,
    };
    select_display(state, target)
}

fn select_display(state: &mut AppState, display: usize) -> Vec<Effect> {
    if display < state.display_len() {
        state.set_display_selected_index(display);
        state.update_scroll_visibility();
    }
    Vec::new()
}

/// Start loading `path`. History and the post-load work are only touched if
/// this load is the one that completes.
fn navigate_to(state: &mut AppState, path: &Path, kind: NavKind, select: PostLoad) -> Vec<Effect> {
    if let Some(index) = state.selected_index {
        state
            .selection_history
            .insert(state.current_path.clone(), index);
    }
    let mut effects = Vec::new();
    let (token, superseded) = state.dir_loader.start(path, kind);
    if let Some(old) = superseded {
        debug!(%old, %token, "superseding directory load");
        effects.push(Effect::CancelDirectory { token: old });
    }
    state.dir_loader.on_complete(token, select);
    state.dir_loader.on_complete(token, PostLoad::RequestPreview);
    effects.push(Effect::LoadDirectory {
        token,
        path: path.to_path_buf(),
    });
    effects
}

fn remembered_selection(state: &AppState, path: &Path) -> PostLoad {
    PostLoad::RestoreSelection(state.selection_history.get(path).copied().unwrap_or(0))
}

fn enter(state: &mut AppState) -> (Vec<Effect>, Owed) {
    let Some(entry) = state.selected_entry() else {
        return (Vec::new(), Owed::No);
    };
    if entry.is_dir {
        let path = entry.path.clone();
        let select = remembered_selection(state, &path);
        (navigate_to(state, &path, NavKind::Push, select), Owed::No)
    } else {
        state.enter_preview_fullscreen();
        (Vec::new(), Owed::No)
    }
}

fn parent(state: &mut AppState) -> Vec<Effect> {
    let Some(parent) = state.current_path.parent().map(Path::to_path_buf) else {
        return Vec::new();
    };
    let child = state.current_path.clone();
    navigate_to(
        state,
        &parent,
        NavKind::Push,
        PostLoad::SelectPath {
            path: child,
            fallback: 0,
        },
    )
}

fn go_home(state: &mut AppState, home: Option<PathBuf>) -> Result<Vec<Effect>> {
    let Some(home) = home else {
        state.last_error = Some(AppError::HomeDirUnavailable.to_string());
        return Err(AppError::HomeDirUnavailable);
    };
    let select = remembered_selection(state, &home);
    Ok(navigate_to(state, &home, NavKind::Push, select))
}

fn history_step(state: &mut AppState, kind: NavKind) -> Vec<Effect> {
    let target = match kind {
        NavKind::Back => state.history.back(),
        _ => state.history.forward(),
    }
    .map(Path::to_path_buf);
    let Some(path) = target else {
        return Vec::new();
    };
    let select = remembered_selection(state, &path);
    navigate_to(state, &path, kind, select)
}

fn refresh(state: &mut AppState) -> Vec<Effect> {
    let path = state.current_path.clone();
    let fallback = state.selected_index.unwrap_or(0);
    let select = match state.selected_path() {
        Some(selected) => PostLoad::SelectPath {
            path: selected,
            fallback,
        },
        None => PostLoad::RestoreSelection(fallback),
    };
    navigate_to(state, &path, NavKind::Reload, select)
}

fn toggle_hidden(state: &mut AppState) {
    state.hide_hidden = !state.hide_hidden;
    state.invalidate_overlay();
    state.ensure_selection_visible();
    state.center_scroll_on_selection();
    state.preview.evict_directories();
    let msg = if state.hide_hidden {
        "Hidden files hidden"
    } else {
        "Hidden files shown"
    };
    state.set_status_message(msg.to_string());
    debug!(hide_hidden = state.hide_hidden, "toggled hidden entries");
}

fn directory_loaded(
    state: &mut AppState,
    token: LoadToken,
    path: &Path,
    result: std::result::Result<DirListing, String>,
) -> Vec<Effect> {
    let Some((request, callbacks)) = state.dir_loader.complete(token) else {
        debug!(%token, path = %path.display(), "dropping stale directory load");
        return Vec::new();
    };
    let kind = request.meta;

    let listing = match result {
        Ok(listing) => listing,
        Err(e) => {
            warn!(path = %request.path.display(), error = %e, "failed to read directory");
            state.last_error = Some(format!("{}: {e}", request.path.display()));
            match kind {
                NavKind::Back => {
                    state.history.forward();
                }
                NavKind::Forward => {
                    state.history.back();
                }
                NavKind::Push | NavKind::Init | NavKind::Reload => {}
            }
            return Vec::new();
        }
    };

    if kind == NavKind::Push {
        state.history.add(&request.path);
    }
    let entering = request.path != state.current_path;
    if entering {
        state.filter_discard();
        state.current_path = request.path.clone();
        state.selected_index = None;
        state.scroll_offset = 0;
    }
    state.last_error = None;
    state.parent_entries = listing.parent_entries;
    state.set_files(listing.entries);

    let mut effects = Vec::new();
    if entering || kind == NavKind::Init {
        effects.push(Effect::WatchDirectory(request.path.clone()));
    }
    for callback in callbacks {
        effects.extend(run_post_load(state, callback, kind));
    }
    effects
}

fn run_post_load(state: &mut AppState, callback: PostLoad, kind: NavKind) -> Vec<Effect> {
    let last = state.files.len().checked_sub(1);
    let base = match callback {
        PostLoad::RequestPreview => return state.request_preview(),
        PostLoad::RestoreSelection(index) => last.map(|last| index.min(last)),
        PostLoad::SelectPath { path, fallback } => state
            .index_of(&path)
            .or_else(|| last.map(|last| fallback.min(last))),
    };
    state.selected_index = match base {
        Some(base) => state.nearest_visible(base),
        None => state.first_visible(),
    };
    if kind == NavKind::Reload {
        state.update_scroll_visibility();
    } else {
        state.center_scroll_on_selection();
    }
    Vec::new()
}

fn search_open(state: &mut AppState) -> (Vec<Effect>, Owed) {
    let Some(hit) = state.search.selected_hit().cloned() else {
        return (Vec::new(), Owed::No);
    };
    let mut effects = state.search_close();
    let parent = hit
        .path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| state.search.root.clone());
    info!(path = %hit.path.display(), "opening search result");

    let here = parent == state.current_path && !state.dir_loader.is_loading();
    match state.index_of(&hit.path).filter(|_| here) {
        Some(base) => {
            if state.filter.active {
                state.filter_discard();
                state.invalidate_overlay();
            }
            state.selected_index = state.nearest_visible(base);
            state.center_scroll_on_selection();
            (effects, Owed::IfMoved)
        }
        None => {
            let kind = if parent == state.current_path {
                NavKind::Reload
            } else {
                NavKind::Push
            };
            effects.extend(navigate_to(
                state,
                &parent,
                kind,
                PostLoad::SelectPath {
                    path: hit.path,
                    fallback: 0,
                },
            ));
            (effects, Owed::No)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::fs::{self, File};

    use super::*;
    use crate::app::test_support::setup_dir;
    use crate::app::StateOptions;
    use crate::fs::preview::{PreviewData, PreviewMeta, TextLine, TextPreview};
    use crate::fs::reader::read_listing;
    use crate::fs::searcher::{SearchBatch, SearchHit};

    /// Reduce `action`, performing directory loads inline. Every other
    /// effect is returned for inspection.
    fn drive(state: &mut AppState, action: Action) -> Vec<Effect> {
        let mut queue: VecDeque<Effect> = reduce(state, action).unwrap().into();
        let mut rest = Vec::new();
        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::LoadDirectory { token, path } => {
                    let result = read_listing(&path).map_err(|e| e.to_string());
                    let follow = reduce(
                        state,
                        Action::DirectoryLoaded {
                            token,
                            path,
                            result,
                        },
                    )
                    .unwrap();
                    queue.extend(follow);
                }
                other => rest.push(other),
            }
        }
        rest
    }

    fn init(dir: &Path) -> AppState {
        let mut state = AppState::new(dir, false, StateOptions::default());
        state.screen_height = 24;
        drive(&mut state, Action::Init);
        state
    }

    fn select_name(state: &mut AppState, name: &str) {
        let index = state.files.iter().position(|e| e.name == name).unwrap();
        state.selected_index = Some(index);
    }

    fn selected_name(state: &AppState) -> Option<String> {
        state.selected_entry().map(|e| e.name.clone())
    }

    fn text_preview() -> (PreviewData, PreviewMeta) {
        (
            PreviewData::Text(TextPreview {
                lines: vec![TextLine {
                    text: "hello".into(),
                    offset: 0,
                    width: 5,
                }],
                styled: None,
                syntax: "Plain Text",
                truncated: false,
            }),
            PreviewMeta {
                size: 5,
                modified: None,
                is_dir: false,
            },
        )
    }

    fn scheduled_tokens(effects: &[Effect]) -> Vec<LoadToken> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::SchedulePreview { token, .. } => Some(*token),
                _ => None,
            })
            .collect()
    }

    /// Invisible-cursor and viewport checks shared by the sequence tests.
    fn assert_consistent(state: &AppState) {
        if let Some(base) = state.selected_index {
            assert!(
                state.to_display(base).is_some(),
                "selected entry {} is not displayed",
                state.files[base].name
            );
        } else {
            assert!(state.display_len() == 0 || state.filter.active);
        }
        assert!(state.scroll_offset <= state.max_scroll_offset());
        if let Some(d) = state.display_selected_index() {
            assert!(d >= state.scroll_offset);
            assert!(d < state.scroll_offset + state.visible_lines());
        }
    }

    #[test]
    fn init_loads_and_selects_first_entry() {
        let dir = setup_dir(&["b", "a/", "c"]);
        let mut state = AppState::new(dir.path(), false, StateOptions::default());
        let effects = drive(&mut state, Action::Init);
        assert_eq!(state.files.len(), 3);
        assert_eq!(selected_name(&state).as_deref(), Some("a"));
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::WatchDirectory(p) if p == dir.path())));
        assert_eq!(scheduled_tokens(&effects).len(), 1);
    }

    #[test]
    fn enter_then_parent_reselects_the_directory() {
        let dir = setup_dir(&["a/", "sub/", "sub/inner.txt", "z"]);
        let mut state = init(dir.path());
        select_name(&mut state, "sub");
        drive(&mut state, Action::Enter);
        assert_eq!(state.current_path, dir.path().join("sub"));
        assert_eq!(selected_name(&state).as_deref(), Some("inner.txt"));

        drive(&mut state, Action::Parent);
        assert_eq!(state.current_path, dir.path());
        assert_eq!(selected_name(&state).as_deref(), Some("sub"));
        // Going up right after entering is an undo, not a new branch.
        assert_eq!(state.history.entries().len(), 2);
        assert_eq!(state.history.index(), 0);
    }

    #[test]
    fn history_back_forward_round_trip() {
        let dir = setup_dir(&["a/", "dir1/", "dir1/b/", "dir1/dir2/", "dir1/dir2/x", "dir1/dir2/y"]);
        let mut state = init(dir.path());
        drive(&mut state, Action::MoveDown);
        drive(&mut state, Action::Enter);
        drive(&mut state, Action::MoveDown);
        drive(&mut state, Action::Enter);
        drive(&mut state, Action::MoveDown);
        let before = (state.current_path.clone(), state.selected_index);
        assert_eq!(before.0, dir.path().join("dir1/dir2"));

        drive(&mut state, Action::HistoryBack);
        assert_eq!(state.current_path, dir.path().join("dir1"));
        assert_eq!(selected_name(&state).as_deref(), Some("dir2"));

        drive(&mut state, Action::HistoryForward);
        assert_eq!((state.current_path.clone(), state.selected_index), before);
        assert_eq!(selected_name(&state).as_deref(), Some("y"));
    }

    #[test]
    fn stale_directory_load_is_dropped() {
        let dir = setup_dir(&["one/", "one/x", "two/", "two/y"]);
        let mut state = init(dir.path());

        select_name(&mut state, "one");
        let first = reduce(&mut state, Action::Enter).unwrap();
        select_name(&mut state, "two");
        let second = reduce(&mut state, Action::Enter).unwrap();
        let token_of = |effects: &[Effect]| {
            effects.iter().find_map(|e| match e {
                Effect::LoadDirectory { token, .. } => Some(*token),
                _ => None,
            })
        };
        let (t1, t2) = (token_of(&first).unwrap(), token_of(&second).unwrap());
        assert!(second
            .iter()
            .any(|e| matches!(e, Effect::CancelDirectory { token } if *token == t1)));

        let files_before = state.files.clone();
        let effects = reduce(
            &mut state,
            Action::DirectoryLoaded {
                token: t1,
                path: dir.path().join("one"),
                result: read_listing(&dir.path().join("one")).map_err(|e| e.to_string()),
            },
        )
        .unwrap();
        assert!(effects.is_empty());
        assert_eq!(state.files, files_before);
        assert_eq!(state.current_path, dir.path());

        reduce(
            &mut state,
            Action::DirectoryLoaded {
                token: t2,
                path: dir.path().join("two"),
                result: read_listing(&dir.path().join("two")).map_err(|e| e.to_string()),
            },
        )
        .unwrap();
        assert_eq!(state.current_path, dir.path().join("two"));
        assert_eq!(selected_name(&state).as_deref(), Some("y"));
    }

    #[test]
    fn superseded_push_stays_out_of_history() {
        let dir = setup_dir(&["one/", "one/x", "two/", "two/y"]);
        let mut state = init(dir.path());
        select_name(&mut state, "one");
        // This load never completes.
        reduce(&mut state, Action::Enter).unwrap();
        select_name(&mut state, "two");
        drive(&mut state, Action::Enter);
        assert_eq!(state.current_path, dir.path().join("two"));
        assert_eq!(
            state.history.entries(),
            &[dir.path().to_path_buf(), dir.path().join("two")]
        );

        drive(&mut state, Action::HistoryBack);
        assert_eq!(state.current_path, dir.path());
    }

    #[test]
    fn failed_load_records_error_and_repairs_history() {
        let dir = setup_dir(&["gone/", "keep"]);
        let mut state = init(dir.path());
        select_name(&mut state, "gone");
        fs::remove_dir(dir.path().join("gone")).unwrap();
        drive(&mut state, Action::Enter);
        assert_eq!(state.current_path, dir.path());
        assert!(state.last_error.is_some());
        assert_eq!(state.history.current(), Some(dir.path()));
        assert_eq!(state.history.entries().len(), 1);
        assert!(!state.history.can_go_forward());
        assert!(drive(&mut state, Action::HistoryForward).is_empty());
    }

    #[test]
    fn missing_home_is_an_error() {
        let dir = setup_dir(&["a"]);
        let mut state = init(dir.path());
        let result = go_home(&mut state, None);
        assert!(matches!(result, Err(AppError::HomeDirUnavailable)));
        assert!(state.last_error.is_some());
    }

    #[test]
    fn debounce_coalesces_rapid_moves() {
        let dir = setup_dir(&["a", "b", "c"]);
        let mut state = init(dir.path());
        let first = drive(&mut state, Action::MoveDown);
        let second = drive(&mut state, Action::MoveDown);
        let t1 = scheduled_tokens(&first)[0];
        let t2 = scheduled_tokens(&second)[0];
        assert!(second
            .iter()
            .any(|e| matches!(e, Effect::CancelPreviewTimer { token } if *token == t1)));

        let mut loads = Vec::new();
        for token in [t1, t2] {
            for effect in reduce(&mut state, Action::PreviewLoadStart { token }).unwrap() {
                if let Effect::LoadPreview { path, .. } = effect {
                    loads.push(path);
                }
            }
        }
        assert_eq!(loads, vec![dir.path().join("c")]);
    }

    #[test]
    fn stale_preview_result_is_dropped() {
        let dir = setup_dir(&["a", "b"]);
        let mut state = init(dir.path());
        let first = drive(&mut state, Action::MoveDown);
        let t1 = scheduled_tokens(&first)[0];
        reduce(&mut state, Action::PreviewLoadStart { token: t1 }).unwrap();
        // Moving away cancels the in-flight load.
        let back = drive(&mut state, Action::MoveUp);
        assert!(back
            .iter()
            .any(|e| matches!(e, Effect::CancelPreview { token } if *token == t1)));

        reduce(
            &mut state,
            Action::PreviewLoaded {
                token: t1,
                path: dir.path().join("b"),
                result: Ok(text_preview()),
            },
        )
        .unwrap();
        assert!(state.preview.data.is_none());
    }

    #[test]
    fn preview_result_applies_for_active_token() {
        let dir = setup_dir(&["a", "b"]);
        let mut state = init(dir.path());
        let effects = drive(&mut state, Action::MoveDown);
        let token = scheduled_tokens(&effects)[0];
        let start = reduce(&mut state, Action::PreviewLoadStart { token }).unwrap();
        assert!(matches!(start.as_slice(), [Effect::LoadPreview { .. }]));
        reduce(
            &mut state,
            Action::PreviewLoaded {
                token,
                path: dir.path().join("b"),
                result: Ok(text_preview()),
            },
        )
        .unwrap();
        assert_eq!(state.preview.path.as_deref(), Some(dir.path().join("b").as_path()));
        assert!(state.preview.data.is_some());
    }

    #[test]
    fn cached_preview_shows_at_once_and_still_refreshes() {
        let dir = setup_dir(&["a", "b"]);
        let mut state = init(dir.path());
        let b_path = dir.path().join("b");
        let effects = drive(&mut state, Action::MoveDown);
        let token = scheduled_tokens(&effects)[0];
        reduce(&mut state, Action::PreviewLoadStart { token }).unwrap();
        let (data, mut meta) = text_preview();
        meta.size = state.files[1].size;
        meta.modified = state.files[1].modified;
        reduce(
            &mut state,
            Action::PreviewLoaded {
                token,
                path: b_path.clone(),
                result: Ok((data, meta)),
            },
        )
        .unwrap();

        let up = drive(&mut state, Action::MoveUp);
        let token = scheduled_tokens(&up)[0];
        reduce(&mut state, Action::PreviewLoadStart { token }).unwrap();
        reduce(
            &mut state,
            Action::PreviewLoaded {
                token,
                path: dir.path().join("a"),
                result: Ok(text_preview()),
            },
        )
        .unwrap();
        assert_eq!(state.preview.path.as_deref(), Some(dir.path().join("a").as_path()));

        let down = drive(&mut state, Action::MoveDown);
        let token = scheduled_tokens(&down)[0];
        let start = reduce(&mut state, Action::PreviewLoadStart { token }).unwrap();
        assert_eq!(state.preview.path.as_deref(), Some(b_path.as_path()));
        assert!(state.preview.data.is_some());
        assert!(start
            .iter()
            .any(|e| matches!(e, Effect::LoadPreview { path, .. } if *path == b_path)));
    }

    #[test]
    fn same_path_preview_is_not_loaded_twice() {
        let dir = setup_dir(&["a", "b"]);
        let mut state = init(dir.path());
        let effects = drive(&mut state, Action::MoveDown);
        let t1 = scheduled_tokens(&effects)[0];
        reduce(&mut state, Action::PreviewLoadStart { token: t1 }).unwrap();

        let refreshed = drive(&mut state, Action::Refresh);
        assert!(!refreshed
            .iter()
            .any(|e| matches!(e, Effect::CancelPreview { .. })));
        let t2 = scheduled_tokens(&refreshed)[0];
        let second = reduce(&mut state, Action::PreviewLoadStart { token: t2 }).unwrap();
        assert!(!second
            .iter()
            .any(|e| matches!(e, Effect::LoadPreview { .. })));
        assert!(state.preview.is_loading());

        reduce(
            &mut state,
            Action::PreviewLoaded {
                token: t1,
                path: dir.path().join("b"),
                result: Ok(text_preview()),
            },
        )
        .unwrap();
        assert!(state.preview.data.is_some());
    }

    #[test]
    fn preview_failure_clears_preview() {
        let dir = setup_dir(&["a", "b"]);
        let mut state = init(dir.path());
        let effects = drive(&mut state, Action::MoveDown);
        let token = scheduled_tokens(&effects)[0];
        reduce(&mut state, Action::PreviewLoadStart { token }).unwrap();
        reduce(
            &mut state,
            Action::PreviewLoaded {
                token,
                path: dir.path().join("b"),
                result: Err("permission denied".into()),
            },
        )
        .unwrap();
        assert!(state.preview.data.is_none());
        assert_eq!(state.preview.scroll, 0);
    }

    #[test]
    fn hidden_toggle_moves_to_nearest_visible() {
        let dir = setup_dir(&["-a", ".m", "z"]);
        let mut state = init(dir.path());
        select_name(&mut state, ".m");
        let effects = drive(&mut state, Action::ToggleHidden);
        assert!(state.hide_hidden);
        assert_eq!(selected_name(&state).as_deref(), Some("-a"));
        assert_eq!(
            state.status_message.as_ref().map(|(m, _)| m.as_str()),
            Some("Hidden files hidden")
        );
        assert_eq!(scheduled_tokens(&effects).len(), 1);
        assert_consistent(&state);
    }

    #[test]
    fn hidden_toggle_with_everything_hidden_clears_selection() {
        let dir = setup_dir(&[".a", ".b"]);
        let mut state = init(dir.path());
        drive(&mut state, Action::ToggleHidden);
        assert_eq!(state.selected_index, None);
        drive(&mut state, Action::ToggleHidden);
        assert_eq!(state.display_len(), 2);
        assert_eq!(selected_name(&state).as_deref(), Some(".a"));
        assert_consistent(&state);
    }

    #[test]
    fn hidden_toggle_rebuilds_in_flight_directory_preview() {
        let dir = setup_dir(&["sub/", "sub/.h", "sub/v", "z"]);
        let mut state = init(dir.path());
        assert_eq!(selected_name(&state).as_deref(), Some("sub"));
        let token = state.preview.loader.pending().unwrap().token;
        let start = reduce(&mut state, Action::PreviewLoadStart { token }).unwrap();
        assert!(matches!(
            start.as_slice(),
            [Effect::LoadPreview {
                hide_hidden: false,
                ..
            }]
        ));

        let toggled = drive(&mut state, Action::ToggleHidden);
        assert!(toggled
            .iter()
            .any(|e| matches!(e, Effect::CancelPreview { token: t } if *t == token)));
        let next = scheduled_tokens(&toggled)[0];
        let restart = reduce(&mut state, Action::PreviewLoadStart { token: next }).unwrap();
        assert!(restart.iter().any(|e| matches!(
            e,
            Effect::LoadPreview {
                hide_hidden: true,
                ..
            }
        )));
    }

    #[test]
    fn hidden_toggle_inside_filter_uses_filter_order() {
        let dir = setup_dir(&["note1", ".note2", "note3", "other"]);
        let mut state = init(dir.path());
        drive(&mut state, Action::FilterStart);
        for c in "note".chars() {
            drive(&mut state, Action::FilterChar(c));
        }
        select_name(&mut state, ".note2");
        drive(&mut state, Action::ToggleHidden);
        let name = selected_name(&state).unwrap();
        assert!(name == "note1" || name == "note3");
        assert_consistent(&state);
    }

    #[test]
    fn overlay_stays_consistent_under_mixed_toggles() {
        let names: Vec<String> = (0..40)
            .map(|i| if i % 3 == 0 { format!(".f{i:02}") } else { format!("f{i:02}") })
            .collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let dir = setup_dir(&refs);
        let mut state = init(dir.path());
        state.screen_height = 12;

        let mut seed: u64 = 0x2545_f491;
        for _ in 0..400 {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let action = match (seed >> 33) % 9 {
                0 => Action::ToggleHidden,
                1 => Action::FilterStart,
                2 => Action::FilterChar(['f', '1', '2', '0', ' '][(seed >> 40) as usize % 5]),
                3 => Action::FilterBackspace,
                4 => Action::FilterClear,
                5 => Action::MoveDown,
                6 => Action::MoveUp,
                7 => Action::PageDown,
                _ => Action::Bottom,
            };
            drive(&mut state, action);
            assert_consistent(&state);
        }
    }

    #[test]
    fn refresh_keeps_selected_entry_by_path() {
        let dir = setup_dir(&["b", "c", "d"]);
        let mut state = init(dir.path());
        select_name(&mut state, "c");
        File::create(dir.path().join("a")).unwrap();
        drive(&mut state, Action::Refresh);
        assert_eq!(state.files.len(), 4);
        assert_eq!(selected_name(&state).as_deref(), Some("c"));
    }

    #[test]
    fn refresh_falls_back_to_index_when_entry_vanishes() {
        let dir = setup_dir(&["a", "b", "c"]);
        let mut state = init(dir.path());
        select_name(&mut state, "c");
        fs::remove_file(dir.path().join("c")).unwrap();
        drive(&mut state, Action::DirectoryChanged(dir.path().to_path_buf()));
        assert_eq!(selected_name(&state).as_deref(), Some("b"));
    }

    #[test]
    fn filter_survives_refresh_of_same_directory() {
        let dir = setup_dir(&["apple", "banana"]);
        let mut state = init(dir.path());
        drive(&mut state, Action::FilterStart);
        drive(&mut state, Action::FilterChar('b'));
        File::create(dir.path().join("blueberry")).unwrap();
        drive(&mut state, Action::Refresh);
        assert!(state.filter.active);
        let mut shown: Vec<String> = state.display_entries().map(|e| e.name.clone()).collect();
        shown.sort();
        assert_eq!(shown, vec!["banana", "blueberry"]);
    }

    #[test]
    fn navigation_discards_the_filter() {
        let dir = setup_dir(&["sub/", "sub/x", "zz"]);
        let mut state = init(dir.path());
        drive(&mut state, Action::FilterStart);
        drive(&mut state, Action::FilterChar('s'));
        drive(&mut state, Action::Enter);
        assert_eq!(state.current_path, dir.path().join("sub"));
        assert!(!state.filter.active);
        assert_eq!(state.display_len(), 1);
    }

    #[test]
    fn search_open_navigates_and_selects_hit() {
        let dir = setup_dir(&["src/", "src/a.rs", "src/main.rs", "top"]);
        let mut state = init(dir.path());
        drive(&mut state, Action::GlobalSearchStart);
        drive(&mut state, Action::SearchChar('m'));
        let id = state.search.search_id;
        drive(
            &mut state,
            Action::SearchResults {
                search_id: id,
                batch: SearchBatch {
                    results: vec![SearchHit {
                        path: dir.path().join("src/main.rs"),
                        relative: "src/main.rs".into(),
                        is_dir: false,
                        score: 10.0,
                    }],
                    is_done: true,
                    in_progress: false,
                },
            },
        );
        let effects = drive(&mut state, Action::SearchOpen);
        assert!(!state.search.active);
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::CancelSearch { discard: true, .. })));
        assert_eq!(state.current_path, dir.path().join("src"));
        assert_eq!(selected_name(&state).as_deref(), Some("main.rs"));
    }

    #[test]
    fn search_clear_invalidates_in_flight_batches() {
        let dir = setup_dir(&["a"]);
        let mut state = init(dir.path());
        drive(&mut state, Action::GlobalSearchStart);
        drive(&mut state, Action::SearchChar('a'));
        let id = state.search.search_id;
        drive(&mut state, Action::SearchClear);
        drive(&mut state, Action::GlobalSearchStart);
        drive(
            &mut state,
            Action::SearchResults {
                search_id: id,
                batch: SearchBatch {
                    results: Vec::new(),
                    is_done: true,
                    in_progress: false,
                },
            },
        );
        assert_ne!(state.search.search_id, id);
        assert!(state.search.results.is_empty());
    }

    #[test]
    fn mouse_select_and_paging() {
        let names: Vec<String> = (0..30).map(|i| format!("f{i:02}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let dir = setup_dir(&refs);
        let mut state = init(dir.path());
        drive(&mut state, Action::Resize { width: 80, height: 14 });
        drive(&mut state, Action::PageDown);
        assert_eq!(state.display_selected_index(), Some(10));
        drive(&mut state, Action::MouseSelect { row: 2 });
        assert_eq!(state.display_selected_index(), Some(state.scroll_offset + 2));
        drive(&mut state, Action::Bottom);
        assert_eq!(state.display_selected_index(), Some(29));
        assert_eq!(state.scroll_offset, 20);
        drive(&mut state, Action::ScrollLines(-3));
        assert_eq!(state.display_selected_index(), Some(26));
        drive(&mut state, Action::Top);
        assert_eq!(state.scroll_offset, 0);
        assert_consistent(&state);
    }

    #[test]
    fn quit_requests_shutdown() {
        let dir = setup_dir(&["a"]);
        let mut state = init(dir.path());
        let effects = drive(&mut state, Action::Quit);
        assert!(state.should_quit);
        assert!(matches!(effects.as_slice(), [Effect::Quit]));
    }

    #[test]
    fn tick_expires_old_status_message() {
        let dir = setup_dir(&["a"]);
        let mut state = init(dir.path());
        state.set_status_message("fresh".into());
        drive(&mut state, Action::Tick);
        assert!(state.status_message.is_some());

        let Some(stale) = std::time::Instant::now().checked_sub(std::time::Duration::from_secs(10)) else {
            return;
        };
        state.status_message = Some(("old".into(), stale));
        let effects = drive(&mut state, Action::Tick);
        assert!(state.status_message.is_none());
        assert!(effects.is_empty());
    }
}
