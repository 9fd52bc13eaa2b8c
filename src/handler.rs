//! Maps terminal input to reducer actions according to the active mode.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::{Position, Rect};

use crate::action::Action;
use crate::app::preview::PreviewScroll;
use crate::app::search::CursorMove;
use crate::app::AppState;
use crate::ui;

/// Rows moved per mouse wheel notch.
const WHEEL_LINES: isize = 3;

/// Input mode, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Help,
    Search,
    Fullscreen,
    Filter,
    Normal,
}

impl Mode {
    pub fn of(state: &AppState) -> Self {
        if state.help_visible {
            Mode::Help
        } else if state.search.active {
            Mode::Search
        } else if state.preview.fullscreen {
            Mode::Fullscreen
        } else if state.filter.active {
            Mode::Filter
        } else {
            Mode::Normal
        }
    }
}

/// Handle a key event.
pub fn handle_key_event(state: &AppState, key: KeyEvent) -> Option<Action> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && key.code == KeyCode::Char('c') {
        return Some(Action::Quit);
    }

    match Mode::of(state) {
        Mode::Help => help_key(key),
        Mode::Search => search_key(key, ctrl),
        Mode::Fullscreen => fullscreen_key(key, ctrl),
        Mode::Filter => filter_key(key, ctrl),
        Mode::Normal => normal_key(key, ctrl),
    }
}

/// Plain character input: no modifiers other than shift.
fn typed_char(key: KeyEvent) -> Option<char> {
    let plain = key.modifiers.difference(KeyModifiers::SHIFT).is_empty();
    match key.code {
        KeyCode::Char(c) if plain => Some(c),
        _ => None,
    }
}

fn help_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('?') | KeyCode::Char('q') | KeyCode::Esc => Some(Action::ToggleHelp),
        _ => None,
    }
}

fn search_key(key: KeyEvent, ctrl: bool) -> Option<Action> {
    match key.code {
        KeyCode::Esc => Some(Action::SearchClear),
        KeyCode::Enter => Some(Action::SearchOpen),
        KeyCode::Up => Some(Action::SearchNavigate(-1)),
        KeyCode::Down => Some(Action::SearchNavigate(1)),
        KeyCode::Char('k') | KeyCode::Char('p') if ctrl => Some(Action::SearchNavigate(-1)),
        KeyCode::Char('j') | KeyCode::Char('n') if ctrl => Some(Action::SearchNavigate(1)),
        KeyCode::PageUp => Some(Action::SearchPage { down: false }),
        KeyCode::PageDown => Some(Action::SearchPage { down: true }),
        KeyCode::Left => Some(Action::SearchMoveCursor(CursorMove::Left)),
        KeyCode::Right => Some(Action::SearchMoveCursor(CursorMove::Right)),
        KeyCode::Home => Some(Action::SearchMoveCursor(CursorMove::Home)),
        KeyCode::End => Some(Action::SearchMoveCursor(CursorMove::End)),
        KeyCode::Char('a') if ctrl => Some(Action::SearchMoveCursor(CursorMove::Home)),
        KeyCode::Char('e') if ctrl => Some(Action::SearchMoveCursor(CursorMove::End)),
        KeyCode::Char('w') if ctrl => Some(Action::SearchDeleteWord),
        KeyCode::Backspace => Some(Action::SearchBackspace),
        KeyCode::Delete => Some(Action::SearchDelete),
        _ => typed_char(key).map(Action::SearchChar),
    }
}

fn fullscreen_key(key: KeyEvent, ctrl: bool) -> Option<Action> {
    let scroll = |motion| Some(Action::PreviewScroll(motion));
    match key.code {
        KeyCode::Char('d') if ctrl => scroll(PreviewScroll::PageDown),
        KeyCode::Char('u') if ctrl => scroll(PreviewScroll::PageUp),
        KeyCode::Char('j') | KeyCode::Down => scroll(PreviewScroll::LineDown),
        KeyCode::Char('k') | KeyCode::Up => scroll(PreviewScroll::LineUp),
        KeyCode::Char(' ') | KeyCode::PageDown => scroll(PreviewScroll::PageDown),
        KeyCode::PageUp => scroll(PreviewScroll::PageUp),
        KeyCode::Char('g') | KeyCode::Home => scroll(PreviewScroll::Top),
        KeyCode::Char('G') | KeyCode::End => scroll(PreviewScroll::Bottom),
        KeyCode::Char('w') => Some(Action::ToggleWrap),
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('p') | KeyCode::Char('h') | KeyCode::Left => {
            Some(Action::PreviewExitFullscreen)
        }
        _ => None,
    }
}

fn filter_key(key: KeyEvent, ctrl: bool) -> Option<Action> {
    match key.code {
        KeyCode::Esc => Some(Action::FilterClear),
        KeyCode::Char('u') if ctrl => Some(Action::FilterReset),
        KeyCode::Char('p') | KeyCode::Char('f') if ctrl => Some(Action::GlobalSearchStart),
        KeyCode::Backspace => Some(Action::FilterBackspace),
        KeyCode::Enter | KeyCode::Right => Some(Action::Enter),
        KeyCode::Left => Some(Action::Parent),
        KeyCode::Up => Some(Action::MoveUp),
        KeyCode::Down => Some(Action::MoveDown),
        KeyCode::PageUp => Some(Action::PageUp),
        KeyCode::PageDown => Some(Action::PageDown),
        KeyCode::Char('/') => Some(Action::FilterStart),
        _ => typed_char(key).map(Action::FilterChar),
    }
}

fn normal_key(key: KeyEvent, ctrl: bool) -> Option<Action> {
    let alt = key.modifiers.contains(KeyModifiers::ALT);
    match key.code {
        KeyCode::Char('d') if ctrl => Some(Action::PageDown),
        KeyCode::Char('u') if ctrl => Some(Action::PageUp),
        KeyCode::Char('r') if ctrl => Some(Action::Refresh),
        KeyCode::Char('p') | KeyCode::Char('f') if ctrl => Some(Action::GlobalSearchStart),
        KeyCode::Left if alt => Some(Action::HistoryBack),
        KeyCode::Right if alt => Some(Action::HistoryForward),
        _ if ctrl || alt => None,

        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Char('j') | KeyCode::Down => Some(Action::MoveDown),
        KeyCode::Char('k') | KeyCode::Up => Some(Action::MoveUp),
        KeyCode::PageDown => Some(Action::PageDown),
        KeyCode::PageUp => Some(Action::PageUp),
        KeyCode::Char('g') | KeyCode::Home => Some(Action::Top),
        KeyCode::Char('G') | KeyCode::End => Some(Action::Bottom),
        KeyCode::Enter | KeyCode::Char('l') | KeyCode::Right => Some(Action::Enter),
        KeyCode::Backspace | KeyCode::Char('h') | KeyCode::Left => Some(Action::Parent),
        KeyCode::Char('~') => Some(Action::Home),
        KeyCode::Char('[') => Some(Action::HistoryBack),
        KeyCode::Char(']') => Some(Action::HistoryForward),
        KeyCode::Char('.') => Some(Action::ToggleHidden),
        KeyCode::F(5) => Some(Action::Refresh),
        KeyCode::Char('/') => Some(Action::FilterStart),
        KeyCode::Char('J') => Some(Action::PreviewScroll(PreviewScroll::LineDown)),
        KeyCode::Char('K') => Some(Action::PreviewScroll(PreviewScroll::LineUp)),
        KeyCode::Char('p') => Some(Action::PreviewEnterFullscreen),
        KeyCode::Char('w') => Some(Action::ToggleWrap),
        KeyCode::Char('?') => Some(Action::ToggleHelp),
        _ => None,
    }
}

/// Handle a mouse event: the wheel scrolls whatever has focus, a left click
/// on the file list selects the row under the pointer.
pub fn handle_mouse_event(state: &AppState, mouse: MouseEvent) -> Option<Action> {
    let delta = match mouse.kind {
        MouseEventKind::ScrollDown => WHEEL_LINES,
        MouseEventKind::ScrollUp => -WHEEL_LINES,
        MouseEventKind::Down(MouseButton::Left) => return click(state, mouse.column, mouse.row),
        _ => return None,
    };
    match Mode::of(state) {
        Mode::Help => None,
        Mode::Search => Some(Action::SearchNavigate(delta.signum())),
        Mode::Fullscreen => Some(Action::PreviewScroll(if delta > 0 {
            PreviewScroll::LineDown
        } else {
            PreviewScroll::LineUp
        })),
        Mode::Filter | Mode::Normal => Some(Action::ScrollLines(delta)),
    }
}

fn click(state: &AppState, column: u16, row: u16) -> Option<Action> {
    if !matches!(Mode::of(state), Mode::Normal | Mode::Filter) {
        return None;
    }
    let screen = Rect::new(0, 0, state.screen_width, state.screen_height);
    let list = ui::list_inner(ui::layout(screen, state).list);
    if !list.contains(Position::new(column, row)) {
        return None;
    }
    Some(Action::MouseSelect {
        row: usize::from(row - list.y),
    })
}
