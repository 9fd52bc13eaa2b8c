use ratatui::{
    layout::{Constraint, Direction, Layout, Margin, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders},
    Frame,
};

use crate::app::AppState;
use crate::components::file_list::FileListWidget;
use crate::components::help::HelpOverlay;
use crate::components::preview::PreviewWidget;
use crate::components::search::SearchWidget;
use crate::components::status_bar::StatusBarWidget;
use crate::fs::preview::PreviewData;
use crate::fuzzy::prepare_tokens;
use crate::theme::ThemeColors;

/// Below this width the parent pane is dropped.
const PARENT_PANE_MIN_WIDTH: u16 = 60;

/// Screen regions. Together the header, the status bar and the list
/// borders take `FIXED_CHROME_ROWS` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Panes {
    pub header: Rect,
    pub body: Rect,
    pub parent: Option<Rect>,
    pub list: Rect,
    pub preview: Option<Rect>,
    pub status: Rect,
}

pub fn layout(area: Rect, state: &AppState) -> Panes {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);
    let (header, body, status) = (rows[0], rows[1], rows[2]);

    let with_parent = area.width >= PARENT_PANE_MIN_WIDTH;
    let with_preview = state.options.preview_enabled;
    let widths: &[u16] = match (with_parent, with_preview) {
        (true, true) => &[20, 40, 40],
        (false, true) => &[50, 50],
        (true, false) => &[25, 75],
        (false, false) => &[100],
    };
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(widths.iter().map(|&w| Constraint::Percentage(w)))
        .split(body);

    let mut cols = columns.iter().copied();
    let parent = if with_parent { cols.next() } else { None };
    let list = cols.next().unwrap_or(body);
    let preview = if with_preview { cols.next() } else { None };

    Panes {
        header,
        body,
        parent,
        list,
        preview,
        status,
    }
}

/// Rows of the list pane that hold entries.
pub fn list_inner(list: Rect) -> Rect {
    list.inner(Margin::new(1, 1))
}

fn bordered<'a>(title: String, theme: &ThemeColors, focused: bool) -> Block<'a> {
    let fg = if focused {
        theme.border_focused_fg
    } else {
        theme.border_fg
    };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(fg))
}

/// Render the application UI.
pub fn render(state: &AppState, theme: &ThemeColors, frame: &mut Frame) {
    let area = frame.area();
    let panes = layout(area, state);

    render_header(state, theme, panes.header, frame);

    if state.preview.fullscreen {
        render_preview(state, theme, panes.body, frame);
    } else {
        if let Some(parent) = panes.parent {
            render_parent(state, theme, parent, frame);
        }
        render_list(state, theme, panes.list, frame);
        if let Some(preview) = panes.preview {
            render_preview(state, theme, preview, frame);
        }
    }

    render_status(state, theme, panes.status, frame);

    if state.search.active {
        frame.render_widget(SearchWidget::new(&state.search, &state.matcher, theme), area);
    }
    if state.help_visible {
        frame.render_widget(HelpOverlay::new(theme), area);
    }
}

fn render_header(state: &AppState, theme: &ThemeColors, area: Rect, frame: &mut Frame) {
    let mut spans = vec![Span::styled(
        format!(" {}", state.current_path.display()),
        Style::default()
            .fg(theme.accent_fg)
            .add_modifier(Modifier::BOLD),
    )];
    if state.dir_loader.is_loading() {
        spans.push(Span::styled("  loading…", Style::default().fg(theme.dim_fg)));
    }
    let history = &state.history;
    if history.can_go_back() || history.can_go_forward() {
        let back = if history.can_go_back() { "◀" } else { " " };
        let forward = if history.can_go_forward() { "▶" } else { " " };
        spans.push(Span::styled(
            format!("  {}{}/{}{}", back, history.index() + 1, history.entries().len(), forward),
            Style::default().fg(theme.dim_fg),
        ));
    }
    frame.render_widget(Line::from(spans), area);
}

fn render_parent(state: &AppState, theme: &ThemeColors, area: Rect, frame: &mut Frame) {
    let selected = state
        .parent_entries
        .iter()
        .position(|e| e.path == state.current_path);
    let visible = list_inner(area).height as usize;
    let max_scroll = state.parent_entries.len().saturating_sub(visible);
    let scroll = selected
        .map(|i| i.saturating_sub(visible / 2).min(max_scroll))
        .unwrap_or(0);
    let title = state
        .current_path
        .parent()
        .and_then(|p| p.file_name())
        .map(|n| format!(" {} ", n.to_string_lossy()))
        .unwrap_or_else(|| " / ".to_string());

    let widget = FileListWidget::new(state.parent_entries.iter().collect(), theme)
        .selected(selected)
        .scroll(scroll)
        .empty_message("")
        .block(bordered(title, theme, false));
    frame.render_widget(widget, area);
}

fn render_list(state: &AppState, theme: &ThemeColors, area: Rect, frame: &mut Frame) {
    let tokens = prepare_tokens(&state.filter.query, state.filter.case_sensitive);
    let name = state
        .current_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "/".to_string());
    let title = if state.filter.active {
        format!(" {} [filter] ", name)
    } else {
        format!(" {} ", name)
    };

    let mut widget = FileListWidget::new(state.display_entries().collect(), theme)
        .selected(state.display_selected_index())
        .scroll(state.scroll_offset)
        .block(bordered(title, theme, true));
    if state.filter.active && !tokens.is_empty() {
        widget = widget
            .highlight(&state.matcher, &tokens, state.filter.case_sensitive)
            .empty_message("no matches");
    }
    frame.render_widget(widget, area);
}

fn render_preview(state: &AppState, theme: &ThemeColors, area: Rect, frame: &mut Frame) {
    let name = state
        .preview
        .path
        .as_ref()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "Preview".to_string());
    let kind = match state.preview.data.as_deref() {
        Some(PreviewData::Text(text)) => format!(" · {}", text.syntax),
        Some(PreviewData::Hex(_)) => " · binary".to_string(),
        Some(PreviewData::Directory(dir)) => format!(" · {} entries", dir.total),
        None => String::new(),
    };
    let wrap = if state.preview.wrap { " [wrap]" } else { "" };
    let title = format!(" {}{}{} ", name, kind, wrap);

    let widget = PreviewWidget::new(&state.preview, theme).block(bordered(
        title,
        theme,
        state.preview.fullscreen,
    ));
    frame.render_widget(widget, area);
}

fn render_status(state: &AppState, theme: &ThemeColors, area: Rect, frame: &mut Frame) {
    let shown = state.display_len();
    let position = state.display_selected_index().map(|i| i + 1).unwrap_or(0);
    let counts = if state.filter.active {
        format!("{}/{} of {}", position, shown, state.files.len())
    } else {
        format!("{}/{}", position, shown)
    };

    let mut flags = Vec::new();
    if !state.hide_hidden {
        flags.push("+hidden");
    }
    if state.preview.wrap {
        flags.push("wrap");
    }
    let flags = flags.join(" ");

    let mut widget = StatusBarWidget::new(&counts, theme).flags(&flags);
    if state.filter.active {
        widget = widget.filter_query(&state.filter.query);
    }
    if let Some((msg, _)) = &state.status_message {
        widget = widget.status_message(msg, false);
    } else if let Some(err) = &state.last_error {
        widget = widget.status_message(err, true);
    }
    frame.render_widget(widget, area);
}
