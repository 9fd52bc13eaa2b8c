use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Widget},
};

use crate::fs::reader::{EntryKind, FileEntry};
use crate::fuzzy::Matcher;
use crate::theme::ThemeColors;

/// Query tokens whose matches are highlighted in entry names.
struct MatchHighlight<'a> {
    matcher: &'a Matcher,
    tokens: &'a [String],
    case_sensitive: bool,
}

/// Flat directory listing: used for both the parent pane and the main list.
pub struct FileListWidget<'a> {
    entries: Vec<&'a FileEntry>,
    /// Row index into `entries`.
    selected: Option<usize>,
    scroll: usize,
    theme: &'a ThemeColors,
    highlight: Option<MatchHighlight<'a>>,
    empty_message: &'a str,
    block: Option<Block<'a>>,
}

impl<'a> FileListWidget<'a> {
    pub fn new(entries: Vec<&'a FileEntry>, theme: &'a ThemeColors) -> Self {
        Self {
            entries,
            selected: None,
            scroll: 0,
            theme,
            highlight: None,
            empty_message: "(empty)",
            block: None,
        }
    }

    pub fn selected(mut self, selected: Option<usize>) -> Self {
        self.selected = selected;
        self
    }

    pub fn scroll(mut self, scroll: usize) -> Self {
        self.scroll = scroll;
        self
    }

    pub fn highlight(mut self, matcher: &'a Matcher, tokens: &'a [String], case_sensitive: bool) -> Self {
        self.highlight = Some(MatchHighlight {
            matcher,
            tokens,
            case_sensitive,
        });
        self
    }

    pub fn empty_message(mut self, message: &'a str) -> Self {
        self.empty_message = message;
        self
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = block.into();
        self
    }

    /// `ls -F` style suffix.
    fn suffix(entry: &FileEntry) -> &'static str {
        match entry.kind {
            EntryKind::Directory => "/",
            EntryKind::Symlink if entry.is_dir => "@/",
            EntryKind::Symlink => "@",
            EntryKind::File => "",
        }
    }

    fn base_style(&self, entry: &FileEntry) -> Style {
        if entry.is_hidden {
            Style::default().fg(self.theme.list_hidden_fg)
        } else if entry.is_dir {
            Style::default()
                .fg(self.theme.list_dir_fg)
                .add_modifier(Modifier::BOLD)
        } else if entry.kind == EntryKind::Symlink {
            Style::default().fg(self.theme.info_fg)
        } else {
            Style::default().fg(self.theme.list_file_fg)
        }
    }

    /// Char positions of `name` matched by any query token.
    fn matched_chars(&self, name: &str) -> Vec<usize> {
        let Some(hl) = &self.highlight else {
            return Vec::new();
        };
        let folded;
        let target = if hl.case_sensitive {
            name
        } else {
            folded = name.to_lowercase();
            folded.as_str()
        };
        let mut positions: Vec<usize> = hl
            .tokens
            .iter()
            .flat_map(|t| hl.matcher.indices(t, target))
            .collect();
        positions.sort_unstable();
        positions.dedup();
        positions
    }

    fn entry_line(&self, entry: &FileEntry, is_selected: bool) -> Line<'static> {
        let style = if is_selected {
            Style::default()
                .bg(self.theme.list_selected_bg)
                .fg(self.theme.list_selected_fg)
                .add_modifier(Modifier::BOLD)
        } else {
            self.base_style(entry)
        };
        let match_style = style.fg(self.theme.list_match_fg).add_modifier(Modifier::BOLD);

        let matched = self.matched_chars(&entry.name);
        let mut spans = vec![Span::styled(if is_selected { "▸ " } else { "  " }, style)];

        // Group consecutive chars sharing a style into one span.
        let mut run = String::new();
        let mut run_matched = false;
        for (i, ch) in entry.name.chars().enumerate() {
            let is_match = matched.binary_search(&i).is_ok();
            if is_match != run_matched && !run.is_empty() {
                let s = if run_matched { match_style } else { style };
                spans.push(Span::styled(std::mem::take(&mut run), s));
            }
            run_matched = is_match;
            run.push(ch);
        }
        if !run.is_empty() {
            spans.push(Span::styled(run, if run_matched { match_style } else { style }));
        }
        spans.push(Span::styled(Self::suffix(entry), style));
        Line::from(spans)
    }
}

impl<'a> Widget for FileListWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = if let Some(block) = &self.block {
            let inner = block.inner(area);
            block.clone().render(area, buf);
            inner
        } else {
            area
        };
        let visible_height = inner.height as usize;
        if inner.width == 0 || visible_height == 0 {
            return;
        }

        if self.entries.is_empty() {
            let line = Line::from(Span::styled(
                self.empty_message,
                Style::default().fg(self.theme.dim_fg),
            ));
            buf.set_line(inner.x, inner.y, &line, inner.width);
            return;
        }

        for (row, (idx, entry)) in self
            .entries
            .iter()
            .enumerate()
            .skip(self.scroll)
            .take(visible_height)
            .enumerate()
        {
            let y = inner.y + row as u16;
            let is_selected = self.selected == Some(idx);
            if is_selected {
                buf.set_style(
                    Rect::new(inner.x, y, inner.width, 1),
                    Style::default().bg(self.theme.list_selected_bg),
                );
            }
            let line = self.entry_line(entry, is_selected);
            buf.set_line(inner.x, y, &line, inner.width);
        }
    }
}
