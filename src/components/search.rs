use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Padding, Widget},
};

use crate::app::search::{overlay_height, GlobalSearchState, SearchPhase};
use crate::fuzzy::{prepare_tokens, Matcher};
use crate::theme::ThemeColors;

/// Global search overlay.
pub struct SearchWidget<'a> {
    state: &'a GlobalSearchState,
    matcher: &'a Matcher,
    theme: &'a ThemeColors,
}

impl<'a> SearchWidget<'a> {
    pub fn new(state: &'a GlobalSearchState, matcher: &'a Matcher, theme: &'a ThemeColors) -> Self {
        Self {
            state,
            matcher,
            theme,
        }
    }

    /// Overlay rectangle: horizontally centred, `overlay_height` rows tall.
    pub fn area(area: Rect) -> Rect {
        let width = ((u32::from(area.width) * 80 / 100) as u16).clamp(20.min(area.width), 100);
        let height = overlay_height(area.height).min(area.height);
        let x = area.x + area.width.saturating_sub(width) / 2;
        let y = area.y + area.height.saturating_sub(height) / 2;
        Rect::new(x, y, width, height)
    }

    fn input_line(&self) -> Line<'a> {
        let query = self.state.query.as_str();
        let cursor = self.state.cursor.min(query.len());
        let (before, rest) = query.split_at(cursor);
        let (cursor_char, after) = match rest.chars().next() {
            Some(c) => rest.split_at(c.len_utf8()),
            None => (" ", ""),
        };

        let input_style = Style::default().fg(self.theme.preview_fg);
        let cursor_style = Style::default()
            .bg(self.theme.preview_fg)
            .fg(self.theme.dialog_bg)
            .add_modifier(Modifier::BOLD);
        let prompt_style = Style::default()
            .fg(self.theme.accent_fg)
            .add_modifier(Modifier::BOLD);

        Line::from(vec![
            Span::styled("> ", prompt_style),
            Span::styled(before, input_style),
            Span::styled(cursor_char, cursor_style),
            Span::styled(after, input_style),
        ])
    }

    fn summary(&self) -> String {
        let state = self.state;
        if state.query.trim().is_empty() {
            return "Type to search...".to_string();
        }
        let count = state.results.len();
        let mut summary = format!("{} result{}", count, if count == 1 { "" } else { "s" });
        if matches!(state.phase, SearchPhase::Index | SearchPhase::Merging) {
            summary.push_str(&format!(" · {}", state.phase.label()));
        }
        if !state.progress.done && state.progress.indexed > 0 {
            summary.push_str(&format!(" · {} indexed", state.progress.indexed));
        }
        if state.case_sensitive {
            summary.push_str(" · case");
        }
        summary
    }
}

impl<'a> Widget for SearchWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height < 5 || area.width < 20 {
            return;
        }

        let rect = Self::area(area);
        Clear.render(rect, buf);

        let block = Block::default()
            .title(" Search [Enter] open  [Esc] close ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.dialog_border_fg))
            .style(Style::default().bg(self.theme.dialog_bg))
            .padding(Padding::horizontal(1));

        let inner = block.inner(rect);
        block.render(rect, buf);

        if inner.height == 0 || inner.width == 0 {
            return;
        }

        // Row 0: query input with cursor
        buf.set_line(inner.x, inner.y, &self.input_line(), inner.width);

        // Row 1: separator + result count and phase
        if inner.height > 1 {
            let sep_line = Line::from(Span::styled(
                format!("─── {} ", self.summary()),
                Style::default().fg(self.theme.dim_fg),
            ));
            buf.set_line(inner.x, inner.y + 1, &sep_line, inner.width);
        }

        // Row 2+: results
        let results_start = 2u16;
        let visible_results = inner.height.saturating_sub(results_start) as usize;
        let tokens = prepare_tokens(&self.state.query, self.state.case_sensitive);

        let base_style = Style::default().fg(self.theme.list_file_fg);
        let dir_style = Style::default().fg(self.theme.list_dir_fg);
        let highlight_style = Style::default()
            .fg(self.theme.list_match_fg)
            .add_modifier(Modifier::BOLD);

        for (i, hit) in self
            .state
            .results
            .iter()
            .enumerate()
            .skip(self.state.scroll)
            .take(visible_results)
        {
            let row = inner.y + results_start + (i - self.state.scroll) as u16;
            let is_selected = i == self.state.selected;

            let target = if self.state.case_sensitive {
                hit.relative.clone()
            } else {
                hit.relative.to_lowercase()
            };
            let mut matched: Vec<usize> = tokens
                .iter()
                .flat_map(|t| self.matcher.indices(t, &target))
                .collect();
            matched.sort_unstable();
            matched.dedup();

            let plain = if hit.is_dir { dir_style } else { base_style };
            let mut spans = vec![if is_selected {
                Span::styled(
                    "▸ ",
                    Style::default()
                        .fg(self.theme.accent_fg)
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                Span::raw("  ")
            }];

            let mut run = String::new();
            let mut run_matched = false;
            for (ci, ch) in hit.relative.chars().enumerate() {
                let is_match = matched.binary_search(&ci).is_ok();
                if is_match != run_matched && !run.is_empty() {
                    let style = if run_matched { highlight_style } else { plain };
                    spans.push(Span::styled(std::mem::take(&mut run), style));
                }
                run_matched = is_match;
                run.push(ch);
            }
            if !run.is_empty() {
                spans.push(Span::styled(run, if run_matched { highlight_style } else { plain }));
            }
            if hit.is_dir {
                spans.push(Span::styled("/", plain));
            }

            if is_selected {
                buf.set_style(
                    Rect::new(inner.x, row, inner.width, 1),
                    Style::default().bg(self.theme.list_selected_bg),
                );
            }
            buf.set_line(inner.x, row, &Line::from(spans), inner.width);
        }
    }
}
