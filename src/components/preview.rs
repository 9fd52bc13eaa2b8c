use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Paragraph, Widget, Wrap},
};

use crate::app::preview::PreviewState;
use crate::fs::preview::{DirectoryPreview, HexPreview, PreviewData, TextPreview};
use crate::theme::ThemeColors;

const TAB_WIDTH: usize = 4;

/// Preview widget that renders file content in the preview panel.
pub struct PreviewWidget<'a> {
    preview_state: &'a PreviewState,
    theme: &'a ThemeColors,
    block: Option<Block<'a>>,
}

impl<'a> PreviewWidget<'a> {
    pub fn new(preview_state: &'a PreviewState, theme: &'a ThemeColors) -> Self {
        Self {
            preview_state,
            theme,
            block: None,
        }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = block.into();
        self
    }

    fn text_lines(&self, text: &'a TextPreview, start: usize, count: usize) -> Vec<Line<'a>> {
        let gutter = text.lines.len().max(1).to_string().len();
        let nr_style = Style::default().fg(self.theme.preview_line_nr_fg);
        let text_style = Style::default().fg(self.theme.preview_fg);

        let mut lines: Vec<Line<'a>> = (start..text.lines.len().min(start + count))
            .map(|i| {
                let number = Span::styled(format!("{:>gutter$} ", i + 1), nr_style);
                let mut spans = vec![number];
                match text.styled.as_ref().and_then(|styled| styled.get(i)) {
                    Some(styled) => {
                        for span in &styled.spans {
                            spans.push(span.clone());
                        }
                    }
                    None => spans.push(Span::styled(
                        text.lines[i].text.replace('\t', &" ".repeat(TAB_WIDTH)),
                        text_style,
                    )),
                }
                Line::from(spans)
            })
            .collect();
        if text.truncated && start + count > text.lines.len() {
            lines.push(Line::from(Span::styled(
                "… preview truncated",
                Style::default().fg(self.theme.dim_fg),
            )));
        }
        lines
    }

    fn directory_lines(&self, dir: &'a DirectoryPreview, start: usize, count: usize) -> Vec<Line<'a>> {
        let mut lines: Vec<Line<'a>> = dir
            .entries
            .iter()
            .skip(start)
            .take(count)
            .map(|entry| {
                let style = if entry.is_hidden {
                    Style::default().fg(self.theme.list_hidden_fg)
                } else if entry.is_dir {
                    Style::default()
                        .fg(self.theme.list_dir_fg)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(self.theme.list_file_fg)
                };
                let suffix = if entry.is_dir { "/" } else { "" };
                Line::from(Span::styled(format!("{}{}", entry.name, suffix), style))
            })
            .collect();
        if dir.entries.is_empty() {
            lines.push(Line::from(Span::styled(
                "(empty directory)",
                Style::default().fg(self.theme.dim_fg),
            )));
        } else if dir.total > dir.entries.len() && start + count > dir.entries.len() {
            lines.push(Line::from(Span::styled(
                format!("… {} more", dir.total - dir.entries.len()),
                Style::default().fg(self.theme.dim_fg),
            )));
        }
        lines
    }

    fn hex_lines(&self, hex: &'a HexPreview, start: usize, count: usize) -> Vec<Line<'a>> {
        let style = Style::default().fg(self.theme.preview_fg);
        let mut lines: Vec<Line<'a>> = hex
            .rows
            .iter()
            .skip(start)
            .take(count)
            .map(|row| Line::from(Span::styled(row.as_str(), style)))
            .collect();
        if hex.truncated && start + count > hex.rows.len() {
            lines.push(Line::from(Span::styled(
                format!("… {} bytes total", hex.size),
                Style::default().fg(self.theme.dim_fg),
            )));
        }
        lines
    }

    fn placeholder(&self, inner: Rect, buf: &mut Buffer) {
        let msg = if self.preview_state.is_loading() {
            "Loading…"
        } else {
            "No preview"
        };
        let line = Line::from(Span::styled(msg, Style::default().fg(self.theme.dim_fg)));
        buf.set_line(inner.x, inner.y, &line, inner.width);
    }
}

impl<'a> Widget for PreviewWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Render block (border) first, get inner area
        let inner = if let Some(block) = &self.block {
            let inner = block.inner(area);
            block.clone().render(area, buf);
            inner
        } else {
            area
        };

        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let preview_state = self.preview_state;
        let Some(data) = preview_state.data.as_deref() else {
            self.placeholder(inner, buf);
            return;
        };

        let start = preview_state.scroll;
        let count = inner.height as usize;
        let lines = match data {
            PreviewData::Text(text) => self.text_lines(text, start, count),
            PreviewData::Directory(dir) => self.directory_lines(dir, start, count),
            PreviewData::Hex(hex) => self.hex_lines(hex, start, count),
        };

        if preview_state.wrap {
            Paragraph::new(lines)
                .wrap(Wrap { trim: false })
                .render(inner, buf);
        } else {
            for (i, line) in lines.iter().take(count).enumerate() {
                buf.set_line(inner.x, inner.y + i as u16, line, inner.width);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use super::*;
    use crate::fs::preview::TextLine;
    use crate::fs::reader::{EntryKind, FileEntry};
    use crate::theme;
    use ratatui::widgets::Borders;

    fn row(buf: &Buffer, y: u16, width: u16) -> String {
        (0..width)
            .map(|x| buf.cell((x, y)).unwrap().symbol().to_string())
            .collect()
    }

    fn text_state(lines: &[&str]) -> PreviewState {
        let mut state = PreviewState::new(false);
        state.data = Some(Arc::new(PreviewData::Text(TextPreview {
            lines: lines
                .iter()
                .map(|l| TextLine {
                    text: l.to_string(),
                    offset: 0,
                    width: l.len(),
                })
                .collect(),
            styled: None,
            syntax: "Plain Text",
            truncated: false,
        })));
        state
    }

    #[test]
    fn test_empty_preview_shows_placeholder() {
        let state = PreviewState::new(false);
        let tc = theme::dark_theme();
        let widget = PreviewWidget::new(&state, &tc)
            .block(Block::default().borders(Borders::ALL).title(" Preview "));
        let area = Rect::new(0, 0, 30, 5);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);
        assert!(row(&buf, 1, 30).contains("No preview"));
    }

    #[test]
    fn test_text_with_line_numbers() {
        let state = text_state(&["line 1", "line 2", "line 3"]);
        let tc = theme::dark_theme();
        let widget = PreviewWidget::new(&state, &tc);
        let area = Rect::new(0, 0, 20, 5);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);
        assert!(row(&buf, 0, 20).starts_with("1 line 1"));
        assert_eq!(buf.cell((0, 0)).unwrap().fg, tc.preview_line_nr_fg);
    }

    #[test]
    fn test_preview_scroll_offset() {
        let mut state = text_state(&["line 1", "line 2", "line 3"]);
        state.scroll = 1;
        let tc = theme::dark_theme();
        let widget = PreviewWidget::new(&state, &tc);
        let area = Rect::new(0, 0, 20, 3);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);
        assert!(row(&buf, 0, 20).contains("line 2"));
    }

    #[test]
    fn test_wrap_continues_long_lines() {
        let mut state = text_state(&["aaaa bbbb cccc"]);
        state.wrap = true;
        let tc = theme::dark_theme();
        let widget = PreviewWidget::new(&state, &tc);
        let area = Rect::new(0, 0, 10, 3);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);
        assert!(row(&buf, 0, 10).starts_with("1 aaaa"));
        assert!(row(&buf, 1, 10).contains("bbbb"));
    }

    #[test]
    fn test_directory_preview_lists_entries() {
        let mut state = PreviewState::new(false);
        state.data = Some(Arc::new(PreviewData::Directory(DirectoryPreview {
            entries: vec![FileEntry {
                name: "docs".into(),
                path: PathBuf::from("/x/docs"),
                kind: EntryKind::Directory,
                is_dir: true,
                size: 0,
                modified: None,
                mode: 0,
                is_hidden: false,
            }],
            total: 3,
        })));
        let tc = theme::dark_theme();
        let widget = PreviewWidget::new(&state, &tc);
        let area = Rect::new(0, 0, 20, 4);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);
        assert!(row(&buf, 0, 20).starts_with("docs/"));
        assert!(row(&buf, 1, 20).contains("2 more"));
    }

    #[test]
    fn test_zero_area_no_panic() {
        let state = PreviewState::new(false);
        let tc = theme::dark_theme();
        let widget = PreviewWidget::new(&state, &tc);
        let area = Rect::new(0, 0, 0, 0);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);
    }
}
