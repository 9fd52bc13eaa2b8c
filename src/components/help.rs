use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Widget},
};

use crate::theme::ThemeColors;

/// A single keybinding entry for display.
struct KeyEntry {
    key: &'static str,
    description: &'static str,
}

/// A category of keybindings.
struct KeyCategory {
    name: &'static str,
    entries: &'static [KeyEntry],
}

macro_rules! keys {
    ($($key:literal => $description:literal),* $(,)?) => {
        &[$(KeyEntry { key: $key, description: $description }),*]
    };
}

const NAVIGATION_KEYS: &[KeyEntry] = keys![
    "j / ↓" => "Move down",
    "k / ↑" => "Move up",
    "PgDn / Ctrl+D" => "Page down",
    "PgUp / Ctrl+U" => "Page up",
    "g / Home" => "Jump to first entry",
    "G / End" => "Jump to last entry",
    "Enter / l / →" => "Open directory (files: fullscreen preview)",
    "Backspace / h / ←" => "Go to parent directory",
    "~" => "Go to home directory",
    "Alt+← / [" => "History back",
    "Alt+→ / ]" => "History forward",
    "." => "Toggle hidden files",
    "F5 / Ctrl+R" => "Reload directory",
];

const FILTER_KEYS: &[KeyEntry] = keys![
    "/" => "Start (or restart) inline filter",
    "Ctrl+U" => "Clear the filter query",
    "Esc" => "Close filter, keep the entry under the cursor",
    "Enter" => "Open the selected entry",
];

const SEARCH_KEYS: &[KeyEntry] = keys![
    "Ctrl+P / Ctrl+F" => "Open global search",
    "↑ / ↓" => "Select result",
    "PgUp / PgDn" => "Page through results",
    "← / → / Home / End" => "Move the cursor",
    "Ctrl+W" => "Delete previous word",
    "Enter" => "Go to the selected result",
    "Esc" => "Close search",
];

const PREVIEW_KEYS: &[KeyEntry] = keys![
    "J / K" => "Scroll preview",
    "p" => "Fullscreen preview",
    "j / k (fullscreen)" => "Scroll by line",
    "g / G (fullscreen)" => "Top / bottom",
    "Esc / q (fullscreen)" => "Leave fullscreen",
    "w" => "Toggle line wrap",
];

const GENERAL_KEYS: &[KeyEntry] = keys![
    "?" => "Toggle this help overlay",
    "q" => "Quit",
    "Ctrl+C" => "Quit",
];

const CATEGORIES: &[KeyCategory] = &[
    KeyCategory {
        name: "Navigation",
        entries: NAVIGATION_KEYS,
    },
    KeyCategory {
        name: "Inline Filter",
        entries: FILTER_KEYS,
    },
    KeyCategory {
        name: "Global Search",
        entries: SEARCH_KEYS,
    },
    KeyCategory {
        name: "Preview",
        entries: PREVIEW_KEYS,
    },
    KeyCategory {
        name: "General",
        entries: GENERAL_KEYS,
    },
];

/// Help overlay widget showing all keybindings.
pub struct HelpOverlay<'a> {
    theme: &'a ThemeColors,
}

impl<'a> HelpOverlay<'a> {
    pub fn new(theme: &'a ThemeColors) -> Self {
        Self { theme }
    }

    /// Build all the lines for the help content.
    fn build_content_lines(&self) -> Vec<Line<'static>> {
        let mut lines: Vec<Line<'static>> = Vec::new();

        for category in CATEGORIES {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("── {} ", category.name),
                    Style::default()
                        .fg(self.theme.accent_fg)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled("─".repeat(30), Style::default().fg(self.theme.dim_fg)),
            ]));

            for entry in category.entries {
                lines.push(Line::from(vec![
                    Span::styled(
                        format!("  {:<22}", entry.key),
                        Style::default()
                            .fg(self.theme.warning_fg)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(entry.description, Style::default().fg(self.theme.list_fg)),
                ]));
            }

            lines.push(Line::from(""));
        }

        lines.push(Line::from(Span::styled(
            " Press ? or Esc to close ",
            Style::default().fg(self.theme.dim_fg),
        )));
        lines
    }

    /// Get total number of content lines.
    #[cfg(test)]
    fn total_lines() -> usize {
        CATEGORIES.iter().map(|c| c.entries.len() + 2).sum::<usize>() + 1
    }
}

impl<'a> Widget for HelpOverlay<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // 70% width, 80% height, capped
        let overlay_width = ((u32::from(area.width) * 70 / 100) as u16).min(80);
        let overlay_height = ((u32::from(area.height) * 80 / 100) as u16).min(50);
        let x = area.x + area.width.saturating_sub(overlay_width) / 2;
        let y = area.y + area.height.saturating_sub(overlay_height) / 2;
        let overlay_area = Rect::new(x, y, overlay_width, overlay_height);

        Clear.render(overlay_area, buf);

        let block = Block::default()
            .title(" Help ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.border_focused_fg))
            .style(Style::default().bg(self.theme.dialog_bg));

        let inner = block.inner(overlay_area);
        block.render(overlay_area, buf);

        let content_lines = self.build_content_lines();
        let visible_height = inner.height as usize;
        for (i, line) in content_lines.iter().take(visible_height).enumerate() {
            buf.set_line(
                inner.x + 1,
                inner.y + i as u16,
                line,
                inner.width.saturating_sub(2),
            );
        }

        // Overflow hint
        if content_lines.len() > visible_height && overlay_area.height > 0 {
            let more = Span::styled(
                format!(" +{} more ", content_lines.len() - visible_height),
                Style::default().fg(self.theme.dim_fg),
            );
            let more_x = overlay_area.x + overlay_area.width.saturating_sub(more.width() as u16 + 1);
            let more_y = overlay_area.y + overlay_area.height - 1;
            buf.set_span(more_x, more_y, &more, more.width() as u16);
        }
    }
}
