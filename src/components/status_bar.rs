use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

use crate::theme::ThemeColors;

const KEY_HINTS: &str = " /:filter  ^P:search  ?:help ";

/// Status bar: entry counts and toggles on the left, filter query, then key
/// hints on the right. A status message or error replaces the whole bar.
pub struct StatusBarWidget<'a> {
    counts: &'a str,
    theme: &'a ThemeColors,
    filter_query: Option<&'a str>,
    flags: Option<&'a str>,
    status_message: Option<&'a str>,
    is_error: bool,
}

impl<'a> StatusBarWidget<'a> {
    pub fn new(counts: &'a str, theme: &'a ThemeColors) -> Self {
        Self {
            counts,
            theme,
            filter_query: None,
            flags: None,
            status_message: None,
            is_error: false,
        }
    }

    pub fn status_message(mut self, msg: &'a str, is_error: bool) -> Self {
        self.status_message = Some(msg);
        self.is_error = is_error;
        self
    }

    /// Show the inline filter prompt with its current query.
    pub fn filter_query(mut self, query: &'a str) -> Self {
        self.filter_query = Some(query);
        self
    }

    /// Short indicators such as hidden-file visibility or line wrap.
    pub fn flags(mut self, flags: &'a str) -> Self {
        self.flags = Some(flags);
        self
    }
}

/// Keep at most `width` chars of `s`.
fn truncate(s: &str, width: usize) -> String {
    s.chars().take(width).collect()
}

impl<'a> Widget for StatusBarWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }

        let width = area.width as usize;
        buf.set_style(area, Style::default().bg(self.theme.status_bg));

        if let Some(msg) = self.status_message {
            let style = if self.is_error {
                Style::default()
                    .bg(self.theme.error_fg)
                    .fg(self.theme.status_fg)
            } else {
                Style::default()
                    .bg(self.theme.status_bg)
                    .fg(self.theme.success_fg)
            };
            let display = format!("{:<width$}", truncate(msg, width), width = width);
            let line = Line::from(Span::styled(display, style));
            buf.set_line(area.x, area.y, &line, area.width);
            return;
        }

        let base = Style::default().bg(self.theme.status_bg);
        let mut spans = vec![Span::styled(
            format!(" {}", self.counts),
            base.fg(self.theme.status_fg),
        )];

        if let Some(flags) = self.flags.filter(|f| !f.is_empty()) {
            spans.push(Span::styled(
                format!("  {}", flags),
                base.fg(self.theme.info_fg),
            ));
        }

        if let Some(query) = self.filter_query {
            spans.push(Span::styled(
                "  /",
                base.fg(self.theme.accent_fg).add_modifier(Modifier::BOLD),
            ));
            spans.push(Span::styled(
                query.to_string(),
                base.fg(self.theme.warning_fg).add_modifier(Modifier::BOLD),
            ));
            spans.push(Span::styled("█", base.fg(self.theme.warning_fg)));
        }

        // Hints only when they fit after the left-hand content.
        let used: usize = spans.iter().map(|s| s.width()).sum();
        let hints_len = KEY_HINTS.chars().count();
        if used + hints_len <= width {
            spans.push(Span::raw(" ".repeat(width - used - hints_len)));
            spans.push(Span::styled(
                KEY_HINTS,
                base.fg(self.theme.dim_fg).add_modifier(Modifier::DIM),
            ));
        }

        let line = Line::from(spans);
        buf.set_line(area.x, area.y, &line, area.width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme;
    use ratatui::style::Color;

    fn test_theme() -> ThemeColors {
        theme::dark_theme()
    }

    fn render(widget: StatusBarWidget<'_>, width: u16) -> (Buffer, String) {
        let area = Rect::new(0, 0, width, 1);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);
        let content = (0..width)
            .map(|x| buf.cell((x, 0)).unwrap().symbol().to_string())
            .collect();
        (buf, content)
    }

    #[test]
    fn test_status_message_success() {
        let tc = test_theme();
        let widget = StatusBarWidget::new("3/10", &tc).status_message("Refreshed", false);
        let (buf, content) = render(widget, 80);
        assert!(content.contains("Refreshed"));
        assert_eq!(buf.cell((0, 0)).unwrap().fg, Color::Rgb(166, 227, 161));
    }

    #[test]
    fn test_status_message_error() {
        let tc = test_theme();
        let widget = StatusBarWidget::new("3/10", &tc).status_message("Permission denied", true);
        let (buf, content) = render(widget, 80);
        assert!(content.contains("Permission denied"));
        let cell = buf.cell((0, 0)).unwrap();
        assert_eq!(cell.bg, Color::Rgb(243, 139, 168));
        assert_eq!(cell.fg, Color::Rgb(205, 214, 244));
    }

    #[test]
    fn test_normal_bar_rendering() {
        let tc = test_theme();
        let widget = StatusBarWidget::new("3/10", &tc).flags("hidden");
        let (_, content) = render(widget, 80);
        assert!(content.starts_with(" 3/10  hidden"));
        assert!(content.contains("?:help"));
    }

    #[test]
    fn test_filter_query_shown() {
        let tc = test_theme();
        let widget = StatusBarWidget::new("2/10", &tc).filter_query("main rs");
        let (_, content) = render(widget, 80);
        assert!(content.contains("/main rs"));
    }

    #[test]
    fn test_hints_dropped_when_narrow() {
        let tc = test_theme();
        let widget = StatusBarWidget::new("12/340", &tc).filter_query("a long filter query");
        let (_, content) = render(widget, 30);
        assert!(!content.contains("?:help"));
    }

    #[test]
    fn test_long_message_truncated_without_panic() {
        let tc = test_theme();
        let msg = "é".repeat(50);
        let widget = StatusBarWidget::new("", &tc).status_message(&msg, true);
        let (_, content) = render(widget, 10);
        assert_eq!(content, "é".repeat(10));
    }

    #[test]
    fn test_zero_area_does_not_panic() {
        let tc = test_theme();
        let widget = StatusBarWidget::new("0/0", &tc);
        let area = Rect::new(0, 0, 0, 0);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);
    }
}
