//! Colour palettes and their resolution from config.

use ratatui::style::Color;

use crate::config::{ThemeColorsConfig, ThemeConfig};

/// All colours used by the widgets.
#[derive(Debug, Clone)]
pub struct ThemeColors {
    // File lists
    pub list_fg: Color,
    pub list_selected_bg: Color,
    pub list_selected_fg: Color,
    pub list_dir_fg: Color,
    pub list_file_fg: Color,
    pub list_hidden_fg: Color,
    pub list_match_fg: Color,

    // Preview pane
    pub preview_fg: Color,
    pub preview_line_nr_fg: Color,

    // Status bar
    pub status_bg: Color,
    pub status_fg: Color,

    // Borders & overlays
    pub border_fg: Color,
    pub border_focused_fg: Color,
    pub dialog_bg: Color,
    pub dialog_border_fg: Color,

    // Semantic colours, the same in every scheme
    pub error_fg: Color,
    pub warning_fg: Color,
    pub success_fg: Color,
    pub info_fg: Color,
    pub accent_fg: Color,
    pub dim_fg: Color,
}

/// Dark scheme (Catppuccin Mocha).
pub fn dark_theme() -> ThemeColors {
    ThemeColors {
        list_fg: Color::Rgb(205, 214, 244),          // text
        list_selected_bg: Color::Rgb(69, 71, 90),    // surface1
        list_selected_fg: Color::Rgb(205, 214, 244), // text
        list_dir_fg: Color::Rgb(137, 180, 250),      // blue
        list_file_fg: Color::Rgb(205, 214, 244),
        list_hidden_fg: Color::Rgb(108, 112, 134), // overlay0
        list_match_fg: Color::Rgb(249, 226, 175),  // yellow

        preview_fg: Color::Rgb(205, 214, 244),
        preview_line_nr_fg: Color::Rgb(108, 112, 134),

        status_bg: Color::Rgb(30, 30, 46), // base
        status_fg: Color::Rgb(205, 214, 244),

        border_fg: Color::Rgb(88, 91, 112),           // surface2
        border_focused_fg: Color::Rgb(137, 180, 250), // blue
        dialog_bg: Color::Rgb(49, 50, 68),            // surface0
        dialog_border_fg: Color::Rgb(137, 180, 250),

        error_fg: Color::Rgb(243, 139, 168),   // red
        warning_fg: Color::Rgb(249, 226, 175), // yellow
        success_fg: Color::Rgb(166, 227, 161), // green
        info_fg: Color::Rgb(137, 180, 250),
        accent_fg: Color::Rgb(203, 166, 247), // mauve
        dim_fg: Color::Rgb(108, 112, 134),
    }
}

/// Light scheme (Catppuccin Latte).
pub fn light_theme() -> ThemeColors {
    ThemeColors {
        list_fg: Color::Rgb(76, 79, 105),
        list_selected_bg: Color::Rgb(204, 208, 218),
        list_selected_fg: Color::Rgb(76, 79, 105),
        list_dir_fg: Color::Rgb(30, 102, 245),
        list_file_fg: Color::Rgb(76, 79, 105),
        list_hidden_fg: Color::Rgb(156, 160, 176),
        list_match_fg: Color::Rgb(223, 142, 29),

        preview_fg: Color::Rgb(76, 79, 105),
        preview_line_nr_fg: Color::Rgb(156, 160, 176),

        status_bg: Color::Rgb(239, 241, 245),
        status_fg: Color::Rgb(76, 79, 105),

        border_fg: Color::Rgb(172, 176, 190),
        border_focused_fg: Color::Rgb(30, 102, 245),
        dialog_bg: Color::Rgb(230, 233, 239),
        dialog_border_fg: Color::Rgb(30, 102, 245),

        error_fg: Color::Rgb(210, 15, 57),
        warning_fg: Color::Rgb(223, 142, 29),
        success_fg: Color::Rgb(64, 160, 43),
        info_fg: Color::Rgb(30, 102, 245),
        accent_fg: Color::Rgb(136, 57, 239),
        dim_fg: Color::Rgb(156, 160, 176),
    }
}

/// Parse `"#aabbcc"` (the `#` is optional). `None` for malformed input.
pub fn parse_hex_color(hex: &str) -> Option<Color> {
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Color::Rgb(r, g, b))
}

/// Resolve the palette named by `config.scheme`:
/// `dark` (default), `light`, or `custom` (dark plus `[theme.custom]` overrides).
pub fn resolve_theme(config: &ThemeConfig) -> ThemeColors {
    match config.scheme_name() {
        "light" => light_theme(),
        "custom" => {
            let mut theme = dark_theme();
            if let Some(custom) = &config.custom {
                apply_custom_colors(&mut theme, custom);
            }
            theme
        }
        _ => dark_theme(),
    }
}

macro_rules! override_colors {
    ($theme:expr, $custom:expr, [$($field:ident),* $(,)?]) => {
        $(
            if let Some(color) = $custom.$field.as_deref().and_then(parse_hex_color) {
                $theme.$field = color;
            }
        )*
    };
}

/// Invalid hex values keep the palette colour.
fn apply_custom_colors(theme: &mut ThemeColors, custom: &ThemeColorsConfig) {
    override_colors!(
        theme,
        custom,
        [
            list_fg,
            list_selected_bg,
            list_selected_fg,
            list_dir_fg,
            list_file_fg,
            list_hidden_fg,
            preview_fg,
            preview_line_nr_fg,
            status_bg,
            status_fg,
            border_fg,
            dialog_bg,
            dialog_border_fg,
        ]
    );
}
