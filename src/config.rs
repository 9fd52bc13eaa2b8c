//! Application configuration: TOML file loading, CLI overrides, and defaults.
//!
//! Resolution order (first found wins, values merge/override):
//! 1. CLI flags (`--config`, `--no-preview`, `--show-hidden`, etc.)
//! 2. `$DIRB_CONFIG` environment variable (path to config file)
//! 3. Project-local `.dirb.toml` in the current working directory
//! 4. Global `~/.config/dirb/config.toml`
//! 5. Built-in defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

// ── Section configs ──────────────────────────────────────────────────────────

/// General application settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Starting directory (overridden by CLI positional arg).
    pub default_path: Option<String>,
    /// Show hidden files by default.
    pub show_hidden: Option<bool>,
    /// Enable mouse support.
    pub mouse: Option<bool>,
    /// Watch the current directory and refresh on change.
    pub watcher: Option<bool>,
}

/// Preview panel settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PreviewConfig {
    /// Whether the preview panel is enabled.
    pub enabled: Option<bool>,
    /// Delay between a selection change and the preview request.
    pub debounce_ms: Option<u64>,
    /// Maximum bytes read for a text preview.
    pub max_text_bytes: Option<u64>,
    /// Maximum number of text lines kept in a preview.
    pub max_lines: Option<usize>,
    /// Number of bytes shown in a hex dump.
    pub hex_bytes: Option<usize>,
    /// Enable line wrapping.
    pub line_wrap: Option<bool>,
    /// Syntax highlighting theme (syntect theme name).
    pub syntax_theme: Option<String>,
    /// Enable syntax highlighting of text previews.
    pub highlight: Option<bool>,
}

/// Global search settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum number of results kept per batch.
    pub max_results: Option<usize>,
    /// Interval between progressive result batches while indexing.
    pub batch_interval_ms: Option<u64>,
}

/// Log output settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `"info"` or `"dir_browser_tui=debug"`.
    pub level: Option<String>,
    /// Log file path.
    pub file: Option<String>,
}

/// Color settings for a single theme palette.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ThemeColorsConfig {
    pub list_fg: Option<String>,
    pub list_selected_bg: Option<String>,
    pub list_selected_fg: Option<String>,
    pub list_dir_fg: Option<String>,
    pub list_file_fg: Option<String>,
    pub list_hidden_fg: Option<String>,
    pub preview_fg: Option<String>,
    pub preview_line_nr_fg: Option<String>,
    pub status_bg: Option<String>,
    pub status_fg: Option<String>,
    pub border_fg: Option<String>,
    pub dialog_bg: Option<String>,
    pub dialog_border_fg: Option<String>,
}

/// Theme configuration section.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ThemeConfig {
    /// Color scheme: "dark", "light", "custom".
    pub scheme: Option<String>,
    /// Custom color overrides.
    pub custom: Option<ThemeColorsConfig>,
}

impl ThemeConfig {
    /// Scheme name, defaulting to "dark".
    pub fn scheme_name(&self) -> &str {
        self.scheme.as_deref().unwrap_or("dark")
    }
}

// ── Top-level config ─────────────────────────────────────────────────────────

/// Top-level application configuration.
///
/// All fields are optional so that partial configs from different sources
/// can be merged together (CLI overrides file, file overrides defaults).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub preview: PreviewConfig,
    pub search: SearchConfig,
    pub logging: LoggingConfig,
    pub theme: ThemeConfig,
}

// ── Default constants ────────────────────────────────────────────────────────

/// Default preview debounce in milliseconds.
pub const DEFAULT_PREVIEW_DEBOUNCE_MS: u64 = 150;
/// Default max bytes read for a text preview (256 KiB).
pub const DEFAULT_MAX_TEXT_BYTES: u64 = 262_144;
/// Default max text lines kept in a preview.
pub const DEFAULT_MAX_LINES: usize = 2_000;
/// Default bytes rendered in a hex dump.
pub const DEFAULT_HEX_BYTES: usize = 4_096;
/// Default cap on global search results.
pub const DEFAULT_MAX_RESULTS: usize = 1_000;
/// Default interval between progressive search batches.
pub const DEFAULT_BATCH_INTERVAL_MS: u64 = 120;

// ── Config file locator ──────────────────────────────────────────────────────

/// Return the list of candidate config file paths in priority order.
///
/// Does NOT include the CLI `--config` path; that is handled separately.
fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(env_path) = std::env::var("DIRB_CONFIG") {
        paths.push(PathBuf::from(env_path));
    }

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(".dirb.toml"));
    }

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("dirb").join("config.toml"));
    }

    paths
}

/// Try to read and parse a TOML config file. Returns `None` if the file
/// doesn't exist or can't be parsed (with a warning logged).
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<AppConfig>(&content) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to parse config file");
            eprintln!(
                "Warning: failed to parse config file {}: {}",
                path.display(),
                e
            );
            None
        }
    }
}

// ── Merge logic ──────────────────────────────────────────────────────────────

impl AppConfig {
    /// Merge `other` on top of `self`; `other`'s `Some` values win.
    pub fn merge(self, other: &AppConfig) -> AppConfig {
        AppConfig {
            general: GeneralConfig {
                default_path: other
                    .general
                    .default_path
                    .clone()
                    .or(self.general.default_path),
                show_hidden: other.general.show_hidden.or(self.general.show_hidden),
                mouse: other.general.mouse.or(self.general.mouse),
                watcher: other.general.watcher.or(self.general.watcher),
            },
            preview: PreviewConfig {
                enabled: other.preview.enabled.or(self.preview.enabled),
                debounce_ms: other.preview.debounce_ms.or(self.preview.debounce_ms),
                max_text_bytes: other.preview.max_text_bytes.or(self.preview.max_text_bytes),
                max_lines: other.preview.max_lines.or(self.preview.max_lines),
                hex_bytes: other.preview.hex_bytes.or(self.preview.hex_bytes),
                line_wrap: other.preview.line_wrap.or(self.preview.line_wrap),
                syntax_theme: other
                    .preview
                    .syntax_theme
                    .clone()
                    .or(self.preview.syntax_theme),
                highlight: other.preview.highlight.or(self.preview.highlight),
            },
            search: SearchConfig {
                max_results: other.search.max_results.or(self.search.max_results),
                batch_interval_ms: other
                    .search
                    .batch_interval_ms
                    .or(self.search.batch_interval_ms),
            },
            logging: LoggingConfig {
                level: other.logging.level.clone().or(self.logging.level),
                file: other.logging.file.clone().or(self.logging.file),
            },
            theme: ThemeConfig {
                scheme: other.theme.scheme.clone().or(self.theme.scheme),
                custom: match (&self.theme.custom, &other.theme.custom) {
                    (_, Some(o)) => Some(o.clone()),
                    (Some(s), None) => Some(s.clone()),
                    (None, None) => None,
                },
            },
        }
    }

    /// Load the final merged configuration.
    ///
    /// `cli_config_path` is an explicit config file path from `--config`.
    /// `cli_overrides` are partial overrides derived from CLI flags.
    pub fn load(cli_config_path: Option<&Path>, cli_overrides: Option<&AppConfig>) -> AppConfig {
        let mut config = AppConfig::default();

        // Walk in reverse so that highest-priority (env var) overwrites lower.
        for path in candidate_paths().iter().rev() {
            if let Some(file_cfg) = load_file(path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(cli_path) = cli_config_path {
            if let Some(file_cfg) = load_file(cli_path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(overrides) = cli_overrides {
            config = config.merge(overrides);
        }

        config
    }

    // ── Convenience getters with built-in defaults ──────────────────────────

    /// Whether hidden files are shown at startup.
    pub fn show_hidden(&self) -> bool {
        self.general.show_hidden.unwrap_or(false)
    }

    /// Whether mouse support is enabled.
    pub fn mouse_enabled(&self) -> bool {
        self.general.mouse.unwrap_or(true)
    }

    /// Whether the directory watcher is enabled.
    pub fn watcher_enabled(&self) -> bool {
        self.general.watcher.unwrap_or(true)
    }

    /// Whether the preview panel is enabled.
    pub fn preview_enabled(&self) -> bool {
        self.preview.enabled.unwrap_or(true)
    }

    /// Preview debounce delay.
    pub fn preview_debounce(&self) -> Duration {
        Duration::from_millis(
            self.preview
                .debounce_ms
                .unwrap_or(DEFAULT_PREVIEW_DEBOUNCE_MS),
        )
    }

    pub fn max_text_bytes(&self) -> u64 {
        self.preview.max_text_bytes.unwrap_or(DEFAULT_MAX_TEXT_BYTES)
    }

    pub fn max_lines(&self) -> usize {
        self.preview.max_lines.unwrap_or(DEFAULT_MAX_LINES)
    }

    pub fn hex_bytes(&self) -> usize {
        self.preview.hex_bytes.unwrap_or(DEFAULT_HEX_BYTES)
    }

    /// Whether preview lines wrap at startup.
    pub fn line_wrap(&self) -> bool {
        self.preview.line_wrap.unwrap_or(false)
    }

    /// Syntax highlighting theme name.
    pub fn syntax_theme_name(&self) -> &str {
        self.preview
            .syntax_theme
            .as_deref()
            .unwrap_or("base16-ocean.dark")
    }

    /// Whether text previews are syntax highlighted.
    pub fn highlight_enabled(&self) -> bool {
        self.preview.highlight.unwrap_or(true)
    }

    pub fn max_search_results(&self) -> usize {
        self.search.max_results.unwrap_or(DEFAULT_MAX_RESULTS)
    }

    pub fn search_batch_interval(&self) -> Duration {
        Duration::from_millis(
            self.search
                .batch_interval_ms
                .unwrap_or(DEFAULT_BATCH_INTERVAL_MS),
        )
    }

    /// Log filter directive.
    pub fn log_level(&self) -> &str {
        self.logging.level.as_deref().unwrap_or("info")
    }

    /// Log file path, if configured.
    pub fn log_file(&self) -> Option<PathBuf> {
        self.logging.file.as_ref().map(PathBuf::from)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_values() {
        let cfg = AppConfig::default();
        assert!(!cfg.show_hidden());
        assert!(cfg.mouse_enabled());
        assert!(cfg.watcher_enabled());
        assert!(cfg.preview_enabled());
        assert_eq!(cfg.preview_debounce(), Duration::from_millis(150));
        assert_eq!(cfg.max_text_bytes(), 262_144);
        assert_eq!(cfg.max_lines(), 2_000);
        assert_eq!(cfg.hex_bytes(), 4_096);
        assert!(!cfg.line_wrap());
        assert_eq!(cfg.syntax_theme_name(), "base16-ocean.dark");
        assert!(cfg.highlight_enabled());
        assert_eq!(cfg.max_search_results(), 1_000);
        assert_eq!(cfg.search_batch_interval(), Duration::from_millis(120));
        assert_eq!(cfg.log_level(), "info");
        assert!(cfg.log_file().is_none());
        assert_eq!(cfg.theme.scheme_name(), "dark");
    }

    #[test]
    fn test_toml_parsing_full() {
        let toml = r#"
[general]
show_hidden = true
mouse = false
watcher = false

[preview]
enabled = false
debounce_ms = 80
max_text_bytes = 1_000
max_lines = 10
hex_bytes = 64
line_wrap = true
syntax_theme = "Solarized (dark)"
highlight = false

[search]
max_results = 50
batch_interval_ms = 40

[logging]
level = "debug"
file = "/tmp/dirb.log"

[theme]
scheme = "light"
"#;
        let cfg: AppConfig = toml::from_str(toml).expect("parse failed");
        assert!(cfg.show_hidden());
        assert!(!cfg.mouse_enabled());
        assert!(!cfg.watcher_enabled());
        assert!(!cfg.preview_enabled());
        assert_eq!(cfg.preview_debounce(), Duration::from_millis(80));
        assert_eq!(cfg.max_text_bytes(), 1_000);
        assert_eq!(cfg.max_lines(), 10);
        assert_eq!(cfg.hex_bytes(), 64);
        assert!(cfg.line_wrap());
        assert_eq!(cfg.syntax_theme_name(), "Solarized (dark)");
        assert!(!cfg.highlight_enabled());
        assert_eq!(cfg.max_search_results(), 50);
        assert_eq!(cfg.search_batch_interval(), Duration::from_millis(40));
        assert_eq!(cfg.log_level(), "debug");
        assert_eq!(cfg.log_file(), Some(PathBuf::from("/tmp/dirb.log")));
        assert_eq!(cfg.theme.scheme_name(), "light");
    }

    #[test]
    fn test_toml_parsing_partial() {
        let toml = r#"
[general]
show_hidden = true
"#;
        let cfg: AppConfig = toml::from_str(toml).expect("parse failed");
        assert!(cfg.show_hidden());
        assert_eq!(cfg.preview_debounce(), Duration::from_millis(150));
        assert_eq!(cfg.max_search_results(), 1_000);
    }

    #[test]
    fn test_merge_overrides() {
        let base = AppConfig {
            general: GeneralConfig {
                show_hidden: Some(false),
                mouse: Some(false),
                ..Default::default()
            },
            preview: PreviewConfig {
                debounce_ms: Some(200),
                max_lines: Some(20),
                ..Default::default()
            },
            ..Default::default()
        };

        let over = AppConfig {
            general: GeneralConfig {
                show_hidden: Some(true),
                ..Default::default()
            },
            preview: PreviewConfig {
                debounce_ms: Some(50),
                ..Default::default()
            },
            ..Default::default()
        };

        let merged = base.merge(&over);
        assert!(merged.show_hidden());
        assert!(!merged.mouse_enabled());
        assert_eq!(merged.preview_debounce(), Duration::from_millis(50));
        assert_eq!(merged.max_lines(), 20);
    }

    #[test]
    fn test_merge_none_does_not_clear_some() {
        let base = AppConfig {
            search: SearchConfig {
                max_results: Some(10),
                batch_interval_ms: Some(500),
            },
            ..Default::default()
        };
        let merged = base.merge(&AppConfig::default());
        assert_eq!(merged.max_search_results(), 10);
        assert_eq!(merged.search_batch_interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("test-config.toml");
        let mut f = std::fs::File::create(&cfg_path).expect("create");
        writeln!(
            f,
            r#"
[general]
show_hidden = true

[preview]
max_lines = 75
"#
        )
        .expect("write");

        let cfg = load_file(&cfg_path).expect("load");
        assert!(cfg.show_hidden());
        assert_eq!(cfg.max_lines(), 75);
        assert_eq!(cfg.hex_bytes(), 4_096);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(load_file(Path::new("/nonexistent/config.toml")).is_none());
    }

    #[test]
    fn test_load_invalid_toml_returns_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("bad.toml");
        std::fs::write(&cfg_path, "this is { not valid toml").expect("write");
        assert!(load_file(&cfg_path).is_none());
    }

    #[test]
    fn test_load_with_cli_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("config.toml");
        std::fs::write(
            &cfg_path,
            r#"
[general]
show_hidden = true

[preview]
max_lines = 75
"#,
        )
        .expect("write");

        let cli_overrides = AppConfig {
            preview: PreviewConfig {
                max_lines: Some(200),
                ..Default::default()
            },
            ..Default::default()
        };

        let cfg = AppConfig::load(Some(&cfg_path), Some(&cli_overrides));
        assert_eq!(cfg.max_lines(), 200);
        assert!(cfg.show_hidden());
    }

    #[test]
    fn test_theme_custom_colors() {
        let toml = r##"
[theme]
scheme = "custom"

[theme.custom]
list_fg = "#c0caf5"
border_fg = "#565f89"
"##;
        let cfg: AppConfig = toml::from_str(toml).expect("parse");
        assert_eq!(cfg.theme.scheme_name(), "custom");
        let custom = cfg.theme.custom.as_ref().expect("custom present");
        assert_eq!(custom.list_fg.as_deref(), Some("#c0caf5"));
        assert_eq!(custom.border_fg.as_deref(), Some("#565f89"));
        assert!(custom.dialog_bg.is_none());
    }
}
