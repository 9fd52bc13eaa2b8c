use std::fs;
use std::io::Read;
use std::path::Path;
use std::time::SystemTime;

use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::SyntaxSet;

use crate::error::Result;
use crate::fs::reader::{read_directory, FileEntry};

/// Bytes scanned for NUL when deciding whether a file is binary.
const BINARY_SNIFF_BYTES: usize = 8192;
/// Bytes per hex dump row.
const HEX_ROW_BYTES: usize = 16;
/// Tab stop used when expanding tabs for display.
const TAB_WIDTH: usize = 4;

/// Known binary file extensions.
const BINARY_EXTENSIONS: &[&str] = &[
    "pt", "pth", "h5", "hdf5", "pkl", "pickle", "onnx", "zip", "tar", "gz", "bz2", "xz", "so",
    "dylib", "exe", "bin", "img", "iso", "png", "jpg", "jpeg", "gif", "pdf",
];

/// Limits applied while building a preview.
#[derive(Debug, Clone)]
pub struct PreviewOptions {
    pub max_text_bytes: u64,
    pub max_lines: usize,
    pub hex_bytes: usize,
    pub max_dir_entries: usize,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            max_text_bytes: crate::config::DEFAULT_MAX_TEXT_BYTES,
            max_lines: crate::config::DEFAULT_MAX_LINES,
            hex_bytes: crate::config::DEFAULT_HEX_BYTES,
            max_dir_entries: 500,
        }
    }
}

/// Metadata of the previewed target, used as the preview cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewMeta {
    pub size: u64,
    pub modified: Option<SystemTime>,
    pub is_dir: bool,
}

/// One line of a text preview with streaming metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    /// Byte offset of the line start within the file.
    pub offset: u64,
    /// Display width in terminal columns after tab expansion.
    pub width: usize,
}

#[derive(Debug, Clone)]
pub struct TextPreview {
    pub lines: Vec<TextLine>,
    /// Highlighted rendition of `lines`, when highlighting is enabled.
    pub styled: Option<Vec<Line<'static>>>,
    pub syntax: &'static str,
    pub truncated: bool,
}

#[derive(Debug, Clone)]
pub struct DirectoryPreview {
    pub entries: Vec<FileEntry>,
    /// Visible entry count before truncation.
    pub total: usize,
}

#[derive(Debug, Clone)]
pub struct HexPreview {
    pub rows: Vec<String>,
    pub size: u64,
    pub truncated: bool,
}

/// Content shown in the preview pane.
#[derive(Debug, Clone)]
pub enum PreviewData {
    Directory(DirectoryPreview),
    Text(TextPreview),
    Hex(HexPreview),
}

impl PreviewData {
    /// Number of scrollable rows.
    pub fn line_count(&self) -> usize {
        match self {
            PreviewData::Directory(d) => d.entries.len(),
            PreviewData::Text(t) => t.lines.len(),
            PreviewData::Hex(h) => h.rows.len(),
        }
    }
}

/// Syntax highlighting resources, loaded once and shared with the preview
/// worker tasks.
pub struct Highlighter {
    syntax_set: SyntaxSet,
    theme: Theme,
}

impl Highlighter {
    /// Load the default syntaxes and the named theme, falling back to
    /// `base16-ocean.dark`.
    pub fn new(theme_name: &str) -> Self {
        let mut themes = ThemeSet::load_defaults().themes;
        let theme = themes
            .remove(theme_name)
            .or_else(|| themes.remove("base16-ocean.dark"))
            .unwrap_or_default();
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme,
        }
    }

    fn highlight(&self, syntax_name: &str, path: &Path, lines: &[TextLine]) -> Vec<Line<'static>> {
        let syntax = self
            .syntax_set
            .find_syntax_by_name(syntax_name)
            .or_else(|| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .and_then(|ext| self.syntax_set.find_syntax_by_extension(ext))
            })
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let mut highlighter = HighlightLines::new(syntax, &self.theme);
        lines
            .iter()
            .map(|line| {
                let with_newline = format!("{}\n", line.text);
                match highlighter.highlight_line(&with_newline, &self.syntax_set) {
                    Ok(ranges) => Line::from(
                        ranges
                            .into_iter()
                            .map(|(style, text)| {
                                let fg = style.foreground;
                                Span::styled(
                                    text.trim_end_matches('\n').to_string(),
                                    Style::default().fg(Color::Rgb(fg.r, fg.g, fg.b)),
                                )
                            })
                            .collect::<Vec<_>>(),
                    ),
                    Err(_) => Line::from(line.text.clone()),
                }
            })
            .collect()
    }
}

/// Detect the syntax name for a file based on its extension.
pub fn detect_syntax_name(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("py") => "Python",
        Some("rs") => "Rust",
        Some("yaml" | "yml") => "YAML",
        Some("json") => "JSON",
        Some("toml") => "TOML",
        Some("sh" | "bash" | "zsh") => "Bourne Again Shell (bash)",
        Some("sql") => "SQL",
        Some("md" | "markdown") => "Markdown",
        Some("html" | "htm") => "HTML",
        Some("css") => "CSS",
        Some("js" | "jsx") => "JavaScript",
        Some("c" | "h") => "C",
        Some("cpp" | "hpp" | "cc") => "C++",
        Some("java") => "Java",
        Some("go") => "Go",
        Some("rb") => "Ruby",
        _ => "Plain Text",
    }
}

/// Check if content is binary by extension or a NUL byte near the start.
pub fn looks_binary(path: &Path, head: &[u8]) -> bool {
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        if BINARY_EXTENSIONS.iter().any(|b| b.eq_ignore_ascii_case(ext)) {
            return true;
        }
    }
    head[..head.len().min(BINARY_SNIFF_BYTES)].contains(&0)
}

/// Build the preview for `path`.
///
/// Directories list their (optionally non-hidden) entries, binary content
/// becomes a hex dump, everything else a line-oriented text preview.
pub fn build_preview(
    path: &Path,
    hide_hidden: bool,
    options: &PreviewOptions,
    highlighter: Option<&Highlighter>,
) -> Result<(PreviewData, PreviewMeta)> {
    let metadata = fs::metadata(path)?;
    let meta = PreviewMeta {
        size: metadata.len(),
        modified: metadata.modified().ok(),
        is_dir: metadata.is_dir(),
    };

    if meta.is_dir {
        return Ok((directory_preview(path, hide_hidden, options)?, meta));
    }

    let limit = options.max_text_bytes.max(options.hex_bytes as u64);
    let mut bytes = Vec::new();
    fs::File::open(path)?.take(limit).read_to_end(&mut bytes)?;

    let data = if looks_binary(path, &bytes) {
        PreviewData::Hex(hex_preview(&bytes, meta.size, options.hex_bytes))
    } else {
        let text_len = bytes.len().min(options.max_text_bytes as usize);
        let mut text = text_preview(&bytes[..text_len], options.max_lines);
        text.truncated |= (text_len as u64) < meta.size;
        text.syntax = detect_syntax_name(path);
        if let Some(h) = highlighter {
            text.styled = Some(h.highlight(text.syntax, path, &text.lines));
        }
        PreviewData::Text(text)
    };
    Ok((data, meta))
}

fn directory_preview(
    path: &Path,
    hide_hidden: bool,
    options: &PreviewOptions,
) -> Result<PreviewData> {
    let mut entries: Vec<FileEntry> = read_directory(path)?
        .into_iter()
        .filter(|e| !(hide_hidden && e.is_hidden))
        .collect();
    let total = entries.len();
    entries.truncate(options.max_dir_entries);
    Ok(PreviewData::Directory(DirectoryPreview { entries, total }))
}

/// Split raw bytes into display lines with byte offsets and widths.
fn text_preview(bytes: &[u8], max_lines: usize) -> TextPreview {
    let mut lines = Vec::new();
    let mut offset = 0u64;
    let mut truncated = false;

    for raw in bytes.split(|&b| b == b'\n') {
        let line_offset = offset;
        offset += raw.len() as u64 + 1;
        if raw.is_empty() && line_offset > 0 && line_offset >= bytes.len() as u64 {
            // Trailing newline does not open a new line.
            break;
        }
        if lines.len() >= max_lines {
            truncated = true;
            break;
        }
        let decoded = String::from_utf8_lossy(raw);
        let text = decoded
            .trim_end_matches('\r')
            .replace('\t', &" ".repeat(TAB_WIDTH));
        let width = Span::raw(text.as_str()).width();
        lines.push(TextLine {
            text,
            offset: line_offset,
            width,
        });
    }

    TextPreview {
        lines,
        styled: None,
        syntax: "Plain Text",
        truncated,
    }
}

/// Fixed-width hex/ASCII dump of the first `max_bytes` bytes.
fn hex_preview(bytes: &[u8], size: u64, max_bytes: usize) -> HexPreview {
    let shown = &bytes[..bytes.len().min(max_bytes)];
    let rows = shown
        .chunks(HEX_ROW_BYTES)
        .enumerate()
        .map(|(row, chunk)| {
            let hex: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
            let ascii: String = chunk
                .iter()
                .map(|&b| {
                    if b.is_ascii_graphic() || b == b' ' {
                        b as char
                    } else {
                        '.'
                    }
                })
                .collect();
            format!(
                "{:08x}  {:<width$} |{}|",
                row * HEX_ROW_BYTES,
                hex.join(" "),
                ascii,
                width = HEX_ROW_BYTES * 3 - 1
            )
        })
        .collect();
    HexPreview {
        rows,
        size,
        truncated: (shown.len() as u64) < size,
    }
}
