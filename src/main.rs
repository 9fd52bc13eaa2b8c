mod action;
mod app;
mod components;
mod config;
mod error;
mod event;
mod fs;
mod fuzzy;
mod handler;
mod logging;
mod reducer;
mod runtime;
mod theme;
mod tui;
mod ui;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use crate::action::Action;
use crate::app::{AppState, StateOptions};
use crate::config::{AppConfig, GeneralConfig, LoggingConfig, PreviewConfig};
use crate::error::AppError;
use crate::event::{Event, EventHandler};
use crate::runtime::Runtime;
use crate::theme::ThemeColors;
use crate::tui::{install_panic_hook, Tui};

/// A terminal directory browser with inline filtering, previews and
/// background recursive search.
#[derive(Parser, Debug)]
#[command(name = "dirb", version, about)]
struct Cli {
    /// Directory to open (defaults to the configured path, else the current directory)
    path: Option<PathBuf>,

    /// Path to a config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Show hidden files
    #[arg(long)]
    show_hidden: bool,

    /// Disable the preview pane
    #[arg(long)]
    no_preview: bool,

    /// Disable filesystem watcher (auto-refresh)
    #[arg(long)]
    no_watcher: bool,

    /// Disable mouse support
    #[arg(long)]
    no_mouse: bool,

    /// Write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    /// Config layer holding only the values set on the command line.
    fn overrides(&self) -> AppConfig {
        AppConfig {
            general: GeneralConfig {
                show_hidden: self.show_hidden.then_some(true),
                mouse: self.no_mouse.then_some(false),
                watcher: self.no_watcher.then_some(false),
                ..GeneralConfig::default()
            },
            preview: PreviewConfig {
                enabled: self.no_preview.then_some(false),
                ..PreviewConfig::default()
            },
            logging: LoggingConfig {
                file: self
                    .log_file
                    .as_ref()
                    .map(|p| p.to_string_lossy().to_string()),
                ..LoggingConfig::default()
            },
            ..AppConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> error::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref(), Some(&cli.overrides()));

    if let Some(log_path) = config.log_file().or_else(logging::default_log_path) {
        if let Err(e) = logging::init(&log_path, config.log_level()) {
            eprintln!("dirb: logging disabled: {e}");
        }
    }

    let start = cli
        .path
        .clone()
        .or_else(|| config.general.default_path.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));
    let path = start
        .canonicalize()
        .map_err(|_| AppError::InvalidPath(format!("{} does not exist", start.display())))?;
    if !path.is_dir() {
        return Err(AppError::InvalidPath(format!(
            "{} is not a directory",
            path.display()
        )));
    }
    info!(path = %path.display(), "starting");

    let theme = theme::resolve_theme(&config.theme);
    let state = AppState::new(&path, !config.show_hidden(), StateOptions::from_config(&config));

    install_panic_hook();
    let mut tui = Tui::new(config.mouse_enabled())?;
    let result = run(&mut tui, state, &config, &theme).await;
    tui.restore()?;
    result
}

async fn run(tui: &mut Tui, mut state: AppState, config: &AppConfig, theme: &ThemeColors) -> error::Result<()> {
    let mut events = EventHandler::new(Duration::from_millis(100));
    let mut runtime = Runtime::from_config(events.sender(), config);

    let (width, height) = tui.size()?;
    dispatch(&mut state, &mut runtime, Action::Resize { width, height });
    dispatch(&mut state, &mut runtime, Action::Init);

    while !state.should_quit {
        tui.draw(&state, theme)?;

        let action = match events.next().await? {
            Event::Key(key) => handler::handle_key_event(&state, key),
            Event::Mouse(mouse) => handler::handle_mouse_event(&state, mouse),
            Event::Resize(width, height) => Some(Action::Resize { width, height }),
            Event::Tick => Some(Action::Tick),
            Event::Action(action) => Some(action),
        };
        if let Some(action) = action {
            dispatch(&mut state, &mut runtime, action);
        }
    }

    runtime.shutdown();
    Ok(())
}

/// Run one action through the reducer and hand its effects to the runtime.
fn dispatch(state: &mut AppState, runtime: &mut Runtime, action: Action) {
    match reducer::reduce(state, action) {
        Ok(effects) => runtime.execute(effects),
        // The reducer already recorded the failure for display.
        Err(e) => warn!(error = %e, "action failed"),
    }
}
